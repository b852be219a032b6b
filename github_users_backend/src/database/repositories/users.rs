use crate::database::changes::{Table, TouchedTables};
use crate::database::models::User;
use anyhow::Result;
use rusqlite::{params, Connection, Row};

pub(super) struct SqliteUserRepository<'conn> {
    pub(super) conn: &'conn Connection,
    pub(super) touched: &'conn TouchedTables,
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        login: row.get(1)?,
        avatar_url: row.get(2)?,
        html_url: row.get(3)?,
    })
}

impl<'conn> super::UserRepository for SqliteUserRepository<'conn> {
    fn insert_all(&self, users: &[User]) -> Result<()> {
        if users.is_empty() {
            return Ok(());
        }
        let mut stmt = self.conn.prepare_cached(
            r#"
            INSERT OR REPLACE INTO github_users (id, login, avatar_url, html_url)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )?;
        for user in users {
            stmt.execute(params![user.id, user.login, user.avatar_url, user.html_url])?;
        }
        self.touched.mark(Table::Users);
        Ok(())
    }

    fn clear_all(&self) -> Result<()> {
        let removed = self.conn.execute("DELETE FROM github_users", [])?;
        tracing::debug!(removed, "cleared cached users");
        self.touched.mark(Table::Users);
        Ok(())
    }

    fn page(&self, offset: usize, limit: usize) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT id, login, avatar_url, html_url
            FROM github_users
            ORDER BY id ASC
            LIMIT ?1 OFFSET ?2
            "#,
        )?;
        let users = stmt
            .query_map(params![limit as i64, offset as i64], map_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM github_users", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
