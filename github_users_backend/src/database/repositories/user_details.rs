use crate::database::changes::{Table, TouchedTables};
use crate::database::models::UserDetail;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqliteUserDetailRepository<'conn> {
    pub(super) conn: &'conn Connection,
    pub(super) touched: &'conn TouchedTables,
}

const SELECT_DETAIL: &str = r#"
    SELECT id, login, avatar_url, html_url, location, followers, following, blog
    FROM github_user_details
"#;

fn map_detail(row: &Row<'_>) -> rusqlite::Result<UserDetail> {
    Ok(UserDetail {
        id: row.get(0)?,
        login: row.get(1)?,
        avatar_url: row.get(2)?,
        html_url: row.get(3)?,
        location: row.get(4)?,
        followers: row.get(5)?,
        following: row.get(6)?,
        blog: row.get(7)?,
    })
}

impl<'conn> super::UserDetailRepository for SqliteUserDetailRepository<'conn> {
    fn upsert(&self, detail: &UserDetail) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO github_user_details
                (id, login, avatar_url, html_url, location, followers, following, blog)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                detail.id,
                detail.login,
                detail.avatar_url,
                detail.html_url,
                detail.location,
                detail.followers,
                detail.following,
                detail.blog
            ],
        )?;
        self.touched.mark(Table::UserDetails);
        Ok(())
    }

    fn get_by_login(&self, login: &str) -> Result<Option<UserDetail>> {
        let sql = format!("{SELECT_DETAIL} WHERE login = ?1 LIMIT 1");
        Ok(self
            .conn
            .query_row(&sql, params![login], map_detail)
            .optional()?)
    }

    fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM github_user_details", [])?;
        self.touched.mark(Table::UserDetails);
        Ok(())
    }
}
