use crate::database::changes::{Table, TouchedTables};
use crate::database::models::RemoteKey;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqliteRemoteKeyRepository<'conn> {
    pub(super) conn: &'conn Connection,
    pub(super) touched: &'conn TouchedTables,
}

fn map_key(row: &Row<'_>) -> rusqlite::Result<RemoteKey> {
    Ok(RemoteKey {
        user_id: row.get(0)?,
        next_key: row.get(1)?,
    })
}

impl<'conn> SqliteRemoteKeyRepository<'conn> {
    fn query_one(&self, sql: &str) -> Result<Option<RemoteKey>> {
        Ok(self.conn.query_row(sql, [], map_key).optional()?)
    }
}

impl<'conn> super::RemoteKeyRepository for SqliteRemoteKeyRepository<'conn> {
    fn insert_all(&self, keys: &[RemoteKey]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut stmt = self.conn.prepare_cached(
            "INSERT OR REPLACE INTO remote_keys (user_id, next_key) VALUES (?1, ?2)",
        )?;
        for key in keys {
            stmt.execute(params![key.user_id, key.next_key])?;
        }
        self.touched.mark(Table::RemoteKeys);
        Ok(())
    }

    fn remote_key_by_user(&self, user_id: i64) -> Result<Option<RemoteKey>> {
        let key = self
            .conn
            .query_row(
                "SELECT user_id, next_key FROM remote_keys WHERE user_id = ?1",
                params![user_id],
                map_key,
            )
            .optional()?;
        Ok(key)
    }

    fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM remote_keys", [])?;
        self.touched.mark(Table::RemoteKeys);
        Ok(())
    }

    fn first(&self) -> Result<Option<RemoteKey>> {
        self.query_one("SELECT user_id, next_key FROM remote_keys ORDER BY user_id ASC LIMIT 1")
    }

    fn last(&self) -> Result<Option<RemoteKey>> {
        self.query_one("SELECT user_id, next_key FROM remote_keys ORDER BY user_id DESC LIMIT 1")
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM remote_keys", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
