mod remote_keys;
mod user_details;
mod users;

use super::changes::TouchedTables;
use super::models::{RemoteKey, User, UserDetail};
use anyhow::Result;
use rusqlite::Connection;

pub trait UserRepository {
    /// Insert or replace by id.
    fn insert_all(&self, users: &[User]) -> Result<()>;
    fn clear_all(&self) -> Result<()>;
    /// Rows ordered by id ascending, starting at `offset`.
    fn page(&self, offset: usize, limit: usize) -> Result<Vec<User>>;
    fn count(&self) -> Result<usize>;
}

pub trait RemoteKeyRepository {
    /// Insert or replace by user id.
    fn insert_all(&self, keys: &[RemoteKey]) -> Result<()>;
    fn remote_key_by_user(&self, user_id: i64) -> Result<Option<RemoteKey>>;
    fn clear_all(&self) -> Result<()>;
    /// Key with the lowest user id.
    fn first(&self) -> Result<Option<RemoteKey>>;
    /// Key with the highest user id.
    fn last(&self) -> Result<Option<RemoteKey>>;
    fn count(&self) -> Result<usize>;
}

pub trait UserDetailRepository {
    fn upsert(&self, detail: &UserDetail) -> Result<()>;
    fn get_by_login(&self, login: &str) -> Result<Option<UserDetail>>;
    fn clear_all(&self) -> Result<()>;
}

/// Repository handles over one connection (or open transaction). Writes
/// record the tables they touch so the owning [`super::Database`] can
/// notify live readers once the write has committed.
pub struct SqliteRepositories<'conn> {
    conn: &'conn Connection,
    touched: &'conn TouchedTables,
}

impl<'conn> SqliteRepositories<'conn> {
    pub fn new(conn: &'conn Connection, touched: &'conn TouchedTables) -> Self {
        Self { conn, touched }
    }

    pub fn users(&self) -> impl UserRepository + '_ {
        users::SqliteUserRepository {
            conn: self.conn,
            touched: self.touched,
        }
    }

    pub fn remote_keys(&self) -> impl RemoteKeyRepository + '_ {
        remote_keys::SqliteRemoteKeyRepository {
            conn: self.conn,
            touched: self.touched,
        }
    }

    pub fn user_details(&self) -> impl UserDetailRepository + '_ {
        user_details::SqliteUserDetailRepository {
            conn: self.conn,
            touched: self.touched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::changes::Table;
    use crate::database::MIGRATIONS;

    fn setup_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        conn.execute_batch(MIGRATIONS).expect("migrations");
        conn
    }

    fn user(id: i64) -> User {
        User {
            id,
            login: format!("user{id}"),
            avatar_url: format!("https://avatars.example/{id}"),
            html_url: format!("https://github.example/user{id}"),
        }
    }

    fn detail(id: i64, location: Option<&str>) -> UserDetail {
        UserDetail {
            id,
            login: format!("user{id}"),
            avatar_url: format!("https://avatars.example/{id}"),
            html_url: format!("https://github.example/user{id}"),
            location: location.map(str::to_string),
            followers: 10,
            following: 2,
            blog: None,
        }
    }

    #[test]
    fn users_upsert_by_id_and_page_in_id_order() {
        let conn = setup_conn();
        let touched = TouchedTables::default();
        let repos = SqliteRepositories::new(&conn, &touched);

        repos.users().insert_all(&[user(3), user(1), user(2)]).unwrap();
        let mut renamed = user(2);
        renamed.login = "renamed".into();
        repos.users().insert_all(&[renamed.clone()]).unwrap();

        assert_eq!(repos.users().count().unwrap(), 3);
        let page = repos.users().page(1, 10).unwrap();
        assert_eq!(page, vec![renamed, user(3)]);
        assert_eq!(repos.users().page(0, 1).unwrap(), vec![user(1)]);
        assert_eq!(touched.take(), vec![Table::Users]);

        repos.users().clear_all().unwrap();
        assert_eq!(repos.users().count().unwrap(), 0);
    }

    #[test]
    fn remote_keys_resolve_first_last_and_by_user() {
        let conn = setup_conn();
        let touched = TouchedTables::default();
        let repos = SqliteRepositories::new(&conn, &touched);
        let keys = repos.remote_keys();

        assert!(keys.first().unwrap().is_none());
        keys.insert_all(&[
            RemoteKey { user_id: 5, next_key: Some(8) },
            RemoteKey { user_id: 7, next_key: Some(8) },
            RemoteKey { user_id: 6, next_key: None },
        ])
        .unwrap();

        assert_eq!(keys.first().unwrap().map(|key| key.user_id), Some(5));
        assert_eq!(keys.last().unwrap().map(|key| key.user_id), Some(7));
        assert_eq!(
            keys.remote_key_by_user(6).unwrap(),
            Some(RemoteKey { user_id: 6, next_key: None })
        );
        assert!(keys.remote_key_by_user(99).unwrap().is_none());

        keys.clear_all().unwrap();
        assert_eq!(keys.count().unwrap(), 0);
    }

    #[test]
    fn user_details_replace_wholesale_and_lookup_by_login() {
        let conn = setup_conn();
        let touched = TouchedTables::default();
        let repos = SqliteRepositories::new(&conn, &touched);

        repos.user_details().upsert(&detail(1, Some("A"))).unwrap();
        repos.user_details().upsert(&detail(1, None)).unwrap();

        let stored = repos.user_details().get_by_login("user1").unwrap().unwrap();
        assert_eq!(stored, detail(1, None));
        assert!(repos.user_details().get_by_login("ghost").unwrap().is_none());
        assert_eq!(touched.take(), vec![Table::UserDetails]);
    }

    #[test]
    fn login_lookup_ignores_case() {
        let conn = setup_conn();
        let touched = TouchedTables::default();
        let repos = SqliteRepositories::new(&conn, &touched);

        repos.user_details().upsert(&detail(1, Some("A"))).unwrap();

        let stored = repos.user_details().get_by_login("USER1").unwrap();
        assert_eq!(stored, Some(detail(1, Some("A"))));
    }

    #[test]
    fn reads_do_not_mark_tables() {
        let conn = setup_conn();
        let touched = TouchedTables::default();
        let repos = SqliteRepositories::new(&conn, &touched);

        repos.users().page(0, 5).unwrap();
        repos.remote_keys().last().unwrap();
        repos.user_details().get_by_login("nobody").unwrap();
        assert!(touched.take().is_empty());
    }
}
