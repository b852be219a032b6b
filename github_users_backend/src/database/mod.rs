pub mod changes;
pub mod models;
pub mod repositories;

use crate::config::AppPaths;
use crate::paging::source::UserPagingSource;
use anyhow::{Context, Result};
use changes::{ChangeTracker, Table, TouchedTables};
use futures_util::stream::{self, Stream};
use models::UserDetail;
use repositories::{
    RemoteKeyRepository, SqliteRepositories, UserDetailRepository, UserRepository,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

/// Bumped whenever the cache layout changes. Older caches are dropped and
/// rebuilt from the network rather than migrated.
pub(crate) const SCHEMA_VERSION: i64 = 2;

pub(crate) const MIGRATIONS: &str = r#"
    CREATE TABLE IF NOT EXISTS github_users (
        id INTEGER PRIMARY KEY,
        login TEXT NOT NULL,
        avatar_url TEXT NOT NULL,
        html_url TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS github_user_details (
        id INTEGER PRIMARY KEY,
        login TEXT NOT NULL COLLATE NOCASE,
        avatar_url TEXT NOT NULL,
        html_url TEXT NOT NULL,
        location TEXT,
        followers INTEGER NOT NULL,
        following INTEGER NOT NULL,
        blog TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_user_details_login ON github_user_details(login);

    CREATE TABLE IF NOT EXISTS remote_keys (
        user_id INTEGER PRIMARY KEY,
        next_key INTEGER
    );
"#;

const DROP_TABLES: &str = r#"
    DROP TABLE IF EXISTS github_users;
    DROP TABLE IF EXISTS github_user_details;
    DROP TABLE IF EXISTS remote_keys;
"#;

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    changes: Arc<ChangeTracker>,
    newly_created: bool,
}

impl Database {
    pub fn connect(paths: &AppPaths) -> Result<Self> {
        let newly_created = !paths.db_path.exists();
        let conn = Connection::open(&paths.db_path)
            .with_context(|| format!("failed to open {}", paths.db_path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self::from_connection(conn, newly_created))
    }

    pub fn from_connection(conn: Connection, newly_created: bool) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            changes: Arc::new(ChangeTracker::new()),
            newly_created,
        }
    }

    /// Fresh, migrated database that lives only as long as its handles.
    pub fn open_in_memory() -> Result<Self> {
        let db = Self::from_connection(Connection::open_in_memory()?, true);
        db.ensure_migrations()?;
        Ok(db)
    }

    /// Creates the cache tables, dropping them first when they were written
    /// by a different schema version. Returns whether the database file was
    /// created by this process.
    pub fn ensure_migrations(&self) -> Result<bool> {
        self.with_conn(|conn| {
            let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
            if version != 0 && version != SCHEMA_VERSION {
                tracing::warn!(
                    found = version,
                    expected = SCHEMA_VERSION,
                    "cache schema changed, dropping cached tables"
                );
                conn.execute_batch(DROP_TABLES)?;
            }
            conn.execute_batch(MIGRATIONS)
                .context("failed to apply cache schema")?;
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
            Ok(())
        })?;
        Ok(self.newly_created)
    }

    /// Runs `f` against autocommit repositories. Each statement commits on
    /// its own; use [`Database::with_transaction`] for multi-row writes that
    /// must land together.
    pub fn with_repositories<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(SqliteRepositories<'_>) -> Result<T>,
    {
        let touched = TouchedTables::default();
        let result = self.with_conn(|conn| f(SqliteRepositories::new(conn, &touched)));
        self.changes.publish(&touched.take());
        result
    }

    /// Runs `f` inside a single SQLite transaction. Everything `f` wrote is
    /// committed when it returns `Ok`, and rolled back when it returns an
    /// error or unwinds. Live readers are only notified after the commit.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(SqliteRepositories<'_>) -> Result<T>,
    {
        let touched = TouchedTables::default();
        let result = self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let value = f(SqliteRepositories::new(&tx, &touched))?;
            tx.commit().context("failed to commit transaction")?;
            Ok(value)
        });
        match result {
            Ok(value) => {
                self.changes.publish(&touched.take());
                Ok(value)
            }
            Err(err) => {
                let discarded = touched.take();
                if !discarded.is_empty() {
                    tracing::debug!(tables = ?discarded, error = %err, "transaction rolled back");
                }
                Err(err)
            }
        }
    }

    /// Removes every cached row from all three tables in one transaction.
    pub fn clear_cache(&self) -> Result<()> {
        self.with_transaction(|repos| {
            repos.remote_keys().clear_all()?;
            repos.users().clear_all()?;
            repos.user_details().clear_all()?;
            Ok(())
        })
    }

    /// Snapshot of the users table usable by the pager. The source becomes
    /// invalid as soon as the users table changes.
    pub fn users_paging_source(&self) -> UserPagingSource {
        UserPagingSource::new(self.clone(), self.changes.generation(Table::Users))
    }

    pub fn generation(&self, table: Table) -> u64 {
        self.changes.generation(table)
    }

    /// Live read of one detail record by login: yields the current value
    /// straight away, then every new value committed afterwards.
    pub fn observe_detail(
        &self,
        login: &str,
    ) -> impl Stream<Item = Result<Option<UserDetail>>> + Send + 'static {
        let login = login.to_string();
        self.live_query(Table::UserDetails, move |repos| {
            repos.user_details().get_by_login(&login)
        })
    }

    /// Re-runs `query` whenever `table` is written and yields its result
    /// when it differs from the previous emission. The first result is
    /// always yielded. The stream ends only when dropped.
    pub fn live_query<T, F>(
        &self,
        table: Table,
        query: F,
    ) -> impl Stream<Item = Result<T>> + Send + 'static
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&SqliteRepositories<'_>) -> Result<T> + Send + Sync + 'static,
    {
        let state = LiveQuery {
            database: self.clone(),
            changes: self.changes.subscribe(table),
            query,
            last: None,
            started: false,
        };
        stream::unfold(state, |mut state| async move {
            loop {
                if state.started && state.changes.changed().await.is_err() {
                    return None;
                }
                state.changes.borrow_and_update();
                let first = !state.started;
                state.started = true;

                let query = &state.query;
                match state.database.with_repositories(|repos| query(&repos)) {
                    Ok(current) => {
                        if !first && state.last.as_ref() == Some(&current) {
                            continue;
                        }
                        state.last = Some(current.clone());
                        return Some((Ok(current), state));
                    }
                    Err(err) => return Some((Err(err), state)),
                }
            }
        })
    }

    fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        // A panic inside a transaction leaves the mutex poisoned, but the
        // transaction guard has already rolled back by then.
        let guard = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }
}

struct LiveQuery<T, F> {
    database: Database,
    changes: watch::Receiver<u64>,
    query: F,
    last: Option<T>,
    started: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{RemoteKey, User};
    use futures_util::StreamExt;
    use std::time::Duration;
    use tokio::time::timeout;

    fn user(id: i64) -> User {
        User {
            id,
            login: format!("user{id}"),
            avatar_url: String::new(),
            html_url: String::new(),
        }
    }

    fn detail(location: &str) -> UserDetail {
        UserDetail {
            id: 1,
            login: "octocat".into(),
            avatar_url: "https://avatars.example/1".into(),
            html_url: "https://github.example/octocat".into(),
            location: Some(location.into()),
            followers: 3,
            following: 4,
            blog: Some("https://blog.example".into()),
        }
    }

    fn counts(db: &Database) -> (usize, usize) {
        db.with_repositories(|repos| Ok((repos.users().count()?, repos.remote_keys().count()?)))
            .unwrap()
    }

    #[test]
    fn transaction_commits_all_rows_together() {
        let db = Database::open_in_memory().unwrap();
        db.with_transaction(|repos| {
            repos
                .remote_keys()
                .insert_all(&[RemoteKey { user_id: 1, next_key: Some(2) }])?;
            repos.users().insert_all(&[user(1)])?;
            Ok(())
        })
        .unwrap();
        assert_eq!(counts(&db), (1, 1));
        assert_eq!(db.generation(Table::Users), 1);
        assert_eq!(db.generation(Table::RemoteKeys), 1);
    }

    #[test]
    fn failed_transaction_leaves_no_rows_and_publishes_nothing() {
        let db = Database::open_in_memory().unwrap();
        db.with_transaction(|repos| {
            repos.users().insert_all(&[user(10)])?;
            repos
                .remote_keys()
                .insert_all(&[RemoteKey { user_id: 10, next_key: Some(11) }])?;
            Ok(())
        })
        .unwrap();

        let result: Result<()> = db.with_transaction(|repos| {
            repos.users().clear_all()?;
            repos.remote_keys().clear_all()?;
            repos
                .remote_keys()
                .insert_all(&[RemoteKey { user_id: 20, next_key: Some(21) }])?;
            anyhow::bail!("interrupted before commit")
        });

        assert!(result.is_err());
        assert_eq!(counts(&db), (1, 1));
        let kept = db
            .with_repositories(|repos| repos.remote_keys().remote_key_by_user(10))
            .unwrap();
        assert_eq!(kept, Some(RemoteKey { user_id: 10, next_key: Some(11) }));
        assert_eq!(db.generation(Table::Users), 1);
    }

    #[test]
    fn panicking_transaction_rolls_back_and_keeps_database_usable() {
        let db = Database::open_in_memory().unwrap();
        let writer = db.clone();
        let joined = std::thread::spawn(move || {
            let _ = writer.with_transaction(|repos| -> Result<()> {
                repos.users().insert_all(&[user(1)])?;
                panic!("writer crashed mid-transaction");
            });
        })
        .join();
        assert!(joined.is_err());

        assert_eq!(counts(&db), (0, 0));
        assert_eq!(db.generation(Table::Users), 0);
        db.with_repositories(|repos| repos.users().insert_all(&[user(2)]))
            .unwrap();
        assert_eq!(counts(&db), (1, 0));
    }

    #[test]
    fn mismatched_schema_version_rebuilds_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE github_users (id INTEGER PRIMARY KEY, name TEXT); PRAGMA user_version = 7;",
        )
        .unwrap();
        let db = Database::from_connection(conn, false);
        assert!(!db.ensure_migrations().unwrap());

        db.with_repositories(|repos| repos.users().insert_all(&[user(1)]))
            .unwrap();
        assert_eq!(counts(&db), (1, 0));
        // idempotent on the current version
        db.ensure_migrations().unwrap();
        assert_eq!(counts(&db), (1, 0));
    }

    #[test]
    fn paging_source_invalidates_on_user_writes() {
        let db = Database::open_in_memory().unwrap();
        let source = db.users_paging_source();
        assert!(!source.is_invalid());

        db.with_repositories(|repos| {
            repos
                .user_details()
                .upsert(&detail("A"))
        })
        .unwrap();
        assert!(!source.is_invalid());

        db.with_repositories(|repos| repos.users().insert_all(&[user(1)]))
            .unwrap();
        assert!(source.is_invalid());
        assert!(!db.users_paging_source().is_invalid());
    }

    #[tokio::test]
    async fn observe_detail_replays_then_emits_changes() {
        let db = Database::open_in_memory().unwrap();
        let mut live = Box::pin(db.observe_detail("octocat"));

        assert_eq!(live.next().await.unwrap().unwrap(), None);

        db.with_repositories(|repos| repos.user_details().upsert(&detail("A")))
            .unwrap();
        assert_eq!(live.next().await.unwrap().unwrap(), Some(detail("A")));

        db.with_repositories(|repos| repos.user_details().upsert(&detail("B")))
            .unwrap();
        assert_eq!(live.next().await.unwrap().unwrap(), Some(detail("B")));
    }

    #[tokio::test]
    async fn observe_detail_skips_unrelated_writes() {
        let db = Database::open_in_memory().unwrap();
        db.with_repositories(|repos| repos.user_details().upsert(&detail("A")))
            .unwrap();
        let mut live = Box::pin(db.observe_detail("octocat"));
        assert_eq!(live.next().await.unwrap().unwrap(), Some(detail("A")));

        let mut other = detail("Z");
        other.id = 2;
        other.login = "hubot".into();
        db.with_repositories(|repos| repos.user_details().upsert(&other))
            .unwrap();

        let pending = timeout(Duration::from_millis(50), live.next()).await;
        assert!(pending.is_err(), "unrelated write must not re-emit");
    }

    #[test]
    fn clear_cache_empties_every_table() {
        let db = Database::open_in_memory().unwrap();
        db.with_transaction(|repos| {
            repos.users().insert_all(&[user(1), user(2)])?;
            repos
                .remote_keys()
                .insert_all(&[RemoteKey { user_id: 2, next_key: Some(3) }])?;
            repos.user_details().upsert(&detail("A"))
        })
        .unwrap();

        db.clear_cache().unwrap();
        assert_eq!(counts(&db), (0, 0));
        let cached = db
            .with_repositories(|repos| repos.user_details().get_by_login("octocat"))
            .unwrap();
        assert!(cached.is_none());
    }
}
