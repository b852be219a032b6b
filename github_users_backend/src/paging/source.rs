use super::{LoadParams, Page};
use crate::database::changes::Table;
use crate::database::models::User;
use crate::database::repositories::UserRepository;
use crate::database::Database;
use anyhow::Result;

/// Offset-based view of the users table. Each instance is bound to the
/// table generation it was created at; once the table is written the
/// instance reports itself invalid and the pager swaps in a fresh one.
pub struct UserPagingSource {
    database: Database,
    generation: u64,
}

impl UserPagingSource {
    pub(crate) fn new(database: Database, generation: u64) -> Self {
        Self {
            database,
            generation,
        }
    }

    pub fn load(&self, params: LoadParams) -> Result<Page<User>> {
        let offset = params.key.unwrap_or(0);
        let data = self
            .database
            .with_repositories(|repos| repos.users().page(offset, params.load_size))?;
        let prev_key = if offset == 0 {
            None
        } else {
            Some(offset.saturating_sub(params.load_size))
        };
        let next_key = if data.len() < params.load_size {
            None
        } else {
            Some(offset + data.len())
        };
        Ok(Page {
            data,
            prev_key,
            next_key,
        })
    }

    pub fn is_invalid(&self) -> bool {
        self.database.generation(Table::Users) != self.generation
    }
}
