use super::{InitializeAction, LoadType, PagingState};
use crate::database::models::{RemoteKey, User};
use crate::database::repositories::{RemoteKeyRepository, UserRepository};
use crate::database::Database;
use crate::remote::{RemoteError, UserRemoteSource};
use std::sync::Arc;
use thiserror::Error;

/// Key used when appending to a list that has nothing loaded yet:
/// fetch from the very beginning of the remote listing.
const START_KEY: RemoteKey = RemoteKey {
    user_id: 0,
    next_key: Some(0),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOutcome {
    pub end_of_pagination_reached: bool,
}

impl LoadOutcome {
    fn end() -> Self {
        Self {
            end_of_pagination_reached: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("failed to update the user cache: {0:#}")]
    Storage(#[from] anyhow::Error),
}

pub type MediatorResult = Result<LoadOutcome, SyncError>;

/// Fills the local users cache from the remote listing, one page per call,
/// and records the `since` cursor for the next page alongside each user.
#[derive(Clone)]
pub struct UserRemoteMediator {
    remote: Arc<dyn UserRemoteSource>,
    database: Database,
}

impl UserRemoteMediator {
    pub fn new(remote: Arc<dyn UserRemoteSource>, database: Database) -> Self {
        Self { remote, database }
    }

    /// A refresh always runs when a list is first shown.
    pub fn initialize(&self) -> InitializeAction {
        InitializeAction::LaunchInitialRefresh
    }

    pub async fn load(&self, load_type: LoadType, state: &PagingState<User>) -> MediatorResult {
        let since = match load_type {
            LoadType::Refresh => None,
            LoadType::Prepend => {
                tracing::debug!("prepend requested, nothing precedes the first user");
                return Ok(LoadOutcome::end());
            }
            LoadType::Append => match self.append_key(state)? {
                Some(RemoteKey {
                    next_key: Some(next),
                    ..
                }) => Some(next),
                key => {
                    tracing::debug!(?key, "no cursor for the last loaded user, pagination ends");
                    return Ok(LoadOutcome::end());
                }
            },
        };

        let per_page = state.config.page_size;
        let users = match self.remote.fetch_page(since, per_page).await {
            Ok(users) => users,
            Err(err) => {
                tracing::error!(?load_type, ?since, error = %err, "failed to load users page");
                return Err(err.into());
            }
        };
        let end_of_pagination_reached = users.is_empty();

        self.database.with_transaction(|repos| {
            if load_type == LoadType::Refresh {
                repos.remote_keys().clear_all()?;
                repos.users().clear_all()?;
            }
            if let Some(last) = users.last() {
                let next_key = Some(last.id + 1);
                let keys: Vec<RemoteKey> = users
                    .iter()
                    .map(|user| RemoteKey {
                        user_id: user.id,
                        next_key,
                    })
                    .collect();
                repos.remote_keys().insert_all(&keys)?;
                repos.users().insert_all(&users)?;
            }
            Ok(())
        })?;

        tracing::info!(
            ?load_type,
            ?since,
            count = users.len(),
            end_of_pagination_reached,
            "users page cached"
        );
        Ok(LoadOutcome {
            end_of_pagination_reached,
        })
    }

    /// Cursor stored for the last user currently loaded. With nothing loaded
    /// the list starts from the beginning.
    fn append_key(&self, state: &PagingState<User>) -> Result<Option<RemoteKey>, SyncError> {
        let Some(last) = state.last_item() else {
            return Ok(Some(START_KEY));
        };
        let key = self
            .database
            .with_repositories(|repos| repos.remote_keys().remote_key_by_user(last.id))?;
        Ok(key)
    }
}
