use crate::config::PagingConfig;
use crate::database::models::UserDetail;
use crate::database::repositories::UserDetailRepository;
use crate::database::Database;
use crate::paging::{Pager, UserRemoteMediator};
use crate::remote::{RemoteError, UserRemoteSource};
use anyhow::Result;
use futures_util::future;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("failed to access the cached user detail: {0:#}")]
    Storage(#[from] anyhow::Error),
}

/// One step of a detail observation: a value for the screen, or the marker
/// that the single remote refresh has finished and its outcome is visible.
#[derive(Debug)]
pub enum DetailEvent {
    Value(Result<Option<UserDetail>, RefreshError>),
    RefreshDone,
}

/// Entry point for everything the list and detail screens read. All reads
/// come from the local cache; the remote only ever writes into it.
#[derive(Clone)]
pub struct UserRepositoryService {
    database: Database,
    remote: Arc<dyn UserRemoteSource>,
    paging: PagingConfig,
}

impl UserRepositoryService {
    pub fn new(database: Database, remote: Arc<dyn UserRemoteSource>, paging: PagingConfig) -> Self {
        Self {
            database,
            remote,
            paging,
        }
    }

    /// A pager over the cached users list, backed by the remote mediator.
    pub fn users_pager(&self) -> Pager {
        let mediator = UserRemoteMediator::new(self.remote.clone(), self.database.clone());
        Pager::new(self.paging, self.database.clone(), mediator)
    }

    /// Cached detail for `login`, kept live. After the first cached value is
    /// delivered the record is fetched once from the remote and written back
    /// when it differs. A failed fetch yields one `Err` item and the stream
    /// keeps following the cache.
    pub fn user_detail(
        &self,
        login: &str,
    ) -> impl Stream<Item = Result<Option<UserDetail>, RefreshError>> + Send + 'static {
        self.detail_events(login).filter_map(|event| {
            future::ready(match event {
                DetailEvent::Value(item) => Some(item),
                DetailEvent::RefreshDone => None,
            })
        })
    }

    /// [`user_detail`](Self::user_detail) with an extra
    /// [`DetailEvent::RefreshDone`] once the refresh outcome has been
    /// delivered: right after the fetch when nothing changed, after the
    /// `Err` item when it failed, or after the value it wrote.
    pub fn detail_events(&self, login: &str) -> impl Stream<Item = DetailEvent> + Send + 'static {
        let login = login.trim();
        let state = DetailRefresh {
            login: login.to_string(),
            live: self.database.observe_detail(login).boxed(),
            database: self.database.clone(),
            remote: self.remote.clone(),
            fetch_started: false,
            pending_fetch: None,
            last: None,
            awaiting_write: false,
            settle_pending: false,
        };
        stream::unfold(state, |mut state| async move {
            if state.settle_pending {
                state.settle_pending = false;
                return Some((DetailEvent::RefreshDone, state));
            }
            if let Some(cached) = state.pending_fetch.take() {
                let refreshed =
                    refresh_detail(&state.remote, &state.database, &state.login, cached).await;
                match refreshed {
                    // The live read skips values equal to its last emission.
                    Ok(Some(written))
                        if state.last.as_ref().and_then(Option::as_ref) != Some(&written) =>
                    {
                        state.awaiting_write = true;
                    }
                    Ok(_) => return Some((DetailEvent::RefreshDone, state)),
                    Err(err) => {
                        state.settle_pending = true;
                        return Some((DetailEvent::Value(Err(err)), state));
                    }
                }
            }
            let item = state.live.next().await?;
            if !state.fetch_started {
                state.fetch_started = true;
                let cached = item.as_ref().ok().cloned().flatten();
                state.pending_fetch = Some(cached);
            } else if state.awaiting_write {
                // Anything read after the write already includes it.
                state.awaiting_write = false;
                state.settle_pending = true;
            }
            if let Ok(value) = &item {
                state.last = Some(value.clone());
            }
            Some((DetailEvent::Value(item.map_err(RefreshError::Storage)), state))
        })
    }

    pub fn clear_cache(&self) -> Result<()> {
        self.database.clear_cache()
    }
}

struct DetailRefresh {
    login: String,
    live: BoxStream<'static, Result<Option<UserDetail>>>,
    database: Database,
    remote: Arc<dyn UserRemoteSource>,
    fetch_started: bool,
    pending_fetch: Option<Option<UserDetail>>,
    last: Option<Option<UserDetail>>,
    awaiting_write: bool,
    settle_pending: bool,
}

async fn refresh_detail(
    remote: &Arc<dyn UserRemoteSource>,
    database: &Database,
    login: &str,
    cached: Option<UserDetail>,
) -> Result<Option<UserDetail>, RefreshError> {
    let fetched = match remote.fetch_detail(login).await {
        Ok(fetched) => fetched,
        Err(err) => {
            tracing::warn!(%login, error = %err, "detail refresh failed, keeping cache");
            return Err(err.into());
        }
    };
    if cached.as_ref() == Some(&fetched) {
        tracing::debug!(%login, "cached detail is current");
        return Ok(None);
    }
    database.with_repositories(|repos| repos.user_details().upsert(&fetched))?;
    tracing::debug!(%login, id = fetched.id, "cached detail updated");
    Ok(Some(fetched))
}
