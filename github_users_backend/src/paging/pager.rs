use super::{
    InitializeAction, LoadParams, LoadType, Page, PagingState, UserPagingSource, UserRemoteMediator,
};
use crate::config::PagingConfig;
use crate::database::models::User;
use crate::database::Database;
use anyhow::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    NotLoading { end_of_pagination_reached: bool },
    Loading,
    Error(String),
}

impl LoadState {
    pub const INCOMPLETE: LoadState = LoadState::NotLoading {
        end_of_pagination_reached: false,
    };
    pub const COMPLETE: LoadState = LoadState::NotLoading {
        end_of_pagination_reached: true,
    };

    pub fn is_end(&self) -> bool {
        matches!(
            self,
            LoadState::NotLoading {
                end_of_pagination_reached: true
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadStates {
    pub refresh: LoadState,
    pub prepend: LoadState,
    pub append: LoadState,
}

impl Default for LoadStates {
    fn default() -> Self {
        Self {
            refresh: LoadState::INCOMPLETE,
            prepend: LoadState::INCOMPLETE,
            append: LoadState::INCOMPLETE,
        }
    }
}

/// What a list screen renders: the loaded users in order plus the state of
/// each edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingSnapshot {
    pub items: Vec<User>,
    pub load_states: LoadStates,
}

/// Drives one paged list. Items are always read from the local cache; the
/// mediator is consulted on refresh and whenever the cached rows run out.
pub struct Pager {
    config: PagingConfig,
    database: Database,
    mediator: UserRemoteMediator,
    source: UserPagingSource,
    pages: Vec<Page<User>>,
    load_states: LoadStates,
}

impl Pager {
    pub fn new(config: PagingConfig, database: Database, mediator: UserRemoteMediator) -> Self {
        let source = database.users_paging_source();
        Self {
            config,
            database,
            mediator,
            source,
            pages: Vec::new(),
            load_states: LoadStates::default(),
        }
    }

    /// First load: shows whatever is cached, then refreshes from the remote.
    pub async fn start(&mut self) -> Result<()> {
        match self.mediator.initialize() {
            InitializeAction::LaunchInitialRefresh => self.refresh().await,
        }
    }

    /// Replaces the cached listing with the first remote page. On failure the
    /// cached rows stay visible and the refresh state carries the error.
    /// Only local read failures are returned as `Err`.
    pub async fn refresh(&mut self) -> Result<()> {
        self.load_states.refresh = LoadState::Loading;
        self.reload(self.initial_load_size())?;

        let state = self.paging_state();
        match self.mediator.load(LoadType::Refresh, &state).await {
            Ok(outcome) => {
                self.load_states = LoadStates {
                    refresh: LoadState::INCOMPLETE,
                    prepend: LoadState::COMPLETE,
                    append: LoadState::NotLoading {
                        end_of_pagination_reached: outcome.end_of_pagination_reached,
                    },
                };
                self.reload(self.initial_load_size())?;
            }
            Err(err) => {
                tracing::warn!(error = %err, "refresh failed, keeping cached users");
                self.load_states.refresh = LoadState::Error(err.to_string());
            }
        }
        Ok(())
    }

    /// Extends the list by one page: from the cache when it still has rows
    /// past the loaded window, otherwise from the remote.
    pub async fn append(&mut self) -> Result<()> {
        if self.load_states.append == LoadState::Loading
            || self.load_states.refresh == LoadState::Loading
        {
            return Ok(());
        }
        self.sync_local()?;
        if self.load_local_page()? {
            return Ok(());
        }
        if self.load_states.append.is_end() {
            return Ok(());
        }

        self.load_states.append = LoadState::Loading;
        let state = self.paging_state();
        match self.mediator.load(LoadType::Append, &state).await {
            Ok(outcome) => {
                self.sync_local()?;
                self.load_local_page()?;
                self.load_states.append = LoadState::NotLoading {
                    end_of_pagination_reached: outcome.end_of_pagination_reached,
                };
            }
            Err(err) => {
                tracing::warn!(error = %err, "append failed");
                self.load_states.append = LoadState::Error(err.to_string());
            }
        }
        Ok(())
    }

    pub async fn prepend(&mut self) -> Result<()> {
        let state = self.paging_state();
        match self.mediator.load(LoadType::Prepend, &state).await {
            Ok(outcome) => {
                self.load_states.prepend = LoadState::NotLoading {
                    end_of_pagination_reached: outcome.end_of_pagination_reached,
                };
            }
            Err(err) => self.load_states.prepend = LoadState::Error(err.to_string()),
        }
        Ok(())
    }

    /// Re-runs whichever load last failed.
    pub async fn retry(&mut self) -> Result<()> {
        if matches!(self.load_states.refresh, LoadState::Error(_)) {
            return self.refresh().await;
        }
        if matches!(self.load_states.append, LoadState::Error(_)) {
            self.load_states.append = LoadState::INCOMPLETE;
            return self.append().await;
        }
        if matches!(self.load_states.prepend, LoadState::Error(_)) {
            return self.prepend().await;
        }
        Ok(())
    }

    /// Called as the screen shows item `index`; appends once the reader is
    /// within the prefetch distance of the loaded end.
    pub async fn on_item_accessed(&mut self, index: usize) -> Result<()> {
        let loaded = self.item_count();
        if index + self.config.prefetch_distance as usize >= loaded {
            self.append().await?;
        }
        Ok(())
    }

    /// Picks up writes made to the cache by anyone else. Returns whether the
    /// loaded window was reloaded.
    pub fn sync_local(&mut self) -> Result<bool> {
        if !self.source.is_invalid() {
            return Ok(false);
        }
        let window = self.item_count().max(self.initial_load_size());
        self.reload(window)?;
        Ok(true)
    }

    pub fn snapshot(&self) -> PagingSnapshot {
        PagingSnapshot {
            items: self.pages.iter().flat_map(|page| page.data.clone()).collect(),
            load_states: self.load_states.clone(),
        }
    }

    pub fn load_states(&self) -> &LoadStates {
        &self.load_states
    }

    pub fn item_count(&self) -> usize {
        self.pages.iter().map(|page| page.data.len()).sum()
    }

    fn initial_load_size(&self) -> usize {
        self.config.initial_load_size.max(1) as usize
    }

    fn paging_state(&self) -> PagingState<User> {
        PagingState {
            pages: self.pages.clone(),
            config: self.config,
        }
    }

    /// Swaps in a fresh source and loads the first `size` cached rows.
    fn reload(&mut self, size: usize) -> Result<()> {
        self.source = self.database.users_paging_source();
        let page = self.source.load(LoadParams {
            key: None,
            load_size: size,
        })?;
        tracing::trace!(rows = page.data.len(), "reloaded cached users");
        self.pages = if page.data.is_empty() {
            Vec::new()
        } else {
            vec![page]
        };
        Ok(())
    }

    /// Loads the next cached page past the window. Returns whether a full page
    /// was found, meaning the cache may hold more rows still.
    fn load_local_page(&mut self) -> Result<bool> {
        let page = self.source.load(LoadParams {
            key: Some(self.item_count()),
            load_size: self.config.page_size.max(1) as usize,
        })?;
        let full = page.next_key.is_some();
        if !page.data.is_empty() {
            self.pages.push(page);
        }
        Ok(full)
    }
}
