//! Incremental list loading: a local paging source over the cache, a remote
//! mediator that fills the cache from GitHub, and the [`Pager`] that drives
//! both on behalf of a list screen.

pub mod mediator;
pub mod pager;
pub mod source;

pub use mediator::{LoadOutcome, MediatorResult, SyncError, UserRemoteMediator};
pub use pager::{LoadState, LoadStates, Pager, PagingSnapshot};
pub use source::UserPagingSource;

use crate::config::PagingConfig;

/// Which edge of the loaded window needs data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadType {
    Refresh,
    Prepend,
    Append,
}

/// What the pager does before serving the first cached page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitializeAction {
    LaunchInitialRefresh,
}

/// Offset-keyed request against a local paging source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadParams {
    pub key: Option<usize>,
    pub load_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub prev_key: Option<usize>,
    pub next_key: Option<usize>,
}

/// What the list currently holds, handed to the mediator on every load.
#[derive(Debug, Clone)]
pub struct PagingState<T> {
    pub pages: Vec<Page<T>>,
    pub config: PagingConfig,
}

impl<T> PagingState<T> {
    pub fn empty(config: PagingConfig) -> Self {
        Self {
            pages: Vec::new(),
            config,
        }
    }

    pub fn item_count(&self) -> usize {
        self.pages.iter().map(|page| page.data.len()).sum()
    }

    pub fn last_item(&self) -> Option<&T> {
        self.pages.iter().rev().find_map(|page| page.data.last())
    }
}
