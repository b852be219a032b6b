//! Remote Source: the GitHub users API behind a result-returning trait.
//!
//! Every transport, status and decoding failure is captured into
//! [`RemoteError`] at this boundary; nothing downstream needs to know which
//! one happened.

mod api;
pub mod dto;
pub mod retry;
#[cfg(test)]
pub(crate) mod testing;

pub use api::UserApiService;

use crate::database::models::{User, UserDetail};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("GitHub responded with {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[async_trait]
pub trait UserRemoteSource: Send + Sync {
    /// One page of users with ids strictly greater than `since`; `None`
    /// starts from the beginning of the collection.
    async fn fetch_page(&self, since: Option<i64>, per_page: u32) -> Result<Vec<User>, RemoteError>;

    async fn fetch_detail(&self, login: &str) -> Result<UserDetail, RemoteError>;
}
