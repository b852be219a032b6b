use serde::{Deserialize, Serialize};

/// Summary row shown in the paged user list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub avatar_url: String,
    pub html_url: String,
}

/// Profile row backing the detail screen. Lives in its own table and is
/// looked up by login, independent of whether the user was ever listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetail {
    pub id: i64,
    pub login: String,
    pub avatar_url: String,
    pub html_url: String,
    pub location: Option<String>,
    pub followers: u32,
    pub following: u32,
    pub blog: Option<String>,
}

/// Pagination cursor anchored to a listed user. `next_key` is the `since`
/// value to request after this user; `None` means no more data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteKey {
    pub user_id: i64,
    pub next_key: Option<i64>,
}
