use super::{RemoteError, UserRemoteSource};
use crate::database::models::{User, UserDetail};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// In-process remote that replays queued responses and records calls.
/// An exhausted page queue answers with an empty page.
#[derive(Default)]
pub(crate) struct ScriptedRemote {
    pages: Mutex<VecDeque<Result<Vec<User>, RemoteError>>>,
    details: Mutex<VecDeque<Result<UserDetail, RemoteError>>>,
    page_calls: Mutex<Vec<(Option<i64>, u32)>>,
    detail_calls: Mutex<Vec<String>>,
}

impl ScriptedRemote {
    pub(crate) fn push_page(&self, users: Vec<User>) {
        self.pages.lock().unwrap().push_back(Ok(users));
    }

    pub(crate) fn push_page_error(&self, status: u16) {
        self.pages.lock().unwrap().push_back(Err(status_error(status)));
    }

    pub(crate) fn push_detail(&self, detail: UserDetail) {
        self.details.lock().unwrap().push_back(Ok(detail));
    }

    pub(crate) fn push_detail_error(&self, status: u16) {
        self.details.lock().unwrap().push_back(Err(status_error(status)));
    }

    pub(crate) fn page_calls(&self) -> Vec<(Option<i64>, u32)> {
        self.page_calls.lock().unwrap().clone()
    }

    pub(crate) fn detail_calls(&self) -> Vec<String> {
        self.detail_calls.lock().unwrap().clone()
    }
}

fn status_error(status: u16) -> RemoteError {
    RemoteError::Status {
        status,
        message: "scripted failure".into(),
    }
}

#[async_trait]
impl UserRemoteSource for ScriptedRemote {
    async fn fetch_page(&self, since: Option<i64>, per_page: u32) -> Result<Vec<User>, RemoteError> {
        self.page_calls.lock().unwrap().push((since, per_page));
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_detail(&self, login: &str) -> Result<UserDetail, RemoteError> {
        self.detail_calls.lock().unwrap().push(login.to_string());
        self.details
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RemoteError::InvalidRequest("no scripted detail".into())))
    }
}

pub(crate) fn user(id: i64) -> User {
    User {
        id,
        login: format!("user{id}"),
        avatar_url: format!("https://avatars.example/u/{id}"),
        html_url: format!("https://github.example/user{id}"),
    }
}

pub(crate) fn users(ids: std::ops::RangeInclusive<i64>) -> Vec<User> {
    ids.map(user).collect()
}

pub(crate) fn detail(login: &str, location: Option<&str>) -> UserDetail {
    UserDetail {
        id: 42,
        login: login.to_string(),
        avatar_url: format!("https://avatars.example/{login}"),
        html_url: format!("https://github.example/{login}"),
        location: location.map(str::to_string),
        followers: 100,
        following: 50,
        blog: Some("https://blog.example".into()),
    }
}
