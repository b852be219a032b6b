use crate::database::models::{User, UserDetail};
use crate::paging::{LoadState, PagingSnapshot};
use crate::users::{DetailEvent, RefreshError, UserRepositoryService};
use futures_util::StreamExt;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Screen state: `Loading` until the first result arrives, then whatever
/// the latest result says.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UiState<T> {
    #[default]
    Loading,
    Success(T),
    Error(String),
}

impl<T> UiState<T> {
    pub fn reduce<E: Display>(&mut self, result: Result<T, E>) {
        *self = match result {
            Ok(value) => UiState::Success(value),
            Err(err) => UiState::Error(err.to_string()),
        };
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            UiState::Success(value) => Some(value),
            _ => None,
        }
    }
}

/// Detail screen state. A refresh failure while cached data is on screen
/// is recorded on the side and leaves the data alone. `refresh_done` flips
/// once the remote refresh has finished and its outcome is reflected here.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserDetailState {
    pub ui: UiState<Option<UserDetail>>,
    pub refresh_failure: Option<String>,
    pub refresh_done: bool,
}

impl UserDetailState {
    pub fn apply(&mut self, event: DetailEvent) {
        match event {
            DetailEvent::Value(item) => self.reduce(item),
            DetailEvent::RefreshDone => self.refresh_done = true,
        }
    }

    pub fn reduce(&mut self, item: Result<Option<UserDetail>, RefreshError>) {
        match item {
            Ok(detail) => self.ui = UiState::Success(detail),
            Err(err) if matches!(self.ui, UiState::Success(Some(_))) => {
                self.refresh_failure = Some(err.to_string());
            }
            Err(err) => self.ui.reduce::<RefreshError>(Err(err)),
        }
    }

    pub fn detail(&self) -> Option<&UserDetail> {
        self.ui.data().and_then(Option::as_ref)
    }
}

pub struct UserDetailViewModel {
    service: UserRepositoryService,
    state: Arc<watch::Sender<UserDetailState>>,
    task: Option<JoinHandle<()>>,
}

impl UserDetailViewModel {
    pub fn new(service: UserRepositoryService) -> Self {
        let (state, _) = watch::channel(UserDetailState::default());
        Self {
            service,
            state: Arc::new(state),
            task: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<UserDetailState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> UserDetailState {
        self.state.borrow().clone()
    }

    /// Starts observing `login`, replacing whatever was observed before.
    pub fn fetch_user_detail(&mut self, login: &str) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.state.send_replace(UserDetailState::default());

        let state = self.state.clone();
        let mut events = Box::pin(self.service.detail_events(login));
        self.task = Some(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                state.send_modify(|current| current.apply(event));
            }
        }));
    }
}

impl Drop for UserDetailViewModel {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListFooter {
    Idle,
    Loading,
    Retry(String),
    EndReached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserListState {
    Loading,
    /// Nothing to show and the first load failed.
    Error(String),
    Success {
        users: Vec<User>,
        footer: ListFooter,
    },
}

impl UserListState {
    pub fn from_snapshot(snapshot: &PagingSnapshot) -> Self {
        let states = &snapshot.load_states;
        if snapshot.items.is_empty() {
            match (&states.refresh, &states.append) {
                (LoadState::Error(message), _) | (_, LoadState::Error(message)) => {
                    return UserListState::Error(message.clone())
                }
                (_, append) if !append.is_end() => return UserListState::Loading,
                _ => {}
            }
        }
        let footer = match (&states.refresh, &states.append) {
            (LoadState::Error(message), _) | (_, LoadState::Error(message)) => {
                ListFooter::Retry(message.clone())
            }
            (_, LoadState::Loading) => ListFooter::Loading,
            (_, append) if append.is_end() => ListFooter::EndReached,
            _ => ListFooter::Idle,
        };
        UserListState::Success {
            users: snapshot.items.clone(),
            footer,
        }
    }
}
