use crate::database::models::UserDetail;
use crate::presentation::{ListFooter, UiState, UserDetailState, UserDetailViewModel, UserListState};
use crate::users::UserRepositoryService;
use anyhow::Result;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

/// Prints up to `pages` pages of users, appending one page at a time the
/// way a scrolling list would.
pub async fn run_list(repository: &UserRepositoryService, pages: usize) -> Result<()> {
    let mut pager = repository.users_pager();
    pager.start().await?;

    let mut printed = 0;
    let mut retried = false;
    let mut page = 0;
    while page < pages.max(1) {
        match UserListState::from_snapshot(&pager.snapshot()) {
            UserListState::Loading => println!("loading..."),
            UserListState::Error(message) => {
                println!("could not load users: {message}");
                return Ok(());
            }
            UserListState::Success { users, footer } => {
                for user in users.iter().skip(printed) {
                    println!("{:>10}  {:<32} {}", user.id, user.login, user.html_url);
                }
                printed = printed.max(users.len());
                match footer {
                    ListFooter::EndReached => {
                        println!("-- end of list ({printed} users)");
                        return Ok(());
                    }
                    ListFooter::Retry(message) if !retried => {
                        println!("-- load failed: {message}, retrying");
                        retried = true;
                        pager.retry().await?;
                        continue;
                    }
                    ListFooter::Retry(message) => {
                        println!("-- load failed: {message}");
                        return Ok(());
                    }
                    ListFooter::Idle | ListFooter::Loading => {}
                }
            }
        }
        page += 1;
        if page < pages {
            pager.append().await?;
        }
    }
    Ok(())
}

/// Follows the detail screen state for `login` until the refresh has
/// settled or `wait` has passed.
pub async fn run_detail(repository: &UserRepositoryService, login: &str, wait: Duration) -> Result<()> {
    let mut view_model = UserDetailViewModel::new(repository.clone());
    let mut states = view_model.subscribe();
    view_model.fetch_user_detail(login);

    let deadline = Instant::now() + wait;
    let mut last = UserDetailState::default();
    loop {
        match timeout_at(deadline, states.changed()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) | Err(_) => break,
        }
        let state = states.borrow_and_update().clone();
        if state.ui != last.ui || state.refresh_failure != last.refresh_failure {
            print_detail_state(&state);
        }
        let settled = state.refresh_done || matches!(state.ui, UiState::Error(_));
        last = state;
        if settled {
            break;
        }
    }
    Ok(())
}

pub fn run_clear(repository: &UserRepositoryService) -> Result<()> {
    repository.clear_cache()?;
    println!("cache cleared");
    Ok(())
}

fn print_detail_state(state: &UserDetailState) {
    match &state.ui {
        UiState::Loading => println!("loading..."),
        UiState::Error(message) => println!("could not load user: {message}"),
        UiState::Success(None) => println!("(not cached yet)"),
        UiState::Success(Some(detail)) => print_detail(detail),
    }
    if let Some(failure) = &state.refresh_failure {
        println!("-- refresh failed, showing cached data: {failure}");
    }
}

fn print_detail(detail: &UserDetail) {
    println!("{} (#{})", detail.login, detail.id);
    println!("  profile:   {}", detail.html_url);
    println!("  avatar:    {}", detail.avatar_url);
    println!("  location:  {}", detail.location.as_deref().unwrap_or("-"));
    println!("  blog:      {}", detail.blog.as_deref().unwrap_or("-"));
    println!("  followers: {}  following: {}", detail.followers, detail.following);
}
