use anyhow::Result;
use clap::{Parser, Subcommand};
use github_users_backend::bootstrap;
use github_users_backend::cli;
use github_users_backend::config::AppConfig;
use github_users_backend::telemetry;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about = "Offline-first browser for the GitHub users directory")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the users list, refreshing the cache first
    List {
        /// Number of pages to walk through
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Show one user's details, cached first and then refreshed
    Detail {
        login: String,
        /// Seconds to wait for the refresh to report back
        #[arg(long, default_value_t = 10)]
        wait_secs: u64,
    },
    /// Remove every cached user, detail and cursor
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let args = Args::parse();

    let config = AppConfig::from_env()?;
    let resources = bootstrap::initialize(&config)?;
    if !resources.directories_created.is_empty() {
        tracing::debug!(created = ?resources.directories_created, "created data directories");
    }

    match args.command.unwrap_or(Command::List { pages: 1 }) {
        Command::List { pages } => cli::run_list(&resources.repository, pages).await,
        Command::Detail { login, wait_secs } => {
            cli::run_detail(&resources.repository, &login, Duration::from_secs(wait_secs)).await
        }
        Command::Clear => cli::run_clear(&resources.repository),
    }
}
