use crate::utils::APP_NAME;
use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Largest `per_page` the users endpoint honours.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub paths: AppPaths,
    pub http: HttpConfig,
    pub paging: PagingConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let paths = match env::var("GITHUB_USERS_HOME") {
            Ok(raw) if !raw.trim().is_empty() => AppPaths::from_base_dir(raw.trim())?,
            _ => AppPaths::discover()?,
        };
        let api_base_url = env::var("GITHUB_USERS_API_URL")
            .ok()
            .filter(|raw| !raw.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Ok(Self {
            api_base_url,
            paths,
            http: HttpConfig::from_env(),
            paging: PagingConfig::from_env(),
        })
    }

    pub fn new(api_base_url: impl Into<String>, paths: AppPaths) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            paths,
            http: HttpConfig::default(),
            paging: PagingConfig::default(),
        }
    }
}

/// Transport policy for the GitHub client. These are fixed per process and
/// never adjusted by the sync layer.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    pub token: Option<String>,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
            max_retries: 5,
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(60),
            token: None,
            user_agent: format!("{APP_NAME}/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(secs) = env::var("GITHUB_USERS_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
        {
            config.connect_timeout = Duration::from_secs(secs);
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = env::var("GITHUB_USERS_MAX_RETRIES")
            .ok()
            .and_then(|raw| raw.parse::<u32>().ok())
        {
            config.max_retries = retries;
        }
        config.token = env::var("GITHUB_USERS_TOKEN").ok().and_then(|raw| {
            if raw.trim().is_empty() {
                None
            } else {
                Some(raw.trim().to_string())
            }
        });
        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingConfig {
    pub page_size: u32,
    pub prefetch_distance: u32,
    pub initial_load_size: u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self::with_page_size(20, 5)
    }
}

impl PagingConfig {
    /// `page_size` is clamped to what `GET /users` accepts for `per_page`.
    pub fn with_page_size(page_size: u32, prefetch_distance: u32) -> Self {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        Self {
            page_size,
            prefetch_distance,
            initial_load_size: page_size.saturating_mul(3),
        }
    }

    pub fn from_env() -> Self {
        let page_size = env::var("GITHUB_USERS_PAGE_SIZE")
            .ok()
            .and_then(|raw| raw.parse::<u32>().ok())
            .filter(|size| *size > 0)
            .unwrap_or(20);
        let prefetch_distance = env::var("GITHUB_USERS_PREFETCH")
            .ok()
            .and_then(|raw| raw.parse::<u32>().ok())
            .unwrap_or(5);
        Self::with_page_size(page_size, prefetch_distance)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppPaths {
    pub base: PathBuf,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let exe_path = std::env::current_exe()
            .map_err(|err| anyhow!("failed to resolve current executable: {err}"))?;
        let base = exe_path
            .parent()
            .ok_or_else(|| anyhow!("executable path missing parent"))?
            .to_path_buf();
        Self::from_base_dir(base)
    }

    pub fn from_base_dir<P: AsRef<Path>>(base: P) -> Result<Self> {
        let base = base.as_ref().to_path_buf();
        let data_dir = base.join("data");
        let db_path = data_dir.join("github_users.db");
        Ok(Self {
            base,
            data_dir,
            db_path,
        })
    }
}
