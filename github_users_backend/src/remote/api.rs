use super::dto::{ApiErrorDto, UserDetailDto, UserDto};
use super::retry::RetryPolicy;
use super::{RemoteError, UserRemoteSource};
use crate::config::HttpConfig;
use crate::database::models::{User, UserDetail};
use crate::utils::sanitize_base_url;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

/// GitHub REST client for the two read-only user endpoints.
#[derive(Clone)]
pub struct UserApiService {
    base_url: Url,
    client: Client,
    retry: RetryPolicy,
}

impl UserApiService {
    pub fn new(base_url: &str, http: &HttpConfig) -> Result<Self> {
        let base_url = Url::parse(&sanitize_base_url(base_url)).context("invalid API base URL")?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API base URL {base_url} cannot hold a path");
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        if let Some(token) = &http.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .context("GitHub token contains invalid header characters")?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .user_agent(http.user_agent.clone())
            .default_headers(headers)
            .connect_timeout(http.connect_timeout)
            .timeout(http.request_timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url,
            client,
            retry: RetryPolicy::from_config(http),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::InvalidRequest("base URL cannot hold a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, RemoteError> {
        tracing::debug!(%url, ?query, "GET");
        let response = self
            .retry
            .send(|| self.client.get(url.clone()).query(query))
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorDto>(&body)
                .map(|err| err.message)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl UserRemoteSource for UserApiService {
    async fn fetch_page(&self, since: Option<i64>, per_page: u32) -> Result<Vec<User>, RemoteError> {
        if per_page == 0 {
            return Err(RemoteError::InvalidRequest("per_page must be positive".into()));
        }
        let mut query = vec![("per_page", per_page.to_string())];
        if let Some(since) = since {
            query.insert(0, ("since", since.to_string()));
        }
        let url = self.endpoint(&["users"])?;
        match self.get_json::<Vec<UserDto>>(url, &query).await {
            Ok(page) => {
                let users: Vec<User> = page.into_iter().map(User::from).collect();
                tracing::debug!(?since, per_page, count = users.len(), "fetched users");
                Ok(users)
            }
            Err(err) => {
                tracing::error!(?since, per_page, error = %err, "error fetching users");
                Err(err)
            }
        }
    }

    async fn fetch_detail(&self, login: &str) -> Result<UserDetail, RemoteError> {
        let login = login.trim();
        if login.is_empty() {
            return Err(RemoteError::InvalidRequest("login may not be empty".into()));
        }
        let url = self.endpoint(&["users", login])?;
        match self.get_json::<UserDetailDto>(url, &[]).await {
            Ok(dto) => {
                let detail = UserDetail::from(dto);
                tracing::debug!(login = %detail.login, id = detail.id, "fetched user detail");
                Ok(detail)
            }
            Err(err) => {
                tracing::error!(%login, error = %err, "error fetching user detail");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_keep_base_path_and_escape_login() {
        let service = UserApiService::new("http://127.0.0.1:9/api/", &HttpConfig::default()).unwrap();
        let url = service.endpoint(&["users", "a b"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9/api/users/a%20b");
    }

    #[tokio::test]
    async fn rejects_invalid_requests_without_network() {
        let service = UserApiService::new("http://127.0.0.1:9", &HttpConfig::default()).unwrap();
        assert!(matches!(
            service.fetch_page(None, 0).await,
            Err(RemoteError::InvalidRequest(_))
        ));
        assert!(matches!(
            service.fetch_detail("  ").await,
            Err(RemoteError::InvalidRequest(_))
        ));
    }
}
