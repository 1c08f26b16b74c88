//! GitLab REST v4 HTTP client (reqwest-based).

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::api::GitlabApi;
use crate::error::{GitlabError, GitlabResult};
use crate::models::{AccessLevel, Group, Member, NewGroup, User};

/// Page size used for every list endpoint.
const PAGE_SIZE: u32 = 100;

/// Hard stop for paginated listings.
const MAX_PAGES: u32 = 10_000;

/// GitLab REST client authenticated with a personal or group access token.
#[derive(Clone)]
pub struct GitlabClient {
    /// API root, e.g. `https://gitlab.example.com/api/v4`.
    base_url: String,
    token: String,
    http_client: Client,
}

impl GitlabClient {
    /// Create a client for the instance at `url`.
    ///
    /// `url` may be the instance root or the API root; `/api/v4` is appended
    /// when missing.
    pub fn new(url: &str, token: String, timeout: Duration) -> GitlabResult<Self> {
        if token.trim().is_empty() {
            return Err(GitlabError::InvalidConfig("GitLab token is empty".into()));
        }
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gitsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GitlabError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_http_client(url, token, http_client))
    }

    /// Create a client with a pre-built `reqwest::Client` (for testing).
    #[must_use]
    pub fn with_http_client(url: &str, token: String, http_client: Client) -> Self {
        let trimmed = url.trim_end_matches('/');
        let base_url = if trimmed.ends_with("/api/v4") {
            trimmed.to_string()
        } else {
            format!("{trimmed}/api/v4")
        };
        Self {
            base_url,
            token,
            http_client,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("PRIVATE-TOKEN", &self.token)
    }

    // ── Internal HTTP Methods ─────────────────────────────────────────

    /// GET every page of a list endpoint, following `X-Next-Page`.
    async fn get_all<T: DeserializeOwned>(&self, endpoint: &str) -> GitlabResult<Vec<T>> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut items = Vec::new();
        let mut page: u32 = 1;

        loop {
            debug!("GitLab GET {} (page={})", url, page);
            let builder = self
                .http_client
                .get(&url)
                .query(&[("per_page", PAGE_SIZE), ("page", page)]);
            let response = self.authorized(builder).send().await?;
            let next_page = response
                .headers()
                .get("X-Next-Page")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u32>().ok());

            let mut batch: Vec<T> = self.handle_response(response).await?;
            items.append(&mut batch);

            match next_page {
                Some(next) if next > page && next <= MAX_PAGES => page = next,
                _ => break,
            }
        }

        Ok(items)
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> GitlabResult<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("GitLab GET {}", url);
        let response = self.authorized(self.http_client.get(&url)).send().await?;
        self.handle_response(response).await
    }

    async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: Option<&B>) -> GitlabResult<()> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("GitLab POST {}", url);
        let mut builder = self.authorized(self.http_client.post(&url));
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        self.handle_empty_response(response).await
    }

    async fn put<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> GitlabResult<()> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("GitLab PUT {}", url);
        let response = self
            .authorized(self.http_client.put(&url))
            .json(body)
            .send()
            .await?;
        self.handle_empty_response(response).await
    }

    async fn delete(&self, endpoint: &str) -> GitlabResult<()> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("GitLab DELETE {}", url);
        let response = self.authorized(self.http_client.delete(&url)).send().await?;
        self.handle_empty_response(response).await
    }

    // ── Response Handling ─────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> GitlabResult<T> {
        if response.status().is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body)
                .map_err(|e| GitlabError::Parse(format!("Failed to parse response: {e}")))
        } else {
            self.handle_error_response(response).await
        }
    }

    async fn handle_empty_response(&self, response: Response) -> GitlabResult<()> {
        if response.status().is_success() {
            Ok(())
        } else {
            self.handle_error_response(response).await
        }
    }

    async fn handle_error_response<T>(&self, response: Response) -> GitlabResult<T> {
        let status = response.status();

        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());

        match status {
            StatusCode::NOT_FOUND => Err(GitlabError::NotFound(body)),
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("GitLab rate limited, retry after {:?}s", retry_after);
                Err(GitlabError::RateLimited {
                    retry_after_secs: retry_after,
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GitlabError::Unauthorized(
                format!("{} {body}", status.as_u16()),
            )),
            _ => {
                let detail = if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body
                };
                Err(GitlabError::Api {
                    status: status.as_u16(),
                    detail,
                })
            }
        }
    }
}

impl std::fmt::Debug for GitlabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitlabClient")
            .field("base_url", &self.base_url)
            .field("token", &"***REDACTED***")
            .finish()
    }
}

#[derive(Serialize)]
struct AddMemberBody {
    user_id: u64,
    access_level: AccessLevel,
}

#[derive(Serialize)]
struct AdminFlagBody {
    admin: bool,
}

#[async_trait]
impl GitlabApi for GitlabClient {
    async fn list_groups(&self) -> GitlabResult<Vec<Group>> {
        self.get_all("/groups").await
    }

    async fn get_group(&self, path: &str) -> GitlabResult<Option<Group>> {
        let endpoint = format!("/groups/{}", urlencoding::encode(path));
        match self.get(&endpoint).await {
            Ok(group) => Ok(Some(group)),
            Err(GitlabError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_group(&self, group: &NewGroup) -> GitlabResult<()> {
        self.post("/groups", Some(group)).await
    }

    async fn list_members(&self, group_id: u64) -> GitlabResult<Vec<Member>> {
        self.get_all(&format!("/groups/{group_id}/members")).await
    }

    async fn add_member(
        &self,
        group_id: u64,
        user_id: u64,
        level: AccessLevel,
    ) -> GitlabResult<()> {
        let body = AddMemberBody {
            user_id,
            access_level: level,
        };
        self.post(&format!("/groups/{group_id}/members"), Some(&body))
            .await
    }

    async fn remove_member(&self, group_id: u64, user_id: u64) -> GitlabResult<()> {
        self.delete(&format!("/groups/{group_id}/members/{user_id}"))
            .await
    }

    async fn list_users(&self) -> GitlabResult<Vec<User>> {
        self.get_all("/users").await
    }

    async fn current_user(&self) -> GitlabResult<User> {
        self.get("/user").await
    }

    async fn promote_to_admin(&self, user_id: u64) -> GitlabResult<()> {
        self.put(&format!("/users/{user_id}"), &AdminFlagBody { admin: true })
            .await
    }

    async fn block_user(&self, user_id: u64) -> GitlabResult<()> {
        self.post::<()>(&format!("/users/{user_id}/block"), None)
            .await
    }

    async fn unblock_user(&self, user_id: u64) -> GitlabResult<()> {
        self.post::<()>(&format!("/users/{user_id}/unblock"), None)
            .await
    }
}
