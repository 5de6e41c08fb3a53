//! Source API client for the Twitter v1.1 user endpoints.

use std::sync::Arc;
#[cfg(feature = "twitter")]
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use url::Url;

use super::error::SourceError;
use super::rate_limit::ApiRateLimiter;
use super::types::{PageRequest, RawUser, UserPage};
use crate::http::{HttpError, HttpHeaders, HttpRequest, HttpTransport, header_get};
use crate::profile::RelationKind;

/// Public API host.
pub const DEFAULT_BASE_URL: &str = "https://api.twitter.com";

/// Window after which a rate limit resets when the source does not say.
const DEFAULT_RATE_LIMIT_WINDOW_MINUTES: i64 = 15;

/// Anything that can look up a user and page through their connections.
///
/// [`TwitterClient`] is the production implementation; tests substitute
/// scripted sources.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Fetch a single user by handle.
    async fn get_profile(&self, username: &str) -> Result<RawUser, SourceError>;

    /// Fetch one page of a user's followers or followings.
    async fn fetch_page(&self, request: &PageRequest) -> Result<UserPage, SourceError>;
}

/// Client for the source API, authenticated with an app bearer token.
#[derive(Clone)]
pub struct TwitterClient {
    transport: Arc<dyn HttpTransport>,
    base_url: Url,
    bearer_token: String,
    rate_limiter: Option<ApiRateLimiter>,
}

impl TwitterClient {
    /// Create a client backed by reqwest.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API host, e.g. [`DEFAULT_BASE_URL`]
    /// * `bearer_token` - An already-issued app bearer token
    /// * `timeout` - Per-request timeout
    /// * `rate_limiter` - Optional proactive pacing
    #[cfg(feature = "twitter")]
    pub fn new(
        base_url: &str,
        bearer_token: &str,
        timeout: StdDuration,
        rate_limiter: Option<ApiRateLimiter>,
    ) -> Result<Self, SourceError> {
        let transport = crate::http::reqwest_transport::ReqwestTransport::with_timeout(timeout)
            .map_err(|e| SourceError::Config(e.to_string()))?;

        Self::new_with_transport(base_url, bearer_token, rate_limiter, Arc::new(transport))
    }

    pub fn new_with_transport(
        base_url: &str,
        bearer_token: &str,
        rate_limiter: Option<ApiRateLimiter>,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, SourceError> {
        // A trailing slash makes `Url::join` append instead of replacing the last segment.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .map_err(|e| SourceError::Config(format!("invalid base url {base_url:?}: {e}")))?;

        Ok(Self {
            transport,
            base_url,
            bearer_token: bearer_token.to_string(),
            rate_limiter,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url, SourceError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| SourceError::Config(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// URL for a single-user lookup.
    pub fn user_show_url(&self, username: &str) -> Result<Url, SourceError> {
        self.endpoint(
            "1.1/users/show.json",
            &[
                ("screen_name", username.to_string()),
                ("include_entities", "true".to_string()),
            ],
        )
    }

    /// URL for one page of a relation.
    pub fn page_url(&self, request: &PageRequest) -> Result<Url, SourceError> {
        let path = match request.relation {
            RelationKind::Followers => "1.1/followers/list.json",
            RelationKind::Followings => "1.1/friends/list.json",
        };

        self.endpoint(
            path,
            &[
                ("screen_name", request.username.clone()),
                ("count", request.count.to_string()),
                ("cursor", request.cursor.to_string()),
                ("skip_status", "true".to_string()),
                ("include_user_entities", "true".to_string()),
            ],
        )
    }

    /// Make an authenticated GET request and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        username: &str,
    ) -> Result<T, SourceError> {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }

        let request = HttpRequest {
            url,
            headers: vec![
                ("Accept".to_string(), "application/json".to_string()),
                (
                    "Authorization".to_string(),
                    format!("Bearer {}", self.bearer_token),
                ),
            ],
        };

        let response = self.transport.get(request).await.map_err(|e| match e {
            HttpError::Timeout(d) => SourceError::Timeout {
                seconds: d.as_secs(),
            },
            other => SourceError::Http(other),
        })?;

        match response.status {
            s if (200..300).contains(&s) => {
                serde_json::from_slice(&response.body).map_err(SourceError::Json)
            }
            404 => Err(SourceError::UserNotFound(username.to_string())),
            429 => Err(SourceError::RateLimited {
                reset_at: parse_rate_limit_reset(&response.headers),
            }),
            status => Err(SourceError::Api {
                status,
                message: String::from_utf8_lossy(&response.body).to_string(),
            }),
        }
    }
}

/// Read `x-rate-limit-reset` (epoch seconds), defaulting to one window from now.
fn parse_rate_limit_reset(headers: &HttpHeaders) -> DateTime<Utc> {
    header_get(headers, "x-rate-limit-reset")
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
        .unwrap_or_else(|| Utc::now() + chrono::Duration::minutes(DEFAULT_RATE_LIMIT_WINDOW_MINUTES))
}

#[async_trait]
impl ProfileSource for TwitterClient {
    async fn get_profile(&self, username: &str) -> Result<RawUser, SourceError> {
        let url = self.user_show_url(username)?;
        self.get_json(url, username).await
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<UserPage, SourceError> {
        let url = self.page_url(request)?;
        tracing::trace!(
            username = %request.username,
            relation = %request.relation,
            cursor = request.cursor,
            "Requesting page"
        );
        self.get_json(url, &request.username).await
    }
}
