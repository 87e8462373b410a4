use std::time::{Duration, Instant};

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::track::{ApiSearchResponse, ApiTrack};
use crate::{CatalogError, TrackResult};

pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";

/// Tokens are treated as expired this long before the server says so.
const TOKEN_EXPIRY_MARGIN_SECS: u64 = 60;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_url: String,
    pub api_base: String,
    /// Extra attempts after the first failed token request.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further attempt.
    pub base_delay_ms: u64,
    pub request_timeout_ms: u64,
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            max_retries: 3,
            base_delay_ms: 500,
            request_timeout_ms: 10_000,
            default_limit: 5,
            max_limit: 20,
        }
    }
}

impl CatalogConfig {
    /// Clamp a requested result count into `1..=max_limit`, using
    /// `default_limit` when none was requested.
    pub fn clamp_limit(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

/// `base * 2^attempt`: 500ms, 1s, 2s, ... with the default base.
pub fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(1u64 << attempt.min(16)))
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Client for the catalog's search API.
///
/// The cached token sits behind a lock only for the moment it is read or
/// replaced; concurrent refreshes may both hit the token endpoint and the
/// last one to finish wins. Both tokens are valid, so that is harmless.
pub struct CatalogClient {
    http: reqwest::Client,
    config: CatalogConfig,
    token: RwLock<Option<CachedToken>>,
}

impl CatalogClient {
    pub fn new(config: CatalogConfig) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self {
            http,
            config,
            token: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// A valid bearer token, from cache when possible.
    pub async fn access_token(&self) -> Result<String, CatalogError> {
        if let Some(cached) = self.token.read().await.as_ref() {
            if Instant::now() < cached.expires_at {
                return Ok(cached.value.clone());
            }
        }

        let fresh = self.request_token().await?;
        let value = fresh.value.clone();
        *self.token.write().await = Some(fresh);
        Ok(value)
    }

    async fn request_token(&self) -> Result<CachedToken, CatalogError> {
        let (Some(client_id), Some(client_secret)) = (
            self.config.client_id.as_deref().filter(|s| !s.is_empty()),
            self.config.client_secret.as_deref().filter(|s| !s.is_empty()),
        ) else {
            return Err(CatalogError::MissingCredentials);
        };

        let mut attempt = 0;
        loop {
            let result = self.try_request_token(client_id, client_secret).await;
            let err = match result {
                Ok(token) => {
                    if attempt > 0 {
                        tracing::info!(attempts = attempt + 1, "Catalog token request succeeded after retry");
                    }
                    return Ok(token);
                }
                Err(e) => e,
            };

            if !err.is_retryable() || attempt >= self.config.max_retries {
                return Err(err);
            }

            let delay = backoff_delay(self.config.base_delay_ms, attempt);
            tracing::warn!(
                error = %err,
                attempt = attempt + 1,
                max_retries = self.config.max_retries,
                delay_ms = delay.as_millis() as u64,
                "Catalog token request failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn try_request_token(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<CachedToken, CatalogError> {
        let resp = self
            .http
            .post(&self.config.token_url)
            .basic_auth(client_id, Some(client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await?;

        let resp = ensure_success(resp, "token request").await?;
        let token: TokenResponse = resp.json().await?;
        let ttl = token.expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS);
        Ok(CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(ttl),
        })
    }

    /// Search tracks by free text. `limit` is clamped per configuration.
    pub async fn search_tracks(
        &self,
        query: &str,
        limit: Option<u32>,
    ) -> Result<Vec<TrackResult>, CatalogError> {
        let token = self.access_token().await?;
        let limit = self.config.clamp_limit(limit).to_string();

        let resp = self
            .http
            .get(format!("{}/search", self.config.api_base))
            .query(&[("q", query), ("type", "track"), ("limit", limit.as_str())])
            .bearer_auth(token)
            .send()
            .await?;

        let resp = ensure_success(resp, "search").await?;
        let page: ApiSearchResponse = resp.json().await?;
        Ok(page
            .tracks
            .map(|p| p.items.into_iter().map(TrackResult::from).collect())
            .unwrap_or_default())
    }

    /// Look up a single track. Unknown ids are `Ok(None)`.
    pub async fn get_track(&self, track_id: &str) -> Result<Option<TrackResult>, CatalogError> {
        let token = self.access_token().await?;

        let resp = self
            .http
            .get(format!("{}/tracks/{}", self.config.api_base, track_id))
            .bearer_auth(token)
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = ensure_success(resp, "track lookup").await?;
        let track: ApiTrack = resp.json().await?;
        Ok(Some(track.into()))
    }
}

async fn ensure_success(
    resp: reqwest::Response,
    context: &'static str,
) -> Result<reqwest::Response, CatalogError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(CatalogError::Status { context, status, body })
}
