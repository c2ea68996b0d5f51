//! HTTP client for the remote pantry service.

use async_trait::async_trait;
use pantry_core::{CollectionKind, CountAction, CountTable};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::FetchError;
use crate::parser::{parse_categories, parse_counts, parse_products};
use crate::retry::RetryStrategy;
use crate::source::PantrySource;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Endpoint for count mutations.
const UPDATE_COUNT_PATH: &str = "/update_count";

/// User agent string for Pantry Tracker.
const USER_AGENT: &str = concat!("pantry-tracker/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct UpdateCountRequest<'a> {
    product_name: &'a str,
    action: CountAction,
    amount: i64,
}

#[derive(Debug, Deserialize)]
struct UpdateCountResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    count: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

// ============================================================================
// Pantry Client
// ============================================================================

/// Persistent HTTP session against one pantry service.
///
/// Holds the base URL and the API key header for every request. The session
/// is released by [`PantryClient::close`]; later requests fail with
/// [`FetchError::Closed`].
#[derive(Debug)]
pub struct PantryClient {
    http: Mutex<Option<Client>>,
    base_url: String,
    retry_strategy: RetryStrategy,
}

impl PantryClient {
    /// Creates a client for `base_url` (e.g. `http://pantry.local:8099`).
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse, the API key is not a
    /// valid header value, or the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| FetchError::InvalidConfig(format!("invalid base URL '{base_url}': {e}")))?;
        if parsed.host_str().is_none() {
            return Err(FetchError::InvalidConfig(format!(
                "base URL '{base_url}' has no host"
            )));
        }

        let mut headers = HeaderMap::new();
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            let mut value = HeaderValue::from_str(key)
                .map_err(|e| FetchError::InvalidConfig(format!("invalid API key: {e}")))?;
            value.set_sensitive(true);
            headers.insert(HeaderName::from_static(API_KEY_HEADER), value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        debug!(base_url = %base_url, timeout_secs = timeout.as_secs(), "Created pantry client");

        Ok(Self {
            http: Mutex::new(Some(client)),
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_strategy: RetryStrategy::default(),
        })
    }

    /// Sets the retry strategy for read requests.
    #[must_use]
    pub fn with_retry_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.retry_strategy = strategy;
        self
    }

    /// The base URL requests are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns true once the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.session().is_err()
    }

    fn session(&self) -> Result<Client, FetchError> {
        self.http
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
            .ok_or(FetchError::Closed)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Performs a GET against a collection endpoint and returns the JSON body.
    #[instrument(skip(self), fields(collection = %kind))]
    async fn get_json(&self, kind: CollectionKind) -> Result<Value, FetchError> {
        let client = self.session()?;
        let url = self.endpoint(kind.path());
        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(url = %url, attempt = attempts, "Making GET request");

            match client.get(&url).send().await {
                Ok(response) => {
                    let status = response.status();
                    debug!(status = %status, "Response received");
                    if status != StatusCode::OK {
                        return Err(FetchError::Status {
                            status: status.as_u16(),
                            endpoint: kind.path().to_string(),
                        });
                    }
                    let body = response.text().await?;
                    return Ok(serde_json::from_str(&body)?);
                }
                Err(e) => {
                    let max_attempts = self.retry_strategy.max_attempts;
                    if attempts < max_attempts && self.retry_strategy.should_retry(&e) {
                        let delay = self.retry_strategy.delay_for_attempt(attempts);
                        warn!(
                            error = %e,
                            delay_secs = delay.as_secs(),
                            "Request failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }
}

#[async_trait]
impl PantrySource for PantryClient {
    fn label(&self) -> &str {
        &self.base_url
    }

    async fn fetch_categories(&self) -> Result<Vec<String>, FetchError> {
        parse_categories(self.get_json(CollectionKind::Categories).await?)
    }

    async fn fetch_products(&self) -> Result<Vec<Value>, FetchError> {
        parse_products(self.get_json(CollectionKind::Products).await?)
    }

    async fn fetch_counts(&self) -> Result<CountTable, FetchError> {
        parse_counts(self.get_json(CollectionKind::Counts).await?)
    }

    #[instrument(skip(self), fields(product = %product_name, action = %action))]
    async fn update_count(
        &self,
        product_name: &str,
        action: CountAction,
        amount: i64,
    ) -> Result<i64, FetchError> {
        let client = self.session()?;
        let url = self.endpoint(UPDATE_COUNT_PATH);
        debug!(url = %url, amount, "POST count update");

        let response = client
            .post(&url)
            .json(&UpdateCountRequest {
                product_name,
                action,
                amount,
            })
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                status: status.as_u16(),
                endpoint: UPDATE_COUNT_PATH.to_string(),
            });
        }

        let body: UpdateCountResponse = serde_json::from_str(&response.text().await?)?;
        if body.status.as_deref() != Some("ok") {
            return Err(FetchError::Rejected(
                body.message
                    .unwrap_or_else(|| "server reported a non-ok status".to_string()),
            ));
        }

        let count = body
            .count
            .ok_or_else(|| FetchError::InvalidResponse("missing 'count' in reply".to_string()))?;
        debug!(count, "Count update confirmed");
        Ok(count)
    }

    fn close(&self) -> bool {
        let closed = self
            .http
            .lock()
            .map(|mut guard| guard.take().is_some())
            .unwrap_or(false);
        if closed {
            info!(base_url = %self.base_url, "Closed pantry session");
        }
        closed
    }
}

// ============================================================================
// Tests
// ============================================================================
