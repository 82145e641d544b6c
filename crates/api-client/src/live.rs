use crate::ShopDataSource;
use crate::auth::TokenStore;
use crate::error::ApiError;
use crate::retry::{RetryPolicy, Retryable};
use async_trait::async_trait;
use cache::Cache;
use configuration::EtsyConfig;
use core_types::{DataMode, DateRange};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The four upstream resources this client reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    ShopStats,
    ListingsStats,
    Trends,
    Funnel,
}

impl Endpoint {
    /// Path segments below `/shops/{shop_id}`.
    fn segments(&self) -> &'static [&'static str] {
        match self {
            Endpoint::ShopStats => &["stats"],
            Endpoint::ListingsStats => &["listings", "stats"],
            Endpoint::Trends => &["stats", "trends"],
            Endpoint::Funnel => &["stats", "funnel"],
        }
    }

    fn cache_name(&self) -> &'static str {
        match self {
            Endpoint::ShopStats => "shop_stats",
            Endpoint::ListingsStats => "listings_stats",
            Endpoint::Trends => "trends",
            Endpoint::Funnel => "funnel",
        }
    }
}

/// A client for the Etsy Open API v3 with retry, token refresh and caching.
pub struct EtsyClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: TokenStore,
    policy: RetryPolicy,
    cache: Option<(Arc<dyn Cache>, Duration)>,
    cancel: CancellationToken,
}

impl EtsyClient {
    /// Builds a live client. Fails with `NotConfigured` without a client id.
    pub fn new(config: &EtsyConfig) -> Result<Self, ApiError> {
        let client_id = config
            .client_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ApiError::NotConfigured("etsy.client_id is not set".to_string()))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::NotConfigured(format!("invalid etsy.base_url: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::NotConfigured(format!(
                "etsy.base_url cannot be used as a base: {}",
                config.base_url
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(client_id).map_err(|_| {
                ApiError::NotConfigured("etsy.client_id is not a valid header value".to_string())
            })?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(ApiError::ClientBuild)?;

        Ok(Self {
            http,
            base_url,
            tokens: TokenStore::new(
                client_id,
                config.token_url.clone(),
                config.access_token.clone(),
                config.refresh_token.clone(),
            ),
            policy: RetryPolicy::from_config(config),
            cache: None,
            cancel: CancellationToken::new(),
        })
    }

    /// Memoises successful responses in `cache` for `ttl`.
    pub fn with_cache(mut self, cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        self.cache = Some((cache, ttl));
        self
    }

    /// Cancelling `token` aborts every pending backoff with `ApiError::Cancelled`.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    fn url(&self, shop_id: &str, endpoint: Endpoint) -> Result<Url, ApiError> {
        if shop_id.trim().is_empty() {
            return Err(ApiError::InvalidRequest("shop_id must not be empty".to_string()));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::NotConfigured("etsy.base_url cannot be a base".to_string()))?
            .pop_if_empty()
            .push("shops")
            .push(shop_id)
            .extend(endpoint.segments());
        Ok(url)
    }

    /// Sends one logical request, retrying according to the policy.
    ///
    /// - 2xx: the JSON body.
    /// - 429: waits `unit * 2^attempt`, then retries.
    /// - 5xx or a network failure: waits one unit, then retries.
    /// - 401: refreshes the token and repeats the same attempt. This happens at
    ///   most once per request; a second 401 is `Unauthorized`.
    /// - any other status: `UnexpectedStatus`, not retried.
    ///
    /// When the budget runs out the last failure is returned as `RateLimited`,
    /// `ServerError` or `Transport`.
    pub async fn request(
        &self,
        method: Method,
        url: Url,
        params: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let mut attempt: u32 = 0;
        let mut refreshed = false;

        loop {
            if self.cancel.is_cancelled() {
                return Err(ApiError::Cancelled);
            }

            let token = self.tokens.access_token().await;
            let mut builder = self
                .http
                .request(method.clone(), url.clone())
                .query(params)
                .bearer_auth(&token);
            if let Some(body) = body {
                builder = builder.json(body);
            }

            tracing::debug!(%method, path = url.path(), attempt, "Sending Etsy request.");

            let failure = match builder.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<Value>()
                            .await
                            .map_err(|e| ApiError::InvalidResponse(e.to_string()));
                    }
                    if status == StatusCode::UNAUTHORIZED {
                        if refreshed {
                            return Err(ApiError::Unauthorized(
                                "token rejected again after refresh".to_string(),
                            ));
                        }
                        tracing::warn!(path = url.path(), "Etsy rejected the access token, refreshing.");
                        self.tokens.refresh(&self.http, &token).await?;
                        refreshed = true;
                        continue;
                    }
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        Retryable::RateLimited
                    } else if status.is_server_error() {
                        Retryable::Server(status)
                    } else {
                        let body = response.text().await.unwrap_or_default();
                        return Err(ApiError::UnexpectedStatus {
                            status: status.as_u16(),
                            body,
                        });
                    }
                }
                Err(e) => Retryable::Transport(e),
            };

            if attempt >= self.policy.max_retries {
                tracing::error!(path = url.path(), attempts = attempt + 1, failure = ?failure, "Etsy request exhausted its retries.");
                return Err(failure.exhausted(attempt + 1));
            }

            let delay = self.policy.delay_for(&failure, attempt);
            tracing::warn!(
                path = url.path(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                failure = ?failure,
                "Etsy request failed, backing off."
            );
            self.backoff(delay).await?;
            attempt += 1;
        }
    }

    async fn backoff(&self, delay: Duration) -> Result<(), ApiError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ApiError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    /// GET through the cache. Cache failures are logged and otherwise ignored.
    async fn fetch(
        &self,
        shop_id: &str,
        endpoint: Endpoint,
        range: &DateRange,
        extra: Vec<(&'static str, String)>,
    ) -> Result<Value, ApiError> {
        let url = self.url(shop_id, endpoint)?;
        let mut params = range.query_params();
        params.extend(extra.iter().cloned());

        let key = cache_key(shop_id, endpoint, range, &extra);

        if let Some((cache, _)) = &self.cache {
            match cache.get(&key).await {
                Ok(Some(hit)) => {
                    tracing::debug!(key = %key, "Cache hit.");
                    return Ok(hit);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(key = %key, error = %e, "Cache read failed."),
            }
        }

        let value = self.request(Method::GET, url, &params, None).await?;

        if let Some((cache, ttl)) = &self.cache {
            if let Err(e) = cache.set(&key, value.clone(), *ttl).await {
                tracing::warn!(key = %key, error = %e, "Cache write failed.");
            }
        }

        Ok(value)
    }
}

/// Cache key for one upstream call. The parts are JSON-encoded because shop ids
/// and parameter values are caller-supplied and may contain any separator.
fn cache_key(shop_id: &str, endpoint: Endpoint, range: &DateRange, extra: &[(&str, String)]) -> String {
    let parts = serde_json::json!([shop_id, endpoint.cache_name(), range.key_fragment(), extra]);
    format!("etsy:{}", parts)
}

#[async_trait]
impl ShopDataSource for EtsyClient {
    async fn fetch_shop_stats(&self, shop_id: &str, range: &DateRange) -> Result<Value, ApiError> {
        self.fetch(shop_id, Endpoint::ShopStats, range, Vec::new()).await
    }

    async fn fetch_listings_stats(
        &self,
        shop_id: &str,
        range: &DateRange,
        limit: u32,
    ) -> Result<Value, ApiError> {
        self.fetch(shop_id, Endpoint::ListingsStats, range, vec![("limit", limit.to_string())])
            .await
    }

    async fn fetch_trends(
        &self,
        shop_id: &str,
        range: &DateRange,
        series: &[String],
    ) -> Result<Value, ApiError> {
        self.fetch(shop_id, Endpoint::Trends, range, vec![("series", series.join(","))])
            .await
    }

    async fn fetch_funnel_stats(&self, shop_id: &str, range: &DateRange) -> Result<Value, ApiError> {
        self.fetch(shop_id, Endpoint::Funnel, range, Vec::new()).await
    }

    fn mode(&self) -> DataMode {
        DataMode::Live
    }
}
