use crate::types::{AggregatorError, FetchConfig, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, error, warn};
use url::Url;

/// Shared HTTP client for providers and the persistence API.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    rate_limiter: Arc<RwLock<HashMap<String, Instant>>>,
    min_host_interval: Duration,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let redirect = if config.follow_redirects {
            reqwest::redirect::Policy::limited(config.max_redirects)
        } else {
            reqwest::redirect::Policy::none()
        };

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(redirect)
            .build()?;

        Ok(Self {
            client,
            config,
            rate_limiter: Arc::new(RwLock::new(HashMap::new())),
            min_host_interval: Duration::from_millis(250),
        })
    }

    pub fn with_min_host_interval(mut self, interval: Duration) -> Self {
        self.min_host_interval = interval;
        self
    }

    /// GET a JSON document, retrying transient failures.
    pub async fn get_json(&self, url: &Url, bearer: Option<&str>) -> Result<Value> {
        let body = self.send_with_retry(Method::GET, url, bearer, None::<&()>).await?;
        parse_body(&body)
    }

    /// Send a request with an optional JSON body and return the parsed
    /// response, or `Value::Null` for an empty body.
    pub async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &Url,
        bearer: Option<&str>,
        body: Option<&B>,
    ) -> Result<Value> {
        let text = self.send_with_retry(method, url, bearer, body).await?;
        parse_body(&text)
    }

    async fn send_with_retry<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &Url,
        bearer: Option<&str>,
        body: Option<&B>,
    ) -> Result<String> {
        self.apply_rate_limit(url).await;

        let delay = Duration::from_secs(self.config.retry_delay_seconds);
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: delay,
            initial_interval: delay,
            max_interval: delay * 32,
            multiplier: 2.0,
            max_elapsed_time: Some(delay * 60),
            ..Default::default()
        };

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            debug!("{} {} (attempt {})", method, redacted(url), attempt + 1);
            let request = self.build_request(method.clone(), url, bearer, body);

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                        warn!("{} rejected credentials with HTTP {}", host_of(url), status);
                        return Err(AggregatorError::AuthRejected { service: host_of(url) });
                    }

                    if status == StatusCode::NOT_FOUND {
                        return Err(AggregatorError::NotFound { id: url.path().to_string() });
                    }

                    if status.is_client_error() {
                        let text = response.text().await.unwrap_or_default();
                        return Err(client_error(status, &text));
                    }

                    if !status.is_success() {
                        last_error = Some(AggregatorError::General(format!(
                            "HTTP {}: {}",
                            status,
                            status.canonical_reason().unwrap_or("Unknown")
                        )));
                    } else {
                        match read_capped(response, self.max_payload_bytes()).await {
                            Ok(text) => return Ok(text),
                            Err(e @ AggregatorError::PayloadTooLarge { .. }) => return Err(e),
                            Err(e) => last_error = Some(e),
                        }
                    }
                }
                Err(e) => {
                    last_error = Some(AggregatorError::Http(e));
                }
            }

            if attempt < self.config.max_retries {
                if let Some(delay) = backoff.next_backoff() {
                    warn!("Attempt {} failed for {}, retrying in {:?}", attempt + 1, redacted(url), delay);
                    tokio::time::sleep(delay).await;
                    continue;
                }
            }
            break;
        }

        error!("Request failed after {} attempts: {}", self.config.max_retries + 1, redacted(url));
        Err(last_error.unwrap_or_else(|| AggregatorError::General("Unknown error".to_string())))
    }

    fn build_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &Url,
        bearer: Option<&str>,
        body: Option<&B>,
    ) -> RequestBuilder {
        let mut request = self.client.request(method, url.clone());
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request
    }

    fn max_payload_bytes(&self) -> usize {
        self.config.max_payload_size_mb.saturating_mul(1024 * 1024)
    }

    async fn apply_rate_limit(&self, url: &Url) {
        let host = host_of(url);
        let slot = self.reserve_slot(&host).await;
        let wait = slot.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            debug!("Rate limiting {}: waiting {:?}", host, wait);
            tokio::time::sleep_until(slot).await;
        }
    }

    /// Claim the next send slot for a host. The lock is released before
    /// anyone waits, so other hosts are never held up.
    async fn reserve_slot(&self, host: &str) -> Instant {
        let mut rate_limiter = self.rate_limiter.write().await;
        let now = Instant::now();
        let slot = match rate_limiter.get(host) {
            Some(last) => (*last + self.min_host_interval).max(now),
            None => now,
        };
        rate_limiter.insert(host.to_string(), slot);
        slot
    }
}

/// Read a response body, giving up as soon as it passes `limit` bytes.
/// Chunked bodies without a length header are counted as they arrive.
async fn read_capped(mut response: Response, limit: usize) -> Result<String> {
    if let Some(length) = response.content_length() {
        if length > limit as u64 {
            return Err(AggregatorError::PayloadTooLarge { limit_bytes: limit });
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > limit {
            return Err(AggregatorError::PayloadTooLarge { limit_bytes: limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

fn parse_body(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(text)?)
}

fn client_error(status: StatusCode, body: &str) -> AggregatorError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| body.to_string());
    AggregatorError::Rejected { status: status.as_u16(), message }
}

fn host_of(url: &Url) -> String {
    url.host_str().unwrap_or("").to_string()
}

/// Render a URL for logs with credential-bearing query values masked.
pub fn redacted(url: &Url) -> String {
    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if k.eq_ignore_ascii_case("apikey") || k.eq_ignore_ascii_case("api_key") {
                "***".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();
    if pairs.is_empty() {
        return masked.to_string();
    }
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}
