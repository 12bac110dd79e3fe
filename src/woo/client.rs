//! HTTP client for storefront pages using wreq for TLS fingerprint emulation.

use crate::config::Config;
use crate::woo::events::{EventSink, ScrapeEvent};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::RngExt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use wreq::Client;
use wreq_util::Emulation;

/// Placeholder in a proxy URL replaced by a sticky-session id.
const SESSION_PLACEHOLDER: &str = "{session}";

/// Errors produced while fetching a page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: wreq::Error,
    },

    /// The server answered with a non-2xx status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Every attempt failed; `last` is the final attempt's error.
    #[error("giving up on {url} after {attempts} attempts: {last}")]
    Exhausted { url: String, attempts: u32, last: Box<FetchError> },
}

/// Fetches page bodies - enables mocking for tests.
#[async_trait]
pub trait PageFetch: Send + Sync {
    /// Fetches `url` and returns its body.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Storefront HTTP client with browser impersonation and retry with backoff.
pub struct ShopClient {
    client: Client,
    headers: Vec<(String, String)>,
    delay: Duration,
    max_retries: u32,
    backoff_base: Duration,
    events: Arc<dyn EventSink>,
}

impl ShopClient {
    /// Creates a new client from the configuration.
    pub fn new(config: &Config, events: Arc<dyn EventSink>) -> Result<Self> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10));

        // Configure proxy if specified
        if let Some(proxy_url) = config.effective_proxy() {
            let proxy_url = with_session_id(proxy_url);
            debug!("Configuring proxy: {}", proxy_url);
            let proxy = wreq::Proxy::all(proxy_url.as_str()).context("Failed to configure proxy")?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            headers: config.request_headers(),
            delay: Duration::from_millis(config.delay_ms),
            max_retries: config.max_retries,
            backoff_base: Duration::from_secs(1),
            events,
        })
    }

    /// Overrides the base of the exponential backoff (1s by default).
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Overrides the pause applied after each successful fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Performs a single GET request.
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        debug!("GET {}", url);

        let mut request = self.client.get(url).emulation(Emulation::Chrome131);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|source| FetchError::Transport { url: url.to_string(), source })?;

        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status: status.as_u16() });
        }

        response.text().await.map_err(|source| FetchError::Transport { url: url.to_string(), source })
    }

    /// Fixed politeness pause after a successful request.
    async fn pause(&self) {
        if self.delay.is_zero() {
            return;
        }
        debug!("Delaying {:?}", self.delay);
        tokio::time::sleep(self.delay).await;
    }
}

#[async_trait]
impl PageFetch for ShopClient {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let attempts = self.max_retries.max(1);
        let mut attempt = 0;

        loop {
            match self.get(url).await {
                Ok(body) => {
                    info!("Fetched {} ({} bytes)", url, body.len());
                    self.pause().await;
                    return Ok(body);
                }
                Err(e) if attempt + 1 < attempts => {
                    let wait = backoff_delay(self.backoff_base, attempt);
                    attempt += 1;
                    self.events.emit(&ScrapeEvent::RetryScheduled {
                        url: url.to_string(),
                        attempt,
                        wait,
                        error: e.to_string(),
                    });
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    self.events.emit(&ScrapeEvent::FetchExhausted { url: url.to_string(), attempts });
                    return Err(FetchError::Exhausted {
                        url: url.to_string(),
                        attempts,
                        last: Box::new(e),
                    });
                }
            }
        }
    }
}

/// Wait before retrying after the 0-indexed failed `attempt`: `base * 2^attempt`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// Replaces the `{session}` placeholder with a random 10-digit id.
fn with_session_id(proxy_url: &str) -> String {
    if !proxy_url.contains(SESSION_PLACEHOLDER) {
        return proxy_url.to_string();
    }
    let session: u64 = rand::rng().random_range(1_000_000_000..=9_999_999_999);
    proxy_url.replace(SESSION_PLACEHOLDER, &session.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::woo::events::testing::RecordingSink;
    use crate::woo::events::NullSink;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_test_config() -> Config {
        Config { delay_ms: 0, max_retries: 3, ..Config::default() }
    }

    fn make_client(config: &Config, events: Arc<dyn EventSink>) -> ShopClient {
        ShopClient::new(config, events).unwrap().with_backoff_base(Duration::from_millis(5))
    }

    #[test]
    fn test_backoff_doubles() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(base, 0), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(4));
    }

    #[test]
    fn test_session_placeholder() {
        let url = with_session_id("http://user-session-{session}:pw@proxy.test:8000");
        let id = url.trim_start_matches("http://user-session-").split(':').next().unwrap();
        assert_eq!(id.len(), 10);
        assert!(id.chars().all(|c| c.is_ascii_digit()));

        assert_eq!(with_session_id("socks5://proxy.test:1080"), "socks5://proxy.test:1080");
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/shop/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html><li class=\"product\">Mug</li></html>"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = make_client(&make_test_config(), Arc::new(NullSink));
        let body = client.fetch(&format!("{}/shop/", mock_server.uri())).await.unwrap();
        assert!(body.contains("Mug"));
    }

    #[tokio::test]
    async fn test_fetch_sends_configured_headers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(header("x-shop-token", "abc"))
            .and(header("accept-language", "vi-VN"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut config = make_test_config();
        config.headers.insert("X-Shop-Token".to_string(), "abc".to_string());
        config.headers.insert("Accept-Language".to_string(), "vi-VN".to_string());

        let client = make_client(&config, Arc::new(NullSink));
        assert_eq!(client.fetch(&mock_server.uri()).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_fetch_retries_then_succeeds() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("third time"))
            .mount(&mock_server)
            .await;

        let sink = Arc::new(RecordingSink::default());
        let client = make_client(&make_test_config(), sink.clone());

        let body = client.fetch(&mock_server.uri()).await.unwrap();
        assert_eq!(body, "third time");

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);

        let waits: Vec<_> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                ScrapeEvent::RetryScheduled { attempt, wait, .. } => Some((attempt, wait)),
                _ => None,
            })
            .collect();
        assert_eq!(
            waits,
            vec![(1, Duration::from_millis(5)), (2, Duration::from_millis(10))]
        );
    }

    #[tokio::test]
    async fn test_fetch_delay_applied_once_after_retries() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&mock_server)
            .await;

        let base = Duration::from_millis(20);
        let delay = Duration::from_millis(200);
        let client = ShopClient::new(&make_test_config(), Arc::new(NullSink))
            .unwrap()
            .with_backoff_base(base)
            .with_delay(delay);

        let started = std::time::Instant::now();
        assert_eq!(client.fetch(&mock_server.uri()).await.unwrap(), "ok");
        let elapsed = started.elapsed();

        assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);

        // Backoff 1x then 2x the base, politeness delay only after the success
        let backoff = base * 3;
        assert!(elapsed >= backoff + delay, "elapsed {:?}", elapsed);
        assert!(elapsed < backoff + delay * 2, "elapsed {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_fetch_exhausted() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(3)
            .mount(&mock_server)
            .await;

        let sink = Arc::new(RecordingSink::default());
        let client = make_client(&make_test_config(), sink.clone());

        let err = client.fetch(&mock_server.uri()).await.unwrap_err();
        match &err {
            FetchError::Exhausted { attempts, last, .. } => {
                assert_eq!(*attempts, 3);
                assert!(matches!(**last, FetchError::Status { status: 404, .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("404"));

        let events = sink.events();
        // Two retries scheduled, no backoff after the final failure
        assert_eq!(
            events.iter().filter(|e| matches!(e, ScrapeEvent::RetryScheduled { .. })).count(),
            2
        );
        assert!(matches!(events.last(), Some(ScrapeEvent::FetchExhausted { attempts: 3, .. })));
    }

    #[tokio::test]
    async fn test_fetch_single_attempt() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = Config { max_retries: 1, ..make_test_config() };
        let sink = Arc::new(RecordingSink::default());
        let client = make_client(&config, sink.clone());

        assert!(client.fetch(&mock_server.uri()).await.is_err());
        assert_eq!(sink.events().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_transport_error() {
        // Nothing listens on this port
        let config = Config { max_retries: 2, ..make_test_config() };
        let client = make_client(&config, Arc::new(NullSink));

        let err = client.fetch("http://127.0.0.1:9/").await.unwrap_err();
        match err {
            FetchError::Exhausted { last, .. } => {
                assert!(matches!(*last, FetchError::Transport { .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_delay_after_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&mock_server)
            .await;

        let client = make_client(&make_test_config(), Arc::new(NullSink))
            .with_delay(Duration::from_millis(50));

        let started = std::time::Instant::now();
        client.fetch(&mock_server.uri()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_empty_proxy_is_ignored() {
        let config = Config { proxy: Some(String::new()), ..make_test_config() };
        assert!(ShopClient::new(&config, Arc::new(NullSink)).is_ok());
    }
}
