//! Feed fetcher trait and implementations.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::FetchError;

/// Default central bank daily feed.
pub const DEFAULT_FEED_URL: &str = "https://www.cbr.ru/scripts/XML_daily.asp";

/// Retrieves the raw rate feed.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Get the fetcher name.
    fn name(&self) -> &str;

    /// Fetch the feed body, decoded to UTF-8.
    async fn fetch_raw(&self) -> Result<Vec<u8>, FetchError>;
}

/// Fetches the feed with a single HTTP GET. No retry and no timeout.
pub struct HttpFeedFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpFeedFetcher {
    /// Create a fetcher for the given feed URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    fn name(&self) -> &str {
        "HTTP"
    }

    async fn fetch_raw(&self) -> Result<Vec<u8>, FetchError> {
        debug!(url = %self.url, "Fetching rate feed");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %self.url, status = status.as_u16(), "Feed returned error status");
            return Err(FetchError::Status(status.as_u16()));
        }

        // The feed declares windows-1251; `text()` honours the response charset.
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;

        Ok(body.into_bytes())
    }
}

/// Mock feed fetcher for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockFeedFetcher {
    response: parking_lot::Mutex<Result<Vec<u8>, FetchError>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockFeedFetcher {
    /// Create a mock serving the given body.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            response: parking_lot::Mutex::new(Ok(body.into().into_bytes())),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Create a mock serving a feed built from `(code, name, nominal, value)` rows.
    pub fn with_rates(rows: &[(&str, &str, u32, &str)]) -> Self {
        Self::new(feed_xml(rows))
    }

    /// Serve a new body from now on.
    pub fn set_body(&self, body: impl Into<String>) {
        *self.response.lock() = Ok(body.into().into_bytes());
    }

    /// Serve a new feed from now on.
    pub fn set_rates(&self, rows: &[(&str, &str, u32, &str)]) {
        self.set_body(feed_xml(rows));
    }

    /// Fail every fetch from now on.
    pub fn set_error(&self, error: FetchError) {
        *self.response.lock() = Err(error);
    }

    /// Number of fetches performed.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Render an `XML_daily` document from `(code, name, nominal, value)` rows.
#[cfg(any(test, feature = "test-utils"))]
pub fn feed_xml(rows: &[(&str, &str, u32, &str)]) -> String {
    let valutes: String = rows
        .iter()
        .map(|(code, name, nominal, value)| {
            format!(
                "<Valute><CharCode>{code}</CharCode><Nominal>{nominal}</Nominal>\
                 <Name>{name}</Name><Value>{value}</Value></Valute>"
            )
        })
        .collect();
    format!(r#"<ValCurs Date="19.10.2026" name="Foreign Currency Market">{valutes}</ValCurs>"#)
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl FeedFetcher for MockFeedFetcher {
    fn name(&self) -> &str {
        "MOCK"
    }

    async fn fetch_raw(&self) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.response.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/scripts/XML_daily.asp"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_http_fetch_success() {
        let body = feed_xml(&[("USD", "Dollar", 1, "90,5")]);
        let server = create_mock_server(200, &body).await;
        let fetcher = HttpFeedFetcher::new(format!("{}/scripts/XML_daily.asp", server.uri()));

        let raw = fetcher.fetch_raw().await.unwrap();

        assert_eq!(String::from_utf8(raw).unwrap(), body);
    }

    #[tokio::test]
    async fn test_http_fetch_error_status() {
        let server = create_mock_server(503, "maintenance").await;
        let fetcher = HttpFeedFetcher::new(format!("{}/scripts/XML_daily.asp", server.uri()));

        let result = fetcher.fetch_raw().await;

        assert_eq!(result, Err(FetchError::Status(503)));
    }

    #[tokio::test]
    async fn test_http_fetch_unreachable() {
        let fetcher = HttpFeedFetcher::new("http://127.0.0.1:9/scripts/XML_daily.asp");

        let result = fetcher.fetch_raw().await;

        assert!(matches!(result, Err(FetchError::Transport(_))));
    }

    #[tokio::test]
    async fn test_mock_fetcher_switches_response() {
        let fetcher = MockFeedFetcher::with_rates(&[("USD", "Dollar", 1, "90,5")]);
        assert!(fetcher.fetch_raw().await.is_ok());

        fetcher.set_error(FetchError::Status(500));
        assert_eq!(fetcher.fetch_raw().await, Err(FetchError::Status(500)));
        assert_eq!(fetcher.calls(), 2);
    }
}
