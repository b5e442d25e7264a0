pub mod config;

pub use config::{mask_api_key, ProviderConfig, UpstreamConfig};

use async_trait::async_trait;
use dashboard_core::{EndpointTemplate, Provider, ProviderError, Ticker};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use std::error::Error as _;
use std::sync::Arc;
use std::time::Duration;

/// Fundamentals gateways refuse requests without a browser-like agent.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// HTTP client for the quotes and fundamentals providers.
///
/// Owns the timeout and retry policy so normalizers never deal with either.
#[derive(Clone)]
pub struct ProviderClient {
    client: Client,
    config: Arc<ProviderConfig>,
}

impl ProviderClient {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Transport(describe_reqwest_error(e)))?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Absolute URL for `endpoint`, with segments and query pairs encoded.
    pub fn build_url(&self, endpoint: &EndpointTemplate, ticker: &Ticker) -> Result<Url, ProviderError> {
        let upstream = self.config.upstream(endpoint.upstream);
        let rendered = endpoint.render(ticker, upstream.api_key.as_deref())?;

        let mut url = Url::parse(&upstream.base_url)
            .map_err(|e| ProviderError::InvalidEndpoint(format!("{} base URL: {}", endpoint.upstream, e)))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidEndpoint(format!("{} base URL cannot carry a path", endpoint.upstream)))?
            .pop_if_empty()
            .extend(rendered.segments.iter());
        if !rendered.query.is_empty() {
            url.query_pairs_mut().extend_pairs(rendered.query.iter());
        }

        Ok(url)
    }

    fn auth_headers(&self, endpoint: &EndpointTemplate) -> Result<HeaderMap, ProviderError> {
        let upstream = self.config.upstream(endpoint.upstream);
        let mut headers = HeaderMap::new();

        if let (Some(name), Some(key)) = (&upstream.api_key_header, &upstream.api_key) {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ProviderError::InvalidEndpoint(format!("invalid API key header name '{name}'")))?;
            let value = HeaderValue::from_str(key)
                .map_err(|_| ProviderError::InvalidEndpoint("API key contains invalid header characters".to_string()))?;
            headers.insert(name, value);
        }

        Ok(headers)
    }

    /// Send a GET with automatic 429 retry.
    async fn send_request(&self, url: Url, headers: HeaderMap) -> Result<reqwest::Response, ProviderError> {
        let attempts = self.config.max_retries + 1;

        for attempt in 1..=attempts {
            let response = self
                .client
                .get(url.clone())
                .headers(headers.clone())
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            if attempt < attempts {
                let wait = self.retry_delay(attempt);
                tracing::warn!(
                    "Upstream 429 rate limited, waiting {:.1}s before retry {}/{}",
                    wait.as_secs_f64(),
                    attempt,
                    self.config.max_retries
                );
                tokio::time::sleep(wait).await;
            }
        }

        Err(ProviderError::RateLimited)
    }

    /// Linear backoff before retry `attempt`, capped at `Duration::MAX`.
    fn retry_delay(&self, attempt: u32) -> Duration {
        self.config.retry_backoff.saturating_mul(attempt)
    }

    fn transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.config.timeout)
        } else {
            ProviderError::Transport(describe_reqwest_error(e))
        }
    }
}

/// reqwest includes the request URL in its message; the URL can hold the key.
fn describe_reqwest_error(e: reqwest::Error) -> String {
    let e = e.without_url();
    match e.source() {
        Some(cause) => format!("{e}: {cause}"),
        None => e.to_string(),
    }
}

#[async_trait]
impl Provider for ProviderClient {
    async fn fetch(&self, endpoint: &EndpointTemplate, ticker: &Ticker) -> Result<Value, ProviderError> {
        let url = self.build_url(endpoint, ticker)?;
        let headers = self.auth_headers(endpoint)?;
        let target = endpoint.describe(ticker);

        tracing::debug!("Fetching {}", target);
        let response = self.send_request(url, headers).await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("{} answered HTTP {}", target, status.as_u16());
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_slice(&body).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_core::Upstream;
    use mockito::Matcher;

    const SECRET: &str = "sk-live-abcdef123456";

    const QUOTE: EndpointTemplate = EndpointTemplate {
        upstream: Upstream::Quotes,
        path: &["query"],
        query: &[("function", "GLOBAL_QUOTE"), ("symbol", "{ticker}"), ("apikey", "{api_key}")],
    };

    const SUMMARY: EndpointTemplate = EndpointTemplate {
        upstream: Upstream::Fundamentals,
        path: &["v10", "finance", "quoteSummary", "{ticker}"],
        query: &[("modules", "assetProfile,price")],
    };

    fn config(base_url: &str) -> ProviderConfig {
        ProviderConfig {
            quotes: UpstreamConfig {
                base_url: base_url.to_string(),
                api_key: Some(SECRET.to_string()),
                api_key_header: None,
            },
            fundamentals: UpstreamConfig {
                base_url: base_url.to_string(),
                api_key: Some("fund-key-0001".to_string()),
                api_key_header: Some("x-api-key".to_string()),
            },
            timeout: Duration::from_millis(300),
            max_retries: 2,
            retry_backoff: Duration::from_millis(1),
        }
    }

    fn ticker(s: &str) -> Ticker {
        Ticker::parse(s).unwrap()
    }

    #[test]
    fn test_build_url_encodes_query_values() {
        let client = ProviderClient::new(config("http://localhost:9999")).unwrap();
        let url = client.build_url(&QUOTE, &ticker("eurusd=x")).unwrap();
        assert_eq!(url.path(), "/query");
        assert_eq!(
            url.query(),
            Some("function=GLOBAL_QUOTE&symbol=EURUSD%3DX&apikey=sk-live-abcdef123456")
        );

        let url = client.build_url(&SUMMARY, &ticker("brk.b")).unwrap();
        assert_eq!(url.path(), "/v10/finance/quoteSummary/BRK.B");
        assert_eq!(url.query(), Some("modules=assetProfile%2Cprice"));
    }

    #[test]
    fn test_build_url_keeps_base_path() {
        let client = ProviderClient::new(config("http://localhost:9999/yf/")).unwrap();
        let url = client.build_url(&SUMMARY, &ticker("aapl")).unwrap();
        assert_eq!(url.path(), "/yf/v10/finance/quoteSummary/AAPL");
    }

    #[test]
    fn test_build_url_invalid_base() {
        let client = ProviderClient::new(config("not a url")).unwrap();
        let err = client.build_url(&QUOTE, &ticker("MSFT")).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidEndpoint(_)));
    }

    #[tokio::test]
    async fn test_fetch_attaches_api_key_and_ticker() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("function".into(), "GLOBAL_QUOTE".into()),
                Matcher::UrlEncoded("symbol".into(), "MSFT".into()),
                Matcher::UrlEncoded("apikey".into(), SECRET.into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"Global Quote": {"05. price": "411.2200"}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = ProviderClient::new(config(&server.url())).unwrap();
        let raw = client.fetch(&QUOTE, &ticker("msft")).await.unwrap();

        assert_eq!(raw["Global Quote"]["05. price"], "411.2200");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_sends_fundamentals_key_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v10/finance/quoteSummary/AAPL")
            .match_query(Matcher::UrlEncoded("modules".into(), "assetProfile,price".into()))
            .match_header("x-api-key", "fund-key-0001")
            .with_status(200)
            .with_body(r#"{"quoteSummary": {"result": [], "error": null}}"#)
            .create_async()
            .await;

        let client = ProviderClient::new(config(&server.url())).unwrap();
        client.fetch(&SUMMARY, &ticker("AAPL")).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_upstream_500_is_status_error_without_key() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/query")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body(format!("internal error for apikey={SECRET}"))
            .create_async()
            .await;

        let client = ProviderClient::new(config(&server.url())).unwrap();
        let err = client.fetch(&QUOTE, &ticker("MSFT")).await.unwrap_err();

        assert_eq!(err, ProviderError::Status(500));
        assert!(!err.to_string().contains(SECRET));
    }

    #[tokio::test]
    async fn test_fetch_upstream_404() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v10/finance/quoteSummary/ZZZZZZ")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"quoteSummary":{"result":null,"error":{"code":"Not Found"}}}"#)
            .create_async()
            .await;

        let client = ProviderClient::new(config(&server.url())).unwrap();
        let err = client.fetch(&SUMMARY, &ticker("zzzzzz")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_fetch_retries_429_then_succeeds() {
        let mut server = mockito::Server::new_async().await;
        let limited = server
            .mock("GET", "/query")
            .match_query(Matcher::Any)
            .with_status(429)
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("GET", "/query")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"Global Quote": {}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = ProviderClient::new(config(&server.url())).unwrap();
        let raw = client.fetch(&QUOTE, &ticker("MSFT")).await.unwrap();

        assert!(raw["Global Quote"].is_object());
        limited.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_gives_up_after_retries() {
        let mut server = mockito::Server::new_async().await;
        let limited = server
            .mock("GET", "/query")
            .match_query(Matcher::Any)
            .with_status(429)
            .expect(3)
            .create_async()
            .await;

        let client = ProviderClient::new(config(&server.url())).unwrap();
        let err = client.fetch(&QUOTE, &ticker("MSFT")).await.unwrap_err();

        assert_eq!(err, ProviderError::RateLimited);
        limited.assert_async().await;
    }

    #[test]
    fn test_retry_delay_is_linear_and_saturates() {
        let client = ProviderClient::new(config("http://localhost:9999")).unwrap();
        assert_eq!(client.retry_delay(1), Duration::from_millis(1));
        assert_eq!(client.retry_delay(3), Duration::from_millis(3));

        let mut huge = config("http://localhost:9999");
        huge.retry_backoff = Duration::from_millis(u64::MAX);
        let client = ProviderClient::new(huge).unwrap();
        assert_eq!(client.retry_delay(2), Duration::MAX);
    }

    #[tokio::test]
    async fn test_fetch_non_json_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/query")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let client = ProviderClient::new(config(&server.url())).unwrap();
        let err = client.fetch(&QUOTE, &ticker("MSFT")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and never answer.
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let client = ProviderClient::new(config(&format!("http://{addr}"))).unwrap();
        let err = client.fetch(&QUOTE, &ticker("MSFT")).await.unwrap_err();

        assert_eq!(err, ProviderError::Timeout(Duration::from_millis(300)));
        assert!(!err.to_string().contains(SECRET));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_hides_url() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ProviderClient::new(config(&format!("http://{addr}"))).unwrap();
        let err = client.fetch(&QUOTE, &ticker("MSFT")).await.unwrap_err();

        assert!(matches!(err, ProviderError::Transport(_)));
        assert!(!err.to_string().contains(SECRET));
        assert!(!err.to_string().contains("apikey"));
    }

    #[tokio::test]
    async fn test_fetch_missing_key_makes_no_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/query")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let mut cfg = config(&server.url());
        cfg.quotes.api_key = None;
        let client = ProviderClient::new(cfg).unwrap();
        let err = client.fetch(&QUOTE, &ticker("MSFT")).await.unwrap_err();

        assert_eq!(err, ProviderError::MissingApiKey("quotes"));
        mock.assert_async().await;
    }
}
