use std::fmt;

use crate::{ProviderError, Ticker};

pub const TICKER_PLACEHOLDER: &str = "{ticker}";
pub const API_KEY_PLACEHOLDER: &str = "{api_key}";

/// Which configured provider an endpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Upstream {
    /// Real-time quotes (Alpha Vantage)
    Quotes,
    /// Company fundamentals and price history (Yahoo-compatible gateway)
    Fundamentals,
}

impl Upstream {
    pub fn name(&self) -> &'static str {
        match self {
            Upstream::Quotes => "quotes",
            Upstream::Fundamentals => "fundamentals",
        }
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Upstream URL shape relative to the provider's base URL.
///
/// Path segments and query values may contain `{ticker}` and `{api_key}`.
/// Rendering substitutes them but does not encode; the client encodes each
/// segment and pair when building the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointTemplate {
    pub upstream: Upstream,
    pub path: &'static [&'static str],
    pub query: &'static [(&'static str, &'static str)],
}

/// Endpoint with placeholders filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEndpoint {
    pub upstream: Upstream,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
}

impl EndpointTemplate {
    pub fn requires_api_key(&self) -> bool {
        self.path.iter().any(|s| s.contains(API_KEY_PLACEHOLDER))
            || self.query.iter().any(|(_, v)| v.contains(API_KEY_PLACEHOLDER))
    }

    pub fn render(&self, ticker: &Ticker, api_key: Option<&str>) -> Result<RenderedEndpoint, ProviderError> {
        let key = match (self.requires_api_key(), api_key) {
            (true, None) => return Err(ProviderError::MissingApiKey(self.upstream.name())),
            (_, key) => key.unwrap_or_default(),
        };
        let fill = |s: &str| s.replace(TICKER_PLACEHOLDER, ticker.as_str()).replace(API_KEY_PLACEHOLDER, key);

        Ok(RenderedEndpoint {
            upstream: self.upstream,
            segments: self.path.iter().map(|s| fill(s)).collect(),
            query: self.query.iter().map(|(k, v)| (k.to_string(), fill(v))).collect(),
        })
    }

    /// Path with the ticker filled in and no credentials, for logs.
    pub fn describe(&self, ticker: &Ticker) -> String {
        let path = self
            .path
            .iter()
            .map(|s| s.replace(TICKER_PLACEHOLDER, ticker.as_str()))
            .collect::<Vec<_>>()
            .join("/");
        format!("{}:/{}", self.upstream, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUOTE: EndpointTemplate = EndpointTemplate {
        upstream: Upstream::Quotes,
        path: &["query"],
        query: &[("function", "GLOBAL_QUOTE"), ("symbol", "{ticker}"), ("apikey", "{api_key}")],
    };

    const CHART: EndpointTemplate = EndpointTemplate {
        upstream: Upstream::Fundamentals,
        path: &["v8", "finance", "chart", "{ticker}"],
        query: &[("range", "1y")],
    };

    #[test]
    fn test_render_fills_ticker_and_key() {
        let ticker = Ticker::parse("msft").unwrap();
        let rendered = QUOTE.render(&ticker, Some("secret")).unwrap();
        assert_eq!(rendered.segments, vec!["query"]);
        assert_eq!(
            rendered.query,
            vec![
                ("function".to_string(), "GLOBAL_QUOTE".to_string()),
                ("symbol".to_string(), "MSFT".to_string()),
                ("apikey".to_string(), "secret".to_string()),
            ]
        );
    }

    #[test]
    fn test_render_without_required_key_fails() {
        let ticker = Ticker::parse("MSFT").unwrap();
        assert_eq!(
            QUOTE.render(&ticker, None),
            Err(ProviderError::MissingApiKey("quotes"))
        );
    }

    #[test]
    fn test_render_keyless_template() {
        let ticker = Ticker::parse("aapl").unwrap();
        assert!(!CHART.requires_api_key());
        let rendered = CHART.render(&ticker, None).unwrap();
        assert_eq!(rendered.segments, vec!["v8", "finance", "chart", "AAPL"]);
    }

    #[test]
    fn test_describe_omits_credentials() {
        let ticker = Ticker::parse("MSFT").unwrap();
        let described = QUOTE.describe(&ticker);
        assert_eq!(described, "quotes:/query");
        assert_eq!(CHART.describe(&ticker), "fundamentals:/v8/finance/chart/MSFT");
    }
}
