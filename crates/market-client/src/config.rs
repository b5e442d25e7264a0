use anyhow::{Context, Result};
use dashboard_core::Upstream;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_QUOTES_BASE_URL: &str = "https://www.alphavantage.co";
pub const DEFAULT_FUNDAMENTALS_BASE_URL: &str = "https://query2.finance.yahoo.com";
pub const DEFAULT_API_KEY_HEADER: &str = "x-api-key";

/// Connection settings for one upstream provider.
#[derive(Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Header that carries `api_key` on every request, if any. Endpoints can
    /// also place the key in the query string through `{api_key}`.
    pub api_key_header: Option<String>,
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_deref().map(mask_api_key))
            .field("api_key_header", &self.api_key_header)
            .finish()
    }
}

/// Immutable provider settings, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub quotes: UpstreamConfig,
    pub fundamentals: UpstreamConfig,
    /// Bound on each upstream call, body included.
    pub timeout: Duration,
    /// Extra attempts after an HTTP 429.
    pub max_retries: u32,
    /// Linear backoff step between 429 retries.
    pub retry_backoff: Duration,
}

impl ProviderConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let config = Self {
            quotes: UpstreamConfig {
                base_url: get("ALPHA_VANTAGE_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_QUOTES_BASE_URL.to_string()),
                api_key: Some(get("ALPHA_VANTAGE_API_KEY").context("ALPHA_VANTAGE_API_KEY not set")?),
                api_key_header: None,
            },
            fundamentals: UpstreamConfig {
                base_url: get("FUNDAMENTALS_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_FUNDAMENTALS_BASE_URL.to_string()),
                api_key: get("FUNDAMENTALS_API_KEY"),
                api_key_header: Some(
                    get("FUNDAMENTALS_API_KEY_HEADER").unwrap_or_else(|| DEFAULT_API_KEY_HEADER.to_string()),
                ),
            },
            timeout: Duration::from_secs(
                get("UPSTREAM_TIMEOUT_SECS")
                    .unwrap_or_else(|| "10".to_string())
                    .parse()
                    .context("UPSTREAM_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            max_retries: get("UPSTREAM_MAX_RETRIES")
                .unwrap_or_else(|| "2".to_string())
                .parse()
                .context("UPSTREAM_MAX_RETRIES must be a non-negative integer")?,
            retry_backoff: Duration::from_millis(
                get("UPSTREAM_RETRY_BACKOFF_MS")
                    .unwrap_or_else(|| "1000".to_string())
                    .parse()
                    .context("UPSTREAM_RETRY_BACKOFF_MS must be a whole number of milliseconds")?,
            ),
        };

        if config.timeout.is_zero() {
            anyhow::bail!("UPSTREAM_TIMEOUT_SECS must be greater than zero");
        }

        Ok(config)
    }

    pub fn upstream(&self, upstream: Upstream) -> &UpstreamConfig {
        match upstream {
            Upstream::Quotes => &self.quotes,
            Upstream::Fundamentals => &self.fundamentals,
        }
    }
}

/// Mask API key for logging (show first 4 and last 4 characters)
pub fn mask_api_key(key: &str) -> String {
    if key.len() <= 8 || !key.is_ascii() {
        return "****".to_string();
    }
    format!("{}...{}", &key[..4], &key[key.len() - 4..])
}
