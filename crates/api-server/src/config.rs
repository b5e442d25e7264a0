use anyhow::{Context, Result};
use market_client::ProviderConfig;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9000;

/// HTTP surface settings shared by the router and its middleware.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpConfig {
    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
    /// Send `Strict-Transport-Security`; only meaningful behind TLS termination.
    pub enable_hsts: bool,
}

/// Server configuration, loaded once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub http: HttpConfig,
    pub provider: ProviderConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get("PORT") {
            Some(p) => p.parse().with_context(|| format!("PORT must be a valid port number, got {p:?}"))?,
            None => DEFAULT_PORT,
        };

        let cors_origins = get("CORS_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let enable_hsts = get("ENABLE_HSTS")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            http: HttpConfig {
                cors_origins,
                enable_hsts,
            },
            provider: ProviderConfig::from_lookup(&lookup)?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[("ALPHA_VANTAGE_API_KEY", "demo-key-123456")])).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
        assert_eq!(config.http, HttpConfig::default());
        assert_eq!(config.provider.quotes.api_key.as_deref(), Some("demo-key-123456"));
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("ALPHA_VANTAGE_API_KEY", "demo-key-123456"),
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("CORS_ORIGINS", "http://localhost:3000, https://dash.example.com,"),
            ("ENABLE_HSTS", "TRUE"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(
            config.http.cors_origins,
            vec!["http://localhost:3000".to_string(), "https://dash.example.com".to_string()]
        );
        assert!(config.http.enable_hsts);
    }

    #[test]
    fn test_invalid_port() {
        let err = ServerConfig::from_lookup(lookup(&[("ALPHA_VANTAGE_API_KEY", "k"), ("PORT", "ninety")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_missing_quotes_key_fails() {
        let err = ServerConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("ALPHA_VANTAGE_API_KEY"));
    }

    #[test]
    fn test_debug_masks_keys() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("ALPHA_VANTAGE_API_KEY", "abcd1234efgh5678"),
            ("FUNDAMENTALS_API_KEY", "wxyz9876stuv5432"),
        ]))
        .unwrap();
        let debug = format!("{config:?}");
        assert!(debug.contains("abcd...5678"));
        assert!(!debug.contains("abcd1234efgh5678"));
        assert!(!debug.contains("wxyz9876stuv5432"));
    }
}
