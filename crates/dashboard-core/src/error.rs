use std::time::Duration;
use thiserror::Error;

use crate::{Category, Ticker, TickerError};

/// Failure talking to an upstream provider.
///
/// Messages never include the request URL, which carries the API key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("upstream request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("upstream request failed: {0}")]
    Transport(String),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("upstream rate limit reached")]
    RateLimited,

    #[error("upstream rejected the request")]
    Rejected,

    #[error("upstream response was not valid JSON: {0}")]
    Decode(String),

    #[error("no API key configured for the {0} provider")]
    MissingApiKey(&'static str),

    #[error("invalid upstream endpoint: {0}")]
    InvalidEndpoint(String),
}

impl ProviderError {
    /// Upstream answered but has no such resource for the ticker.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::Status(404))
    }
}

/// Outcome of reshaping a raw provider payload.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    /// The payload carries no data for the ticker.
    #[error("no data in upstream payload")]
    Missing,

    /// The payload is an upstream-level failure (throttling, rejection).
    #[error(transparent)]
    Upstream(#[from] ProviderError),

    #[error("{0}")]
    Schema(String),
}

impl NormalizeError {
    pub fn schema(detail: impl Into<String>) -> Self {
        NormalizeError::Schema(detail.into())
    }
}

/// Per-category failure surfaced to the router.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricError {
    #[error("Invalid ticker: {0}")]
    InvalidTicker(#[from] TickerError),

    #[error("No {} found for ticker {ticker}", .category.label())]
    NotFound { category: Category, ticker: Ticker },

    #[error("Error fetching {} for ticker {ticker}: {source}", .category.label())]
    Upstream {
        category: Category,
        ticker: Ticker,
        #[source]
        source: ProviderError,
    },

    #[error("Error fetching {} for ticker {ticker}: unexpected upstream response: {detail}", .category.label())]
    Schema {
        category: Category,
        ticker: Ticker,
        detail: String,
    },
}

impl MetricError {
    /// Attach category and ticker to a normalizer outcome.
    pub fn from_normalize(category: Category, ticker: &Ticker, err: NormalizeError) -> Self {
        match err {
            NormalizeError::Missing => MetricError::NotFound { category, ticker: ticker.clone() },
            NormalizeError::Upstream(source) => MetricError::from_provider(category, ticker, source),
            NormalizeError::Schema(detail) => MetricError::Schema {
                category,
                ticker: ticker.clone(),
                detail,
            },
        }
    }

    /// Attach category and ticker to a provider failure. Upstream 404 means the
    /// ticker has no data for the category.
    pub fn from_provider(category: Category, ticker: &Ticker, err: ProviderError) -> Self {
        if err.is_not_found() {
            MetricError::NotFound { category, ticker: ticker.clone() }
        } else {
            MetricError::Upstream {
                category,
                ticker: ticker.clone(),
                source: err,
            }
        }
    }

    /// HTTP status code the router answers with.
    pub fn status_code(&self) -> u16 {
        match self {
            MetricError::InvalidTicker(_) => 400,
            MetricError::NotFound { .. } => 404,
            MetricError::Upstream { .. } | MetricError::Schema { .. } => 500,
        }
    }
}
