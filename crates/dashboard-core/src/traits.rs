use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::{Category, EndpointTemplate, NormalizeError, ProviderError, Ticker};

/// Source of raw upstream payloads
#[async_trait]
pub trait Provider: Send + Sync {
    async fn fetch(&self, endpoint: &EndpointTemplate, ticker: &Ticker) -> Result<Value, ProviderError>;
}

/// Reshapes one category's raw payload into its fixed output schema.
pub trait Normalizer: Send + Sync + 'static {
    type Output: Serialize + Send + 'static;

    const CATEGORY: Category;

    fn endpoint() -> EndpointTemplate;

    fn normalize(ticker: &Ticker, raw: &Value) -> Result<Self::Output, NormalizeError>;
}
