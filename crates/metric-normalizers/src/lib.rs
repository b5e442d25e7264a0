//! Per-category normalizers. Each one names the upstream endpoint it needs and
//! reshapes the raw payload into the fixed output schema for its category.

use dashboard_core::{
    EndpointTemplate, MetricError, NormalizeError, Normalizer, Provider, Ticker, Upstream,
};
use serde_json::Value;

pub mod balance_sheet;
pub mod fields;
pub mod historical;
pub mod holders;
pub mod income_statement;
pub mod profile;
pub mod quote;
pub mod statistics;
pub mod sustainability;

pub use balance_sheet::BalanceSheetNormalizer;
pub use historical::HistoricalNormalizer;
pub use holders::HoldersNormalizer;
pub use income_statement::IncomeStatementNormalizer;
pub use profile::ProfileNormalizer;
pub use quote::StockPriceNormalizer;
pub use statistics::StatisticsNormalizer;
pub use sustainability::SustainabilityNormalizer;

/// quoteSummary endpoint on the fundamentals upstream.
pub(crate) fn quote_summary(query: &'static [(&'static str, &'static str)]) -> EndpointTemplate {
    EndpointTemplate {
        upstream: Upstream::Fundamentals,
        path: &["v10", "finance", "quoteSummary", "{ticker}"],
        query,
    }
}

/// Statement array nested as `<module>.<key>`. A missing module or an empty
/// list both mean there are no filings for the ticker.
pub(crate) fn statement_list<'a>(
    result: &'a fields::Object,
    module: &str,
    key: &str,
) -> Result<&'a [Value], NormalizeError> {
    let history = fields::object(result, module)?.ok_or(NormalizeError::Missing)?;
    let entries = fields::list(history, key)?;
    if entries.is_empty() {
        return Err(NormalizeError::Missing);
    }
    Ok(entries)
}

/// Fetch one category for one ticker and normalize it.
///
/// Every call goes to the provider; nothing is cached or shared between
/// requests.
pub async fn fetch_metric<N: Normalizer>(
    provider: &dyn Provider,
    ticker: &Ticker,
) -> Result<N::Output, MetricError> {
    let endpoint = N::endpoint();
    tracing::debug!("Fetching {} for {} from {}", N::CATEGORY, ticker, endpoint.describe(ticker));

    let raw = provider
        .fetch(&endpoint, ticker)
        .await
        .map_err(|e| MetricError::from_provider(N::CATEGORY, ticker, e))?;

    N::normalize(ticker, &raw).map_err(|e| MetricError::from_normalize(N::CATEGORY, ticker, e))
}
