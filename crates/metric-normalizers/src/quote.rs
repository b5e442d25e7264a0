use dashboard_core::{
    Category, EndpointTemplate, NormalizeError, Normalizer, ProviderError, StockPrice, Ticker, Upstream,
};
use serde_json::Value;

use crate::fields;

const GLOBAL_QUOTE: &str = "Global Quote";
const PRICE: &str = "05. price";
const VOLUME: &str = "06. volume";
const LATEST_TRADING_DAY: &str = "07. latest trading day";

/// Alpha Vantage `GLOBAL_QUOTE`.
///
/// An unknown symbol comes back as `{"Global Quote": {}}`. Throttled calls
/// come back as HTTP 200 with a `Note` or `Information` message instead of
/// the quote, and invalid calls with `Error Message`.
pub struct StockPriceNormalizer;

impl Normalizer for StockPriceNormalizer {
    type Output = StockPrice;

    const CATEGORY: Category = Category::StockPrice;

    fn endpoint() -> EndpointTemplate {
        EndpointTemplate {
            upstream: Upstream::Quotes,
            path: &["query"],
            query: &[("function", "GLOBAL_QUOTE"), ("symbol", "{ticker}"), ("apikey", "{api_key}")],
        }
    }

    fn normalize(ticker: &Ticker, raw: &Value) -> Result<StockPrice, NormalizeError> {
        let payload = fields::as_object(raw, "quote payload")?;

        let Some(quote) = fields::object(payload, GLOBAL_QUOTE)? else {
            if payload.contains_key("Note") || payload.contains_key("Information") {
                tracing::warn!("Quote provider throttled request for {}", ticker);
                return Err(ProviderError::RateLimited.into());
            }
            if payload.contains_key("Error Message") {
                return Err(ProviderError::Rejected.into());
            }
            return Err(NormalizeError::Missing);
        };

        let price = fields::number(quote, PRICE)?.ok_or(NormalizeError::Missing)?;

        Ok(StockPrice {
            symbol: ticker.to_string(),
            price,
            last_trade_time: fields::date(quote, LATEST_TRADING_DAY)?,
            volume: fields::unsigned(quote, VOLUME)?,
        })
    }
}
