use dashboard_core::{Category, EndpointTemplate, KeyStatistics, NormalizeError, Normalizer, Ticker};
use serde_json::{Map, Value};

use crate::{fields, quote_summary};

/// Key statistics merged from three quoteSummary modules. Only
/// `defaultKeyStatistics` is required; the other two fill in when present.
pub struct StatisticsNormalizer;

impl Normalizer for StatisticsNormalizer {
    type Output = KeyStatistics;

    const CATEGORY: Category = Category::Statistics;

    fn endpoint() -> EndpointTemplate {
        quote_summary(&[("modules", "defaultKeyStatistics,financialData,summaryDetail")])
    }

    fn normalize(ticker: &Ticker, raw: &Value) -> Result<KeyStatistics, NormalizeError> {
        let result = fields::first_result(raw, "quoteSummary")?;
        let stats = fields::object(result, "defaultKeyStatistics")?.ok_or(NormalizeError::Missing)?;

        let empty = Map::new();
        let financial = fields::object(result, "financialData")?.unwrap_or(&empty);
        let detail = fields::object(result, "summaryDetail")?.unwrap_or(&empty);

        Ok(KeyStatistics {
            symbol: ticker.to_string(),
            current_price: fields::number(financial, "currentPrice")?,
            market_cap: fields::number(detail, "marketCap")?,
            enterprise_value: fields::number(stats, "enterpriseValue")?,
            trailing_pe: fields::number(detail, "trailingPE")?,
            forward_pe: fields::number(stats, "forwardPE")?.or(fields::number(detail, "forwardPE")?),
            peg_ratio: fields::number(stats, "pegRatio")?,
            price_to_book: fields::number(stats, "priceToBook")?,
            beta: fields::number(stats, "beta")?.or(fields::number(detail, "beta")?),
            trailing_eps: fields::number(stats, "trailingEps")?,
            forward_eps: fields::number(stats, "forwardEps")?,
            profit_margins: fields::number(stats, "profitMargins")?.or(fields::number(financial, "profitMargins")?),
            dividend_yield: fields::number(detail, "dividendYield")?,
            fifty_two_week_high: fields::number(detail, "fiftyTwoWeekHigh")?,
            fifty_two_week_low: fields::number(detail, "fiftyTwoWeekLow")?,
            shares_outstanding: fields::number(stats, "sharesOutstanding")?,
            float_shares: fields::number(stats, "floatShares")?,
            short_ratio: fields::number(stats, "shortRatio")?,
            recommendation_key: fields::text(financial, "recommendationKey")?,
            recommendation_mean: fields::number(financial, "recommendationMean")?,
            number_of_analyst_opinions: fields::integer(financial, "numberOfAnalystOpinions")?,
            target_mean_price: fields::number(financial, "targetMeanPrice")?,
            target_high_price: fields::number(financial, "targetHighPrice")?,
            target_low_price: fields::number(financial, "targetLowPrice")?,
        })
    }
}
