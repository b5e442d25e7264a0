use dashboard_core::{Category, EndpointTemplate, NormalizeError, Normalizer, Sustainability, Ticker};
use serde_json::Value;

use crate::{fields, quote_summary};

/// ESG risk scores. Tickers without coverage (most small caps, funds) have no
/// `esgScores` module and read as not found.
pub struct SustainabilityNormalizer;

impl Normalizer for SustainabilityNormalizer {
    type Output = Sustainability;

    const CATEGORY: Category = Category::Sustainability;

    fn endpoint() -> EndpointTemplate {
        quote_summary(&[("modules", "esgScores")])
    }

    fn normalize(ticker: &Ticker, raw: &Value) -> Result<Sustainability, NormalizeError> {
        let result = fields::first_result(raw, "quoteSummary")?;
        let esg = fields::object(result, "esgScores")?.ok_or(NormalizeError::Missing)?;

        Ok(Sustainability {
            symbol: ticker.to_string(),
            total_esg: fields::number(esg, "totalEsg")?,
            environment_score: fields::number(esg, "environmentScore")?,
            social_score: fields::number(esg, "socialScore")?,
            governance_score: fields::number(esg, "governanceScore")?,
            percentile: fields::number(esg, "percentile")?,
            esg_performance: fields::text(esg, "esgPerformance")?,
            peer_group: fields::text(esg, "peerGroup")?,
            highest_controversy: fields::number(esg, "highestControversy")?,
            rating_year: fields::integer(esg, "ratingYear")?,
            rating_month: fields::integer(esg, "ratingMonth")?,
        })
    }
}
