use dashboard_core::{
    Category, EndpointTemplate, HoldersBreakdown, InstitutionalHolder, NormalizeError, Normalizer, Ticker,
};
use serde_json::Value;

use crate::{fields, quote_summary};

pub struct HoldersNormalizer;

impl Normalizer for HoldersNormalizer {
    type Output = HoldersBreakdown;

    const CATEGORY: Category = Category::Holders;

    fn endpoint() -> EndpointTemplate {
        quote_summary(&[("modules", "majorHoldersBreakdown,institutionOwnership")])
    }

    fn normalize(ticker: &Ticker, raw: &Value) -> Result<HoldersBreakdown, NormalizeError> {
        let result = fields::first_result(raw, "quoteSummary")?;
        let breakdown = fields::object(result, "majorHoldersBreakdown")?.ok_or(NormalizeError::Missing)?;

        let mut top_institutions = Vec::new();
        if let Some(ownership) = fields::object(result, "institutionOwnership")? {
            for entry in fields::list(ownership, "ownershipList")? {
                let holder = fields::as_object(entry, "ownership entry")?;
                let Some(organization) = fields::text(holder, "organization")? else {
                    continue;
                };
                top_institutions.push(InstitutionalHolder {
                    organization,
                    pct_held: fields::number(holder, "pctHeld")?,
                    position: fields::number(holder, "position")?,
                    value: fields::number(holder, "value")?,
                    report_date: fields::date(holder, "reportDate")?,
                });
            }
        }

        Ok(HoldersBreakdown {
            symbol: ticker.to_string(),
            insiders_percent_held: fields::number(breakdown, "insidersPercentHeld")?,
            institutions_percent_held: fields::number(breakdown, "institutionsPercentHeld")?,
            institutions_float_percent_held: fields::number(breakdown, "institutionsFloatPercentHeld")?,
            institutions_count: fields::integer(breakdown, "institutionsCount")?,
            top_institutions,
        })
    }
}
