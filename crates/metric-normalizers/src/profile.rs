use dashboard_core::{
    Category, CompanyOfficer, CompanyProfile, EndpointTemplate, NormalizeError, Normalizer, Ticker,
};
use serde_json::Value;

use crate::{fields, quote_summary};

pub struct ProfileNormalizer;

impl Normalizer for ProfileNormalizer {
    type Output = CompanyProfile;

    const CATEGORY: Category = Category::Profile;

    fn endpoint() -> EndpointTemplate {
        quote_summary(&[("modules", "assetProfile,price")])
    }

    fn normalize(ticker: &Ticker, raw: &Value) -> Result<CompanyProfile, NormalizeError> {
        let result = fields::first_result(raw, "quoteSummary")?;
        let profile = fields::object(result, "assetProfile")?.ok_or(NormalizeError::Missing)?;
        let price = fields::object(result, "price")?;

        let (name, exchange, currency) = match price {
            Some(p) => (
                fields::text(p, "longName")?.or(fields::text(p, "shortName")?),
                fields::text(p, "exchangeName")?,
                fields::text(p, "currency")?,
            ),
            None => (None, None, None),
        };

        let mut officers = Vec::new();
        for entry in fields::list(profile, "companyOfficers")? {
            let officer = fields::as_object(entry, "company officer")?;
            // Entries without a name carry nothing the panel can show.
            let Some(officer_name) = fields::text(officer, "name")? else {
                continue;
            };
            officers.push(CompanyOfficer {
                name: officer_name,
                title: fields::text(officer, "title")?,
                age: fields::integer(officer, "age")?,
                total_pay: fields::number(officer, "totalPay")?,
            });
        }

        Ok(CompanyProfile {
            symbol: ticker.to_string(),
            name,
            exchange,
            currency,
            sector: fields::text(profile, "sector")?,
            industry: fields::text(profile, "industry")?,
            website: fields::text(profile, "website")?,
            phone: fields::text(profile, "phone")?,
            address: fields::text(profile, "address1")?,
            city: fields::text(profile, "city")?,
            state: fields::text(profile, "state")?,
            country: fields::text(profile, "country")?,
            full_time_employees: fields::integer(profile, "fullTimeEmployees")?,
            long_business_summary: fields::text(profile, "longBusinessSummary")?,
            officers,
        })
    }
}
