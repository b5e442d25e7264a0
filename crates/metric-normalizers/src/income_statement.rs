use dashboard_core::{
    Category, EndpointTemplate, IncomeStatement, IncomeStatementEntry, NormalizeError, Normalizer, Ticker,
};
use serde_json::Value;

use crate::{fields, quote_summary, statement_list};

pub struct IncomeStatementNormalizer;

impl Normalizer for IncomeStatementNormalizer {
    type Output = IncomeStatement;

    const CATEGORY: Category = Category::IncomeStatement;

    fn endpoint() -> EndpointTemplate {
        quote_summary(&[("modules", "incomeStatementHistory")])
    }

    fn normalize(ticker: &Ticker, raw: &Value) -> Result<IncomeStatement, NormalizeError> {
        let result = fields::first_result(raw, "quoteSummary")?;
        let entries = statement_list(result, "incomeStatementHistory", "incomeStatementHistory")?;

        let statements = entries
            .iter()
            .map(|entry| {
                let s = fields::as_object(entry, "income statement")?;
                Ok(IncomeStatementEntry {
                    end_date: fields::date(s, "endDate")?,
                    total_revenue: fields::number(s, "totalRevenue")?,
                    cost_of_revenue: fields::number(s, "costOfRevenue")?,
                    gross_profit: fields::number(s, "grossProfit")?,
                    research_development: fields::number(s, "researchDevelopment")?,
                    selling_general_administrative: fields::number(s, "sellingGeneralAdministrative")?,
                    operating_income: fields::number(s, "operatingIncome")?,
                    interest_expense: fields::number(s, "interestExpense")?,
                    ebit: fields::number(s, "ebit")?,
                    income_before_tax: fields::number(s, "incomeBeforeTax")?,
                    income_tax_expense: fields::number(s, "incomeTaxExpense")?,
                    net_income: fields::number(s, "netIncome")?,
                })
            })
            .collect::<Result<Vec<_>, NormalizeError>>()?;

        Ok(IncomeStatement {
            symbol: ticker.to_string(),
            statements,
        })
    }
}
