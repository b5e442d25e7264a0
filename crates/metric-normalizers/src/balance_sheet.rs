use dashboard_core::{
    BalanceSheet, BalanceSheetStatement, Category, EndpointTemplate, NormalizeError, Normalizer, Ticker,
};
use serde_json::Value;

use crate::{fields, quote_summary, statement_list};

/// Annual balance sheets, newest first as the upstream orders them.
pub struct BalanceSheetNormalizer;

impl Normalizer for BalanceSheetNormalizer {
    type Output = BalanceSheet;

    const CATEGORY: Category = Category::BalanceSheet;

    fn endpoint() -> EndpointTemplate {
        quote_summary(&[("modules", "balanceSheetHistory")])
    }

    fn normalize(ticker: &Ticker, raw: &Value) -> Result<BalanceSheet, NormalizeError> {
        let result = fields::first_result(raw, "quoteSummary")?;
        let entries = statement_list(result, "balanceSheetHistory", "balanceSheetStatements")?;

        let mut statements = Vec::with_capacity(entries.len());
        for entry in entries {
            let s = fields::as_object(entry, "balance sheet statement")?;
            let total_liabilities = match fields::number(s, "totalLiab")? {
                Some(v) => Some(v),
                None => fields::number(s, "totalLiabilities")?,
            };
            statements.push(BalanceSheetStatement {
                end_date: fields::date(s, "endDate")?,
                total_assets: fields::number(s, "totalAssets")?,
                total_liabilities,
                total_stockholder_equity: fields::number(s, "totalStockholderEquity")?,
                cash: fields::number(s, "cash")?,
                short_term_investments: fields::number(s, "shortTermInvestments")?,
                net_receivables: fields::number(s, "netReceivables")?,
                inventory: fields::number(s, "inventory")?,
                total_current_assets: fields::number(s, "totalCurrentAssets")?,
                total_current_liabilities: fields::number(s, "totalCurrentLiabilities")?,
                long_term_debt: fields::number(s, "longTermDebt")?,
                retained_earnings: fields::number(s, "retainedEarnings")?,
            });
        }

        Ok(BalanceSheet {
            symbol: ticker.to_string(),
            statements,
        })
    }
}
