use serde::Serialize;
use std::fmt;

/// Data category served by the dashboard, one route each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    StockPrice,
    Statistics,
    Profile,
    Historical,
    Holders,
    Sustainability,
    BalanceSheet,
    IncomeStatement,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::StockPrice,
        Category::Statistics,
        Category::Profile,
        Category::Historical,
        Category::Holders,
        Category::Sustainability,
        Category::BalanceSheet,
        Category::IncomeStatement,
    ];

    /// Path segment under `/api/` that serves this category.
    pub fn route_segment(&self) -> &'static str {
        match self {
            Category::StockPrice => "stock-price",
            Category::Statistics => "statistics",
            Category::Profile => "profile",
            Category::Historical => "historical",
            Category::Holders => "holders",
            Category::Sustainability => "sustainability",
            Category::BalanceSheet => "balanceSheet",
            Category::IncomeStatement => "incomeStatement",
        }
    }

    /// Human-readable noun used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Category::StockPrice => "stock price data",
            Category::Statistics => "statistics",
            Category::Profile => "profile data",
            Category::Historical => "historical data",
            Category::Holders => "holders data",
            Category::Sustainability => "sustainability data",
            Category::BalanceSheet => "balance sheet data",
            Category::IncomeStatement => "income statement data",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route_segment())
    }
}

// Output schemas. Absent provider values serialize as `null` (or `[]` for
// lists); fields are never skipped.

/// Real-time quote
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockPrice {
    pub symbol: String,
    pub price: f64,
    pub last_trade_time: Option<String>,
    pub volume: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyOfficer {
    pub name: String,
    pub title: Option<String>,
    pub age: Option<i64>,
    pub total_pay: Option<f64>,
}

/// Company profile
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    pub symbol: String,
    pub name: Option<String>,
    pub exchange: Option<String>,
    pub currency: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub full_time_employees: Option<i64>,
    pub long_business_summary: Option<String>,
    pub officers: Vec<CompanyOfficer>,
}

/// Valuation, share and analyst statistics. The analyst fields back the
/// ratings panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyStatistics {
    pub symbol: String,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub enterprise_value: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub forward_pe: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub price_to_book: Option<f64>,
    pub beta: Option<f64>,
    pub trailing_eps: Option<f64>,
    pub forward_eps: Option<f64>,
    pub profit_margins: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub float_shares: Option<f64>,
    pub short_ratio: Option<f64>,
    pub recommendation_key: Option<String>,
    pub recommendation_mean: Option<f64>,
    pub number_of_analyst_opinions: Option<i64>,
    pub target_mean_price: Option<f64>,
    pub target_high_price: Option<f64>,
    pub target_low_price: Option<f64>,
}

/// Daily OHLCV point
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub date: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub adj_close: Option<f64>,
    pub volume: Option<u64>,
}

/// Price history, oldest point first
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalSeries {
    pub symbol: String,
    pub currency: Option<String>,
    pub interval: String,
    pub points: Vec<PricePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionalHolder {
    pub organization: String,
    pub pct_held: Option<f64>,
    pub position: Option<f64>,
    pub value: Option<f64>,
    pub report_date: Option<String>,
}

/// Ownership breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldersBreakdown {
    pub symbol: String,
    pub insiders_percent_held: Option<f64>,
    pub institutions_percent_held: Option<f64>,
    pub institutions_float_percent_held: Option<f64>,
    pub institutions_count: Option<i64>,
    pub top_institutions: Vec<InstitutionalHolder>,
}

/// ESG risk scores
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sustainability {
    pub symbol: String,
    pub total_esg: Option<f64>,
    pub environment_score: Option<f64>,
    pub social_score: Option<f64>,
    pub governance_score: Option<f64>,
    pub percentile: Option<f64>,
    pub esg_performance: Option<String>,
    pub peer_group: Option<String>,
    pub highest_controversy: Option<f64>,
    pub rating_year: Option<i64>,
    pub rating_month: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSheetStatement {
    pub end_date: Option<String>,
    pub total_assets: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub total_stockholder_equity: Option<f64>,
    pub cash: Option<f64>,
    pub short_term_investments: Option<f64>,
    pub net_receivables: Option<f64>,
    pub inventory: Option<f64>,
    pub total_current_assets: Option<f64>,
    pub total_current_liabilities: Option<f64>,
    pub long_term_debt: Option<f64>,
    pub retained_earnings: Option<f64>,
}

/// Annual balance sheets, most recent first
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSheet {
    pub symbol: String,
    pub statements: Vec<BalanceSheetStatement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeStatementEntry {
    pub end_date: Option<String>,
    pub total_revenue: Option<f64>,
    pub cost_of_revenue: Option<f64>,
    pub gross_profit: Option<f64>,
    pub research_development: Option<f64>,
    pub selling_general_administrative: Option<f64>,
    pub operating_income: Option<f64>,
    pub interest_expense: Option<f64>,
    pub ebit: Option<f64>,
    pub income_before_tax: Option<f64>,
    pub income_tax_expense: Option<f64>,
    pub net_income: Option<f64>,
}

/// Annual income statements, most recent first
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeStatement {
    pub symbol: String,
    pub statements: Vec<IncomeStatementEntry>,
}

/// JSON body of every non-success response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEnvelope {
    pub message: String,
}
