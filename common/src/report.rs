//! Response types for the dashboard and report aggregations.
//!
//! These are derived views over a single user's budgets and transactions,
//! recomputed by the backend on every request.

use serde::{Deserialize, Serialize};

use crate::{Transaction, TransactionType};

/// One month in the dashboard's six month trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTrendEntry {
    /// The user's total budget. The same whole-user total is repeated for
    /// every month rather than a historical snapshot.
    pub budget: f64,
    /// The month's expense sum.
    pub spent: f64,
    /// The month's income sum.
    pub income: f64,
    /// The month key, formatted `"M/YYYY"` without zero padding.
    pub month: String,
}

/// The expense total for a single category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpend {
    pub category: String,
    pub spent: f64,
}

/// Everything the dashboard page needs in a single response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Sum of all budget amounts. Monthly and yearly budgets are summed
    /// identically, with no period weighting.
    pub total_budget: f64,
    /// Sum of all expense transaction amounts, all time.
    pub total_spent: f64,
    /// Sum of all income transaction amounts, all time.
    pub total_income: f64,
    /// `total_spent / total_budget`, or zero when there are no budgets.
    pub budget_utilization: f64,
    /// The last six calendar months, current month inclusive, oldest first.
    /// Always fully populated; months without transactions have zero sums.
    pub monthly_trend: Vec<MonthlyTrendEntry>,
    /// Expense sums per category, descending by sum.
    pub category_breakdown: Vec<CategorySpend>,
    /// The five most recent transactions by date, descending.
    pub recent_transactions: Vec<Transaction>,
    /// The current month's expense sum. Duplicates the last trend entry.
    pub current_month_spent: f64,
}

/// The all-time total for one transaction type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeTotal {
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub total: f64,
}

/// The all-time total for one category, tagged with the type of the first
/// transaction seen in that category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
}

/// The total for one `(year, month, type)` group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthTotal {
    pub year: i32,
    pub month: u8,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub total: f64,
}

/// The response for the reports page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub totals: Vec<TypeTotal>,
    pub by_category: Vec<CategoryTotal>,
    /// Totals grouped by `(year, month, type)` over the last twelve months,
    /// ascending.
    pub by_month: Vec<MonthTotal>,
}
