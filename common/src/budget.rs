//! This file defines budgets: named spending caps for a category and period.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{DatabaseID, UserID};

/// How often a budget's cap applies.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Monthly,
    Yearly,
}

impl BudgetPeriod {
    /// The string stored in the database for this period.
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetPeriod::Monthly => "monthly",
            BudgetPeriod::Yearly => "yearly",
        }
    }
}

impl Display for BudgetPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BudgetPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(BudgetPeriod::Monthly),
            "yearly" => Ok(BudgetPeriod::Yearly),
            other => Err(format!("{other} is not a valid budget period")),
        }
    }
}

/// A spending cap for a category.
///
/// A budget is matched against transactions by exact, case-sensitive category
/// string equality. There is no stored link between the two record kinds, so
/// renaming a budget's category detaches it from prior transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: DatabaseID,
    pub user_id: UserID,
    pub name: String,
    pub category: String,
    pub amount: f64,
    pub period: BudgetPeriod,
    /// Optional month tag. Defaults to the empty string for monthly budgets
    /// with no month set.
    pub month: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A budget together with its derived spend.
///
/// `spent` is recomputed from the owner's expense transactions on every read
/// and is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetWithSpent {
    #[serde(flatten)]
    pub budget: Budget,
    pub spent: f64,
}
