//! Domain types shared between the Centsible backend and frontend.
//!
//! The backend stores and serves these types over its REST API, and the
//! frontend deserializes them straight from the response JSON.

mod budget;
mod password;
mod report;
mod transaction;
mod user;

pub use budget::{Budget, BudgetPeriod, BudgetWithSpent};
pub use password::{PasswordError, PasswordHash};
pub use report::{
    CategorySpend, CategoryTotal, DashboardStats, MonthTotal, MonthlyTrendEntry, ReportSummary,
    TypeTotal,
};
pub use transaction::{Transaction, TransactionStatus, TransactionType};
pub use user::{User, UserID, UserProfile};

/// An alias for integer IDs assigned by the database.
pub type DatabaseID = i64;
