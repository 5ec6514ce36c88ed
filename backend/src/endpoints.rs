//! The API endpoint URIs.

/// The route for registering a new account.
pub const REGISTER: &str = "/api/auth/register";
/// The route for logging in and receiving an identity token.
pub const LOG_IN: &str = "/api/auth/login";
/// The route to list and create budgets.
pub const BUDGETS: &str = "/api/budgets";
/// The route to update or delete a budget.
pub const BUDGET: &str = "/api/budgets/{budget_id}";
/// The route to list and create transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to update or delete a transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route for the dashboard aggregation.
pub const DASHBOARD_STATS: &str = "/api/dashboard/stats";
/// The route for the report summary.
pub const REPORTS: &str = "/api/reports";
/// The route for the caller's profile.
pub const PROFILE: &str = "/api/users/me";
/// The route for changing the caller's password.
pub const PASSWORD: &str = "/api/users/me/password";
