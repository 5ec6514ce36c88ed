//! Assembles the REST API router.

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    AppState, auth, budget, dashboard, endpoints, logging::logging_middleware, report,
    transaction, user,
};

/// Build the API router with all routes and middleware attached.
///
/// Every route except registration and login requires a bearer token. The
/// static frontend is not served here; the server binary attaches it as a
/// fallback service.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::REGISTER, post(auth::register))
        .route(endpoints::LOG_IN, post(auth::log_in))
        .route(
            endpoints::BUDGETS,
            get(budget::get_budgets).post(budget::post_budget),
        )
        .route(
            endpoints::BUDGET,
            put(budget::put_budget).delete(budget::delete_budget_route),
        )
        .route(
            endpoints::TRANSACTIONS,
            get(transaction::get_transactions).post(transaction::post_transaction),
        )
        .route(
            endpoints::TRANSACTION,
            put(transaction::put_transaction).delete(transaction::delete_transaction_route),
        )
        .route(
            endpoints::DASHBOARD_STATS,
            get(dashboard::get_dashboard_stats_route),
        )
        .route(endpoints::REPORTS, get(report::get_reports_route))
        .route(
            endpoints::PROFILE,
            get(user::get_profile).put(user::update_profile),
        )
        .route(endpoints::PASSWORD, put(user::change_password))
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
