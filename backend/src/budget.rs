//! Budget records: storage, derived spend and the CRUD route handlers.

use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, State},
};
use rusqlite::{Connection, Row, types::Type};
use serde::Deserialize;
use serde_json::{Value, json};
use time::OffsetDateTime;

use common::{Budget, BudgetPeriod, BudgetWithSpent, DatabaseID, UserID};

use crate::{
    AppState, Error,
    auth::Claims,
    db::{CreateTable, MapRow},
    transaction::expense_totals_by_category,
};

impl CreateTable for Budget {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS budget (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                amount REAL NOT NULL,
                period TEXT NOT NULL,
                month TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
                )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for Budget {
    type ReturnType = Self;

    fn map_row(row: &Row) -> Result<Self, rusqlite::Error> {
        let raw_period: String = row.get(5)?;
        let period = BudgetPeriod::from_str(&raw_period)
            .map_err(|error| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, error.into()))?;

        Ok(Budget {
            id: row.get(0)?,
            user_id: UserID::new(row.get(1)?),
            name: row.get(2)?,
            category: row.get(3)?,
            amount: row.get(4)?,
            period,
            month: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

const BUDGET_COLUMNS: &str =
    "id, user_id, name, category, amount, period, month, created_at, updated_at";

/// The request body for creating a budget.
#[derive(Debug, Deserialize)]
pub struct NewBudget {
    /// The display name of the budget.
    pub name: String,
    /// The transaction category the cap applies to.
    pub category: String,
    /// The spending cap.
    pub amount: f64,
    /// How often the cap applies.
    pub period: BudgetPeriod,
    /// Optional month tag. Stored as the empty string when absent.
    #[serde(default)]
    pub month: Option<String>,
}

/// Insert a new budget for a user.
pub fn create_budget(
    user_id: UserID,
    new_budget: &NewBudget,
    connection: &Connection,
) -> Result<Budget, Error> {
    let now = OffsetDateTime::now_utc();

    let budget = connection
        .prepare(&format!(
            "INSERT INTO budget (user_id, name, category, amount, period, month, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING {BUDGET_COLUMNS}"
        ))?
        .query_row(
            (
                user_id.as_i64(),
                &new_budget.name,
                &new_budget.category,
                new_budget.amount,
                new_budget.period.as_str(),
                new_budget.month.as_deref().unwrap_or_default(),
                now,
                now,
            ),
            Budget::map_row,
        )?;

    Ok(budget)
}

/// Retrieve a user's budget by its ID.
///
/// # Errors
/// Returns [Error::BudgetNotFound] if the budget does not exist or belongs to
/// another user.
pub fn get_budget(
    budget_id: DatabaseID,
    user_id: UserID,
    connection: &Connection,
) -> Result<Budget, Error> {
    connection
        .prepare(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budget WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_row((budget_id, user_id.as_i64()), Budget::map_row)
        .map_err(|error| match error.into() {
            Error::NotFound => Error::BudgetNotFound,
            other => other,
        })
}

/// Retrieve all of a user's budgets, oldest first.
pub fn list_budgets(user_id: UserID, connection: &Connection) -> Result<Vec<Budget>, Error> {
    let budgets = connection
        .prepare(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budget WHERE user_id = ?1 ORDER BY id"
        ))?
        .query_map([user_id.as_i64()], Budget::map_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(budgets)
}

/// Attach the derived spend to a budget.
///
/// The spend is the total of the owner's expense transactions whose category
/// exactly matches the budget's category. It is recomputed on every read.
fn with_spent(budget: Budget, category_totals: &[(String, f64)]) -> BudgetWithSpent {
    let spent = category_totals
        .iter()
        .find(|(category, _)| *category == budget.category)
        .map(|(_, total)| *total)
        .unwrap_or(0.0);

    BudgetWithSpent { budget, spent }
}

/// Retrieve all of a user's budgets with their derived spends.
pub fn list_budgets_with_spent(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<BudgetWithSpent>, Error> {
    let category_totals = expense_totals_by_category(user_id, connection)?;
    let budgets = list_budgets(user_id, connection)?
        .into_iter()
        .map(|budget| with_spent(budget, &category_totals))
        .collect();

    Ok(budgets)
}

/// The request body for updating a budget. Absent fields keep their stored
/// value, except for `month` (see [update_budget]).
#[derive(Debug, Default, Deserialize)]
#[allow(missing_docs)]
pub struct BudgetPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub period: Option<BudgetPeriod>,
    pub month: Option<String>,
}

/// Apply a patch to a user's budget.
///
/// A patch that sets the period to monthly without supplying a month clears
/// the stored month tag. Every other combination keeps the stored month when
/// the patch omits it.
///
/// # Errors
/// Returns [Error::BudgetNotFound] if the budget does not exist or belongs to
/// another user.
pub fn update_budget(
    budget_id: DatabaseID,
    user_id: UserID,
    patch: &BudgetPatch,
    connection: &Connection,
) -> Result<Budget, Error> {
    let existing = get_budget(budget_id, user_id, connection)?;

    let name = patch.name.as_deref().unwrap_or(&existing.name);
    let category = patch.category.as_deref().unwrap_or(&existing.category);
    let amount = patch.amount.unwrap_or(existing.amount);
    let period = patch.period.unwrap_or(existing.period);
    let month = match (&patch.month, patch.period) {
        (Some(month), _) => month.as_str(),
        (None, Some(BudgetPeriod::Monthly)) => "",
        (None, _) => &existing.month,
    };

    let budget = connection
        .prepare(&format!(
            "UPDATE budget
             SET name = ?1, category = ?2, amount = ?3, period = ?4, month = ?5, updated_at = ?6
             WHERE id = ?7 AND user_id = ?8
             RETURNING {BUDGET_COLUMNS}"
        ))?
        .query_row(
            (
                name,
                category,
                amount,
                period.as_str(),
                month,
                OffsetDateTime::now_utc(),
                budget_id,
                user_id.as_i64(),
            ),
            Budget::map_row,
        )?;

    Ok(budget)
}

/// Delete a user's budget.
///
/// # Errors
/// Returns [Error::BudgetNotFound] if the budget does not exist or belongs to
/// another user.
pub fn delete_budget(
    budget_id: DatabaseID,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_deleted = connection.execute(
        "DELETE FROM budget WHERE id = ?1 AND user_id = ?2",
        (budget_id, user_id.as_i64()),
    )?;

    if rows_deleted == 0 {
        return Err(Error::BudgetNotFound);
    }

    Ok(())
}

/// A route handler for listing the caller's budgets with their spends.
pub async fn get_budgets(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<BudgetWithSpent>>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    list_budgets_with_spent(claims.user_id, &connection).map(Json)
}

/// A route handler for creating a budget.
///
/// The response carries the derived spend so that a budget created for a
/// category with existing expenses starts out non-zero.
pub async fn post_budget(
    State(state): State<AppState>,
    claims: Claims,
    Json(new_budget): Json<NewBudget>,
) -> Result<Json<BudgetWithSpent>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let budget = create_budget(claims.user_id, &new_budget, &connection)?;
    let category_totals = expense_totals_by_category(claims.user_id, &connection)?;

    Ok(Json(with_spent(budget, &category_totals)))
}

/// A route handler for updating a budget.
pub async fn put_budget(
    State(state): State<AppState>,
    claims: Claims,
    Path(budget_id): Path<DatabaseID>,
    Json(patch): Json<BudgetPatch>,
) -> Result<Json<BudgetWithSpent>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let budget = update_budget(budget_id, claims.user_id, &patch, &connection)?;
    let category_totals = expense_totals_by_category(claims.user_id, &connection)?;

    Ok(Json(with_spent(budget, &category_totals)))
}

/// A route handler for deleting a budget.
pub async fn delete_budget_route(
    State(state): State<AppState>,
    claims: Claims,
    Path(budget_id): Path<DatabaseID>,
) -> Result<Json<Value>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    delete_budget(budget_id, claims.user_id, &connection)?;

    Ok(Json(json!({ "success": true })))
}


#[cfg(test)]
mod budget_route_tests {
    use std::str::FromStr;

    use axum::{
        Router,
        http::StatusCode,
        routing::{get, put},
    };
    use axum_test::TestServer;
    use email_address::EmailAddress;
    use rusqlite::Connection;
    use serde_json::json;

    use common::{BudgetWithSpent, PasswordHash, User};

    use crate::{AppState, auth::encode_token, endpoints, user::create_user};

    use super::{delete_budget_route, get_budgets, post_budget, put_budget};

    fn get_test_app_state() -> AppState {
        let db_connection =
            Connection::open_in_memory().expect("Could not open database in memory.");

        AppState::new(db_connection, "foobar").expect("Could not create app state.")
    }

    fn create_test_user(state: &AppState) -> User {
        let email = EmailAddress::from_str("foo@bar.baz").unwrap();
        let password_hash = PasswordHash::from_raw_password("averysafepassword", 4).unwrap();
        let connection = state.db_connection.lock().unwrap();

        create_user(&email, &password_hash, "Test User", &connection).unwrap()
    }

    fn get_test_server(state: AppState) -> TestServer {
        let app = Router::new()
            .route(endpoints::BUDGETS, get(get_budgets).post(post_budget))
            .route(
                endpoints::BUDGET,
                put(put_budget).delete(delete_budget_route),
            )
            .with_state(state);

        TestServer::new(app)
    }

    #[tokio::test]
    async fn create_then_list_round_trips() {
        let state = get_test_app_state();
        let user = create_test_user(&state);
        let token = encode_token(user.id(), user.email(), state.encoding_key()).unwrap();
        let server = get_test_server(state);

        let response = server
            .post(endpoints::BUDGETS)
            .authorization_bearer(&token)
            .content_type("application/json")
            .json(&json!({
                "name": "Food",
                "category": "Groceries",
                "amount": 200.0,
                "period": "monthly",
            }))
            .await;

        response.assert_status_ok();

        let created = response.json::<BudgetWithSpent>();
        assert_eq!(created.spent, 0.0);
        assert_eq!(created.budget.month, "");

        let listed = server
            .get(endpoints::BUDGETS)
            .authorization_bearer(&token)
            .await
            .json::<Vec<BudgetWithSpent>>();

        assert_eq!(listed, vec![created]);
    }

    #[tokio::test]
    async fn update_responds_with_recomputed_spend() {
        let state = get_test_app_state();
        let user = create_test_user(&state);
        let token = encode_token(user.id(), user.email(), state.encoding_key()).unwrap();
        let server = get_test_server(state);

        let created = server
            .post(endpoints::BUDGETS)
            .authorization_bearer(&token)
            .content_type("application/json")
            .json(&json!({
                "name": "Food",
                "category": "Groceries",
                "amount": 200.0,
                "period": "monthly",
            }))
            .await
            .json::<BudgetWithSpent>();

        let response = server
            .put(&format!("/api/budgets/{}", created.budget.id))
            .authorization_bearer(&token)
            .content_type("application/json")
            .json(&json!({ "amount": 300.0 }))
            .await;

        response.assert_status_ok();

        let updated = response.json::<BudgetWithSpent>();
        assert_eq!(updated.budget.amount, 300.0);
        assert_eq!(updated.spent, 0.0);
    }

    #[tokio::test]
    async fn delete_responds_with_success_flag() {
        let state = get_test_app_state();
        let user = create_test_user(&state);
        let token = encode_token(user.id(), user.email(), state.encoding_key()).unwrap();
        let server = get_test_server(state);

        let created = server
            .post(endpoints::BUDGETS)
            .authorization_bearer(&token)
            .content_type("application/json")
            .json(&json!({
                "name": "Food",
                "category": "Groceries",
                "amount": 200.0,
                "period": "monthly",
            }))
            .await
            .json::<BudgetWithSpent>();

        let response = server
            .delete(&format!("/api/budgets/{}", created.budget.id))
            .authorization_bearer(&token)
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({ "success": true }));
    }

    #[tokio::test]
    async fn delete_missing_budget_returns_not_found() {
        let state = get_test_app_state();
        let user = create_test_user(&state);
        let token = encode_token(user.id(), user.email(), state.encoding_key()).unwrap();
        let server = get_test_server(state);

        server
            .delete("/api/budgets/999")
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
