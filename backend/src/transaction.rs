//! Transaction records: storage and the CRUD route handlers.

use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, State},
};
use rusqlite::{Connection, Row, types::Type};
use serde::Deserialize;
use serde_json::{Value, json};
use time::{Date, OffsetDateTime};

use common::{DatabaseID, Transaction, TransactionStatus, TransactionType, UserID};

use crate::{
    AppState, Error,
    auth::Claims,
    db::{CreateTable, MapRow},
};

impl CreateTable for Transaction {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                amount REAL NOT NULL,
                type TEXT NOT NULL,
                category TEXT NOT NULL,
                date TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
                )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for Transaction {
    type ReturnType = Self;

    fn map_row(row: &Row) -> Result<Self, rusqlite::Error> {
        let raw_type: String = row.get(4)?;
        let transaction_type = TransactionType::from_str(&raw_type)
            .map_err(|error| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, error.into()))?;

        let raw_status: String = row.get(7)?;
        let status = TransactionStatus::from_str(&raw_status)
            .map_err(|error| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, error.into()))?;

        Ok(Transaction {
            id: row.get(0)?,
            user_id: UserID::new(row.get(1)?),
            title: row.get(2)?,
            amount: row.get(3)?,
            transaction_type,
            category: row.get(5)?,
            date: row.get(6)?,
            status,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

const TRANSACTION_COLUMNS: &str =
    "id, user_id, title, amount, type, category, date, status, created_at, updated_at";

/// The request body for creating a transaction.
#[derive(Debug, Deserialize)]
pub struct NewTransaction {
    /// A short description of the transaction.
    pub title: String,
    /// The amount of money, always non-negative. The direction is given by
    /// the type.
    pub amount: f64,
    /// Whether the transaction is income or an expense.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The category the transaction belongs to, free text.
    pub category: String,
    /// The day the transaction happened.
    pub date: Date,
    /// Accepted in the request body but ignored. The stored status is always
    /// `completed`.
    #[serde(default)]
    pub status: Option<TransactionStatus>,
}

/// Insert a new transaction for a user.
///
/// The stored status is always [TransactionStatus::Completed], regardless of
/// what the request carried.
pub fn create_transaction(
    user_id: UserID,
    new_transaction: &NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let now = OffsetDateTime::now_utc();

    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" (user_id, title, amount, type, category, date, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                user_id.as_i64(),
                &new_transaction.title,
                new_transaction.amount,
                new_transaction.transaction_type.as_str(),
                &new_transaction.category,
                new_transaction.date,
                TransactionStatus::Completed.as_str(),
                now,
                now,
            ),
            Transaction::map_row,
        )?;

    Ok(transaction)
}

/// Retrieve a user's transaction by its ID.
///
/// # Errors
/// Returns [Error::TransactionNotFound] if the transaction does not exist or
/// belongs to another user.
pub fn get_transaction(
    transaction_id: DatabaseID,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_row((transaction_id, user_id.as_i64()), Transaction::map_row)
        .map_err(|error| match error.into() {
            Error::NotFound => Error::TransactionNotFound,
            other => other,
        })
}

/// Retrieve all of a user's transactions, newest first.
pub fn list_transactions(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let transactions = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"
             WHERE user_id = ?1
             ORDER BY date DESC, id DESC"
        ))?
        .query_map([user_id.as_i64()], Transaction::map_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(transactions)
}

/// The request body for updating a transaction. Absent fields keep their
/// stored value.
#[derive(Debug, Default, Deserialize)]
#[allow(missing_docs)]
pub struct TransactionPatch {
    pub title: Option<String>,
    pub amount: Option<f64>,
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    pub category: Option<String>,
    pub date: Option<Date>,
    /// Accepted but ignored, the same as on create.
    pub status: Option<TransactionStatus>,
}

/// Apply a patch to a user's transaction.
///
/// The stored status is reset to [TransactionStatus::Completed] on every
/// update, even for fields-only patches.
///
/// # Errors
/// Returns [Error::TransactionNotFound] if the transaction does not exist or
/// belongs to another user.
pub fn update_transaction(
    transaction_id: DatabaseID,
    user_id: UserID,
    patch: &TransactionPatch,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let existing = get_transaction(transaction_id, user_id, connection)?;

    let title = patch.title.as_deref().unwrap_or(&existing.title);
    let amount = patch.amount.unwrap_or(existing.amount);
    let transaction_type = patch.transaction_type.unwrap_or(existing.transaction_type);
    let category = patch.category.as_deref().unwrap_or(&existing.category);
    let date = patch.date.unwrap_or(existing.date);

    let transaction = connection
        .prepare(&format!(
            "UPDATE \"transaction\"
             SET title = ?1, amount = ?2, type = ?3, category = ?4, date = ?5,
                 status = ?6, updated_at = ?7
             WHERE id = ?8 AND user_id = ?9
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                title,
                amount,
                transaction_type.as_str(),
                category,
                date,
                TransactionStatus::Completed.as_str(),
                OffsetDateTime::now_utc(),
                transaction_id,
                user_id.as_i64(),
            ),
            Transaction::map_row,
        )?;

    Ok(transaction)
}

/// Delete a user's transaction.
///
/// # Errors
/// Returns [Error::TransactionNotFound] if the transaction does not exist or
/// belongs to another user.
pub fn delete_transaction(
    transaction_id: DatabaseID,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_deleted = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
        (transaction_id, user_id.as_i64()),
    )?;

    if rows_deleted == 0 {
        return Err(Error::TransactionNotFound);
    }

    Ok(())
}

/// Total expense amounts per category for a user, largest first.
///
/// Categories are compared as exact strings, so "Food" and "food" count
/// separately.
pub fn expense_totals_by_category(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<(String, f64)>, Error> {
    let totals = connection
        .prepare(
            "SELECT category, COALESCE(SUM(amount), 0) AS total
             FROM \"transaction\"
             WHERE user_id = ?1 AND type = 'expense'
             GROUP BY category
             ORDER BY total DESC",
        )?
        .query_map([user_id.as_i64()], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(totals)
}

/// A route handler for listing the caller's transactions.
pub async fn get_transactions(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<Transaction>>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    list_transactions(claims.user_id, &connection).map(Json)
}

/// A route handler for creating a transaction.
pub async fn post_transaction(
    State(state): State<AppState>,
    claims: Claims,
    Json(new_transaction): Json<NewTransaction>,
) -> Result<Json<Transaction>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    create_transaction(claims.user_id, &new_transaction, &connection).map(Json)
}

/// A route handler for updating a transaction.
pub async fn put_transaction(
    State(state): State<AppState>,
    claims: Claims,
    Path(transaction_id): Path<DatabaseID>,
    Json(patch): Json<TransactionPatch>,
) -> Result<Json<Transaction>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    update_transaction(transaction_id, claims.user_id, &patch, &connection).map(Json)
}

/// A route handler for deleting a transaction.
pub async fn delete_transaction_route(
    State(state): State<AppState>,
    claims: Claims,
    Path(transaction_id): Path<DatabaseID>,
) -> Result<Json<Value>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    delete_transaction(transaction_id, claims.user_id, &connection)?;

    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod transaction_store_tests {
    use std::str::FromStr;

    use email_address::EmailAddress;
    use rusqlite::Connection;
    use time::macros::date;

    use common::{PasswordHash, TransactionStatus, TransactionType, UserID};

    use crate::{Error, db::initialize, user::create_user};

    use super::{
        NewTransaction, TransactionPatch, create_transaction, delete_transaction,
        expense_totals_by_category, list_transactions, update_transaction,
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    fn create_test_user(email: &str, connection: &Connection) -> UserID {
        let email = EmailAddress::from_str(email).unwrap();
        let password_hash = PasswordHash::from_raw_password("averysafepassword", 4).unwrap();

        create_user(&email, &password_hash, "Test User", connection)
            .unwrap()
            .id()
    }

    fn new_expense(title: &str, amount: f64, category: &str) -> NewTransaction {
        NewTransaction {
            title: title.to_string(),
            amount,
            transaction_type: TransactionType::Expense,
            category: category.to_string(),
            date: date!(2026 - 08 - 15),
            status: None,
        }
    }

    #[test]
    fn create_forces_completed_status() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);

        let new_transaction = NewTransaction {
            status: Some(TransactionStatus::Pending),
            ..new_expense("Weekly shop", 42.5, "Groceries")
        };
        let transaction = create_transaction(user_id, &new_transaction, &connection).unwrap();

        assert_eq!(transaction.status, TransactionStatus::Completed);
    }

    #[test]
    fn update_forces_completed_status() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);

        let transaction =
            create_transaction(user_id, &new_expense("Weekly shop", 42.5, "Groceries"), &connection)
                .unwrap();

        let patch = TransactionPatch {
            status: Some(TransactionStatus::Pending),
            ..TransactionPatch::default()
        };
        let updated = update_transaction(transaction.id, user_id, &patch, &connection).unwrap();

        assert_eq!(updated.status, TransactionStatus::Completed);
    }

    #[test]
    fn update_keeps_absent_fields() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);

        let transaction =
            create_transaction(user_id, &new_expense("Weekly shop", 42.5, "Groceries"), &connection)
                .unwrap();

        let patch = TransactionPatch {
            amount: Some(50.0),
            ..TransactionPatch::default()
        };
        let updated = update_transaction(transaction.id, user_id, &patch, &connection).unwrap();

        assert_eq!(updated.amount, 50.0);
        assert_eq!(updated.title, "Weekly shop");
        assert_eq!(updated.category, "Groceries");
        assert_eq!(updated.date, transaction.date);
    }

    #[test]
    fn list_is_scoped_to_the_user() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);
        let other_user_id = create_test_user("other@bar.baz", &connection);

        create_transaction(user_id, &new_expense("Mine", 10.0, "Misc"), &connection).unwrap();
        create_transaction(other_user_id, &new_expense("Theirs", 20.0, "Misc"), &connection)
            .unwrap();

        let transactions = list_transactions(user_id, &connection).unwrap();

        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].title, "Mine");
    }

    #[test]
    fn list_orders_newest_first() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);

        let older = NewTransaction {
            date: date!(2026 - 07 - 01),
            ..new_expense("Older", 10.0, "Misc")
        };
        let newer = NewTransaction {
            date: date!(2026 - 08 - 01),
            ..new_expense("Newer", 10.0, "Misc")
        };
        create_transaction(user_id, &older, &connection).unwrap();
        create_transaction(user_id, &newer, &connection).unwrap();

        let transactions = list_transactions(user_id, &connection).unwrap();

        assert_eq!(transactions[0].title, "Newer");
        assert_eq!(transactions[1].title, "Older");
    }

    #[test]
    fn update_fails_for_other_users_transaction() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);
        let other_user_id = create_test_user("other@bar.baz", &connection);

        let transaction =
            create_transaction(user_id, &new_expense("Mine", 10.0, "Misc"), &connection).unwrap();

        let result = update_transaction(
            transaction.id,
            other_user_id,
            &TransactionPatch::default(),
            &connection,
        );

        assert_eq!(result, Err(Error::TransactionNotFound));
    }

    #[test]
    fn delete_fails_for_missing_transaction() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);

        assert_eq!(
            delete_transaction(999, user_id, &connection),
            Err(Error::TransactionNotFound)
        );
    }

    #[test]
    fn expense_totals_group_by_exact_category() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);

        create_transaction(user_id, &new_expense("Shop", 20.0, "Food"), &connection).unwrap();
        create_transaction(user_id, &new_expense("Snack", 15.0, "Food"), &connection).unwrap();
        create_transaction(user_id, &new_expense("Takeaway", 5.0, "food"), &connection).unwrap();

        let income = NewTransaction {
            transaction_type: TransactionType::Income,
            ..new_expense("Salary", 1000.0, "Food")
        };
        create_transaction(user_id, &income, &connection).unwrap();

        let totals = expense_totals_by_category(user_id, &connection).unwrap();

        assert_eq!(
            totals,
            vec![("Food".to_string(), 35.0), ("food".to_string(), 5.0)]
        );
    }
}
