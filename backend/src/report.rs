//! The report aggregation: all time totals and monthly history.

use std::str::FromStr;

use axum::{Json, extract::State};
use rusqlite::{Connection, types::Type};
use time::{Date, OffsetDateTime};

use common::{CategoryTotal, MonthTotal, ReportSummary, TransactionType, TypeTotal, UserID};

use crate::{AppState, Error, auth::Claims, dates::months_back};

/// How many calendar months the monthly history covers, current month
/// inclusive.
const HISTORY_MONTHS: u32 = 12;

fn parse_type(raw: &str, column: usize) -> Result<TransactionType, rusqlite::Error> {
    TransactionType::from_str(raw)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, error.into()))
}

fn totals_by_type(user_id: UserID, connection: &Connection) -> Result<Vec<TypeTotal>, Error> {
    let totals = connection
        .prepare(
            "SELECT type, COALESCE(SUM(amount), 0) FROM \"transaction\"
             WHERE user_id = ?1
             GROUP BY type
             ORDER BY type",
        )?
        .query_map([user_id.as_i64()], |row| {
            let raw_type: String = row.get(0)?;

            Ok(TypeTotal {
                transaction_type: parse_type(&raw_type, 0)?,
                total: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(totals)
}

/// All time totals per category, in the order categories first appeared.
///
/// Each category is tagged with the type of its earliest transaction, even if
/// later transactions in the category have the other type.
fn totals_by_category(user_id: UserID, connection: &Connection) -> Result<Vec<CategoryTotal>, Error> {
    let rows = connection
        .prepare(
            "SELECT category, amount, type FROM \"transaction\"
             WHERE user_id = ?1
             ORDER BY id",
        )?
        .query_map([user_id.as_i64()], |row| {
            let category: String = row.get(0)?;
            let amount: f64 = row.get(1)?;
            let raw_type: String = row.get(2)?;

            Ok((category, amount, parse_type(&raw_type, 2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut totals: Vec<CategoryTotal> = Vec::new();

    for (category, amount, transaction_type) in rows {
        match totals.iter_mut().find(|entry| entry.category == category) {
            Some(entry) => entry.total += amount,
            None => totals.push(CategoryTotal {
                category,
                total: amount,
                transaction_type,
            }),
        }
    }

    Ok(totals)
}

fn totals_by_month(
    user_id: UserID,
    today: Date,
    connection: &Connection,
) -> Result<Vec<MonthTotal>, Error> {
    let window_start = months_back(today, HISTORY_MONTHS - 1);

    let totals = connection
        .prepare(
            "SELECT CAST(strftime('%Y', date) AS INTEGER) AS year,
                    CAST(strftime('%m', date) AS INTEGER) AS month,
                    type,
                    COALESCE(SUM(amount), 0)
             FROM \"transaction\"
             WHERE user_id = ?1 AND date >= ?2
             GROUP BY year, month, type
             ORDER BY year, month, type",
        )?
        .query_map((user_id.as_i64(), window_start), |row| {
            let raw_type: String = row.get(2)?;

            Ok(MonthTotal {
                year: row.get(0)?,
                month: row.get(1)?,
                transaction_type: parse_type(&raw_type, 2)?,
                total: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(totals)
}

/// Compute the report aggregation for a user as of `today`.
///
/// The type and category totals cover all time. The monthly history covers
/// the last twelve calendar months, current month inclusive, and only holds
/// `(year, month, type)` groups that have transactions.
pub fn get_report_summary(
    user_id: UserID,
    today: Date,
    connection: &Connection,
) -> Result<ReportSummary, Error> {
    Ok(ReportSummary {
        totals: totals_by_type(user_id, connection)?,
        by_category: totals_by_category(user_id, connection)?,
        by_month: totals_by_month(user_id, today, connection)?,
    })
}

/// A route handler for the report aggregation.
pub async fn get_reports_route(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<ReportSummary>, Error> {
    let today = OffsetDateTime::now_utc().date();
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    get_report_summary(claims.user_id, today, &connection).map(Json)
}
