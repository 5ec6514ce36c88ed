//! The dashboard aggregation: totals, a six month trend and recent activity.

use axum::{Json, extract::State};
use rusqlite::Connection;
use time::{Date, OffsetDateTime};

use common::{CategorySpend, DashboardStats, MonthlyTrendEntry, Transaction, UserID};

use crate::{
    AppState, Error,
    auth::Claims,
    dates::{month_key, months_back, next_month_start},
    db::MapRow,
    transaction::expense_totals_by_category,
};

/// How many calendar months the trend covers, current month inclusive.
const TREND_MONTHS: u32 = 6;

/// How many transactions the recent activity list holds.
const RECENT_LIMIT: i64 = 5;

fn sum_by_type(user_id: UserID, transaction_type: &str, connection: &Connection) -> Result<f64, Error> {
    let total = connection.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM \"transaction\"
         WHERE user_id = ?1 AND type = ?2",
        (user_id.as_i64(), transaction_type),
        |row| row.get(0),
    )?;

    Ok(total)
}

fn sum_by_type_in_month(
    user_id: UserID,
    transaction_type: &str,
    month_start: Date,
    connection: &Connection,
) -> Result<f64, Error> {
    // Dates are stored as ISO-8601 text, so the half-open range compare is
    // lexicographic.
    let total = connection.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM \"transaction\"
         WHERE user_id = ?1 AND type = ?2 AND date >= ?3 AND date < ?4",
        (
            user_id.as_i64(),
            transaction_type,
            month_start,
            next_month_start(month_start),
        ),
        |row| row.get(0),
    )?;

    Ok(total)
}

fn recent_transactions(user_id: UserID, connection: &Connection) -> Result<Vec<Transaction>, Error> {
    let transactions = connection
        .prepare(
            "SELECT id, user_id, title, amount, type, category, date, status, created_at, updated_at
             FROM \"transaction\"
             WHERE user_id = ?1
             ORDER BY date DESC, id DESC
             LIMIT ?2",
        )?
        .query_map((user_id.as_i64(), RECENT_LIMIT), Transaction::map_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(transactions)
}

/// Compute the dashboard aggregation for a user as of `today`.
///
/// The trend always holds exactly six entries, oldest first, with zero sums
/// for months without transactions. Each entry repeats the whole-user budget
/// total. The utilization is zero when there are no budgets.
pub fn get_dashboard_stats(
    user_id: UserID,
    today: Date,
    connection: &Connection,
) -> Result<DashboardStats, Error> {
    let total_budget: f64 = connection.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM budget WHERE user_id = ?1",
        [user_id.as_i64()],
        |row| row.get(0),
    )?;

    let total_spent = sum_by_type(user_id, "expense", connection)?;
    let total_income = sum_by_type(user_id, "income", connection)?;

    let budget_utilization = if total_budget == 0.0 {
        0.0
    } else {
        total_spent / total_budget
    };

    let mut monthly_trend = Vec::with_capacity(TREND_MONTHS as usize);
    for months_ago in (0..TREND_MONTHS).rev() {
        let start = months_back(today, months_ago);

        monthly_trend.push(MonthlyTrendEntry {
            budget: total_budget,
            spent: sum_by_type_in_month(user_id, "expense", start, connection)?,
            income: sum_by_type_in_month(user_id, "income", start, connection)?,
            month: month_key(start),
        });
    }

    let current_month_spent = monthly_trend
        .last()
        .map(|entry| entry.spent)
        .unwrap_or_default();

    let category_breakdown = expense_totals_by_category(user_id, connection)?
        .into_iter()
        .map(|(category, spent)| CategorySpend { category, spent })
        .collect();

    Ok(DashboardStats {
        total_budget,
        total_spent,
        total_income,
        budget_utilization,
        monthly_trend,
        category_breakdown,
        recent_transactions: recent_transactions(user_id, connection)?,
        current_month_spent,
    })
}

/// A route handler for the dashboard aggregation.
pub async fn get_dashboard_stats_route(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<DashboardStats>, Error> {
    let today = OffsetDateTime::now_utc().date();
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    get_dashboard_stats(claims.user_id, today, &connection).map(Json)
}

#[cfg(test)]
mod dashboard_tests {
    use std::str::FromStr;

    use email_address::EmailAddress;
    use rusqlite::Connection;
    use time::{Date, macros::date};

    use common::{BudgetPeriod, PasswordHash, TransactionType, UserID};

    use crate::{
        budget::{NewBudget, create_budget},
        db::initialize,
        transaction::{NewTransaction, create_transaction},
        user::create_user,
    };

    use super::get_dashboard_stats;

    const TODAY: Date = date!(2026 - 08 - 31);

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

    fn record(
        user_id: UserID,
        amount: f64,
        transaction_type: TransactionType,
        date: Date,
        connection: &Connection,
    ) {
        let new_transaction = NewTransaction {
            title: "Entry".to_string(),
            amount,
            transaction_type,
            category: "Misc".to_string(),
            date,
            status: None,
        };

        create_transaction(user_id, &new_transaction, connection).unwrap();
    }

    #[test]
    fn empty_account_has_all_zero_stats() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);

        let stats = get_dashboard_stats(user_id, TODAY, &connection).unwrap();

        assert_eq!(stats.total_budget, 0.0);
        assert_eq!(stats.total_spent, 0.0);
        assert_eq!(stats.total_income, 0.0);
        assert_eq!(stats.budget_utilization, 0.0);
        assert_eq!(stats.current_month_spent, 0.0);
        assert!(stats.category_breakdown.is_empty());
        assert!(stats.recent_transactions.is_empty());
    }

    #[test]
    fn utilization_is_zero_without_budgets_even_with_spending() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);

        record(user_id, 100.0, TransactionType::Expense, TODAY, &connection);

        let stats = get_dashboard_stats(user_id, TODAY, &connection).unwrap();

        assert_eq!(stats.total_spent, 100.0);
        assert_eq!(stats.budget_utilization, 0.0);
    }

    #[test]
    fn utilization_is_spent_over_budget() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);

        let new_budget = NewBudget {
            name: "Everything".to_string(),
            category: "Misc".to_string(),
            amount: 200.0,
            period: BudgetPeriod::Monthly,
            month: None,
        };
        create_budget(user_id, &new_budget, &connection).unwrap();
        record(user_id, 50.0, TransactionType::Expense, TODAY, &connection);

        let stats = get_dashboard_stats(user_id, TODAY, &connection).unwrap();

        assert_eq!(stats.budget_utilization, 0.25);
    }

    #[test]
    fn trend_always_has_six_months_oldest_first() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);

        let stats = get_dashboard_stats(user_id, TODAY, &connection).unwrap();

        let months: Vec<&str> = stats
            .monthly_trend
            .iter()
            .map(|entry| entry.month.as_str())
            .collect();

        assert_eq!(
            months,
            vec!["3/2026", "4/2026", "5/2026", "6/2026", "7/2026", "8/2026"]
        );
        assert!(stats.monthly_trend.iter().all(|entry| entry.spent == 0.0));
        assert!(stats.monthly_trend.iter().all(|entry| entry.income == 0.0));
    }

    #[test]
    fn trend_buckets_transactions_into_their_month() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);

        record(
            user_id,
            30.0,
            TransactionType::Expense,
            date!(2026 - 06 - 15),
            &connection,
        );
        record(
            user_id,
            500.0,
            TransactionType::Income,
            date!(2026 - 08 - 01),
            &connection,
        );
        // Outside the window, must not appear anywhere.
        record(
            user_id,
            999.0,
            TransactionType::Expense,
            date!(2026 - 02 - 28),
            &connection,
        );

        let stats = get_dashboard_stats(user_id, TODAY, &connection).unwrap();

        let june = &stats.monthly_trend[3];
        assert_eq!(june.month, "6/2026");
        assert_eq!(june.spent, 30.0);

        let august = &stats.monthly_trend[5];
        assert_eq!(august.month, "8/2026");
        assert_eq!(august.income, 500.0);
        assert_eq!(stats.current_month_spent, august.spent);

        let window_spent: f64 = stats.monthly_trend.iter().map(|entry| entry.spent).sum();
        assert_eq!(window_spent, 30.0);
    }

    #[test]
    fn trend_repeats_the_whole_budget_total() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);

        let new_budget = NewBudget {
            name: "Everything".to_string(),
            category: "Misc".to_string(),
            amount: 150.0,
            period: BudgetPeriod::Monthly,
            month: None,
        };
        create_budget(user_id, &new_budget, &connection).unwrap();

        let stats = get_dashboard_stats(user_id, TODAY, &connection).unwrap();

        assert!(stats.monthly_trend.iter().all(|entry| entry.budget == 150.0));
    }

    #[test]
    fn recent_transactions_are_capped_at_five_newest() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);

        for day in 1..=7u8 {
            record(
                user_id,
                f64::from(day),
                TransactionType::Expense,
                Date::from_calendar_date(2026, time::Month::August, day).unwrap(),
                &connection,
            );
        }

        let stats = get_dashboard_stats(user_id, TODAY, &connection).unwrap();

        assert_eq!(stats.recent_transactions.len(), 5);
        assert_eq!(stats.recent_transactions[0].date, date!(2026 - 08 - 07));
        assert_eq!(stats.recent_transactions[4].date, date!(2026 - 08 - 03));
    }

    #[test]
    fn stats_only_cover_the_requested_user() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);
        let other_user_id = create_test_user("other@bar.baz", &connection);

        record(other_user_id, 100.0, TransactionType::Expense, TODAY, &connection);

        let stats = get_dashboard_stats(user_id, TODAY, &connection).unwrap();

        assert_eq!(stats.total_spent, 0.0);
        assert!(stats.recent_transactions.is_empty());
    }
}
