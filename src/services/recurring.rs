//! Recurring transaction materialization.
//!
//! Turns every due recurring income/expense into a concrete record.
//! Runs before income/expense listings and the dashboard, so recurring
//! items appear without a background scheduler.
//!
//! # Ordering
//!
//! Incomes materialize before expenses within each pass: a recurring
//! expense only fires while cumulative expenses plus its amount stay
//! within cumulative income. Expenses that don't fit are parked as
//! `pending` and retried on later passes (including later iterations of
//! the same call, since new income may have landed).

use crate::{
    db::DbPool,
    error::AppError,
    models::recurring::{Frequency, RecurringExpense, RecurringIncome},
    services::periods,
};
use chrono::NaiveDate;
use uuid::Uuid;

/// Materialize all due recurring items for a user.
///
/// Loops until a full pass makes no change. Re-running is idempotent:
/// an occurrence is identified by (recurring_id, due date) and inserted
/// at most once.
pub async fn process_recurring(
    pool: &DbPool,
    user_id: Uuid,
    today: NaiveDate,
) -> Result<(), AppError> {
    let mut total_income: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM incomes WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    let mut total_expense: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM expenses WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    let mut changed = true;
    while changed {
        changed = false;

        // Due incomes first; they widen the headroom for expenses
        let incomes = sqlx::query_as::<_, RecurringIncome>(
            "SELECT * FROM recurring_incomes WHERE user_id = $1 AND next_due_date <= $2 AND status = 'active'",
        )
        .bind(user_id)
        .bind(today)
        .fetch_all(pool)
        .await?;

        for rec in incomes {
            if past_end(rec.next_due_date, rec.end_date) {
                set_income_status(pool, rec.id, "inactive").await?;
                continue;
            }

            let frequency = Frequency::from_str(&rec.frequency)
                .ok_or_else(|| AppError::InvalidRequest("Unknown frequency".to_string()))?;

            let mut tx = pool.begin().await?;

            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM incomes WHERE recurring_id = $1 AND date = $2)",
            )
            .bind(rec.id)
            .bind(rec.next_due_date)
            .fetch_one(&mut *tx)
            .await?;

            if !exists {
                sqlx::query(
                    r#"
                    INSERT INTO incomes (user_id, source, amount_cents, category, date, recurring_id)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(user_id)
                .bind(&rec.source)
                .bind(rec.amount_cents)
                .bind(&rec.category)
                .bind(rec.next_due_date)
                .bind(rec.id)
                .execute(&mut *tx)
                .await?;
                total_income += rec.amount_cents;
            }

            let next = periods::next_due_date(rec.next_due_date, frequency);
            let status = if past_end(next, rec.end_date) {
                "inactive"
            } else {
                "active"
            };
            sqlx::query(
                "UPDATE recurring_incomes SET next_due_date = $1, status = $2 WHERE id = $3",
            )
            .bind(next)
            .bind(status)
            .bind(rec.id)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            changed = true;
        }

        // Due expenses, including pending ones parked on earlier passes
        let expenses = sqlx::query_as::<_, RecurringExpense>(
            "SELECT * FROM recurring_expenses WHERE user_id = $1 AND next_due_date <= $2 AND status != 'inactive'",
        )
        .bind(user_id)
        .bind(today)
        .fetch_all(pool)
        .await?;

        for rec in expenses {
            if past_end(rec.next_due_date, rec.end_date) {
                set_expense_status(pool, rec.id, "inactive").await?;
                continue;
            }

            // Does the expense fit under cumulative income?
            if total_expense + rec.amount_cents > total_income {
                if rec.status != "pending" {
                    set_expense_status(pool, rec.id, "pending").await?;
                }
                continue;
            }

            let frequency = Frequency::from_str(&rec.frequency)
                .ok_or_else(|| AppError::InvalidRequest("Unknown frequency".to_string()))?;

            let mut tx = pool.begin().await?;

            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM expenses WHERE recurring_id = $1 AND date = $2)",
            )
            .bind(rec.id)
            .bind(rec.next_due_date)
            .fetch_one(&mut *tx)
            .await?;

            if !exists {
                sqlx::query(
                    r#"
                    INSERT INTO expenses (user_id, name, amount_cents, category, date, recurring_id)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(user_id)
                .bind(&rec.name)
                .bind(rec.amount_cents)
                .bind(&rec.category)
                .bind(rec.next_due_date)
                .bind(rec.id)
                .execute(&mut *tx)
                .await?;
                total_expense += rec.amount_cents;
            }

            let next = periods::next_due_date(rec.next_due_date, frequency);
            let status = if past_end(next, rec.end_date) {
                "inactive"
            } else {
                "active"
            };
            sqlx::query(
                "UPDATE recurring_expenses SET next_due_date = $1, status = $2 WHERE id = $3",
            )
            .bind(next)
            .bind(status)
            .bind(rec.id)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            changed = true;
        }
    }

    Ok(())
}

/// Recurring expenses currently due or parked, for the dashboard.
pub async fn due_recurring_expenses(
    pool: &DbPool,
    user_id: Uuid,
    today: NaiveDate,
) -> Result<Vec<RecurringExpense>, AppError> {
    let due = sqlx::query_as::<_, RecurringExpense>(
        r#"
        SELECT * FROM recurring_expenses
        WHERE user_id = $1 AND next_due_date <= $2 AND status IN ('active', 'pending')
        ORDER BY next_due_date
        "#,
    )
    .bind(user_id)
    .bind(today)
    .fetch_all(pool)
    .await?;
    Ok(due)
}

/// Whether a due date has run past the item's end date.
pub fn past_end(next_due: NaiveDate, end_date: Option<NaiveDate>) -> bool {
    end_date.is_some_and(|end| next_due > end)
}

async fn set_income_status(pool: &DbPool, id: Uuid, status: &str) -> Result<(), AppError> {
    sqlx::query("UPDATE recurring_incomes SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

async fn set_expense_status(pool: &DbPool, id: Uuid, status: &str) -> Result<(), AppError> {
    sqlx::query("UPDATE recurring_expenses SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn end_date_checks() {
        assert!(past_end(d(2026, 9, 1), Some(d(2026, 8, 31))));
        assert!(!past_end(d(2026, 8, 31), Some(d(2026, 8, 31))));
        assert!(!past_end(d(2099, 1, 1), None));
    }
}
