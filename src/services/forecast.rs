//! Expense forecasting.
//!
//! Projects the current month's final spend from its daily run rate and
//! the next month's spend from the trailing average of complete months.

use crate::{db::DbPool, error::AppError};
use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

/// How many complete months feed the trailing average.
const TRAILING_MONTHS: u32 = 6;

/// Forecast attached to the expense analytics response.
///
/// # JSON Example
///
/// ```json
/// {
///   "spent_so_far_cents": 41200,
///   "this_month_expected_cents": 86500,
///   "next_month_expected_cents": 79400,
///   "note": null
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ExpenseForecast {
    /// Current month's expenses to date
    pub spent_so_far_cents: i64,
    /// Projected final total for the current month
    pub this_month_expected_cents: Option<i64>,
    /// Expected total for next month
    pub next_month_expected_cents: Option<i64>,
    /// Set when there is no history to project from
    pub note: Option<String>,
}

/// Compute the forecast from already-aggregated inputs.
///
/// `monthly_totals` are the totals of the trailing complete months
/// (oldest first, zero months included only when inside the user's
/// history).
pub fn compute_forecast(
    spent_so_far_cents: i64,
    days_elapsed: i64,
    days_in_month: i64,
    monthly_totals: &[i64],
) -> ExpenseForecast {
    let historical_avg = if monthly_totals.is_empty() {
        None
    } else {
        Some(monthly_totals.iter().sum::<i64>() / monthly_totals.len() as i64)
    };

    // Run rate: spent-so-far scaled to the full month. Falls back to
    // the historical average before the month has any spending.
    let this_month = if spent_so_far_cents > 0 && days_elapsed > 0 {
        Some(spent_so_far_cents * days_in_month / days_elapsed)
    } else {
        historical_avg
    };

    let next_month = historical_avg;

    let note = if this_month.is_none() && next_month.is_none() {
        Some("Not enough data to forecast".to_string())
    } else {
        None
    };

    ExpenseForecast {
        spent_so_far_cents,
        this_month_expected_cents: this_month,
        next_month_expected_cents: next_month,
        note,
    }
}

/// Build the forecast for a user as of `today`.
pub async fn expense_forecast(
    pool: &DbPool,
    user_id: Uuid,
    today: NaiveDate,
) -> Result<ExpenseForecast, AppError> {
    let month_start = super::periods::month_start(today);

    let spent_so_far: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM expenses WHERE user_id = $1 AND date >= $2 AND date <= $3",
    )
    .bind(user_id)
    .bind(month_start)
    .bind(today)
    .fetch_one(pool)
    .await?;

    // Trailing complete months, clipped to the user's actual history so
    // empty months before their first expense don't drag the average down
    let first_expense: Option<NaiveDate> =
        sqlx::query_scalar("SELECT MIN(date) FROM expenses WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

    let mut monthly_totals = Vec::new();
    if let Some(first) = first_expense {
        let first_month = super::periods::month_start(first);
        for back in (1..=TRAILING_MONTHS).rev() {
            let month = super::periods::months_ago(month_start, back);
            if month < first_month {
                continue;
            }
            let end = month.checked_add_months(Months::new(1)).unwrap_or(month);
            let total: i64 = sqlx::query_scalar(
                "SELECT COALESCE(SUM(amount_cents), 0) FROM expenses WHERE user_id = $1 AND date >= $2 AND date < $3",
            )
            .bind(user_id)
            .bind(month)
            .bind(end)
            .fetch_one(pool)
            .await?;
            monthly_totals.push(total);
        }
    }

    let days_elapsed = i64::from(today.day());
    let days_in_month = super::periods::days_in_month(today);
    Ok(compute_forecast(
        spent_so_far,
        days_elapsed,
        days_in_month,
        &monthly_totals,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_rate_projects_full_month() {
        // 10 days in, 1000 spent, 30-day month -> 3000 expected
        let f = compute_forecast(1000, 10, 30, &[2500, 3500]);
        assert_eq!(f.this_month_expected_cents, Some(3000));
        assert_eq!(f.next_month_expected_cents, Some(3000));
        assert_eq!(f.note, None);
    }

    #[test]
    fn empty_month_falls_back_to_history() {
        let f = compute_forecast(0, 5, 31, &[2000, 4000]);
        assert_eq!(f.this_month_expected_cents, Some(3000));
        assert_eq!(f.next_month_expected_cents, Some(3000));
    }

    #[test]
    fn no_history_yields_note() {
        let f = compute_forecast(0, 5, 31, &[]);
        assert_eq!(f.this_month_expected_cents, None);
        assert_eq!(f.next_month_expected_cents, None);
        assert_eq!(f.note.as_deref(), Some("Not enough data to forecast"));
    }

    #[test]
    fn first_month_with_spending_but_no_history() {
        // Spending exists, so the run rate works even with no complete months
        let f = compute_forecast(900, 9, 30, &[]);
        assert_eq!(f.spent_so_far_cents, 900);
        assert_eq!(f.this_month_expected_cents, Some(3000));
        assert_eq!(f.next_month_expected_cents, None);
        assert_eq!(f.note, None);
    }
}
