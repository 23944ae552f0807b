//! Analytics HTTP handlers.
//!
//! This module implements the chart-feeding endpoints:
//! - GET /api/v1/analytics/dashboard - Totals, series, breakdowns
//! - GET /api/v1/analytics/expenses - Expense series plus forecast
//! - GET /api/v1/analytics/incomes - Income series
//!
//! All series are zero-filled over the requested window so charts get
//! one point per period even for quiet months.

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::recurring::RecurringExpenseResponse,
    services::{
        forecast::{self, ExpenseForecast},
        periods::{self, ViewWindow},
        recurring,
    },
};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Query parameters for analytics windows.
#[derive(Debug, Deserialize)]
pub struct WindowParams {
    /// `3m`, `6m`, `monthly` (default), `2y`, `yearly`, `all`
    pub view: Option<String>,
    /// Custom window start (YYYY-MM-DD); overrides `view`
    pub start: Option<NaiveDate>,
    /// Custom window end; defaults to today
    pub end: Option<NaiveDate>,
}

impl WindowParams {
    fn window(&self) -> ViewWindow {
        ViewWindow::parse(self.view.as_deref().unwrap_or("monthly"))
    }
}

/// One chart series: parallel label/value vectors.
#[derive(Debug, Serialize)]
pub struct Series {
    pub labels: Vec<String>,
    pub data: Vec<i64>,
}

/// Paired income/expense series over the same labels.
#[derive(Debug, Serialize)]
pub struct PairedSeries {
    pub labels: Vec<String>,
    pub income: Vec<i64>,
    pub expense: Vec<i64>,
}

/// One slice of the category breakdown.
#[derive(Debug, Serialize)]
pub struct CategorySlice {
    pub category: String,
    pub total_cents: i64,
}

/// The most recent income or expense.
#[derive(Debug, Serialize)]
pub struct LastTransaction {
    /// "income" or "expense"
    pub kind: String,
    pub description: String,
    pub amount_cents: i64,
    pub date: NaiveDate,
}

/// Response body for the dashboard endpoint.
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    /// All-time totals, independent of the window
    pub total_income_cents: i64,
    pub total_expense_cents: i64,
    pub balance_cents: i64,
    pub monthly: PairedSeries,
    pub weekly: PairedSeries,
    /// Expense categories in the window, largest first
    pub categories: Vec<CategorySlice>,
    pub last_transaction: Option<LastTransaction>,
    /// Recurring expenses currently due or waiting on income
    pub due_recurring_expenses: Vec<RecurringExpenseResponse>,
}

/// (date, amount) rows in the window, oldest first.
async fn dated_amounts(
    pool: &DbPool,
    table: &str,
    user_id: Uuid,
    start: Option<NaiveDate>,
    end: NaiveDate,
) -> Result<Vec<(NaiveDate, i64)>, AppError> {
    // `table` is one of two internal constants, never user input
    let sql = format!(
        "SELECT date, amount_cents FROM {table} \
         WHERE user_id = $1 AND date <= $2 AND ($3::date IS NULL OR date >= $3) \
         ORDER BY date"
    );
    let rows: Vec<(NaiveDate, i64)> = sqlx::query_as(&sql)
        .bind(user_id)
        .bind(end)
        .bind(start)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

fn window_bounds(
    params: &WindowParams,
    today: NaiveDate,
    earliest: Option<NaiveDate>,
) -> (Option<NaiveDate>, NaiveDate) {
    let end = params.end.unwrap_or(today);
    let start = match params.start {
        Some(s) => Some(s),
        None => params.window().start_date(today).or(earliest),
    };
    (start, end)
}

fn monthly_series(rows: &[(NaiveDate, i64)], labels: &[String]) -> Vec<i64> {
    let mut by_month: HashMap<String, i64> = HashMap::new();
    for (date, amount) in rows {
        *by_month.entry(periods::month_key(*date)).or_insert(0) += amount;
    }
    labels
        .iter()
        .map(|label| by_month.get(label).copied().unwrap_or(0))
        .collect()
}

fn weekly_series(rows: &[(NaiveDate, i64)], labels: &[String]) -> Vec<i64> {
    let mut by_week: HashMap<String, i64> = HashMap::new();
    for (date, amount) in rows {
        *by_week.entry(periods::week_key(*date)).or_insert(0) += amount;
    }
    labels
        .iter()
        .map(|label| by_week.get(label).copied().unwrap_or(0))
        .collect()
}

fn yearly_series(rows: &[(NaiveDate, i64)]) -> Series {
    let mut by_year: HashMap<i32, i64> = HashMap::new();
    for (date, amount) in rows {
        *by_year.entry(date.year()).or_insert(0) += amount;
    }
    let mut years: Vec<i32> = by_year.keys().copied().collect();
    years.sort_unstable();
    Series {
        labels: years.iter().map(|y| y.to_string()).collect(),
        data: years.iter().map(|y| by_year[y]).collect(),
    }
}

/// Dashboard: totals, zero-filled series, breakdowns and due items.
///
/// # Query Parameters
///
/// - `view`: `3m` | `6m` | `monthly` (default, 12 months) | `2y` | `all`
/// - `start`, `end`: custom window (YYYY-MM-DD), overriding `view`
pub async fn dashboard(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<WindowParams>,
) -> Result<Json<DashboardResponse>, AppError> {
    let today = Utc::now().date_naive();
    recurring::process_recurring(&pool, auth.user_id, today).await?;

    let total_income: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM incomes WHERE user_id = $1",
    )
    .bind(auth.user_id)
    .fetch_one(&pool)
    .await?;
    let total_expense: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM expenses WHERE user_id = $1",
    )
    .bind(auth.user_id)
    .fetch_one(&pool)
    .await?;

    let earliest: Option<NaiveDate> = sqlx::query_scalar(
        r#"
        SELECT LEAST(
            (SELECT MIN(date) FROM incomes WHERE user_id = $1),
            (SELECT MIN(date) FROM expenses WHERE user_id = $1)
        )
        "#,
    )
    .bind(auth.user_id)
    .fetch_one(&pool)
    .await?;

    let (start, end) = window_bounds(&params, today, earliest);
    let income_rows = dated_amounts(&pool, "incomes", auth.user_id, start, end).await?;
    let expense_rows = dated_amounts(&pool, "expenses", auth.user_id, start, end).await?;

    let series_start = start.unwrap_or(end);
    let month_labels = periods::month_labels(series_start, end);
    let week_labels = periods::week_keys(series_start, end);

    let monthly = PairedSeries {
        income: monthly_series(&income_rows, &month_labels),
        expense: monthly_series(&expense_rows, &month_labels),
        labels: month_labels,
    };
    let weekly = PairedSeries {
        income: weekly_series(&income_rows, &week_labels),
        expense: weekly_series(&expense_rows, &week_labels),
        labels: week_labels,
    };

    let categories: Vec<CategorySlice> = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT category, COALESCE(SUM(amount_cents), 0)
        FROM expenses
        WHERE user_id = $1 AND date <= $2 AND ($3::date IS NULL OR date >= $3)
        GROUP BY category
        ORDER BY 2 DESC
        "#,
    )
    .bind(auth.user_id)
    .bind(end)
    .bind(start)
    .fetch_all(&pool)
    .await?
    .into_iter()
    .map(|(category, total_cents)| CategorySlice {
        category,
        total_cents,
    })
    .collect();

    let last_transaction: Option<LastTransaction> = sqlx::query_as::<_, (String, String, i64, NaiveDate)>(
        r#"
        SELECT kind, description, amount_cents, date FROM (
            SELECT 'income' AS kind, source AS description, amount_cents, date, created_at
            FROM incomes WHERE user_id = $1
            UNION ALL
            SELECT 'expense' AS kind, name AS description, amount_cents, date, created_at
            FROM expenses WHERE user_id = $1
        ) t
        ORDER BY date DESC, created_at DESC
        LIMIT 1
        "#,
    )
    .bind(auth.user_id)
    .fetch_optional(&pool)
    .await?
    .map(|(kind, description, amount_cents, date)| LastTransaction {
        kind,
        description,
        amount_cents,
        date,
    });

    let due = recurring::due_recurring_expenses(&pool, auth.user_id, today)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(DashboardResponse {
        total_income_cents: total_income,
        total_expense_cents: total_expense,
        balance_cents: total_income - total_expense,
        monthly,
        weekly,
        categories,
        last_transaction,
        due_recurring_expenses: due,
    }))
}

/// Response body for the expense series endpoint.
#[derive(Debug, Serialize)]
pub struct ExpenseSeriesResponse {
    #[serde(flatten)]
    pub series: Series,
    pub forecast: ExpenseForecast,
}

async fn build_series(
    pool: &DbPool,
    table: &str,
    user_id: Uuid,
    params: &WindowParams,
    today: NaiveDate,
) -> Result<Series, AppError> {
    let sql = format!("SELECT MIN(date) FROM {table} WHERE user_id = $1");
    let earliest: Option<NaiveDate> = sqlx::query_scalar(&sql)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    let (start, end) = window_bounds(params, today, earliest);
    let rows = dated_amounts(pool, table, user_id, start, end).await?;

    if params.window() == ViewWindow::Yearly && params.start.is_none() {
        return Ok(yearly_series(&rows));
    }

    let labels = periods::month_labels(start.unwrap_or(end), end);
    let data = monthly_series(&rows, &labels);
    Ok(Series { labels, data })
}

/// Expense series over the window, with the spending forecast.
pub async fn expense_series(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<WindowParams>,
) -> Result<Json<ExpenseSeriesResponse>, AppError> {
    let today = Utc::now().date_naive();
    recurring::process_recurring(&pool, auth.user_id, today).await?;

    let series = build_series(&pool, "expenses", auth.user_id, &params, today).await?;
    let forecast = forecast::expense_forecast(&pool, auth.user_id, today).await?;
    Ok(Json(ExpenseSeriesResponse { series, forecast }))
}

/// Income series over the window.
pub async fn income_series(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<WindowParams>,
) -> Result<Json<Series>, AppError> {
    let today = Utc::now().date_naive();
    recurring::process_recurring(&pool, auth.user_id, today).await?;

    let series = build_series(&pool, "incomes", auth.user_id, &params, today).await?;
    Ok(Json(series))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn monthly_series_zero_fills_quiet_months() {
        let rows = vec![(d(2026, 1, 10), 100), (d(2026, 3, 5), 250), (d(2026, 3, 20), 50)];
        let labels = periods::month_labels(d(2026, 1, 1), d(2026, 3, 31));
        assert_eq!(labels, vec!["2026-01", "2026-02", "2026-03"]);
        assert_eq!(monthly_series(&rows, &labels), vec![100, 0, 300]);
    }

    #[test]
    fn yearly_series_groups_by_calendar_year() {
        let rows = vec![
            (d(2024, 6, 1), 100),
            (d(2025, 1, 1), 200),
            (d(2025, 12, 31), 300),
        ];
        let s = yearly_series(&rows);
        assert_eq!(s.labels, vec!["2024", "2025"]);
        assert_eq!(s.data, vec![100, 500]);
    }

    #[test]
    fn custom_start_overrides_the_named_view() {
        let params = WindowParams {
            view: Some("3m".to_string()),
            start: Some(d(2025, 1, 1)),
            end: None,
        };
        let (start, end) = window_bounds(&params, d(2026, 8, 29), None);
        assert_eq!(start, Some(d(2025, 1, 1)));
        assert_eq!(end, d(2026, 8, 29));
    }
}
