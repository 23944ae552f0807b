//! Expense HTTP handlers.
//!
//! This module implements the expense endpoints:
//! - GET /api/v1/expenses - Paginated listing, newest first
//! - POST /api/v1/expenses - Record an expense
//! - PUT /api/v1/expenses/{id} - Replace an expense
//! - DELETE /api/v1/expenses/{id} - Delete an expense
//! - POST /api/v1/expenses/delete-selected - Delete a set of expenses
//! - DELETE /api/v1/expenses - Delete all expenses
//!
//! # Monthly Surplus Rule
//!
//! An expense only lands if the income of its month covers it together
//! with the month's other expenses. Writes that pass the rule still run
//! budget checks and return any warnings alongside the record.

use crate::{
    db::DbPool,
    error::AppError,
    handlers::{
        PAGE_SIZE, PageParams, Paginated,
        incomes::{DeleteResponse, DeleteSelectedRequest},
    },
    middleware::auth::AuthContext,
    models::expense::{
        CreateExpenseRequest, Expense, ExpenseResponse, ExpenseWriteResponse, UpdateExpenseRequest,
    },
    services::{budget, classify, periods, recurring},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::{Months, NaiveDate, Utc};
use uuid::Uuid;

/// List expenses, newest first.
///
/// # Query Parameters
///
/// - `page`: 1-based page number (20 records per page)
pub async fn list_expenses(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<PageParams>,
) -> Result<Json<Paginated<ExpenseResponse>>, AppError> {
    let today = Utc::now().date_naive();
    recurring::process_recurring(&pool, auth.user_id, today).await?;

    let page = params.page();
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM expenses WHERE user_id = $1")
        .bind(auth.user_id)
        .fetch_one(&pool)
        .await?;

    let expenses = sqlx::query_as::<_, Expense>(
        r#"
        SELECT * FROM expenses
        WHERE user_id = $1
        ORDER BY date DESC, created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(auth.user_id)
    .bind(PAGE_SIZE)
    .bind((page - 1) * PAGE_SIZE)
    .fetch_all(&pool)
    .await?;

    let items = expenses.into_iter().map(ExpenseResponse::from).collect();
    Ok(Json(Paginated::new(items, page, total)))
}

/// Income minus other expenses for the month containing `date`,
/// optionally ignoring one expense (used when replacing it).
async fn month_headroom(
    pool: &DbPool,
    user_id: Uuid,
    date: NaiveDate,
    exclude: Option<Uuid>,
) -> Result<i64, AppError> {
    let start = periods::month_start(date);
    let end = start.checked_add_months(Months::new(1)).unwrap_or(start);

    let income: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM incomes WHERE user_id = $1 AND date >= $2 AND date < $3",
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;

    let spent: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(amount_cents), 0) FROM expenses
        WHERE user_id = $1 AND date >= $2 AND date < $3 AND ($4::uuid IS NULL OR id != $4)
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .bind(exclude)
    .fetch_one(pool)
    .await?;

    Ok(income - spent)
}

/// Record an expense.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Weekly groceries",
///   "amount_cents": 8450,
///   "date": "2026-08-14"
/// }
/// ```
///
/// # Response (200)
///
/// The created record plus any budget warnings it triggered.
///
/// # Errors
///
/// - 400 on a non-positive amount or empty name
/// - 422 when the month's income cannot cover the expense
pub async fn create_expense(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateExpenseRequest>,
) -> Result<Json<ExpenseWriteResponse>, AppError> {
    if request.amount_cents <= 0 {
        return Err(AppError::InvalidRequest(
            "Amount must be positive".to_string(),
        ));
    }
    if request.name.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Name must not be empty".to_string(),
        ));
    }

    if month_headroom(&pool, auth.user_id, request.date, None).await? < request.amount_cents {
        return Err(AppError::InsufficientSurplus);
    }

    let category = match &request.category {
        Some(raw) => classify::normalize_expense_category(raw),
        None => classify::predict_expense_category(&request.name),
    };

    let expense = sqlx::query_as::<_, Expense>(
        r#"
        INSERT INTO expenses (user_id, name, amount_cents, category, date)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(auth.user_id)
    .bind(request.name.trim())
    .bind(request.amount_cents)
    .bind(&category)
    .bind(request.date)
    .fetch_one(&pool)
    .await?;

    let today = Utc::now().date_naive();
    let warnings = budget::check_budget_warnings(&pool, auth.user_id, &expense, today).await?;

    Ok(Json(ExpenseWriteResponse {
        expense: expense.into(),
        warnings,
    }))
}

/// Replace an expense.
///
/// The surplus rule is re-checked against the target month with the
/// old amount taken out of the picture.
pub async fn update_expense(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(expense_id): Path<Uuid>,
    Json(request): Json<UpdateExpenseRequest>,
) -> Result<Json<ExpenseWriteResponse>, AppError> {
    if request.amount_cents <= 0 {
        return Err(AppError::InvalidRequest(
            "Amount must be positive".to_string(),
        ));
    }

    sqlx::query_scalar::<_, Uuid>("SELECT id FROM expenses WHERE id = $1 AND user_id = $2")
        .bind(expense_id)
        .bind(auth.user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::RecordNotFound)?;

    if month_headroom(&pool, auth.user_id, request.date, Some(expense_id)).await?
        < request.amount_cents
    {
        return Err(AppError::InsufficientSurplus);
    }

    let category = classify::normalize_expense_category(&request.category);
    let expense = sqlx::query_as::<_, Expense>(
        r#"
        UPDATE expenses
        SET name = $1, amount_cents = $2, category = $3, date = $4
        WHERE id = $5 AND user_id = $6
        RETURNING *
        "#,
    )
    .bind(request.name.trim())
    .bind(request.amount_cents)
    .bind(&category)
    .bind(request.date)
    .bind(expense_id)
    .bind(auth.user_id)
    .fetch_one(&pool)
    .await?;

    let today = Utc::now().date_naive();
    let warnings = budget::check_budget_warnings(&pool, auth.user_id, &expense, today).await?;

    Ok(Json(ExpenseWriteResponse {
        expense: expense.into(),
        warnings,
    }))
}

/// Delete a single expense.
pub async fn delete_expense(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(expense_id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, AppError> {
    let result = sqlx::query("DELETE FROM expenses WHERE id = $1 AND user_id = $2")
        .bind(expense_id)
        .bind(auth.user_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::RecordNotFound);
    }
    Ok(Json(DeleteResponse { deleted: 1 }))
}

/// Delete a selected set of expenses. IDs not owned by the caller are
/// silently ignored.
pub async fn delete_selected_expenses(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<DeleteSelectedRequest>,
) -> Result<Json<DeleteResponse>, AppError> {
    let result = sqlx::query("DELETE FROM expenses WHERE user_id = $1 AND id = ANY($2)")
        .bind(auth.user_id)
        .bind(&request.ids)
        .execute(&pool)
        .await?;

    Ok(Json(DeleteResponse {
        deleted: result.rows_affected(),
    }))
}

/// Delete all of the caller's expenses.
pub async fn delete_all_expenses(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<DeleteResponse>, AppError> {
    let result = sqlx::query("DELETE FROM expenses WHERE user_id = $1")
        .bind(auth.user_id)
        .execute(&pool)
        .await?;

    Ok(Json(DeleteResponse {
        deleted: result.rows_affected(),
    }))
}
