//! Income HTTP handlers.
//!
//! This module implements the income endpoints:
//! - GET /api/v1/incomes - Paginated listing, newest first
//! - POST /api/v1/incomes - Record an income
//! - PUT /api/v1/incomes/{id} - Replace an income
//! - DELETE /api/v1/incomes/{id} - Delete an income
//! - POST /api/v1/incomes/delete-selected - Delete a set of incomes
//! - DELETE /api/v1/incomes - Delete all incomes
//!
//! Listings materialize due recurring incomes first, so a salary that
//! came due this morning is already present in the response.

use crate::{
    db::DbPool,
    error::AppError,
    handlers::{PAGE_SIZE, PageParams, Paginated},
    middleware::auth::AuthContext,
    models::income::{CreateIncomeRequest, Income, IncomeResponse, UpdateIncomeRequest},
    services::{classify, recurring},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// List incomes, newest first.
///
/// # Query Parameters
///
/// - `page`: 1-based page number (20 records per page)
pub async fn list_incomes(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<PageParams>,
) -> Result<Json<Paginated<IncomeResponse>>, AppError> {
    let today = Utc::now().date_naive();
    recurring::process_recurring(&pool, auth.user_id, today).await?;

    let page = params.page();
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM incomes WHERE user_id = $1")
        .bind(auth.user_id)
        .fetch_one(&pool)
        .await?;

    let incomes = sqlx::query_as::<_, Income>(
        r#"
        SELECT * FROM incomes
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

    let items = incomes.into_iter().map(IncomeResponse::from).collect();
    Ok(Json(Paginated::new(items, page, total)))
}

/// Record an income.
///
/// # Request Body
///
/// ```json
/// {
///   "source": "Acme Corp salary",
///   "amount_cents": 520000,
///   "date": "2026-08-01"
/// }
/// ```
///
/// When `category` is omitted it is predicted from the source text.
pub async fn create_income(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateIncomeRequest>,
) -> Result<Json<IncomeResponse>, AppError> {
    if request.amount_cents <= 0 {
        return Err(AppError::InvalidRequest(
            "Amount must be positive".to_string(),
        ));
    }
    if request.source.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Source must not be empty".to_string(),
        ));
    }

    let category = match &request.category {
        Some(raw) => classify::normalize_income_category(raw),
        None => classify::predict_income_category(&request.source),
    };

    let income = sqlx::query_as::<_, Income>(
        r#"
        INSERT INTO incomes (user_id, source, amount_cents, category, date)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(auth.user_id)
    .bind(request.source.trim())
    .bind(request.amount_cents)
    .bind(&category)
    .bind(request.date)
    .fetch_one(&pool)
    .await?;

    Ok(Json(income.into()))
}

/// Replace an income.
///
/// # Validation
///
/// Shrinking an income must not leave already-recorded expenses
/// uncovered: the user's total income after the edit still has to be
/// at least their total expenses.
pub async fn update_income(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(income_id): Path<Uuid>,
    Json(request): Json<UpdateIncomeRequest>,
) -> Result<Json<IncomeResponse>, AppError> {
    if request.amount_cents <= 0 {
        return Err(AppError::InvalidRequest(
            "Amount must be positive".to_string(),
        ));
    }

    let existing = sqlx::query_as::<_, Income>(
        "SELECT * FROM incomes WHERE id = $1 AND user_id = $2",
    )
    .bind(income_id)
    .bind(auth.user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::RecordNotFound)?;

    check_income_coverage(&pool, auth.user_id, existing.amount_cents, request.amount_cents).await?;

    let category = classify::normalize_income_category(&request.category);
    let income = sqlx::query_as::<_, Income>(
        r#"
        UPDATE incomes
        SET source = $1, amount_cents = $2, category = $3, date = $4
        WHERE id = $5 AND user_id = $6
        RETURNING *
        "#,
    )
    .bind(request.source.trim())
    .bind(request.amount_cents)
    .bind(&category)
    .bind(request.date)
    .bind(income_id)
    .bind(auth.user_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(income.into()))
}

/// Reject income edits that would drop total income below total expenses.
pub async fn check_income_coverage(
    pool: &DbPool,
    user_id: Uuid,
    old_amount_cents: i64,
    new_amount_cents: i64,
) -> Result<(), AppError> {
    let total_income: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM incomes WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    let total_expense: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM expenses WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    if total_income - old_amount_cents + new_amount_cents < total_expense {
        return Err(AppError::IncomeCoverage(
            "Cannot reduce this income: recorded expenses would exceed total income".to_string(),
        ));
    }
    Ok(())
}

/// Delete a single income.
pub async fn delete_income(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(income_id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, AppError> {
    let result = sqlx::query("DELETE FROM incomes WHERE id = $1 AND user_id = $2")
        .bind(income_id)
        .bind(auth.user_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::RecordNotFound);
    }
    Ok(Json(DeleteResponse { deleted: 1 }))
}

/// Request body for bulk deletion.
#[derive(Debug, Deserialize)]
pub struct DeleteSelectedRequest {
    pub ids: Vec<Uuid>,
}

/// Count of deleted records.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: u64,
}

/// Delete a selected set of incomes. IDs not owned by the caller are
/// silently ignored.
pub async fn delete_selected_incomes(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<DeleteSelectedRequest>,
) -> Result<Json<DeleteResponse>, AppError> {
    let result = sqlx::query("DELETE FROM incomes WHERE user_id = $1 AND id = ANY($2)")
        .bind(auth.user_id)
        .bind(&request.ids)
        .execute(&pool)
        .await?;

    Ok(Json(DeleteResponse {
        deleted: result.rows_affected(),
    }))
}

/// Delete all of the caller's incomes.
pub async fn delete_all_incomes(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<DeleteResponse>, AppError> {
    let result = sqlx::query("DELETE FROM incomes WHERE user_id = $1")
        .bind(auth.user_id)
        .execute(&pool)
        .await?;

    Ok(Json(DeleteResponse {
        deleted: result.rows_affected(),
    }))
}
