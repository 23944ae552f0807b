//! Budget HTTP handlers.
//!
//! This module implements the budget endpoints:
//! - GET /api/v1/budgets - List budgets with live per-category spend
//! - POST /api/v1/budgets - Create a budget with category allocations
//! - GET /api/v1/budgets/{id} - Get one budget
//! - PUT /api/v1/budgets/{id} - Replace a budget and its allocations
//! - DELETE /api/v1/budgets/{id} - Delete a budget

use crate::{
    db::DbPool,
    error::AppError,
    handlers::incomes::DeleteResponse,
    middleware::auth::AuthContext,
    models::budget::{Budget, BudgetRequest, BudgetResponse},
    services::{budget, classify},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::collections::HashSet;
use uuid::Uuid;

/// Validate a budget request and return its normalized categories.
fn validate_budget(request: &BudgetRequest) -> Result<Vec<(String, i32)>, AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Budget name must not be empty".to_string(),
        ));
    }
    if request.total_amount_cents <= 0 {
        return Err(AppError::InvalidRequest(
            "Total amount must be positive".to_string(),
        ));
    }
    if request.end_date < request.start_date {
        return Err(AppError::InvalidRequest(
            "End date must not be before the start date".to_string(),
        ));
    }
    if request.categories.is_empty() {
        return Err(AppError::InvalidRequest(
            "A budget needs at least one category allocation".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut categories = Vec::with_capacity(request.categories.len());
    for cat in &request.categories {
        if !(1..=100).contains(&cat.percent) {
            return Err(AppError::InvalidRequest(format!(
                "Percent for '{}' must be between 1 and 100",
                cat.category
            )));
        }
        let normalized = classify::normalize_expense_category(&cat.category);
        if !seen.insert(normalized.clone()) {
            return Err(AppError::InvalidRequest(format!(
                "Category '{normalized}' appears more than once"
            )));
        }
        categories.push((normalized, cat.percent));
    }
    Ok(categories)
}

/// List budgets, newest first, with live spend per category.
pub async fn list_budgets(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<BudgetResponse>>, AppError> {
    let budgets = sqlx::query_as::<_, Budget>(
        "SELECT * FROM budgets WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(auth.user_id)
    .fetch_all(&pool)
    .await?;

    let mut responses = Vec::with_capacity(budgets.len());
    for b in budgets {
        responses.push(budget::budget_response(&pool, auth.user_id, b).await?);
    }
    Ok(Json(responses))
}

/// Create a budget.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "August",
///   "total_amount_cents": 200000,
///   "start_date": "2026-08-01",
///   "end_date": "2026-08-31",
///   "categories": [
///     { "category": "Groceries", "percent": 40 },
///     { "category": "Entertainment", "percent": 20 }
///   ]
/// }
/// ```
pub async fn create_budget(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<BudgetRequest>,
) -> Result<Json<BudgetResponse>, AppError> {
    let categories = validate_budget(&request)?;

    let mut tx = pool.begin().await?;
    let created = sqlx::query_as::<_, Budget>(
        r#"
        INSERT INTO budgets (user_id, name, total_amount_cents, start_date, end_date)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(auth.user_id)
    .bind(request.name.trim())
    .bind(request.total_amount_cents)
    .bind(request.start_date)
    .bind(request.end_date)
    .fetch_one(&mut *tx)
    .await?;

    for (category, percent) in &categories {
        sqlx::query("INSERT INTO budget_categories (budget_id, category, percent) VALUES ($1, $2, $3)")
            .bind(created.id)
            .bind(category)
            .bind(percent)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    Ok(Json(
        budget::budget_response(&pool, auth.user_id, created).await?,
    ))
}

/// Get one budget with live spend per category.
pub async fn get_budget(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(budget_id): Path<Uuid>,
) -> Result<Json<BudgetResponse>, AppError> {
    let b = sqlx::query_as::<_, Budget>("SELECT * FROM budgets WHERE id = $1 AND user_id = $2")
        .bind(budget_id)
        .bind(auth.user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::BudgetNotFound)?;

    Ok(Json(budget::budget_response(&pool, auth.user_id, b).await?))
}

/// Replace a budget and its category allocations.
pub async fn update_budget(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(budget_id): Path<Uuid>,
    Json(request): Json<BudgetRequest>,
) -> Result<Json<BudgetResponse>, AppError> {
    let categories = validate_budget(&request)?;

    let mut tx = pool.begin().await?;
    let updated = sqlx::query_as::<_, Budget>(
        r#"
        UPDATE budgets
        SET name = $1, total_amount_cents = $2, start_date = $3, end_date = $4
        WHERE id = $5 AND user_id = $6
        RETURNING *
        "#,
    )
    .bind(request.name.trim())
    .bind(request.total_amount_cents)
    .bind(request.start_date)
    .bind(request.end_date)
    .bind(budget_id)
    .bind(auth.user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::BudgetNotFound)?;

    sqlx::query("DELETE FROM budget_categories WHERE budget_id = $1")
        .bind(budget_id)
        .execute(&mut *tx)
        .await?;
    for (category, percent) in &categories {
        sqlx::query("INSERT INTO budget_categories (budget_id, category, percent) VALUES ($1, $2, $3)")
            .bind(budget_id)
            .bind(category)
            .bind(percent)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    Ok(Json(
        budget::budget_response(&pool, auth.user_id, updated).await?,
    ))
}

/// Delete a budget (allocations cascade).
pub async fn delete_budget(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(budget_id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, AppError> {
    let result = sqlx::query("DELETE FROM budgets WHERE id = $1 AND user_id = $2")
        .bind(budget_id)
        .bind(auth.user_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::BudgetNotFound);
    }
    Ok(Json(DeleteResponse { deleted: 1 }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::budget::BudgetCategoryRequest;
    use chrono::NaiveDate;

    fn request(categories: Vec<BudgetCategoryRequest>) -> BudgetRequest {
        BudgetRequest {
            name: "August".to_string(),
            total_amount_cents: 200_000,
            start_date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 8, 31).unwrap(),
            categories,
        }
    }

    #[test]
    fn categories_are_normalized_and_deduplicated() {
        let ok = validate_budget(&request(vec![
            BudgetCategoryRequest {
                category: "groceries".to_string(),
                percent: 40,
            },
            BudgetCategoryRequest {
                category: "Rent".to_string(),
                percent: 30,
            },
        ]))
        .unwrap();
        assert_eq!(ok[0].0, "Groceries");

        let dup = validate_budget(&request(vec![
            BudgetCategoryRequest {
                category: "groceries".to_string(),
                percent: 40,
            },
            BudgetCategoryRequest {
                category: "Groceries".to_string(),
                percent: 10,
            },
        ]));
        assert!(dup.is_err());
    }

    #[test]
    fn percent_bounds_are_enforced() {
        let zero = validate_budget(&request(vec![BudgetCategoryRequest {
            category: "Rent".to_string(),
            percent: 0,
        }]));
        assert!(zero.is_err());
        let over = validate_budget(&request(vec![BudgetCategoryRequest {
            category: "Rent".to_string(),
            percent: 101,
        }]));
        assert!(over.is_err());
    }
}
