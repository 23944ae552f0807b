//! Savings goal HTTP handlers.
//!
//! This module implements the goal endpoints:
//! - GET /api/v1/goals - Dashboard: rollover, allocations, projections
//! - POST /api/v1/goals - Create a goal
//! - PUT /api/v1/goals/{id} - Replace a goal
//! - DELETE /api/v1/goals/{id} - Delete a goal, refunding its allocation
//! - POST /api/v1/goals/delete-selected - Delete chosen goals
//! - DELETE /api/v1/goals - Delete all goals, refunding everything
//!
//! The dashboard is where money moves: every request rolls completed
//! months' surplus into the goals by deadline/priority order, then
//! projects each goal's completion odds from the recent average surplus.

use crate::{
    db::DbPool,
    error::AppError,
    handlers::incomes::DeleteSelectedRequest,
    middleware::auth::AuthContext,
    models::goal::{
        GoalDeleteResponse, GoalRequest, GoalResponse, GoalsDashboardResponse, SavingsGoal,
    },
    services::{recurring, surplus},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

fn goal_response(goal: SavingsGoal, avg_surplus_cents: i64, today: NaiveDate) -> GoalResponse {
    let projection = surplus::project_goal(&goal, avg_surplus_cents, today);
    GoalResponse {
        completed: goal.is_completed(),
        progress_percent: goal.progress_percent(),
        id: goal.id,
        name: goal.name,
        target_amount_cents: goal.target_amount_cents,
        current_amount_cents: goal.current_amount_cents,
        deadline: goal.deadline,
        priority: goal.priority,
        created_at: goal.created_at,
        projection,
    }
}

/// Goals dashboard.
///
/// # Flow
///
/// 1. Materialize due recurring items (they change the surplus)
/// 2. Roll completed months' surplus into the goals
/// 3. Project each goal from the trailing average monthly surplus
///
/// # Response (200)
///
/// ```json
/// {
///   "goals": [ { "name": "Emergency fund", "projection": { "probability": 62.5 } } ],
///   "total_goals": 1,
///   "overall_progress_percent": 41.0,
///   "accumulated_balance_cents": 1500,
///   "current_balance_cents": 82000
/// }
/// ```
pub async fn goals_dashboard(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<GoalsDashboardResponse>, AppError> {
    let today = Utc::now().date_naive();
    recurring::process_recurring(&pool, auth.user_id, today).await?;
    let balances = surplus::rollover(&pool, auth.user_id, today).await?;
    let avg = surplus::average_monthly_surplus(&pool, auth.user_id, today).await?;

    let goals = sqlx::query_as::<_, SavingsGoal>(
        "SELECT * FROM savings_goals WHERE user_id = $1 ORDER BY created_at",
    )
    .bind(auth.user_id)
    .fetch_all(&pool)
    .await?;

    let total_goals = goals.len() as i64;
    let total_target: i64 = goals.iter().map(|g| g.target_amount_cents).sum();
    let total_current: i64 = goals.iter().map(|g| g.current_amount_cents).sum();
    let overall = if total_target > 0 {
        (total_current as f64 / total_target as f64 * 100.0).min(100.0)
    } else {
        0.0
    };

    let goals = goals
        .into_iter()
        .map(|g| goal_response(g, avg, today))
        .collect();

    Ok(Json(GoalsDashboardResponse {
        goals,
        total_goals,
        total_target_cents: total_target,
        total_current_cents: total_current,
        overall_progress_percent: overall,
        accumulated_balance_cents: balances.accumulated_cents,
        current_balance_cents: balances.current_cents,
    }))
}

fn validate_goal(request: &GoalRequest) -> Result<(), AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Goal name must not be empty".to_string(),
        ));
    }
    if request.target_amount_cents <= 0 {
        return Err(AppError::InvalidRequest(
            "Target amount must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Create a savings goal.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Emergency fund",
///   "target_amount_cents": 500000,
///   "deadline": "2027-06-30",
///   "priority": "High"
/// }
/// ```
///
/// The tracker balance and existing allocations are immediately
/// redistributed across all goals including the new one.
pub async fn create_goal(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<GoalRequest>,
) -> Result<Json<GoalResponse>, AppError> {
    validate_goal(&request)?;

    let created = sqlx::query_as::<_, SavingsGoal>(
        r#"
        INSERT INTO savings_goals (user_id, name, target_amount_cents, deadline, priority)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(auth.user_id)
    .bind(request.name.trim())
    .bind(request.target_amount_cents)
    .bind(request.deadline)
    .bind(request.priority.as_str())
    .fetch_one(&pool)
    .await?;

    surplus::reallocate(&pool, auth.user_id).await?;

    let today = Utc::now().date_naive();
    let avg = surplus::average_monthly_surplus(&pool, auth.user_id, today).await?;
    let goal = sqlx::query_as::<_, SavingsGoal>("SELECT * FROM savings_goals WHERE id = $1")
        .bind(created.id)
        .fetch_one(&pool)
        .await?;

    Ok(Json(goal_response(goal, avg, today)))
}

/// Replace a savings goal and redistribute allocations.
pub async fn update_goal(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(goal_id): Path<Uuid>,
    Json(request): Json<GoalRequest>,
) -> Result<Json<GoalResponse>, AppError> {
    validate_goal(&request)?;

    sqlx::query_as::<_, SavingsGoal>(
        r#"
        UPDATE savings_goals
        SET name = $1, target_amount_cents = $2, deadline = $3, priority = $4
        WHERE id = $5 AND user_id = $6
        RETURNING *
        "#,
    )
    .bind(request.name.trim())
    .bind(request.target_amount_cents)
    .bind(request.deadline)
    .bind(request.priority.as_str())
    .bind(goal_id)
    .bind(auth.user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::GoalNotFound)?;

    surplus::reallocate(&pool, auth.user_id).await?;

    let today = Utc::now().date_naive();
    let avg = surplus::average_monthly_surplus(&pool, auth.user_id, today).await?;
    let goal = sqlx::query_as::<_, SavingsGoal>("SELECT * FROM savings_goals WHERE id = $1")
        .bind(goal_id)
        .fetch_one(&pool)
        .await?;

    Ok(Json(goal_response(goal, avg, today)))
}

/// Delete a goal; its allocation flows back into the surplus tracker.
pub async fn delete_goal(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(goal_id): Path<Uuid>,
) -> Result<Json<GoalDeleteResponse>, AppError> {
    let goal = sqlx::query_as::<_, SavingsGoal>(
        "SELECT * FROM savings_goals WHERE id = $1 AND user_id = $2",
    )
    .bind(goal_id)
    .bind(auth.user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::GoalNotFound)?;

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM savings_goals WHERE id = $1")
        .bind(goal_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        r#"
        INSERT INTO surplus_trackers (user_id, last_surplus_cents)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE
        SET last_surplus_cents = surplus_trackers.last_surplus_cents + $2
        "#,
    )
    .bind(auth.user_id)
    .bind(goal.current_amount_cents)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(Json(GoalDeleteResponse {
        deleted: 1,
        refunded_cents: goal.current_amount_cents,
    }))
}

/// Delete a chosen set of goals, refunding their allocations.
///
/// # Request Body
///
/// ```json
/// { "ids": ["550e8400-e29b-41d4-a716-446655440000"] }
/// ```
pub async fn delete_selected_goals(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<DeleteSelectedRequest>,
) -> Result<Json<GoalDeleteResponse>, AppError> {
    let refund: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(current_amount_cents), 0)
        FROM savings_goals
        WHERE user_id = $1 AND id = ANY($2)
        "#,
    )
    .bind(auth.user_id)
    .bind(&request.ids)
    .fetch_one(&pool)
    .await?;

    let mut tx = pool.begin().await?;
    let result = sqlx::query("DELETE FROM savings_goals WHERE user_id = $1 AND id = ANY($2)")
        .bind(auth.user_id)
        .bind(&request.ids)
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        r#"
        INSERT INTO surplus_trackers (user_id, last_surplus_cents)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE
        SET last_surplus_cents = surplus_trackers.last_surplus_cents + $2
        "#,
    )
    .bind(auth.user_id)
    .bind(refund)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(Json(GoalDeleteResponse {
        deleted: result.rows_affected() as i64,
        refunded_cents: refund,
    }))
}

/// Delete all goals, refunding every allocation to the tracker.
pub async fn delete_all_goals(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<GoalDeleteResponse>, AppError> {
    let refund: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(current_amount_cents), 0) FROM savings_goals WHERE user_id = $1",
    )
    .bind(auth.user_id)
    .fetch_one(&pool)
    .await?;

    let mut tx = pool.begin().await?;
    let result = sqlx::query("DELETE FROM savings_goals WHERE user_id = $1")
        .bind(auth.user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        r#"
        INSERT INTO surplus_trackers (user_id, last_surplus_cents)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE
        SET last_surplus_cents = surplus_trackers.last_surplus_cents + $2
        "#,
    )
    .bind(auth.user_id)
    .bind(refund)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(Json(GoalDeleteResponse {
        deleted: result.rows_affected() as i64,
        refunded_cents: refund,
    }))
}
