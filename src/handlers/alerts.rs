//! Budget alert endpoint HTTP handlers.
//!
//! This module implements the alert endpoint management API:
//! - POST /api/v1/alerts - Register an alert endpoint
//! - GET /api/v1/alerts - List active alert endpoints
//! - DELETE /api/v1/alerts/{id} - Deactivate an alert endpoint
//!
//! Delivery itself happens from the budget checks on expense writes
//! (services::alerts); these handlers only manage the endpoints.

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::alert::{AlertEndpointRequest, AlertEndpointResponse},
    services::alerts,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde_json::{Value, json};
use uuid::Uuid;

/// Register an alert endpoint.
///
/// # Request Body
///
/// ```json
/// { "url": "https://example.com/budget-alerts" }
/// ```
///
/// # Response (200)
///
/// The endpoint including its HMAC secret. The secret is shown only
/// here; store it to verify `X-Alert-Signature` headers.
pub async fn create_alert(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<AlertEndpointRequest>,
) -> Result<Json<AlertEndpointResponse>, AppError> {
    let endpoint = alerts::create_alert_endpoint(&pool, auth.user_id, request).await?;
    Ok(Json(endpoint))
}

/// List active alert endpoints (secrets omitted).
pub async fn list_alerts(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<AlertEndpointResponse>>, AppError> {
    let endpoints = alerts::list_alert_endpoints(&pool, auth.user_id).await?;
    Ok(Json(endpoints))
}

/// Deactivate an alert endpoint.
///
/// Soft delete: the endpoint stops receiving alerts but its delivery
/// history in `alert_events` is preserved.
pub async fn delete_alert(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(endpoint_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    alerts::delete_alert_endpoint(&pool, auth.user_id, endpoint_id).await?;
    Ok(Json(json!({ "deleted": true })))
}
