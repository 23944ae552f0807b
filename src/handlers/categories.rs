//! Category listing and prediction endpoints.
//!
//! - GET /api/v1/categories/expense - Canonical expense categories
//! - GET /api/v1/categories/income - Canonical income categories
//! - GET /api/v1/categories/expense/predict?text= - Predict from text
//! - GET /api/v1/categories/income/predict?text= - Predict from text
//!
//! Prediction is the keyword scorer in `services::classify`; clients
//! use it to pre-fill the category field from a description.

use crate::{error::AppError, services::classify};
use axum::{Json, extract::Query};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct PredictParams {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub category: String,
}

/// List the canonical expense categories.
pub async fn list_expense_categories() -> Json<Vec<&'static str>> {
    Json(classify::EXPENSE_CATEGORIES.to_vec())
}

/// List the canonical income categories.
pub async fn list_income_categories() -> Json<Vec<&'static str>> {
    Json(classify::INCOME_CATEGORIES.to_vec())
}

/// Predict an expense category from free text.
///
/// # Response (200)
///
/// ```json
/// { "category": "Groceries" }
/// ```
pub async fn predict_expense_category(
    Query(params): Query<PredictParams>,
) -> Result<Json<PredictResponse>, AppError> {
    if params.text.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Query parameter 'text' must not be empty".to_string(),
        ));
    }
    Ok(Json(PredictResponse {
        category: classify::predict_expense_category(&params.text),
    }))
}

/// Predict an income category from free text.
pub async fn predict_income_category(
    Query(params): Query<PredictParams>,
) -> Result<Json<PredictResponse>, AppError> {
    if params.text.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Query parameter 'text' must not be empty".to_string(),
        ));
    }
    Ok(Json(PredictResponse {
        category: classify::predict_income_category(&params.text),
    }))
}
