//! CSV import HTTP handlers.
//!
//! This module implements the import endpoints:
//! - POST /api/v1/imports/incomes - Income CSV (raw body)
//! - POST /api/v1/imports/expenses - Expense CSV (raw body)
//! - POST /api/v1/imports/bank-statement - Raw bank statement CSV
//!
//! Bodies are raw `text/csv`; responses report imported/skipped counts
//! plus any budget warnings the imported expenses triggered.

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    services::csv_import::{self, ImportSummary, StatementSummary},
};
use axum::{Extension, Json, extract::State};
use chrono::Utc;

/// Import an income CSV.
///
/// # Request Body
///
/// Raw CSV (max 1 MiB) with at least `date`, `source` and `amount`
/// columns; header names are normalized, so bank-export spellings like
/// "Transaction Date" work too.
///
/// # Response (200)
///
/// ```json
/// { "imported": 41, "skipped": 2, "warnings": [] }
/// ```
pub async fn import_incomes(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    body: String,
) -> Result<Json<ImportSummary>, AppError> {
    let summary = csv_import::import_incomes(&pool, auth.user_id, &body).await?;
    tracing::info!(
        "Income import for {}: {} imported, {} skipped",
        auth.username,
        summary.imported,
        summary.skipped
    );
    Ok(Json(summary))
}

/// Import an expense CSV.
///
/// Rows the monthly surplus rule cannot cover are skipped, and budget
/// warnings for the affected categories are returned once each.
pub async fn import_expenses(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    body: String,
) -> Result<Json<ImportSummary>, AppError> {
    let today = Utc::now().date_naive();
    let summary = csv_import::import_expenses(&pool, auth.user_id, &body, today).await?;
    tracing::info!(
        "Expense import for {}: {} imported, {} skipped",
        auth.username,
        summary.imported,
        summary.skipped
    );
    Ok(Json(summary))
}

/// Import a raw bank statement CSV.
///
/// Detects debit/credit/withdrawal/deposit columns by header sniffing;
/// each row lands as an income or an expense with a predicted category.
///
/// # Response (200)
///
/// ```json
/// { "imported_income": 12, "imported_expense": 30, "skipped": 1, "warnings": [] }
/// ```
pub async fn import_bank_statement(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    body: String,
) -> Result<Json<StatementSummary>, AppError> {
    let today = Utc::now().date_naive();
    let summary =
        csv_import::import_bank_statement(&pool, auth.user_id, &body, today).await?;
    tracing::info!(
        "Statement import for {}: {} incomes, {} expenses, {} skipped",
        auth.username,
        summary.imported_income,
        summary.imported_expense,
        summary.skipped
    );
    Ok(Json(summary))
}
