//! Income data models and API request/response types.
//!
//! This module defines:
//! - `Income`: Database entity representing an income record
//! - Request types for creating and updating incomes
//! - `IncomeResponse`: Response body returned to clients

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents an income record from the database.
///
/// # Database Table
///
/// Maps to the `incomes` table. Each income:
/// - Belongs to one user (via `user_id`)
/// - Stores its amount in cents (never floats!)
/// - Optionally points at the recurring income that generated it
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Income {
    /// Unique identifier for this income
    pub id: Uuid,

    /// Owner of the record; every query filters by this
    pub user_id: Uuid,

    /// Where the money came from ("Acme Corp salary", truncated to 100 chars on import)
    pub source: String,

    /// Amount in cents
    ///
    /// Must be positive (enforced by CHECK constraint)
    pub amount_cents: i64,

    /// Canonical income category (see services::classify)
    pub category: String,

    /// Date the income was received
    pub date: NaiveDate,

    /// Recurring income that materialized this record, if any
    pub recurring_id: Option<Uuid>,

    /// When the record was created
    pub created_at: DateTime<Utc>,
}

/// Request body for creating an income.
///
/// # JSON Example
///
/// ```json
/// {
///   "source": "Acme Corp salary",
///   "amount_cents": 520000,
///   "category": "Salary",
///   "date": "2026-08-01"
/// }
/// ```
///
/// When `category` is omitted it is predicted from `source`.
#[derive(Debug, Deserialize)]
pub struct CreateIncomeRequest {
    pub source: String,
    pub amount_cents: i64,
    pub category: Option<String>,
    pub date: NaiveDate,
}

/// Request body for updating an income. All fields are replaced.
#[derive(Debug, Deserialize)]
pub struct UpdateIncomeRequest {
    pub source: String,
    pub amount_cents: i64,
    pub category: String,
    pub date: NaiveDate,
}

/// Response body for income endpoints.
#[derive(Debug, Serialize)]
pub struct IncomeResponse {
    pub id: Uuid,
    pub source: String,
    pub amount_cents: i64,
    pub category: String,
    pub date: NaiveDate,
    pub recurring_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Convert database Income to API IncomeResponse.
///
/// This removes the internal `user_id` field.
impl From<Income> for IncomeResponse {
    fn from(income: Income) -> Self {
        Self {
            id: income.id,
            source: income.source,
            amount_cents: income.amount_cents,
            category: income.category,
            date: income.date,
            recurring_id: income.recurring_id,
            created_at: income.created_at,
        }
    }
}
