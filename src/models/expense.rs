//! Expense data models and API request/response types.
//!
//! Mirrors the income model with `name` in place of `source`. Expense
//! writes are additionally subject to the monthly surplus rule and to
//! budget warning checks, so create/update responses carry a
//! `warnings` list.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents an expense record from the database.
///
/// # Database Table
///
/// Maps to the `expenses` table. Each expense:
/// - Belongs to one user (via `user_id`)
/// - Stores its amount in cents (never floats!)
/// - Optionally points at the recurring expense that generated it
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Expense {
    /// Unique identifier for this expense
    pub id: Uuid,

    /// Owner of the record; every query filters by this
    pub user_id: Uuid,

    /// What the money was spent on (truncated to 100 chars on import)
    pub name: String,

    /// Amount in cents
    ///
    /// Must be positive (enforced by CHECK constraint)
    pub amount_cents: i64,

    /// Canonical expense category (see services::classify)
    pub category: String,

    /// Date the expense occurred
    pub date: NaiveDate,

    /// Recurring expense that materialized this record, if any
    pub recurring_id: Option<Uuid>,

    /// When the record was created
    pub created_at: DateTime<Utc>,
}

/// Request body for creating an expense.
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "Weekly groceries",
///   "amount_cents": 8450,
///   "category": "Groceries",
///   "date": "2026-08-14"
/// }
/// ```
///
/// When `category` is omitted it is predicted from `name`.
///
/// # Validation
///
/// - Amount must be positive
/// - The month's income minus its other expenses must cover the amount
#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    pub name: String,
    pub amount_cents: i64,
    pub category: Option<String>,
    pub date: NaiveDate,
}

/// Request body for updating an expense. All fields are replaced.
#[derive(Debug, Deserialize)]
pub struct UpdateExpenseRequest {
    pub name: String,
    pub amount_cents: i64,
    pub category: String,
    pub date: NaiveDate,
}

/// Response body for expense endpoints.
#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
    pub id: Uuid,
    pub name: String,
    pub amount_cents: i64,
    pub category: String,
    pub date: NaiveDate,
    pub recurring_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Convert database Expense to API ExpenseResponse.
///
/// This removes the internal `user_id` field.
impl From<Expense> for ExpenseResponse {
    fn from(expense: Expense) -> Self {
        Self {
            id: expense.id,
            name: expense.name,
            amount_cents: expense.amount_cents,
            category: expense.category,
            date: expense.date,
            recurring_id: expense.recurring_id,
            created_at: expense.created_at,
        }
    }
}

/// Response for expense create/update: the record plus any budget
/// warnings triggered by it.
///
/// # JSON Example
///
/// ```json
/// {
///   "expense": { "id": "...", "name": "Weekly groceries", "amount_cents": 8450 },
///   "warnings": [
///     "You have exceeded the limit for category 'Groceries' in budget 'August'. Spent: 41200, Limit: 40000"
///   ]
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ExpenseWriteResponse {
    pub expense: ExpenseResponse,
    pub warnings: Vec<String>,
}
