//! Budget models.
//!
//! A budget covers a date range with a total amount; each attached
//! category gets a percentage of that total as its spending limit.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a budget record from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Budget {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub total_amount_cents: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Represents a per-category allocation within a budget.
///
/// The category's limit is `percent`% of the budget's total amount.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct BudgetCategory {
    pub id: Uuid,
    pub budget_id: Uuid,
    pub category: String,
    pub percent: i32,
}

impl BudgetCategory {
    /// Spending limit in cents: `percent`% of the budget total.
    pub fn limit_cents(&self, total_amount_cents: i64) -> i64 {
        total_amount_cents * i64::from(self.percent) / 100
    }
}

/// One category allocation in a budget request.
#[derive(Debug, Deserialize)]
pub struct BudgetCategoryRequest {
    pub category: String,
    pub percent: i32,
}

/// Request body for creating or updating a budget.
///
/// # JSON Example
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
///
/// # Validation
///
/// - Total amount must be positive
/// - Each percent is in 1..=100
/// - Categories must be unique within the budget
#[derive(Debug, Deserialize)]
pub struct BudgetRequest {
    pub name: String,
    pub total_amount_cents: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub categories: Vec<BudgetCategoryRequest>,
}

/// Per-category status in a budget response.
#[derive(Debug, Serialize)]
pub struct BudgetCategoryStatus {
    pub category: String,
    pub percent: i32,
    pub limit_cents: i64,
    /// Expenses in this category within the budget's date range
    pub spent_cents: i64,
}

/// Response body for budget endpoints: the budget plus live
/// per-category spend against each limit.
#[derive(Debug, Serialize)]
pub struct BudgetResponse {
    pub id: Uuid,
    pub name: String,
    pub total_amount_cents: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    /// Whether today falls inside the budget's date range
    pub is_active: bool,
    pub categories: Vec<BudgetCategoryStatus>,
    /// Sum of spent_cents across categories
    pub total_spent_cents: i64,
}
