//! Recurring income and expense models.
//!
//! A recurring item is a template: the materialization pass
//! (services::recurring) turns every due occurrence into a concrete
//! income/expense record and advances `next_due_date` by `frequency`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How often a recurring item fires.
///
/// Stored in the database as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Parse the database representation.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }

    /// Database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

/// Represents a recurring income record from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct RecurringIncome {
    pub id: Uuid,
    pub user_id: Uuid,
    pub source: String,
    pub amount_cents: i64,
    pub category: String,
    /// "daily" | "weekly" | "monthly" | "yearly"
    pub frequency: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// Next occurrence to materialize; starts at `start_date`
    pub next_due_date: NaiveDate,
    /// "active" | "inactive"
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Represents a recurring expense record from the database.
///
/// Unlike incomes, recurring expenses can be `pending`: due, but
/// deferred because cumulative income did not cover them yet.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct RecurringExpense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub amount_cents: i64,
    pub category: String,
    /// "daily" | "weekly" | "monthly" | "yearly"
    pub frequency: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// Next occurrence to materialize; starts at `start_date`
    pub next_due_date: NaiveDate,
    /// "active" | "pending" | "inactive"
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Request body for creating or updating a recurring income.
///
/// # JSON Example
///
/// ```json
/// {
///   "source": "Acme Corp salary",
///   "amount_cents": 520000,
///   "category": "Salary",
///   "frequency": "monthly",
///   "start_date": "2026-01-01",
///   "end_date": null
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct RecurringIncomeRequest {
    pub source: String,
    pub amount_cents: i64,
    pub category: String,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Request body for creating or updating a recurring expense.
#[derive(Debug, Deserialize)]
pub struct RecurringExpenseRequest {
    pub name: String,
    pub amount_cents: i64,
    pub category: String,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Response body for recurring income endpoints (strips `user_id`).
#[derive(Debug, Serialize)]
pub struct RecurringIncomeResponse {
    pub id: Uuid,
    pub source: String,
    pub amount_cents: i64,
    pub category: String,
    pub frequency: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub next_due_date: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<RecurringIncome> for RecurringIncomeResponse {
    fn from(rec: RecurringIncome) -> Self {
        Self {
            id: rec.id,
            source: rec.source,
            amount_cents: rec.amount_cents,
            category: rec.category,
            frequency: rec.frequency,
            start_date: rec.start_date,
            end_date: rec.end_date,
            next_due_date: rec.next_due_date,
            status: rec.status,
            created_at: rec.created_at,
        }
    }
}

/// Response body for recurring expense endpoints (strips `user_id`).
#[derive(Debug, Serialize)]
pub struct RecurringExpenseResponse {
    pub id: Uuid,
    pub name: String,
    pub amount_cents: i64,
    pub category: String,
    pub frequency: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub next_due_date: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<RecurringExpense> for RecurringExpenseResponse {
    fn from(rec: RecurringExpense) -> Self {
        Self {
            id: rec.id,
            name: rec.name,
            amount_cents: rec.amount_cents,
            category: rec.category,
            frequency: rec.frequency,
            start_date: rec.start_date,
            end_date: rec.end_date,
            next_due_date: rec.next_due_date,
            status: rec.status,
            created_at: rec.created_at,
        }
    }
}
