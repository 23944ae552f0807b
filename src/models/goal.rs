//! Savings goal and surplus tracker models.
//!
//! Goals never hold money of their own: the rollover pass
//! (services::surplus) distributes the accumulated monthly surplus
//! across goals each time the goals dashboard is requested, and the
//! unallocated remainder lives in the per-user surplus tracker.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Goal priority; used as an allocation tiebreaker after deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "High" => Some(Self::High),
            "Medium" => Some(Self::Medium),
            "Low" => Some(Self::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    /// Allocation rank: High before Medium before Low.
    pub fn rank(&self) -> i32 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

/// Represents a savings goal record from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct SavingsGoal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub target_amount_cents: i64,
    /// Surplus currently allocated to this goal by the rollover pass
    pub current_amount_cents: i64,
    pub deadline: Option<NaiveDate>,
    /// "High" | "Medium" | "Low"
    pub priority: String,
    pub created_at: DateTime<Utc>,
}

impl SavingsGoal {
    /// A goal is complete once its allocation reaches the target.
    pub fn is_completed(&self) -> bool {
        self.current_amount_cents >= self.target_amount_cents
    }

    /// Progress percentage, capped at 100.
    pub fn progress_percent(&self) -> f64 {
        if self.target_amount_cents <= 0 {
            return 0.0;
        }
        let pct = self.current_amount_cents as f64 / self.target_amount_cents as f64 * 100.0;
        pct.min(100.0)
    }
}

/// Per-user surplus not yet allocated to any goal.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SurplusTracker {
    pub user_id: Uuid,
    pub last_surplus_cents: i64,
}

/// Request body for creating or updating a savings goal.
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "Emergency fund",
///   "target_amount_cents": 500000,
///   "deadline": "2027-06-30",
///   "priority": "High"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct GoalRequest {
    pub name: String,
    pub target_amount_cents: i64,
    pub deadline: Option<NaiveDate>,
    #[serde(default = "default_priority")]
    pub priority: Priority,
}

fn default_priority() -> Priority {
    Priority::Medium
}

/// Completion projection attached to each goal in the dashboard.
///
/// `probability` is a 0-100 percentage when it can be computed;
/// otherwise `note` carries a display message ("Deadline passed,
/// please extend the deadline", etc.) and `probability` is null.
#[derive(Debug, Serialize)]
pub struct GoalProjection {
    pub probability: Option<f64>,
    /// Suggested completion date based on the average monthly surplus;
    /// null when completed or more than 30 years out
    pub suggested_deadline: Option<NaiveDate>,
    pub note: Option<String>,
}

/// One goal in the goals dashboard response.
#[derive(Debug, Serialize)]
pub struct GoalResponse {
    pub id: Uuid,
    pub name: String,
    pub target_amount_cents: i64,
    pub current_amount_cents: i64,
    pub deadline: Option<NaiveDate>,
    pub priority: String,
    pub created_at: DateTime<Utc>,
    pub completed: bool,
    pub progress_percent: f64,
    pub projection: GoalProjection,
}

/// Response body for `GET /api/v1/goals`.
///
/// Mirrors the savings dashboard: all goals with projections, overall
/// progress, and the two balances produced by the rollover pass.
#[derive(Debug, Serialize)]
pub struct GoalsDashboardResponse {
    pub goals: Vec<GoalResponse>,
    pub total_goals: i64,
    pub total_target_cents: i64,
    pub total_current_cents: i64,
    pub overall_progress_percent: f64,
    /// Surplus left over after allocation (the tracker balance)
    pub accumulated_balance_cents: i64,
    /// Current (incomplete) month's surplus, not yet rolled over
    pub current_balance_cents: i64,
}

/// Response for goal deletions that refund allocations to the tracker.
#[derive(Debug, Serialize)]
pub struct GoalDeleteResponse {
    pub deleted: i64,
    pub refunded_cents: i64,
}
