//! Monthly surplus accounting, goal allocation and goal projections.
//!
//! The surplus of a month is its income minus its expenses, floored at
//! zero. Complete months roll their surplus into savings goals; the
//! current month's surplus is the headroom new expenses must fit into
//! (the monthly surplus rule).

use crate::{
    db::DbPool,
    error::AppError,
    models::goal::{GoalProjection, Priority, SavingsGoal},
};
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use uuid::Uuid;

/// Display messages for goal projections that cannot be numeric.
pub const MSG_DEADLINE_PASSED: &str = "Deadline passed, please extend the deadline";
pub const MSG_DEADLINE_THIS_MONTH: &str = "Unable to meet deadline this month";
pub const MSG_MORE_THAN_30_YEARS: &str = "More than 30 years";
pub const MSG_NO_SURPLUS: &str = "No monthly surplus to project from";

/// Suggested deadlines further out than this are replaced by a message.
const MAX_DISPLAY_YEARS: u32 = 30;

/// Income minus expenses for the month containing `date`, floored at zero.
pub async fn monthly_surplus(
    pool: &DbPool,
    user_id: Uuid,
    date: NaiveDate,
) -> Result<i64, AppError> {
    let start = super::periods::month_start(date);
    let end = start.checked_add_months(Months::new(1)).unwrap_or(start);

    let income: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM incomes WHERE user_id = $1 AND date >= $2 AND date < $3",
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;

    let expense: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM expenses WHERE user_id = $1 AND date >= $2 AND date < $3",
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;

    Ok((income - expense).max(0))
}

/// A goal as seen by the pure allocator.
#[derive(Debug, Clone)]
pub struct GoalSlot {
    pub id: Uuid,
    pub target_cents: i64,
    pub deadline: Option<NaiveDate>,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

impl GoalSlot {
    fn from_goal(goal: &SavingsGoal) -> Self {
        Self {
            id: goal.id,
            target_cents: goal.target_amount_cents,
            deadline: goal.deadline,
            priority: Priority::from_str(&goal.priority).unwrap_or(Priority::Low),
            created_at: goal.created_at,
        }
    }
}

/// Result of distributing a surplus across goals.
#[derive(Debug, PartialEq, Eq)]
pub struct Allocation {
    /// (goal id, allocated cents), in allocation order
    pub per_goal: Vec<(Uuid, i64)>,
    /// Surplus left after every goal is capped at its target
    pub leftover_cents: i64,
}

/// Sort goals into allocation order: earliest deadline first (missing
/// deadlines last), then priority High < Medium < Low, then creation
/// time, then id.
pub fn sort_for_allocation(goals: &mut [GoalSlot]) {
    goals.sort_by(|a, b| {
        let da = a.deadline.unwrap_or(NaiveDate::MAX);
        let db = b.deadline.unwrap_or(NaiveDate::MAX);
        da.cmp(&db)
            .then(a.priority.rank().cmp(&b.priority.rank()))
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
}

/// Distribute `total_cents` across already-sorted goals, capping each
/// at its target.
pub fn allocate_surplus(goals: &[GoalSlot], total_cents: i64) -> Allocation {
    let mut remaining = total_cents.max(0);
    let mut per_goal = Vec::with_capacity(goals.len());
    for goal in goals {
        // exhausted surplus still yields explicit zero allocations
        let allocation = remaining.min(goal.target_cents);
        per_goal.push((goal.id, allocation));
        remaining -= allocation;
    }
    Allocation {
        per_goal,
        leftover_cents: remaining,
    }
}

/// Balances produced by a rollover or reallocation pass.
#[derive(Debug)]
pub struct SurplusBalances {
    /// Unallocated surplus now held by the tracker
    pub accumulated_cents: i64,
    /// The current (incomplete) month's surplus
    pub current_cents: i64,
}

/// Roll every complete month's surplus into savings goals.
///
/// # Process
///
/// 1. Sum the per-month surplus (floored at zero) from the month of the
///    first income up to, but not including, the current month
/// 2. Reset all goal allocations to zero
/// 3. Allocate from scratch to goals whose deadline has not passed,
///    in allocation order, capping each at its target
/// 4. Store the leftover in the surplus tracker
pub async fn rollover(
    pool: &DbPool,
    user_id: Uuid,
    today: NaiveDate,
) -> Result<SurplusBalances, AppError> {
    let current_month = super::periods::month_start(today);

    let first_income_date: Option<NaiveDate> =
        sqlx::query_scalar("SELECT MIN(date) FROM incomes WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

    let mut total = 0i64;
    if let Some(first) = first_income_date {
        let mut cursor = super::periods::month_start(first);
        while cursor < current_month {
            total += monthly_surplus(pool, user_id, cursor).await?;
            cursor = cursor.checked_add_months(Months::new(1)).unwrap_or(cursor);
        }
    }

    let goals = sqlx::query_as::<_, SavingsGoal>(
        "SELECT * FROM savings_goals WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    // Only goals whose deadline has not passed receive allocations
    let mut slots: Vec<GoalSlot> = goals
        .iter()
        .filter(|g| g.deadline.is_some_and(|d| d >= today))
        .map(GoalSlot::from_goal)
        .collect();
    sort_for_allocation(&mut slots);
    let allocation = allocate_surplus(&slots, total);

    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE savings_goals SET current_amount_cents = 0 WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    for (goal_id, cents) in &allocation.per_goal {
        if *cents > 0 {
            sqlx::query(
                "UPDATE savings_goals SET current_amount_cents = $1 WHERE id = $2 AND user_id = $3",
            )
            .bind(cents)
            .bind(goal_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }
    }

    sqlx::query(
        r#"
        INSERT INTO surplus_trackers (user_id, last_surplus_cents)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET last_surplus_cents = $2
        "#,
    )
    .bind(user_id)
    .bind(allocation.leftover_cents)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let current = monthly_surplus(pool, user_id, today).await?;
    Ok(SurplusBalances {
        accumulated_cents: allocation.leftover_cents,
        current_cents: current,
    })
}

/// Redistribute tracker balance + all existing allocations after a goal
/// is created or updated.
///
/// Unlike the rollover pass this considers every goal, treating a
/// missing deadline as infinitely far out.
pub async fn reallocate(pool: &DbPool, user_id: Uuid) -> Result<(), AppError> {
    let tracker_balance: i64 = sqlx::query_scalar(
        "SELECT COALESCE((SELECT last_surplus_cents FROM surplus_trackers WHERE user_id = $1), 0)",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    let allocated: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(current_amount_cents), 0) FROM savings_goals WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    let total = tracker_balance + allocated;

    let goals =
        sqlx::query_as::<_, SavingsGoal>("SELECT * FROM savings_goals WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(pool)
            .await?;

    let mut slots: Vec<GoalSlot> = goals.iter().map(GoalSlot::from_goal).collect();
    sort_for_allocation(&mut slots);
    let allocation = allocate_surplus(&slots, total);

    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE savings_goals SET current_amount_cents = 0 WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    for (goal_id, cents) in &allocation.per_goal {
        if *cents > 0 {
            sqlx::query(
                "UPDATE savings_goals SET current_amount_cents = $1 WHERE id = $2 AND user_id = $3",
            )
            .bind(cents)
            .bind(goal_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }
    }

    sqlx::query(
        r#"
        INSERT INTO surplus_trackers (user_id, last_surplus_cents)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET last_surplus_cents = $2
        "#,
    )
    .bind(user_id)
    .bind(allocation.leftover_cents)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Average surplus of the last up to six complete months, clipped to
/// the user's history so empty months before their first income don't
/// drag the average down.
pub async fn average_monthly_surplus(
    pool: &DbPool,
    user_id: Uuid,
    today: NaiveDate,
) -> Result<i64, AppError> {
    let first_income: Option<NaiveDate> =
        sqlx::query_scalar("SELECT MIN(date) FROM incomes WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    let Some(first) = first_income else {
        return Ok(0);
    };
    let first_month = super::periods::month_start(first);
    let current_month = super::periods::month_start(today);

    let months = months_to_average(current_month, first_month);
    if months.is_empty() {
        return Ok(0);
    }
    let mut total = 0i64;
    for month in &months {
        total += monthly_surplus(pool, user_id, *month).await?;
    }
    Ok(total / months.len() as i64)
}

/// Trailing complete months to average, clipped to the first month
/// with any income.
fn months_to_average(current_month: NaiveDate, first_month: NaiveDate) -> Vec<NaiveDate> {
    (1..=6u32)
        .map(|back| super::periods::months_ago(current_month, back))
        .filter(|month| *month >= first_month)
        .collect()
}

/// Project a goal's completion odds and a suggested deadline.
///
/// Numeric probability requires a live deadline and a positive average
/// surplus; the edge cases produce display messages instead.
pub fn project_goal(
    goal: &SavingsGoal,
    avg_monthly_surplus_cents: i64,
    today: NaiveDate,
) -> GoalProjection {
    if goal.is_completed() {
        return GoalProjection {
            probability: None,
            suggested_deadline: None,
            note: None,
        };
    }

    if let Some(deadline) = goal.deadline {
        if deadline < today {
            return GoalProjection {
                probability: None,
                suggested_deadline: suggested_deadline(goal, avg_monthly_surplus_cents, today).0,
                note: Some(MSG_DEADLINE_PASSED.to_string()),
            };
        }
        if deadline.year() == today.year() && deadline.month() == today.month() {
            return GoalProjection {
                probability: None,
                suggested_deadline: suggested_deadline(goal, avg_monthly_surplus_cents, today).0,
                note: Some(MSG_DEADLINE_THIS_MONTH.to_string()),
            };
        }
    }

    if avg_monthly_surplus_cents <= 0 {
        return GoalProjection {
            probability: None,
            suggested_deadline: None,
            note: Some(MSG_NO_SURPLUS.to_string()),
        };
    }

    let needed = goal.target_amount_cents - goal.current_amount_cents;
    let probability = goal.deadline.map(|deadline| {
        let months_remaining = months_between(today, deadline).max(0);
        let expected = avg_monthly_surplus_cents.saturating_mul(months_remaining);
        let pct = expected as f64 / needed as f64 * 100.0;
        (pct.min(100.0) * 100.0).round() / 100.0
    });

    let (suggested, note) = suggested_deadline(goal, avg_monthly_surplus_cents, today);
    GoalProjection {
        probability,
        suggested_deadline: suggested,
        note,
    }
}

/// Date by which the goal would complete at the average surplus rate,
/// capped at 30 years out.
fn suggested_deadline(
    goal: &SavingsGoal,
    avg_monthly_surplus_cents: i64,
    today: NaiveDate,
) -> (Option<NaiveDate>, Option<String>) {
    if avg_monthly_surplus_cents <= 0 {
        return (None, Some(MSG_NO_SURPLUS.to_string()));
    }
    let needed = goal.target_amount_cents - goal.current_amount_cents;
    let months_needed = ((needed + avg_monthly_surplus_cents - 1) / avg_monthly_surplus_cents).max(1);
    if months_needed > i64::from(MAX_DISPLAY_YEARS) * 12 {
        return (None, Some(MSG_MORE_THAN_30_YEARS.to_string()));
    }
    let date = today
        .checked_add_months(Months::new(months_needed as u32))
        .unwrap_or(today);
    (Some(date), None)
}

/// Whole months from `from` to `to` (0 when `to` is in the same month).
fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    i64::from(to.year() - from.year()) * 12 + i64::from(to.month() as i32 - from.month() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn slot(target: i64, deadline: Option<NaiveDate>, priority: Priority, created_s: i64) -> GoalSlot {
        GoalSlot {
            id: Uuid::new_v4(),
            target_cents: target,
            deadline,
            priority,
            created_at: Utc.timestamp_opt(created_s, 0).unwrap(),
        }
    }

    #[test]
    fn surplus_fills_goals_in_order_and_caps_at_target() {
        let deadline = Some(d(2026, 12, 31));
        let goals = vec![
            slot(2000, deadline, Priority::Medium, 1),
            slot(5000, deadline, Priority::Medium, 2),
            slot(3000, deadline, Priority::Medium, 3),
        ];
        let result = allocate_surplus(&goals, 8000);
        assert_eq!(result.per_goal[0].1, 2000);
        assert_eq!(result.per_goal[1].1, 5000);
        assert_eq!(result.per_goal[2].1, 1000);
        assert_eq!(result.leftover_cents, 0);
    }

    #[test]
    fn surplus_leftover_goes_unallocated() {
        let deadline = Some(d(2026, 12, 31));
        let goals = vec![
            slot(2000, deadline, Priority::Medium, 1),
            slot(5000, deadline, Priority::Medium, 2),
        ];
        let result = allocate_surplus(&goals, 11000);
        assert_eq!(result.per_goal[0].1, 2000);
        assert_eq!(result.per_goal[1].1, 5000);
        assert_eq!(result.leftover_cents, 4000);
    }

    #[test]
    fn allocation_order_prefers_deadline_then_priority() {
        let mut goals = vec![
            slot(1000, Some(d(2027, 1, 1)), Priority::High, 1),
            slot(1000, Some(d(2026, 10, 1)), Priority::Low, 2),
            slot(1000, Some(d(2026, 10, 1)), Priority::High, 3),
            slot(1000, None, Priority::High, 4),
        ];
        sort_for_allocation(&mut goals);
        // earliest deadline wins; High beats Low on ties; no deadline last
        assert_eq!(goals[0].deadline, Some(d(2026, 10, 1)));
        assert_eq!(goals[0].priority, Priority::High);
        assert_eq!(goals[1].priority, Priority::Low);
        assert_eq!(goals[2].deadline, Some(d(2027, 1, 1)));
        assert_eq!(goals[3].deadline, None);
    }

    fn goal(target: i64, current: i64, deadline: Option<NaiveDate>) -> SavingsGoal {
        SavingsGoal {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "goal".into(),
            target_amount_cents: target,
            current_amount_cents: current,
            deadline,
            priority: "Medium".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn completed_goal_projects_nothing() {
        let g = goal(1000, 1000, Some(d(2026, 12, 1)));
        let p = project_goal(&g, 500, d(2026, 8, 29));
        assert_eq!(p.probability, None);
        assert_eq!(p.note, None);
    }

    #[test]
    fn passed_deadline_gets_message() {
        let g = goal(1000, 0, Some(d(2026, 1, 1)));
        let p = project_goal(&g, 500, d(2026, 8, 29));
        assert_eq!(p.note.as_deref(), Some(MSG_DEADLINE_PASSED));
        assert!(p.suggested_deadline.is_some());
    }

    #[test]
    fn deadline_this_month_gets_message() {
        let g = goal(1000, 0, Some(d(2026, 8, 31)));
        let p = project_goal(&g, 500, d(2026, 8, 29));
        assert_eq!(p.note.as_deref(), Some(MSG_DEADLINE_THIS_MONTH));
    }

    #[test]
    fn probability_caps_at_100() {
        // 10 months out, needs 1000, saves 500/month -> easily done
        let g = goal(1000, 0, Some(d(2027, 6, 15)));
        let p = project_goal(&g, 500, d(2026, 8, 29));
        assert_eq!(p.probability, Some(100.0));
    }

    #[test]
    fn probability_scales_with_shortfall() {
        // 2 months out, needs 1000, saves 250/month -> 50%
        let g = goal(1000, 0, Some(d(2026, 10, 29)));
        let p = project_goal(&g, 250, d(2026, 8, 29));
        assert_eq!(p.probability, Some(50.0));
    }

    #[test]
    fn distant_completion_becomes_message() {
        let g = goal(100_000_000, 0, Some(d(2027, 6, 15)));
        let p = project_goal(&g, 1, d(2026, 8, 29));
        assert_eq!(p.note.as_deref(), Some(MSG_MORE_THAN_30_YEARS));
        assert_eq!(p.suggested_deadline, None);
    }

    #[test]
    fn average_window_clips_to_first_income_month() {
        // two months of history: only those two count toward the average
        let months = months_to_average(d(2026, 8, 1), d(2026, 6, 1));
        assert_eq!(months, vec![d(2026, 7, 1), d(2026, 6, 1)]);
        // long history: the full six-month window applies
        let months = months_to_average(d(2026, 8, 1), d(2024, 1, 1));
        assert_eq!(months.len(), 6);
        // first income this month: no complete months yet
        assert!(months_to_average(d(2026, 8, 1), d(2026, 8, 1)).is_empty());
    }

    #[test]
    fn suggested_deadline_rounds_partial_months_up() {
        // needs 1000 at 300/month: 4 months, not 3
        let g = goal(1000, 0, None);
        let (date, note) = suggested_deadline(&g, 300, d(2026, 8, 29));
        assert_eq!(date, Some(d(2026, 12, 29)));
        assert_eq!(note, None);
    }

    #[test]
    fn no_surplus_no_projection() {
        let g = goal(1000, 0, Some(d(2027, 6, 15)));
        let p = project_goal(&g, 0, d(2026, 8, 29));
        assert_eq!(p.note.as_deref(), Some(MSG_NO_SURPLUS));
    }
}
