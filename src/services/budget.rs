//! Budget warning checks.
//!
//! Every expense write runs through here: for each active budget whose
//! categories include the expense's category, produce warnings when the
//! category limit or the budget total is exceeded, and fire a signed
//! alert when this expense is the one that pushed the total past 100%.

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        alert::BudgetExceededData,
        budget::{Budget, BudgetCategory, BudgetCategoryStatus, BudgetResponse},
        expense::Expense,
    },
    services::alerts,
};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

/// Category spending limit: `percent`% of the budget total.
pub fn category_limit_cents(total_amount_cents: i64, percent: i32) -> i64 {
    total_amount_cents * i64::from(percent) / 100
}

/// Did this expense push the total over the limit (as opposed to the
/// total already being over it)?
pub fn crossed_limit(new_total: i64, expense_amount: i64, limit: i64) -> bool {
    let previous = (new_total - expense_amount).max(0);
    previous <= limit && new_total > limit
}

/// Sum of the user's expenses in `category` within `[start, end]`.
async fn spent_in_category(
    pool: &DbPool,
    user_id: Uuid,
    category: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<i64, AppError> {
    let spent: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(amount_cents), 0)
        FROM expenses
        WHERE user_id = $1 AND category = $2 AND date >= $3 AND date <= $4
        "#,
    )
    .bind(user_id)
    .bind(category)
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;
    Ok(spent)
}

/// Budgets active on `today` that allocate `category`.
async fn active_budgets_for_category(
    pool: &DbPool,
    user_id: Uuid,
    category: &str,
    today: NaiveDate,
) -> Result<Vec<(Budget, i32)>, AppError> {
    let rows: Vec<(Uuid, i32)> = sqlx::query_as(
        r#"
        SELECT b.id, bc.percent
        FROM budgets b
        JOIN budget_categories bc ON bc.budget_id = b.id
        WHERE b.user_id = $1 AND bc.category = $2
          AND b.start_date <= $3 AND b.end_date >= $3
        "#,
    )
    .bind(user_id)
    .bind(category)
    .bind(today)
    .fetch_all(pool)
    .await?;

    let mut out = Vec::with_capacity(rows.len());
    for (budget_id, percent) in rows {
        let budget = sqlx::query_as::<_, Budget>("SELECT * FROM budgets WHERE id = $1")
            .bind(budget_id)
            .fetch_one(pool)
            .await?;
        out.push((budget, percent));
    }
    Ok(out)
}

/// Total spend across all of a budget's categories within its range.
async fn budget_total_spent(
    pool: &DbPool,
    user_id: Uuid,
    budget: &Budget,
) -> Result<i64, AppError> {
    let spent: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(e.amount_cents), 0)
        FROM expenses e
        JOIN budget_categories bc ON bc.category = e.category AND bc.budget_id = $2
        WHERE e.user_id = $1 AND e.date >= $3 AND e.date <= $4
        "#,
    )
    .bind(user_id)
    .bind(budget.id)
    .bind(budget.start_date)
    .bind(budget.end_date)
    .fetch_one(pool)
    .await?;
    Ok(spent)
}

/// Run budget checks for a just-written expense.
///
/// # Returns
///
/// Human-readable warnings to surface in the write response. When the
/// expense crosses a budget's total from under to over 100%, a signed
/// alert is dispatched to the user's endpoints; alert failures are
/// logged and never fail the expense.
pub async fn check_budget_warnings(
    pool: &DbPool,
    user_id: Uuid,
    expense: &Expense,
    today: NaiveDate,
) -> Result<Vec<String>, AppError> {
    let mut warnings = Vec::new();

    for (budget, percent) in
        active_budgets_for_category(pool, user_id, &expense.category, today).await?
    {
        let spent = spent_in_category(
            pool,
            user_id,
            &expense.category,
            budget.start_date,
            budget.end_date,
        )
        .await?;
        let limit = category_limit_cents(budget.total_amount_cents, percent);

        if spent > limit {
            warnings.push(format!(
                "You have exceeded the limit for category '{}' in budget '{}'. Spent: {}, Limit: {}",
                expense.category, budget.name, spent, limit
            ));
        }

        let total_spent = budget_total_spent(pool, user_id, &budget).await?;
        if total_spent > budget.total_amount_cents {
            warnings.push(format!(
                "Your total spending ({}) exceeded the budget '{}' limit ({})!",
                total_spent, budget.name, budget.total_amount_cents
            ));
        }

        if crossed_limit(total_spent, expense.amount_cents, budget.total_amount_cents) {
            let data = BudgetExceededData {
                budget_id: budget.id,
                budget_name: budget.name.clone(),
                limit_cents: budget.total_amount_cents,
                previous_total_cents: (total_spent - expense.amount_cents).max(0),
                new_total_cents: total_spent,
                expense_name: expense.name.clone(),
                expense_amount_cents: expense.amount_cents,
                expense_category: expense.category.clone(),
            };
            if let Err(e) = alerts::notify_budget_exceeded(pool, user_id, &data).await {
                tracing::error!("Failed to dispatch budget alert: {:?}", e);
            }
        }
    }

    Ok(warnings)
}

/// Assemble the API view of a budget with live per-category spend.
pub async fn budget_response(
    pool: &DbPool,
    user_id: Uuid,
    budget: Budget,
) -> Result<BudgetResponse, AppError> {
    let categories = sqlx::query_as::<_, BudgetCategory>(
        "SELECT * FROM budget_categories WHERE budget_id = $1 ORDER BY category",
    )
    .bind(budget.id)
    .fetch_all(pool)
    .await?;

    let mut statuses = Vec::with_capacity(categories.len());
    let mut total_spent = 0i64;
    for cat in categories {
        let spent = spent_in_category(
            pool,
            user_id,
            &cat.category,
            budget.start_date,
            budget.end_date,
        )
        .await?;
        total_spent += spent;
        statuses.push(BudgetCategoryStatus {
            limit_cents: cat.limit_cents(budget.total_amount_cents),
            category: cat.category,
            percent: cat.percent,
            spent_cents: spent,
        });
    }

    let today = Utc::now().date_naive();
    Ok(BudgetResponse {
        id: budget.id,
        name: budget.name,
        total_amount_cents: budget.total_amount_cents,
        start_date: budget.start_date,
        end_date: budget.end_date,
        created_at: budget.created_at,
        is_active: budget.start_date <= today && today <= budget.end_date,
        categories: statuses,
        total_spent_cents: total_spent,
    })
}

/// Category-level warnings only, used after CSV imports where a single
/// summary check per category replaces per-row checks.
pub async fn category_status_warnings(
    pool: &DbPool,
    user_id: Uuid,
    category: &str,
    today: NaiveDate,
) -> Result<Vec<String>, AppError> {
    let mut warnings = Vec::new();
    for (budget, percent) in active_budgets_for_category(pool, user_id, category, today).await? {
        let spent =
            spent_in_category(pool, user_id, category, budget.start_date, budget.end_date).await?;
        let limit = category_limit_cents(budget.total_amount_cents, percent);
        if spent > limit {
            warnings.push(format!(
                "You have exceeded the limit for category '{}' in budget '{}'. Spent: {}, Limit: {}",
                category, budget.name, spent, limit
            ));
        }
    }
    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_percent_of_total() {
        assert_eq!(category_limit_cents(200_000, 40), 80_000);
        assert_eq!(category_limit_cents(99, 50), 49);
    }

    #[test]
    fn crossing_fires_only_on_the_crossing_expense() {
        // under -> over: crossing
        assert!(crossed_limit(105, 10, 100));
        // already over before this expense: no crossing
        assert!(!crossed_limit(120, 10, 100));
        // still under: no crossing
        assert!(!crossed_limit(90, 10, 100));
        // first expense blows through the limit by itself
        assert!(crossed_limit(150, 150, 100));
    }
}
