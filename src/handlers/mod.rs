//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Performs business logic (database queries, validation)
//! 3. Returns HTTP response (JSON, status code)

/// Registration, login and logout endpoints
pub mod auth;
/// Income CRUD endpoints
pub mod incomes;
/// Expense CRUD endpoints
pub mod expenses;
/// Recurring income/expense endpoints
pub mod recurring;
/// Budget endpoints
pub mod budgets;
/// Savings goal endpoints
pub mod goals;
/// Dashboard and chart-series endpoints
pub mod analytics;
/// Category listing and prediction endpoints
pub mod categories;
/// CSV import endpoints
pub mod imports;
/// Budget alert endpoint management
pub mod alerts;
/// Health check endpoint
pub mod health;

use serde::{Deserialize, Serialize};

/// Records shown per listing page.
pub const PAGE_SIZE: i64 = 20;

/// How many page numbers the pagination window spans.
const PAGE_WINDOW: i64 = 5;

/// Query parameters shared by paginated listings.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    /// 1-based page number; defaults to the first page
    pub page: Option<i64>,
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }
}

/// A page of results plus the metadata clients need to render a pager.
///
/// # JSON Example
///
/// ```json
/// {
///   "items": [ ... ],
///   "page": 3,
///   "per_page": 20,
///   "total": 94,
///   "total_pages": 5,
///   "page_window": [1, 2, 3, 4, 5]
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
    /// Up to five page numbers centered on the current page
    pub page_window: Vec<i64>,
}

impl<T> Paginated<T> {
    /// Wrap one page of items with pager metadata.
    pub fn new(items: Vec<T>, page: i64, total: i64) -> Self {
        let total_pages = if total == 0 {
            1
        } else {
            (total + PAGE_SIZE - 1) / PAGE_SIZE
        };
        let page = page.clamp(1, total_pages);

        // Center the window on the current page, shifting at the edges
        let half = PAGE_WINDOW / 2;
        let mut start = (page - half).max(1);
        let end = (start + PAGE_WINDOW - 1).min(total_pages);
        start = (end - PAGE_WINDOW + 1).max(1);

        Self {
            items,
            page,
            per_page: PAGE_SIZE,
            total,
            total_pages,
            page_window: (start..=end).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_centers_on_current_page() {
        let p = Paginated::<i32>::new(vec![], 5, 200); // 10 pages
        assert_eq!(p.page_window, vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn window_clamps_at_the_edges() {
        let p = Paginated::<i32>::new(vec![], 1, 200);
        assert_eq!(p.page_window, vec![1, 2, 3, 4, 5]);
        let p = Paginated::<i32>::new(vec![], 10, 200);
        assert_eq!(p.page_window, vec![6, 7, 8, 9, 10]);
    }

    #[test]
    fn short_lists_get_short_windows() {
        let p = Paginated::<i32>::new(vec![], 1, 45); // 3 pages
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.page_window, vec![1, 2, 3]);
        let empty = Paginated::<i32>::new(vec![], 7, 0);
        assert_eq!(empty.total_pages, 1);
        assert_eq!(empty.page, 1);
    }
}
