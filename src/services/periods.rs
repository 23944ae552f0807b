//! Calendar helpers shared by recurring materialization, analytics and
//! forecasting.
//!
//! All date math is on `chrono::NaiveDate`. Month arithmetic clamps the
//! day of month (Jan 31 + 1 month = Feb 28/29).

use crate::models::recurring::Frequency;
use chrono::{Datelike, Days, Months, NaiveDate};

/// Step a due date forward by one occurrence of `frequency`.
pub fn next_due_date(date: NaiveDate, frequency: Frequency) -> NaiveDate {
    match frequency {
        Frequency::Daily => date + Days::new(1),
        Frequency::Weekly => date + Days::new(7),
        // checked_add_months clamps the day and cannot fail for the
        // date ranges Postgres DATE accepts
        Frequency::Monthly => date.checked_add_months(Months::new(1)).unwrap_or(date),
        Frequency::Yearly => date.checked_add_months(Months::new(12)).unwrap_or(date),
    }
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    // with_day(1) always succeeds
    date.with_day(1).unwrap_or(date)
}

/// Number of days in the month containing `date`.
pub fn days_in_month(date: NaiveDate) -> i64 {
    let start = month_start(date);
    let next = start.checked_add_months(Months::new(1)).unwrap_or(start);
    (next - start).num_days()
}

/// Subtract whole months, clamping the day.
pub fn months_ago(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months)).unwrap_or(date)
}

/// "YYYY-MM" key used for monthly series labels.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// "YYYY-Www" key used for weekly series labels (ISO week).
pub fn week_key(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{:04}-W{:02}", iso.year(), iso.week())
}

/// Generate consecutive "YYYY-MM" labels from the month containing
/// `start` through the month containing `end`.
pub fn month_labels(start: NaiveDate, end: NaiveDate) -> Vec<String> {
    let mut labels = Vec::new();
    let mut current = month_start(start);
    while current <= end {
        labels.push(month_key(current));
        current = current.checked_add_months(Months::new(1)).unwrap_or(current);
        if labels.len() > 1200 {
            // runaway guard for inverted ranges
            break;
        }
    }
    labels
}

/// Generate consecutive ISO week keys covering `start..=end`.
pub fn week_keys(start: NaiveDate, end: NaiveDate) -> Vec<String> {
    let mut keys = Vec::new();
    let mut current = start;
    while current <= end {
        let key = week_key(current);
        if keys.last() != Some(&key) {
            keys.push(key);
        }
        current = current + Days::new(7);
        if keys.len() > 5300 {
            break;
        }
    }
    // make sure the final partial week is covered
    let last = week_key(end);
    if keys.last() != Some(&last) {
        keys.push(last);
    }
    keys
}

/// Named analytics windows accepted as `?view=`.
///
/// `start`/`end` query parameters override the named view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewWindow {
    ThreeMonths,
    SixMonths,
    /// Trailing 12 months; the default
    Monthly,
    TwoYears,
    /// Aggregate by calendar year over all history
    Yearly,
    /// Monthly aggregation over all history
    All,
}

impl ViewWindow {
    pub fn parse(view: &str) -> Self {
        match view {
            "3m" => Self::ThreeMonths,
            "6m" => Self::SixMonths,
            "2y" => Self::TwoYears,
            "yearly" => Self::Yearly,
            "all" => Self::All,
            _ => Self::Monthly,
        }
    }

    /// Window start for views with a bounded lookback, relative to `today`.
    pub fn start_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::ThreeMonths => Some(months_ago(today, 3)),
            Self::SixMonths => Some(months_ago(today, 6)),
            Self::Monthly => Some(months_ago(today, 12)),
            Self::TwoYears => Some(months_ago(today, 24)),
            Self::Yearly | Self::All => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn monthly_step_clamps_day() {
        assert_eq!(
            next_due_date(d(2026, 1, 31), Frequency::Monthly),
            d(2026, 2, 28)
        );
        assert_eq!(
            next_due_date(d(2024, 1, 31), Frequency::Monthly),
            d(2024, 2, 29)
        );
    }

    #[test]
    fn daily_and_weekly_steps() {
        assert_eq!(
            next_due_date(d(2026, 12, 31), Frequency::Daily),
            d(2027, 1, 1)
        );
        assert_eq!(
            next_due_date(d(2026, 8, 28), Frequency::Weekly),
            d(2026, 9, 4)
        );
    }

    #[test]
    fn yearly_step_handles_leap_day() {
        assert_eq!(
            next_due_date(d(2024, 2, 29), Frequency::Yearly),
            d(2025, 2, 28)
        );
    }

    #[test]
    fn month_labels_span_inclusive() {
        let labels = month_labels(d(2025, 11, 15), d(2026, 2, 3));
        assert_eq!(labels, vec!["2025-11", "2025-12", "2026-01", "2026-02"]);
    }

    #[test]
    fn week_keys_cover_partial_weeks() {
        let keys = week_keys(d(2026, 1, 1), d(2026, 1, 20));
        assert!(keys.contains(&"2026-W01".to_string()));
        assert_eq!(keys.last().unwrap(), &week_key(d(2026, 1, 20)));
    }

    #[test]
    fn days_in_month_handles_february() {
        assert_eq!(days_in_month(d(2026, 2, 10)), 28);
        assert_eq!(days_in_month(d(2024, 2, 10)), 29);
        assert_eq!(days_in_month(d(2026, 8, 1)), 31);
    }

    #[test]
    fn view_windows_parse_with_default() {
        assert_eq!(ViewWindow::parse("3m"), ViewWindow::ThreeMonths);
        assert_eq!(ViewWindow::parse("bogus"), ViewWindow::Monthly);
        assert_eq!(
            ViewWindow::Monthly.start_date(d(2026, 8, 29)),
            Some(d(2025, 8, 29))
        );
        assert_eq!(ViewWindow::All.start_date(d(2026, 8, 29)), None);
    }
}
