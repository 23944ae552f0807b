//! CSV import for incomes, expenses, and raw bank statements.
//!
//! Uploads arrive as raw CSV text. Headers are sniffed and normalized
//! onto canonical fields; bad rows are skipped, never aborting the
//! import. Bank statements get their own endpoint with debit/credit
//! column detection; a statement uploaded to the plain income/expense
//! endpoints is rejected with a pointer to the right one.

use crate::{
    db::DbPool,
    error::AppError,
    models::expense::Expense,
    services::{budget, classify, surplus},
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Upload size cap for income/expense CSVs (1 MiB).
pub const MAX_CSV_BYTES: usize = 1_048_576;

/// Upload size cap for bank statements (1.5 MiB).
pub const MAX_STATEMENT_BYTES: usize = 1_572_864;

/// Descriptions are truncated to this length on import.
const MAX_DESCRIPTION_LEN: usize = 100;

/// Result of an income or expense CSV import.
#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub imported: u32,
    pub skipped: u32,
    pub warnings: Vec<String>,
}

/// Result of a bank statement import.
#[derive(Debug, Serialize)]
pub struct StatementSummary {
    pub imported_income: u32,
    pub imported_expense: u32,
    pub skipped: u32,
    pub warnings: Vec<String>,
}

/// Map one raw header onto a canonical field name.
fn canonical_field(header: &str) -> Option<&'static str> {
    let h = header.trim().to_lowercase();
    match h.as_str() {
        "date" | "transaction date" | "txn date" | "value date" | "posting date" => Some("date"),
        "amount" | "value" | "amt" => Some("amount"),
        "source" | "payer" | "from" | "income source" => Some("source"),
        "name" | "payee" | "merchant" | "expense" | "expense name" | "title" => Some("name"),
        "category" | "type" | "tag" => Some("category"),
        "description" | "details" | "narration" | "memo" | "remarks" | "particulars" => {
            Some("description")
        }
        _ => None,
    }
}

/// Normalize headers into canonical-field -> column-index.
///
/// First matching column wins for each field.
pub fn normalize_headers(headers: &[&str]) -> HashMap<&'static str, usize> {
    let mut map = HashMap::new();
    for (idx, header) in headers.iter().enumerate() {
        if let Some(field) = canonical_field(header) {
            map.entry(field).or_insert(idx);
        }
    }
    map
}

/// Heuristic: does this header row look like a real bank statement?
pub fn is_bank_statement(headers: &[&str]) -> bool {
    headers.iter().any(|h| {
        let h = h.to_lowercase();
        h.contains("debit")
            || h.contains("credit")
            || h.contains("withdrawal")
            || h.contains("deposit")
            || h.contains("balance")
    })
}

/// Parse a date from the formats bank exports actually use.
///
/// ISO first, then day-first, then month-first.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    const FORMATS: &[&str] = &[
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%d/%m/%Y",
        "%m/%d/%Y",
        "%d-%m-%Y",
        "%d.%m.%Y",
        "%d %b %Y",
        "%d %B %Y",
        "%b %d, %Y",
        "%d/%m/%y",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Strip currency symbols/commas out of an amount and convert to cents,
/// rounding half-up at two decimal places.
pub fn clean_amount_cents(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };
    // a second minus sign anywhere means garbage
    if digits.contains('-') || digits.is_empty() || digits == "." {
        return None;
    }

    let mut parts = digits.splitn(2, '.');
    let int_part = parts.next().unwrap_or("");
    let frac_part = parts.next().unwrap_or("");
    // more than one decimal point
    if frac_part.contains('.') {
        return None;
    }

    let whole: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().ok()?
    };

    let mut frac_digits = frac_part.chars();
    let d1 = frac_digits.next().and_then(|c| c.to_digit(10)).unwrap_or(0) as i64;
    let d2 = frac_digits.next().and_then(|c| c.to_digit(10)).unwrap_or(0) as i64;
    let d3 = frac_digits.next().and_then(|c| c.to_digit(10)).unwrap_or(0) as i64;

    let mut cents = whole.checked_mul(100)?.checked_add(d1 * 10 + d2)?;
    if d3 >= 5 {
        cents = cents.checked_add(1)?;
    }
    Some(if negative { -cents } else { cents })
}

/// Trim a value, substituting `default` when empty.
fn clean_value(raw: Option<&str>, default: &str) -> String {
    let trimmed = raw.unwrap_or("").trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.chars().take(MAX_DESCRIPTION_LEN).collect()
    }
}

/// Parse CSV text and return (headers, rows).
fn read_csv(csv_text: &str) -> Result<(Vec<String>, Vec<csv::StringRecord>), AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(csv_text.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::InvalidCsv(format!("Could not read CSV headers: {}", e)))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.is_empty() {
        return Err(AppError::InvalidCsv("CSV has no headers".to_string()));
    }
    let mut rows = Vec::new();
    for record in reader.records() {
        match record {
            Ok(row) => rows.push(row),
            // malformed rows are skipped, not fatal
            Err(e) => tracing::warn!("Skipped malformed CSV row: {}", e),
        }
    }
    Ok((headers, rows))
}

fn field<'a>(
    row: &'a csv::StringRecord,
    map: &HashMap<&'static str, usize>,
    name: &str,
) -> Option<&'a str> {
    map.get(name).and_then(|idx| row.get(*idx))
}

/// Import an income CSV.
///
/// # Required columns
///
/// date, source, amount (after header normalization)
///
/// # Row handling
///
/// - Unparseable dates or zero/garbage amounts skip the row
/// - Missing categories are normalized from the raw label or predicted
///   from the source text
pub async fn import_incomes(
    pool: &DbPool,
    user_id: Uuid,
    csv_text: &str,
) -> Result<ImportSummary, AppError> {
    if csv_text.len() > MAX_CSV_BYTES {
        return Err(AppError::InvalidCsv(
            "File too large! Please upload a CSV under 1 MB.".to_string(),
        ));
    }
    let (headers, rows) = read_csv(csv_text)?;
    let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();

    if is_bank_statement(&header_refs) {
        return Err(AppError::InvalidCsv(
            "This appears to be a real bank statement. Please upload it via /api/v1/imports/bank-statement.".to_string(),
        ));
    }

    let map = normalize_headers(&header_refs);
    let missing: Vec<&str> = ["date", "source", "amount"]
        .into_iter()
        .filter(|f| !map.contains_key(f))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::InvalidCsv(format!(
            "CSV missing required fields: {}",
            missing.join(", ")
        )));
    }

    let mut imported = 0u32;
    let mut skipped = 0u32;

    for row in &rows {
        let date = field(row, &map, "date").and_then(normalize_date);
        let source = clean_value(field(row, &map, "source"), "Unknown Income");
        let amount = field(row, &map, "amount").and_then(clean_amount_cents);

        let (Some(date), Some(amount)) = (date, amount) else {
            skipped += 1;
            continue;
        };
        if amount <= 0 {
            skipped += 1;
            continue;
        }

        let raw_category = field(row, &map, "category").unwrap_or("").trim();
        let category = if raw_category.is_empty() {
            classify::predict_income_category(&source)
        } else {
            classify::normalize_income_category(raw_category)
        };

        sqlx::query(
            "INSERT INTO incomes (user_id, source, amount_cents, category, date) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user_id)
        .bind(&source)
        .bind(amount)
        .bind(&category)
        .bind(date)
        .execute(pool)
        .await?;
        imported += 1;
    }

    let mut warnings = Vec::new();
    if imported == 0 {
        warnings.push("No incomes were imported. All rows were skipped due to validation.".to_string());
    }
    Ok(ImportSummary {
        imported,
        skipped,
        warnings,
    })
}

/// Import an expense CSV.
///
/// Same shape as income import plus the monthly surplus rule: rows the
/// month's income cannot cover are skipped. Budget warnings for every
/// affected category are collected at the end.
pub async fn import_expenses(
    pool: &DbPool,
    user_id: Uuid,
    csv_text: &str,
    today: NaiveDate,
) -> Result<ImportSummary, AppError> {
    if csv_text.len() > MAX_CSV_BYTES {
        return Err(AppError::InvalidCsv(
            "File too large! Please upload a CSV under 1 MB.".to_string(),
        ));
    }
    let (headers, rows) = read_csv(csv_text)?;
    let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();

    if is_bank_statement(&header_refs) {
        return Err(AppError::InvalidCsv(
            "This appears to be a real bank statement. Please upload it via /api/v1/imports/bank-statement.".to_string(),
        ));
    }

    let map = normalize_headers(&header_refs);
    let missing: Vec<&str> = ["date", "name", "amount"]
        .into_iter()
        .filter(|f| !map.contains_key(f))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::InvalidCsv(format!(
            "CSV missing required fields: {}",
            missing.join(", ")
        )));
    }

    let mut imported = 0u32;
    let mut skipped = 0u32;
    let mut affected_categories = HashSet::new();

    for row in &rows {
        let date = field(row, &map, "date").and_then(normalize_date);
        let name = clean_value(field(row, &map, "name"), "Unknown Expense");
        let amount = field(row, &map, "amount").and_then(clean_amount_cents);

        let (Some(date), Some(amount)) = (date, amount) else {
            skipped += 1;
            continue;
        };
        if amount <= 0 {
            skipped += 1;
            continue;
        }

        // monthly surplus rule
        let available = surplus::monthly_surplus(pool, user_id, date).await?;
        if available < amount {
            skipped += 1;
            continue;
        }

        let raw_category = field(row, &map, "category").unwrap_or("").trim();
        let category = if raw_category.is_empty() {
            classify::predict_expense_category(&name)
        } else {
            classify::normalize_expense_category(raw_category)
        };

        sqlx::query(
            "INSERT INTO expenses (user_id, name, amount_cents, category, date) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user_id)
        .bind(&name)
        .bind(amount)
        .bind(&category)
        .bind(date)
        .execute(pool)
        .await?;
        imported += 1;
        affected_categories.insert(category);
    }

    let mut warnings = Vec::new();
    if imported == 0 {
        warnings.push(
            "No expenses were imported. All rows were skipped due to month-level income validation."
                .to_string(),
        );
    } else {
        // one summary check per category touched by the import
        for category in &affected_categories {
            let check = budget::category_status_warnings(pool, user_id, category, today).await?;
            warnings.extend(check);
        }
    }

    Ok(ImportSummary {
        imported,
        skipped,
        warnings,
    })
}

/// Columns detected in a bank statement by header sniffing.
#[derive(Debug)]
pub struct StatementColumns {
    pub date: usize,
    pub debit: Option<usize>,
    pub credit: Option<usize>,
    pub withdrawal: Option<usize>,
    pub deposit: Option<usize>,
    pub amount: Option<usize>,
    pub txn_type: Option<usize>,
    pub description: Option<usize>,
}

/// Sniff statement columns from raw headers. `None` when no date
/// column can be found (not a statement we can read).
pub fn find_statement_columns(headers: &[&str]) -> Option<StatementColumns> {
    let lower: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
    let position = |pred: &dyn Fn(&str) -> bool| lower.iter().position(|h| pred(h));

    let date = normalize_headers(headers)
        .get("date")
        .copied()
        .or_else(|| position(&|h| h.contains("date")))?;

    Some(StatementColumns {
        date,
        debit: position(&|h| h.contains("debit") || h.contains("(dr")),
        credit: position(&|h| h.contains("credit") || h.contains("(cr")),
        withdrawal: position(&|h| h.contains("withdrawal")),
        deposit: position(&|h| h.contains("deposit")),
        amount: position(&|h| h.contains("amount")),
        txn_type: position(&|h| h.contains("type")),
        description: position(&|h| {
            h.contains("description")
                || h.contains("details")
                || h.contains("narration")
                || h.contains("memo")
                || h.contains("remarks")
        }),
    })
}

/// Which side of the ledger a statement row lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Income,
    Expense,
}

/// A statement row reduced to the fields we store.
#[derive(Debug, PartialEq, Eq)]
pub struct StatementRow {
    pub kind: StatementKind,
    pub date: NaiveDate,
    pub amount_cents: i64,
    pub description: String,
}

/// Classify one statement row.
///
/// Column precedence mirrors the variety of real statement exports:
/// explicit debit/credit columns first, then withdrawal/deposit, then a
/// shared amount column disambiguated by a type column (CR/CREDIT means
/// income). Rows without a date or a positive amount return `None`.
pub fn classify_statement_row(
    row: &csv::StringRecord,
    cols: &StatementColumns,
) -> Option<StatementRow> {
    let date = row.get(cols.date).and_then(normalize_date)?;

    let get = |idx: Option<usize>| idx.and_then(|i| row.get(i)).map(str::trim).filter(|v| !v.is_empty());

    let description = get(cols.description)
        .map(str::to_string)
        .or_else(|| row.iter().find(|v| !v.trim().is_empty()).map(|v| v.trim().to_string()))
        .unwrap_or_default();
    let description: String = description.chars().take(MAX_DESCRIPTION_LEN).collect();

    let (amount, kind) = if let Some(raw) = get(cols.debit) {
        let amount = clean_amount_cents(raw)?;
        // negative debits are reversals, treat as income
        let kind = if amount > 0 {
            StatementKind::Expense
        } else {
            StatementKind::Income
        };
        (amount.abs(), kind)
    } else if let Some(raw) = get(cols.credit) {
        let amount = clean_amount_cents(raw)?;
        let kind = if amount > 0 {
            StatementKind::Income
        } else {
            StatementKind::Expense
        };
        (amount.abs(), kind)
    } else if let Some(raw) = get(cols.withdrawal) {
        (clean_amount_cents(raw)?, StatementKind::Expense)
    } else if let Some(raw) = get(cols.deposit) {
        (clean_amount_cents(raw)?, StatementKind::Income)
    } else if let (Some(type_raw), Some(amount_raw)) = (get(cols.txn_type), get(cols.amount)) {
        let kind = match type_raw.to_uppercase().as_str() {
            "CR" | "CREDIT" => StatementKind::Income,
            _ => StatementKind::Expense,
        };
        (clean_amount_cents(amount_raw)?, kind)
    } else {
        return None;
    };

    if amount <= 0 {
        return None;
    }

    Some(StatementRow {
        kind,
        date,
        amount_cents: amount,
        description,
    })
}

/// Import a raw bank statement CSV.
///
/// Credits/deposits become incomes, debits/withdrawals become expenses
/// (subject to the monthly surplus rule); categories are predicted from
/// the description. Budget warnings are deduplicated across rows.
pub async fn import_bank_statement(
    pool: &DbPool,
    user_id: Uuid,
    csv_text: &str,
    today: NaiveDate,
) -> Result<StatementSummary, AppError> {
    if csv_text.len() > MAX_STATEMENT_BYTES {
        return Err(AppError::InvalidCsv(
            "CSV file too large (max 1.5 MB).".to_string(),
        ));
    }
    let (headers, rows) = read_csv(csv_text)?;
    let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();

    let cols = find_statement_columns(&header_refs).ok_or_else(|| {
        AppError::InvalidCsv("Date column not found - invalid bank statement.".to_string())
    })?;

    let mut imported_income = 0u32;
    let mut imported_expense = 0u32;
    let mut skipped = 0u32;
    let mut seen_warnings: HashSet<String> = HashSet::new();
    let mut warnings = Vec::new();

    for row in &rows {
        let Some(parsed) = classify_statement_row(row, &cols) else {
            skipped += 1;
            continue;
        };

        match parsed.kind {
            StatementKind::Income => {
                let category = classify::predict_income_category(&parsed.description);
                sqlx::query(
                    "INSERT INTO incomes (user_id, source, amount_cents, category, date) VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(user_id)
                .bind(&parsed.description)
                .bind(parsed.amount_cents)
                .bind(&category)
                .bind(parsed.date)
                .execute(pool)
                .await?;
                imported_income += 1;
            }
            StatementKind::Expense => {
                let available = surplus::monthly_surplus(pool, user_id, parsed.date).await?;
                if available < parsed.amount_cents {
                    skipped += 1;
                    continue;
                }

                let category = classify::predict_expense_category(&parsed.description);
                let expense = sqlx::query_as::<_, Expense>(
                    r#"
                    INSERT INTO expenses (user_id, name, amount_cents, category, date)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING *
                    "#,
                )
                .bind(user_id)
                .bind(&parsed.description)
                .bind(parsed.amount_cents)
                .bind(&category)
                .bind(parsed.date)
                .fetch_one(pool)
                .await?;
                imported_expense += 1;

                let check = budget::check_budget_warnings(pool, user_id, &expense, today).await?;
                for warning in check {
                    if seen_warnings.insert(warning.clone()) {
                        warnings.push(warning);
                    }
                }
            }
        }
    }

    if imported_income == 0 && imported_expense == 0 {
        warnings.push(
            "No transactions were imported. All rows were skipped due to month-level validation."
                .to_string(),
        );
    }

    Ok(StatementSummary {
        imported_income,
        imported_expense,
        skipped,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn headers_normalize_to_canonical_fields() {
        let map = normalize_headers(&["Txn Date", "Payee", "Amount", "Category"]);
        assert_eq!(map.get("date"), Some(&0));
        assert_eq!(map.get("name"), Some(&1));
        assert_eq!(map.get("amount"), Some(&2));
        assert_eq!(map.get("category"), Some(&3));
    }

    #[test]
    fn first_matching_header_wins() {
        let map = normalize_headers(&["Date", "Posting Date", "Amount"]);
        assert_eq!(map.get("date"), Some(&0));
    }

    #[test]
    fn bank_statement_detection() {
        assert!(is_bank_statement(&["Date", "Debit", "Credit", "Balance"]));
        assert!(is_bank_statement(&["Date", "Withdrawal Amt", "Deposit Amt"]));
        assert!(!is_bank_statement(&["Date", "Source", "Amount"]));
    }

    #[test]
    fn dates_parse_from_common_formats() {
        assert_eq!(normalize_date("2026-08-14"), Some(d(2026, 8, 14)));
        assert_eq!(normalize_date("14/08/2026"), Some(d(2026, 8, 14)));
        assert_eq!(normalize_date("14-08-2026"), Some(d(2026, 8, 14)));
        assert_eq!(normalize_date("14 Aug 2026"), Some(d(2026, 8, 14)));
        assert_eq!(normalize_date(" 2026/08/14 "), Some(d(2026, 8, 14)));
        assert_eq!(normalize_date("not a date"), None);
        assert_eq!(normalize_date(""), None);
    }

    #[test]
    fn amounts_clean_to_cents() {
        assert_eq!(clean_amount_cents("1234.56"), Some(123456));
        assert_eq!(clean_amount_cents("$1,234.56"), Some(123456));
        assert_eq!(clean_amount_cents("₹ 99"), Some(9900));
        assert_eq!(clean_amount_cents("-12.50"), Some(-1250));
        assert_eq!(clean_amount_cents(".75"), Some(75));
        assert_eq!(clean_amount_cents("garbage"), None);
        assert_eq!(clean_amount_cents(""), None);
        assert_eq!(clean_amount_cents("1.2.3"), None);
    }

    #[test]
    fn amounts_round_half_up() {
        assert_eq!(clean_amount_cents("10.005"), Some(1001));
        assert_eq!(clean_amount_cents("10.004"), Some(1000));
        assert_eq!(clean_amount_cents("10.9999"), Some(1100));
    }

    #[test]
    fn statement_columns_detected_by_sniffing() {
        let cols =
            find_statement_columns(&["Value Date", "Narration", "Debit (DR)", "Credit (CR)"])
                .unwrap();
        assert_eq!(cols.date, 0);
        assert_eq!(cols.description, Some(1));
        assert_eq!(cols.debit, Some(2));
        assert_eq!(cols.credit, Some(3));
        assert!(find_statement_columns(&["Narration", "Debit"]).is_none());
    }

    #[test]
    fn debit_rows_classify_as_expenses() {
        let cols = find_statement_columns(&["Date", "Description", "Debit", "Credit"]).unwrap();
        let row = csv::StringRecord::from(vec!["2026-08-14", "UBER TRIP", "250.00", ""]);
        let parsed = classify_statement_row(&row, &cols).unwrap();
        assert_eq!(parsed.kind, StatementKind::Expense);
        assert_eq!(parsed.amount_cents, 25000);
        assert_eq!(parsed.description, "UBER TRIP");
    }

    #[test]
    fn credit_rows_classify_as_income() {
        let cols = find_statement_columns(&["Date", "Description", "Debit", "Credit"]).unwrap();
        let row = csv::StringRecord::from(vec!["2026-08-01", "ACME PAYROLL", "", "5200.00"]);
        let parsed = classify_statement_row(&row, &cols).unwrap();
        assert_eq!(parsed.kind, StatementKind::Income);
        assert_eq!(parsed.amount_cents, 520000);
    }

    #[test]
    fn type_and_amount_columns_disambiguate() {
        let cols = find_statement_columns(&["Date", "Type", "Amount", "Remarks"]).unwrap();
        let credit = csv::StringRecord::from(vec!["2026-08-01", "CR", "100.00", "refund"]);
        let debit = csv::StringRecord::from(vec!["2026-08-02", "DR", "40.00", "coffee"]);
        assert_eq!(
            classify_statement_row(&credit, &cols).unwrap().kind,
            StatementKind::Income
        );
        assert_eq!(
            classify_statement_row(&debit, &cols).unwrap().kind,
            StatementKind::Expense
        );
    }

    #[test]
    fn rows_without_dates_or_amounts_are_dropped() {
        let cols = find_statement_columns(&["Date", "Description", "Debit", "Credit"]).unwrap();
        let no_date = csv::StringRecord::from(vec!["??", "X", "10.00", ""]);
        let no_amount = csv::StringRecord::from(vec!["2026-08-01", "X", "", ""]);
        assert!(classify_statement_row(&no_date, &cols).is_none());
        assert!(classify_statement_row(&no_amount, &cols).is_none());
    }
}
