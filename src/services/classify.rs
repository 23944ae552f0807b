//! Category normalization and prediction.
//!
//! Categories come from fixed sets. Free-form labels (CSV imports, API
//! clients) are normalized onto them; when no label is available at all,
//! a keyword scorer predicts one from the record's description text,
//! falling back to "Miscellaneous" / "Other Income".

/// Canonical expense categories.
pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Food & Dining",
    "Groceries",
    "Transport",
    "Rent",
    "Utilities",
    "Entertainment",
    "Healthcare",
    "Education",
    "Shopping",
    "Travel",
    "Insurance",
    "Miscellaneous",
];

/// Canonical income categories.
pub const INCOME_CATEGORIES: &[&str] = &[
    "Salary",
    "Business",
    "Freelance",
    "Investment",
    "Rental Income",
    "Gift",
    "Other Income",
];

/// Fallback expense category.
pub const DEFAULT_EXPENSE_CATEGORY: &str = "Miscellaneous";

/// Fallback income category.
pub const DEFAULT_INCOME_CATEGORY: &str = "Other Income";

/// Map a free-form expense label onto the canonical set.
///
/// Exact (case-insensitive) matches win; a handful of common synonyms
/// are folded in; anything else becomes "Miscellaneous".
pub fn normalize_expense_category(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    if lowered.is_empty() {
        return DEFAULT_EXPENSE_CATEGORY.to_string();
    }
    for canonical in EXPENSE_CATEGORIES {
        if canonical.to_lowercase() == lowered {
            return (*canonical).to_string();
        }
    }
    let mapped = match lowered.as_str() {
        "food" | "dining" | "restaurant" | "restaurants" | "eating out" => "Food & Dining",
        "grocery" | "supermarket" => "Groceries",
        "transportation" | "fuel" | "gas" | "petrol" | "commute" => "Transport",
        "housing" | "mortgage" => "Rent",
        "bills" | "utility" | "electricity" | "water" | "internet" | "phone" => "Utilities",
        "movies" | "fun" | "leisure" | "subscriptions" => "Entertainment",
        "medical" | "health" | "pharmacy" | "doctor" => "Healthcare",
        "school" | "tuition" | "books" | "courses" => "Education",
        "clothes" | "clothing" | "electronics" => "Shopping",
        "vacation" | "holiday" | "flights" | "hotel" => "Travel",
        "misc" | "other" => "Miscellaneous",
        _ => return DEFAULT_EXPENSE_CATEGORY.to_string(),
    };
    mapped.to_string()
}

/// Map a free-form income label onto the canonical set.
pub fn normalize_income_category(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    if lowered.is_empty() {
        return DEFAULT_INCOME_CATEGORY.to_string();
    }
    for canonical in INCOME_CATEGORIES {
        if canonical.to_lowercase() == lowered {
            return (*canonical).to_string();
        }
    }
    let mapped = match lowered.as_str() {
        "wages" | "wage" | "pay" | "paycheck" | "payroll" => "Salary",
        "self-employed" | "self employed" | "side business" => "Business",
        "contract" | "consulting" | "gig" => "Freelance",
        "dividend" | "dividends" | "interest" | "stocks" | "crypto" => "Investment",
        "rent" | "rental" | "lease" => "Rental Income",
        "present" | "donation" | "bonus gift" => "Gift",
        "misc" | "other" => "Other Income",
        _ => return DEFAULT_INCOME_CATEGORY.to_string(),
    };
    mapped.to_string()
}

/// Keyword table used by the expense predictor.
const EXPENSE_KEYWORDS: &[(&str, &str)] = &[
    ("restaurant", "Food & Dining"),
    ("cafe", "Food & Dining"),
    ("coffee", "Food & Dining"),
    ("pizza", "Food & Dining"),
    ("burger", "Food & Dining"),
    ("dinner", "Food & Dining"),
    ("lunch", "Food & Dining"),
    ("grocery", "Groceries"),
    ("groceries", "Groceries"),
    ("supermarket", "Groceries"),
    ("market", "Groceries"),
    ("uber", "Transport"),
    ("taxi", "Transport"),
    ("bus", "Transport"),
    ("train", "Transport"),
    ("fuel", "Transport"),
    ("petrol", "Transport"),
    ("gas station", "Transport"),
    ("parking", "Transport"),
    ("rent", "Rent"),
    ("mortgage", "Rent"),
    ("landlord", "Rent"),
    ("electric", "Utilities"),
    ("electricity", "Utilities"),
    ("water bill", "Utilities"),
    ("internet", "Utilities"),
    ("broadband", "Utilities"),
    ("phone bill", "Utilities"),
    ("netflix", "Entertainment"),
    ("spotify", "Entertainment"),
    ("cinema", "Entertainment"),
    ("movie", "Entertainment"),
    ("game", "Entertainment"),
    ("concert", "Entertainment"),
    ("pharmacy", "Healthcare"),
    ("doctor", "Healthcare"),
    ("hospital", "Healthcare"),
    ("dentist", "Healthcare"),
    ("clinic", "Healthcare"),
    ("tuition", "Education"),
    ("course", "Education"),
    ("textbook", "Education"),
    ("school", "Education"),
    ("amazon", "Shopping"),
    ("mall", "Shopping"),
    ("clothes", "Shopping"),
    ("shoes", "Shopping"),
    ("electronics", "Shopping"),
    ("flight", "Travel"),
    ("hotel", "Travel"),
    ("airbnb", "Travel"),
    ("airline", "Travel"),
    ("insurance", "Insurance"),
    ("premium", "Insurance"),
];

/// Keyword table used by the income predictor.
const INCOME_KEYWORDS: &[(&str, &str)] = &[
    ("salary", "Salary"),
    ("payroll", "Salary"),
    ("wages", "Salary"),
    ("paycheck", "Salary"),
    ("employer", "Salary"),
    ("business", "Business"),
    ("sales", "Business"),
    ("invoice", "Business"),
    ("freelance", "Freelance"),
    ("contract", "Freelance"),
    ("consulting", "Freelance"),
    ("gig", "Freelance"),
    ("dividend", "Investment"),
    ("interest", "Investment"),
    ("stock", "Investment"),
    ("crypto", "Investment"),
    ("mutual fund", "Investment"),
    ("rent", "Rental Income"),
    ("tenant", "Rental Income"),
    ("lease", "Rental Income"),
    ("gift", "Gift"),
    ("birthday", "Gift"),
    ("refund", "Other Income"),
    ("cashback", "Other Income"),
];

/// Score keyword hits in `text` and return the best category.
fn predict(text: &str, keywords: &[(&str, &str)], fallback: &str) -> String {
    let lowered = text.to_lowercase();
    let mut best: Option<(&str, usize)> = None;
    for (keyword, category) in keywords {
        let hits = lowered.matches(keyword).count();
        if hits == 0 {
            continue;
        }
        // longer keywords are more specific, use length as tiebreaker
        let score = hits * 100 + keyword.len();
        match best {
            Some((_, s)) if s >= score => {}
            _ => best = Some((category, score)),
        }
    }
    best.map(|(c, _)| c.to_string())
        .unwrap_or_else(|| fallback.to_string())
}

/// Predict an expense category from description text.
pub fn predict_expense_category(text: &str) -> String {
    predict(text, EXPENSE_KEYWORDS, DEFAULT_EXPENSE_CATEGORY)
}

/// Predict an income category from description text.
pub fn predict_income_category(text: &str) -> String {
    predict(text, INCOME_KEYWORDS, DEFAULT_INCOME_CATEGORY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_is_case_insensitive() {
        assert_eq!(normalize_expense_category("groceries"), "Groceries");
        assert_eq!(normalize_expense_category("GROCERY"), "Groceries");
        assert_eq!(normalize_income_category("salary"), "Salary");
    }

    #[test]
    fn normalization_folds_synonyms() {
        assert_eq!(normalize_expense_category("fuel"), "Transport");
        assert_eq!(normalize_expense_category("medical"), "Healthcare");
        assert_eq!(normalize_income_category("dividends"), "Investment");
    }

    #[test]
    fn unknown_labels_fall_back() {
        assert_eq!(normalize_expense_category("zorp"), "Miscellaneous");
        assert_eq!(normalize_expense_category("  "), "Miscellaneous");
        assert_eq!(normalize_income_category("zorp"), "Other Income");
    }

    #[test]
    fn prediction_matches_keywords() {
        assert_eq!(predict_expense_category("UBER TRIP HELP.UBER.COM"), "Transport");
        assert_eq!(predict_expense_category("Netflix monthly"), "Entertainment");
        assert_eq!(predict_income_category("ACME PAYROLL DEPOSIT"), "Salary");
    }

    #[test]
    fn prediction_falls_back_on_no_hits() {
        assert_eq!(predict_expense_category("xyzzy"), "Miscellaneous");
        assert_eq!(predict_income_category(""), "Other Income");
    }
}
