use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use tracing::debug;

use crate::core::{Category, NormalizedRecord, PaymentMethod, PreprocessingStats, RawRecord};

/// Field aliases in priority order: first non-empty match wins. These cover
/// the header variants seen across historical upload formats.
const ID_ALIASES: &[&str] = &[
    "transaction_id",
    "Transaction_ID",
    "TransactionID",
    "transactionId",
    "txn_id",
    "id",
];
const AMOUNT_ALIASES: &[&str] = &[
    "amount",
    "Amount",
    "transaction_amount",
    "Transaction_Amount",
    "amt",
    "value",
];
const MERCHANT_ALIASES: &[&str] = &["merchant", "Merchant", "merchant_name", "Merchant_Name", "vendor"];
const CATEGORY_ALIASES: &[&str] = &["category", "Category", "transaction_category", "Transaction_Type", "type"];
const USER_ALIASES: &[&str] = &["user_id", "User_ID", "userId", "customer_id", "Customer_ID"];
const TIMESTAMP_ALIASES: &[&str] = &[
    "timestamp",
    "Timestamp",
    "transaction_date",
    "Transaction_Date",
    "date",
    "Date",
    "time",
];
const LOCATION_ALIASES: &[&str] = &["location", "Location", "country", "Country", "city"];
const PAYMENT_ALIASES: &[&str] = &["payment_method", "Payment_Method", "paymentMethod", "method"];

const DEFAULT_MERCHANT: &str = "Unknown Merchant";
const DEFAULT_LOCATION: &str = "Unknown";

/// Map a batch of raw rows into canonical records.
///
/// Rows with no usable transaction id or a non-positive/unparseable amount
/// are dropped, never surfaced as errors. Output order follows input order.
pub fn normalize(rows: &[RawRecord]) -> Vec<NormalizedRecord> {
    rows.iter().filter_map(normalize_row).collect()
}

/// Normalize a single row. `None` means the row was rejected.
pub fn normalize_row(row: &RawRecord) -> Option<NormalizedRecord> {
    // Amount is the hard requirement: without a positive amount the row
    // carries no risk signal at all.
    let amount_text = resolve(row, AMOUNT_ALIASES)?;
    let amount = parse_amount(&amount_text)?;

    let timestamp = resolve(row, TIMESTAMP_ALIASES)
        .and_then(|text| parse_timestamp(&text))
        .unwrap_or_else(Utc::now);

    let transaction_id = match resolve(row, ID_ALIASES) {
        Some(id) => id,
        None => generate_transaction_id(timestamp),
    };

    let user_id = resolve(row, USER_ALIASES).unwrap_or_else(generate_user_id);

    Some(NormalizedRecord {
        transaction_id,
        amount,
        merchant: resolve(row, MERCHANT_ALIASES).unwrap_or_else(|| DEFAULT_MERCHANT.to_string()),
        category: resolve(row, CATEGORY_ALIASES)
            .map(|c| Category::from_input(&c))
            .unwrap_or(Category::Other),
        user_id,
        timestamp,
        location: resolve(row, LOCATION_ALIASES).unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
        payment_method: resolve(row, PAYMENT_ALIASES)
            .map(|p| PaymentMethod::from_input(&p))
            .unwrap_or(PaymentMethod::Other),
    })
}

/// Batch-level preprocessing summary for the original vs cleaned row sets.
pub fn stats(original: &[RawRecord], cleaned: &[NormalizedRecord]) -> PreprocessingStats {
    let removal_rate = if original.is_empty() {
        0.0
    } else {
        (original.len() - cleaned.len().min(original.len())) as f64 / original.len() as f64
    };

    let mut categories: Vec<String> = cleaned
        .iter()
        .map(|r| r.category.as_str().to_string())
        .collect();
    categories.sort();
    categories.dedup();

    let average_amount = if cleaned.is_empty() {
        0.0
    } else {
        cleaned.iter().map(|r| r.amount).sum::<f64>() / cleaned.len() as f64
    };

    PreprocessingStats {
        original_count: original.len(),
        cleaned_count: cleaned.len(),
        removal_rate,
        categories,
        earliest_timestamp: cleaned.iter().map(|r| r.timestamp).min(),
        latest_timestamp: cleaned.iter().map(|r| r.timestamp).max(),
        average_amount,
    }
}

/// Try each alias in priority order, returning the first non-empty value.
fn resolve(row: &RawRecord, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|key| row.get(*key))
        .find_map(value_as_text)
}

/// Render a loosely-typed cell as trimmed text; empty and null cells count
/// as absent.
fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse an amount after stripping currency symbols and thousands
/// separators. `None` for non-numeric, non-finite, or non-positive values.
fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let amount: f64 = cleaned.parse().ok()?;
    if !amount.is_finite() || amount <= 0.0 {
        debug!("Rejecting non-positive amount: {text}");
        return None;
    }
    Some(amount)
}

/// Parse a timestamp from the formats seen in upload files. The caller
/// defaults to "now" on `None` — completeness over fidelity.
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    const FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M", "%m/%d/%Y"];
    for format in FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

fn random_suffix(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Synthesize a globally unique transaction id from the record timestamp
/// plus a random suffix.
fn generate_transaction_id(timestamp: DateTime<Utc>) -> String {
    format!("TXN-{}-{}", timestamp.timestamp_millis(), random_suffix(6))
}

fn generate_user_id() -> String {
    format!("USER-{}", random_suffix(8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> RawRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn normalizes_canonical_row() {
        let rows = vec![row(&[
            ("transaction_id", json!("TX1")),
            ("amount", json!("250.00")),
            ("merchant", json!("Acme")),
            ("category", json!("Retail")),
            ("user_id", json!("U1")),
            ("timestamp", json!("2024-03-01T12:30:00Z")),
            ("location", json!("Austin, US")),
            ("payment_method", json!("credit_card")),
        ])];
        let cleaned = normalize(&rows);
        assert_eq!(cleaned.len(), 1);
        let rec = &cleaned[0];
        assert_eq!(rec.transaction_id, "TX1");
        assert_eq!(rec.amount, 250.0);
        assert_eq!(rec.category, Category::Retail);
        assert_eq!(rec.payment_method, PaymentMethod::CreditCard);
        assert_eq!(rec.timestamp.to_rfc3339(), "2024-03-01T12:30:00+00:00");
    }

    #[test]
    fn alias_priority_first_match_wins() {
        let r = row(&[
            ("id", json!("fallback")),
            ("Transaction_ID", json!("primary")),
            ("amount", json!(10)),
        ]);
        let rec = normalize_row(&r).unwrap();
        assert_eq!(rec.transaction_id, "primary");
    }

    #[test]
    fn currency_symbols_and_separators_stripped() {
        let r = row(&[("transaction_id", json!("T")), ("Amount", json!("$1,234.56"))]);
        let rec = normalize_row(&r).unwrap();
        assert!((rec.amount - 1234.56).abs() < 1e-9);
    }

    #[test]
    fn numeric_amount_cell_accepted() {
        let r = row(&[("transaction_id", json!("T")), ("amount", json!(42.5))]);
        assert_eq!(normalize_row(&r).unwrap().amount, 42.5);
    }

    #[test]
    fn rejects_missing_amount() {
        let r = row(&[("transaction_id", json!("T"))]);
        assert!(normalize_row(&r).is_none());
    }

    #[test]
    fn rejects_non_numeric_zero_and_negative_amounts() {
        for bad in ["abc", "0", "0.00", "-5", ""] {
            let r = row(&[("transaction_id", json!("T")), ("amount", json!(bad))]);
            assert!(normalize_row(&r).is_none(), "amount {bad:?} should reject");
        }
    }

    #[test]
    fn missing_id_generates_one() {
        let r = row(&[("amount", json!("100"))]);
        let rec = normalize_row(&r).unwrap();
        assert!(rec.transaction_id.starts_with("TXN-"));
        assert!(!rec.transaction_id.is_empty());
    }

    #[test]
    fn blank_id_generates_one() {
        let r = row(&[("transaction_id", json!("   ")), ("amount", json!("100"))]);
        let rec = normalize_row(&r).unwrap();
        assert!(rec.transaction_id.starts_with("TXN-"));
    }

    #[test]
    fn missing_optionals_get_defaults() {
        let r = row(&[("transaction_id", json!("T")), ("amount", json!("100"))]);
        let rec = normalize_row(&r).unwrap();
        assert_eq!(rec.merchant, "Unknown Merchant");
        assert_eq!(rec.location, "Unknown");
        assert_eq!(rec.category, Category::Other);
        assert_eq!(rec.payment_method, PaymentMethod::Other);
        assert!(rec.user_id.starts_with("USER-"));
    }

    #[test]
    fn unparseable_timestamp_defaults_to_now() {
        let before = Utc::now();
        let r = row(&[
            ("transaction_id", json!("T")),
            ("amount", json!("100")),
            ("timestamp", json!("not a date")),
        ]);
        let rec = normalize_row(&r).unwrap();
        assert!(rec.timestamp >= before && rec.timestamp <= Utc::now());
    }

    #[test]
    fn date_only_timestamp_accepted() {
        let r = row(&[
            ("transaction_id", json!("T")),
            ("amount", json!("100")),
            ("date", json!("2024-06-15")),
        ]);
        let rec = normalize_row(&r).unwrap();
        assert_eq!(rec.timestamp.to_rfc3339(), "2024-06-15T00:00:00+00:00");
    }

    #[test]
    fn free_text_category_folds_to_other() {
        let r = row(&[
            ("transaction_id", json!("T")),
            ("amount", json!("100")),
            ("category", json!("Crypto")),
        ]);
        assert_eq!(normalize_row(&r).unwrap().category, Category::Other);
    }

    #[test]
    fn output_order_preserves_input_order() {
        let rows = vec![
            row(&[("transaction_id", json!("A")), ("amount", json!("10"))]),
            row(&[("transaction_id", json!("bad")), ("amount", json!("-1"))]),
            row(&[("transaction_id", json!("B")), ("amount", json!("20"))]),
            row(&[("transaction_id", json!("C")), ("amount", json!("30"))]),
        ];
        let cleaned = normalize(&rows);
        let ids: Vec<&str> = cleaned.iter().map(|r| r.transaction_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn normalization_is_idempotent() {
        let rows = vec![row(&[
            ("transaction_id", json!("TX9")),
            ("amount", json!("88.20")),
            ("merchant", json!("Corner Store")),
            ("category", json!("Food")),
            ("user_id", json!("U9")),
            ("timestamp", json!("2024-01-05T08:00:00Z")),
            ("location", json!("Boston, US")),
            ("payment_method", json!("debit_card")),
        ])];
        let first = normalize(&rows);

        // Feed the canonical record back through as a raw row.
        let rec = &first[0];
        let again = vec![row(&[
            ("transaction_id", json!(rec.transaction_id)),
            ("amount", json!(rec.amount.to_string())),
            ("merchant", json!(rec.merchant)),
            ("category", json!(rec.category.as_str())),
            ("user_id", json!(rec.user_id)),
            ("timestamp", json!(rec.timestamp.to_rfc3339())),
            ("location", json!(rec.location)),
            ("payment_method", json!(rec.payment_method.as_str())),
        ])];
        let second = normalize(&again);
        assert_eq!(first, second);
    }

    #[test]
    fn stats_counts_and_removal_rate() {
        let rows = vec![
            row(&[("transaction_id", json!("A")), ("amount", json!("100")), ("category", json!("Retail"))]),
            row(&[("transaction_id", json!("B")), ("amount", json!("zero"))]),
            row(&[("transaction_id", json!("C")), ("amount", json!("300")), ("category", json!("ATM"))]),
            row(&[("transaction_id", json!("D")), ("amount", json!("-2"))]),
        ];
        let cleaned = normalize(&rows);
        let s = stats(&rows, &cleaned);
        assert_eq!(s.original_count, 4);
        assert_eq!(s.cleaned_count, 2);
        assert!((s.removal_rate - 0.5).abs() < 1e-9);
        assert_eq!(s.categories, vec!["ATM".to_string(), "Retail".to_string()]);
        assert!((s.average_amount - 200.0).abs() < 1e-9);
    }

    #[test]
    fn stats_empty_batch() {
        let s = stats(&[], &[]);
        assert_eq!(s.original_count, 0);
        assert_eq!(s.cleaned_count, 0);
        assert_eq!(s.removal_rate, 0.0);
        assert_eq!(s.average_amount, 0.0);
        assert!(s.earliest_timestamp.is_none());
        assert!(s.latest_timestamp.is_none());
    }

    #[test]
    fn stats_timestamp_bounds() {
        let rows = vec![
            row(&[("transaction_id", json!("A")), ("amount", json!("10")), ("timestamp", json!("2024-01-01T00:00:00Z"))]),
            row(&[("transaction_id", json!("B")), ("amount", json!("10")), ("timestamp", json!("2024-06-01T00:00:00Z"))]),
        ];
        let cleaned = normalize(&rows);
        let s = stats(&rows, &cleaned);
        assert_eq!(s.earliest_timestamp.unwrap().to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(s.latest_timestamp.unwrap().to_rfc3339(), "2024-06-01T00:00:00+00:00");
    }
}
