pub mod features;
pub mod normalize;
pub mod pipeline;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One unparsed input row: arbitrary column names mapped to loosely-typed
/// values. Discarded after normalization.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Fixed transaction category set. Anything else folds to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    ECommerce,
    Retail,
    Gas,
    Food,
    Atm,
    Online,
    Other,
}

impl Category {
    /// Case-insensitive match against the fixed set. Never fails — unknown
    /// values fold to `Other` silently.
    pub fn from_input(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "e-commerce" | "ecommerce" => Category::ECommerce,
            "retail" => Category::Retail,
            "gas" => Category::Gas,
            "food" => Category::Food,
            "atm" => Category::Atm,
            "online" => Category::Online,
            _ => Category::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ECommerce => "E-commerce",
            Category::Retail => "Retail",
            Category::Gas => "Gas",
            Category::Food => "Food",
            Category::Atm => "ATM",
            Category::Online => "Online",
            Category::Other => "Other",
        }
    }
}

/// Fixed payment method set. Anything else folds to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    BankTransfer,
    DigitalWallet,
    Other,
}

impl PaymentMethod {
    pub fn from_input(value: &str) -> Self {
        match value.trim().to_lowercase().replace(' ', "_").as_str() {
            "credit_card" => PaymentMethod::CreditCard,
            "debit_card" => PaymentMethod::DebitCard,
            "bank_transfer" => PaymentMethod::BankTransfer,
            "digital_wallet" => PaymentMethod::DigitalWallet,
            _ => PaymentMethod::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::DigitalWallet => "digital_wallet",
            PaymentMethod::Other => "other",
        }
    }
}

/// A transaction coerced into the canonical shape.
///
/// Invariant: `transaction_id` is non-empty and `amount` is strictly positive.
/// The normalizer drops any row it cannot bring up to this invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub transaction_id: String,
    pub amount: f64,
    pub merchant: String,
    pub category: Category,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub location: String,
    pub payment_method: PaymentMethod,
}

/// A normalized record augmented with derived risk features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub record: NormalizedRecord,
    pub hour_of_day: u32,
    pub is_night_transaction: bool,
    pub is_high_amount: bool,
    pub amount_log: f64,
    pub category_risk_score: f64,
    pub is_foreign: bool,
}

/// Risk tier derived from fraud probability via fixed cutoffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }

    pub fn from_str_or_low(value: &str) -> Self {
        match value {
            "HIGH" => RiskLevel::High,
            "MEDIUM" => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }
}

/// A fully scored transaction ready for persistence and alerting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub features: FeatureRecord,
    /// Fraud probability on the canonical 0-1 scale, floored at 0.1.
    pub fraud_probability: f64,
    pub fraud_flag: bool,
    pub risk_level: RiskLevel,
    /// Triggered-rule descriptions in evaluation order.
    pub reasons: Vec<String>,
}

impl ScoredRecord {
    pub fn transaction_id(&self) -> &str {
        &self.features.record.transaction_id
    }
}

/// Counts reported by the normalizer for one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingStats {
    pub original_count: usize,
    pub cleaned_count: usize,
    /// Fraction of rows dropped, 0.0 for an empty batch.
    pub removal_rate: f64,
    pub categories: Vec<String>,
    pub earliest_timestamp: Option<DateTime<Utc>>,
    pub latest_timestamp: Option<DateTime<Utc>>,
    pub average_amount: f64,
}

/// Headline counts over one batch of predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub fraudulent: usize,
    pub high_risk: usize,
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub preprocessing: PreprocessingStats,
    pub predictions: Vec<ScoredRecord>,
    pub summary: BatchSummary,
}
