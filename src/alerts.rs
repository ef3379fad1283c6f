use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{RiskLevel, ScoredRecord};

/// Lifecycle state of an alert. Transitions past `Open` are driven by the
/// downstream review workflow, not by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertStatus {
    Open,
    Investigating,
    Resolved,
    FalsePositive,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Open => "open",
            AlertStatus::Investigating => "investigating",
            AlertStatus::Resolved => "resolved",
            AlertStatus::FalsePositive => "false_positive",
        }
    }

    pub fn from_str_or_open(value: &str) -> Self {
        match value {
            "investigating" => AlertStatus::Investigating,
            "resolved" => AlertStatus::Resolved,
            "false_positive" => AlertStatus::FalsePositive,
            _ => AlertStatus::Open,
        }
    }
}

/// An alert raised for one scored transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub transaction_id: String,
    pub risk_level: RiskLevel,
    pub reasons: Vec<String>,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Pure filter+map: one alert per scored record that is high risk or
/// flagged. No deduplication here — re-submissions are handled by the
/// storage layer's upsert.
pub fn generate_alerts(scored: &[ScoredRecord]) -> Vec<AlertRecord> {
    let now = Utc::now();
    scored
        .iter()
        .filter(|record| record.risk_level == RiskLevel::High || record.fraud_flag)
        .map(|record| AlertRecord {
            transaction_id: record.transaction_id().to_string(),
            risk_level: record.risk_level,
            reasons: record.reasons.clone(),
            status: AlertStatus::Open,
            created_at: now,
            updated_at: now,
        })
        .collect()
}
