use std::collections::HashMap;

use chrono::Timelike;

use crate::core::{Category, FeatureRecord, NormalizedRecord};

/// Score used when a category is missing from the risk table. The table
/// covers the full enum today, but the default keeps derivation total if the
/// enum ever grows.
const DEFAULT_CATEGORY_RISK: f64 = 0.5;

const HIGH_AMOUNT_THRESHOLD: f64 = 1000.0;

/// Derives secondary risk attributes from normalized records.
///
/// The category-risk table is immutable configuration owned by the engine,
/// not a global.
pub struct FeatureEngine {
    category_risk: HashMap<Category, f64>,
}

impl Default for FeatureEngine {
    fn default() -> Self {
        let category_risk = HashMap::from([
            (Category::Atm, 0.9),
            (Category::Online, 0.8),
            (Category::ECommerce, 0.7),
            (Category::Gas, 0.4),
            (Category::Retail, 0.3),
            (Category::Food, 0.2),
            (Category::Other, 0.5),
        ]);
        Self { category_risk }
    }
}

impl FeatureEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total function: every normalized record yields exactly one feature
    /// record.
    pub fn derive(&self, record: &NormalizedRecord) -> FeatureRecord {
        let hour_of_day = record.timestamp.hour();
        FeatureRecord {
            hour_of_day,
            is_night_transaction: hour_of_day >= 22 || hour_of_day <= 6,
            is_high_amount: record.amount > HIGH_AMOUNT_THRESHOLD,
            amount_log: (record.amount + 1.0).ln(),
            category_risk_score: self
                .category_risk
                .get(&record.category)
                .copied()
                .unwrap_or(DEFAULT_CATEGORY_RISK),
            is_foreign: !record.location.to_lowercase().contains("us"),
            record: record.clone(),
        }
    }
}
