use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{RiskLevel, ScoredRecord};

/// Optional inclusive date bounds for an aggregate query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        if let Some(from) = self.from {
            if timestamp < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if timestamp > to {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

/// Point-in-time rollup over a record set. Recomputed on demand, never
/// cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total: usize,
    pub fraud_count: usize,
    pub risk_counts: RiskCounts,
    /// 0.0 for an empty record set.
    pub average_probability: f64,
    pub by_category: BTreeMap<String, usize>,
    pub by_merchant: BTreeMap<String, usize>,
    /// Hour-of-day buckets, 0-23.
    pub by_hour: BTreeMap<u32, usize>,
}

/// Pure reduction over scored records. An empty input (or a range matching
/// nothing) yields the all-zero stats, never an error.
pub fn aggregate(records: &[ScoredRecord], range: Option<DateRange>) -> AggregateStats {
    let mut stats = AggregateStats::default();
    let mut probability_sum = 0.0;

    for record in records {
        if let Some(range) = range {
            if !range.contains(record.features.record.timestamp) {
                continue;
            }
        }

        stats.total += 1;
        if record.fraud_flag {
            stats.fraud_count += 1;
        }
        match record.risk_level {
            RiskLevel::Low => stats.risk_counts.low += 1,
            RiskLevel::Medium => stats.risk_counts.medium += 1,
            RiskLevel::High => stats.risk_counts.high += 1,
        }
        probability_sum += record.fraud_probability;

        *stats
            .by_category
            .entry(record.features.record.category.as_str().to_string())
            .or_insert(0) += 1;
        *stats
            .by_merchant
            .entry(record.features.record.merchant.clone())
            .or_insert(0) += 1;
        *stats.by_hour.entry(record.features.hour_of_day).or_insert(0) += 1;
    }

    if stats.total > 0 {
        stats.average_probability = probability_sum / stats.total as f64;
    }
    stats
}
