use tracing::info;

use crate::config::ScoringConfig;
use crate::core::features::FeatureEngine;
use crate::core::{normalize, BatchSummary, PipelineResult, RawRecord, RiskLevel};
use crate::scoring::{NoiseSource, RiskScorer};

/// Sequences Normalizer → Feature Engine → Risk Scorer over one batch.
/// Does no I/O itself; persistence and alerting are the caller's steps.
pub struct Pipeline {
    engine: FeatureEngine,
    scorer: RiskScorer,
}

impl Pipeline {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            engine: FeatureEngine::new(),
            scorer: RiskScorer::new(config),
        }
    }

    /// Deterministic variant for tests: noise pinned by the caller.
    pub fn with_noise(config: ScoringConfig, noise: Box<dyn NoiseSource + Send + Sync>) -> Self {
        Self {
            engine: FeatureEngine::new(),
            scorer: RiskScorer::with_noise(config, noise),
        }
    }

    /// Run the full batch. Rejected rows are dropped silently and only show
    /// up in the preprocessing stats; surviving rows keep their input order.
    pub fn run(&self, rows: &[RawRecord]) -> PipelineResult {
        let cleaned = normalize::normalize(rows);
        let preprocessing = normalize::stats(rows, &cleaned);

        let predictions: Vec<_> = cleaned
            .iter()
            .map(|record| self.scorer.score(&self.engine.derive(record)))
            .collect();

        let summary = BatchSummary {
            total: predictions.len(),
            fraudulent: predictions.iter().filter(|p| p.fraud_flag).count(),
            high_risk: predictions
                .iter()
                .filter(|p| p.risk_level == RiskLevel::High)
                .count(),
        };

        info!(
            "Batch scored: {} in, {} kept, {} flagged, {} high risk",
            preprocessing.original_count, summary.total, summary.fraudulent, summary.high_risk
        );

        PipelineResult {
            preprocessing,
            predictions,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RawRecord;
    use crate::scoring::FixedNoise;
    use serde_json::json;

    fn row(id: &str, amount: &str, extra: &[(&str, &str)]) -> RawRecord {
        let mut map = RawRecord::new();
        map.insert("transaction_id".to_string(), json!(id));
        map.insert("amount".to_string(), json!(amount));
        for (k, v) in extra {
            map.insert(k.to_string(), json!(v));
        }
        map
    }

    fn deterministic_pipeline() -> Pipeline {
        Pipeline::with_noise(ScoringConfig::default(), Box::new(FixedNoise(0.0)))
    }

    #[test]
    fn runs_full_batch() {
        let rows = vec![
            row("A", "50.50", &[("timestamp", "2024-03-01T12:00:00Z"), ("location", "Austin, US")]),
            row("B", "2000.50", &[
                ("timestamp", "2024-03-01T23:00:00Z"),
                ("category", "ATM"),
                ("location", "Lagos, NG"),
                ("payment_method", "credit_card"),
            ]),
        ];
        let result = deterministic_pipeline().run(&rows);

        assert_eq!(result.summary.total, 2);
        assert_eq!(result.summary.fraudulent, 1);
        assert_eq!(result.summary.high_risk, 1);
        assert_eq!(result.preprocessing.original_count, 2);
        assert_eq!(result.preprocessing.cleaned_count, 2);
    }

    #[test]
    fn rejected_rows_drop_without_failing_batch() {
        let rows = vec![
            row("A", "10", &[]),
            row("B", "not-a-number", &[]),
            row("C", "-5", &[]),
            row("D", "20", &[]),
        ];
        let result = deterministic_pipeline().run(&rows);

        assert_eq!(result.summary.total, 2);
        assert_eq!(result.preprocessing.original_count, 4);
        assert_eq!(result.preprocessing.cleaned_count, 2);
        assert!((result.preprocessing.removal_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn predictions_preserve_surviving_row_order() {
        let rows = vec![
            row("first", "10", &[]),
            row("dropped", "0", &[]),
            row("second", "20", &[]),
            row("third", "30", &[]),
        ];
        let result = deterministic_pipeline().run(&rows);
        let ids: Vec<&str> = result.predictions.iter().map(|p| p.transaction_id()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn empty_batch_yields_empty_result() {
        let result = deterministic_pipeline().run(&[]);
        assert_eq!(result.summary.total, 0);
        assert_eq!(result.summary.fraudulent, 0);
        assert!(result.predictions.is_empty());
    }

    #[test]
    fn summary_counts_match_predicates() {
        let rows: Vec<RawRecord> = (0..10)
            .map(|i| {
                row(&format!("T{i}"), "750.50", &[
                    ("timestamp", "2024-03-01T12:00:00Z"),
                    ("location", "Austin, US"),
                ])
            })
            .collect();
        let result = deterministic_pipeline().run(&rows);

        let fraudulent = result.predictions.iter().filter(|p| p.fraud_flag).count();
        let high = result
            .predictions
            .iter()
            .filter(|p| p.risk_level == RiskLevel::High)
            .count();
        assert_eq!(result.summary.fraudulent, fraudulent);
        assert_eq!(result.summary.high_risk, high);
    }
}
