pub mod rules;

use rand::Rng;

use crate::config::ScoringConfig;
use crate::core::{FeatureRecord, RiskLevel, ScoredRecord};
use rules::Rule;

/// Reason reported when no rule fires.
pub const BASELINE_REASON: &str = "baseline fraud risk detected";

/// Source of the bounded noise term added to every score. Isolated behind a
/// trait so tests can pin it to a known value.
pub trait NoiseSource {
    /// A sample in `[0, ceiling)`.
    fn sample(&self, ceiling: f64) -> f64;
}

/// Production source: uniform draw from the thread RNG.
pub struct ThreadRngNoise;

impl NoiseSource for ThreadRngNoise {
    fn sample(&self, ceiling: f64) -> f64 {
        if ceiling <= 0.0 {
            return 0.0;
        }
        rand::thread_rng().gen_range(0.0..ceiling)
    }
}

/// Deterministic source for tests.
pub struct FixedNoise(pub f64);

impl NoiseSource for FixedNoise {
    fn sample(&self, _ceiling: f64) -> f64 {
        self.0
    }
}

/// Applies the additive rule set plus bounded noise to produce a fraud
/// probability, flag, and risk tier.
pub struct RiskScorer {
    rules: Vec<Box<dyn Rule + Send + Sync>>,
    config: ScoringConfig,
    noise: Box<dyn NoiseSource + Send + Sync>,
}

impl RiskScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self::with_noise(config, Box::new(ThreadRngNoise))
    }

    pub fn with_noise(config: ScoringConfig, noise: Box<dyn NoiseSource + Send + Sync>) -> Self {
        Self {
            rules: rules::default_rules(),
            config,
            noise,
        }
    }

    /// Score one record. Never fails: every feature record yields a scored
    /// record with probability in `[min_probability, 1.0]`.
    pub fn score(&self, features: &FeatureRecord) -> ScoredRecord {
        let mut probability = self.config.base_score;
        let mut reasons = Vec::new();

        for rule in &self.rules {
            if let Some(hit) = rule.evaluate(features, &self.config) {
                probability += hit.delta;
                reasons.push(hit.reason);
            }
        }

        probability += self.noise.sample(self.config.noise_ceiling);
        let probability = probability.clamp(self.config.min_probability, 1.0);

        if reasons.is_empty() {
            reasons.push(BASELINE_REASON.to_string());
        }

        ScoredRecord {
            features: features.clone(),
            fraud_probability: probability,
            fraud_flag: probability > self.config.fraud_flag_threshold,
            risk_level: risk_level(probability, &self.config),
            reasons,
        }
    }
}

/// Map a probability onto the risk tier cutoffs.
pub fn risk_level(probability: f64, config: &ScoringConfig) -> RiskLevel {
    if probability >= config.high_risk_threshold {
        RiskLevel::High
    } else if probability >= config.medium_risk_threshold {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}
