use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub scoring: ScoringConfig,
    pub database: DatabaseConfig,
    pub export: ExportConfig,
}

/// Thresholds shared by the scorer and the alert policy. Keeping them in one
/// structure prevents scoring and alerting cutoffs from drifting apart.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScoringConfig {
    pub base_score: f64,
    /// Amount tier boundaries, highest wins: > high → +0.6, > elevated →
    /// +0.4, > notable → +0.2.
    pub amount_tier_high: f64,
    pub amount_tier_elevated: f64,
    pub amount_tier_notable: f64,
    /// Probability above which a record is flagged fraudulent.
    pub fraud_flag_threshold: f64,
    pub high_risk_threshold: f64,
    pub medium_risk_threshold: f64,
    /// Upper bound (exclusive) of the uniform noise term.
    pub noise_ceiling: f64,
    /// Final probability floor.
    pub min_probability: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExportConfig {
    pub enabled: bool,
    pub dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            database: DatabaseConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_score: 0.2,
            amount_tier_high: 1000.0,
            amount_tier_elevated: 500.0,
            amount_tier_notable: 100.0,
            fraud_flag_threshold: 0.3,
            high_risk_threshold: 0.5,
            medium_risk_threshold: 0.3,
            noise_ceiling: 0.3,
            min_probability: 0.1,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/fraudlens.db".into(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: "reports".into(),
        }
    }
}

impl Config {
    /// Load config from a TOML file. Falls back to defaults if file doesn't exist.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Config loaded from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", path.display());
                Self::default()
            }
        }
    }
}
