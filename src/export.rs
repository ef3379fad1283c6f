use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;

use crate::core::ScoredRecord;

/// Write one pipeline run's predictions as a CSV report with the persisted
/// record column set. Returns the path of the file written; the filename is
/// timestamped so each run gets its own file.
pub fn write_report(dir: &Path, records: &[ScoredRecord]) -> Result<PathBuf, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;
    let now = Utc::now();
    let path = dir.join(format!("fraud_report_{}.csv", now.format("%Y%m%d_%H%M%S")));

    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record([
        "transaction_id",
        "fraud_probability",
        "fraud_flag",
        "risk_level",
        "reasons",
        "created_at",
        "updated_at",
    ])?;

    let written_at = now.to_rfc3339();
    for record in records {
        let probability = format!("{:.4}", record.fraud_probability);
        let reasons = record.reasons.join("; ");
        writer.write_record([
            record.transaction_id(),
            probability.as_str(),
            if record.fraud_flag { "true" } else { "false" },
            record.risk_level.as_str(),
            reasons.as_str(),
            written_at.as_str(),
            written_at.as_str(),
        ])?;
    }
    writer.flush()?;

    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(path)
}
