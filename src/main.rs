mod alerts;
mod config;
mod core;
mod db;
mod export;
mod ingest;
mod scoring;
mod stats;

use std::path::Path;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::core::pipeline::Pipeline;
use crate::db::SharedDatabase;

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("fraudlens=info".parse().unwrap()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let input = match args.next() {
        Some(path) => path,
        None => {
            eprintln!("Usage: fraudlens <input-file> [config-file]");
            std::process::exit(2);
        }
    };
    let config_path = args.next().unwrap_or_else(|| "config.toml".to_string());

    tracing::info!("fraudlens starting, input={input}");
    let config = Config::load(&config_path);

    // Batch I/O failure is fatal: no rows were processed.
    let rows = match ingest::read_rows(Path::new(&input)) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Batch failed before processing (0 records scored): {e}");
            std::process::exit(1);
        }
    };

    let pipeline = Pipeline::new(config.scoring.clone());
    let result = pipeline.run(&rows);
    tracing::info!(
        "Preprocessing: {}/{} rows kept ({:.1}% removed)",
        result.preprocessing.cleaned_count,
        result.preprocessing.original_count,
        result.preprocessing.removal_rate * 100.0
    );

    let db_path = Path::new(&config.database.path);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create database directory");
    }
    let db = SharedDatabase::open(db_path).expect("Failed to open results database");

    match db.store_records_batch(&result.predictions) {
        Ok(outcome) => tracing::info!(
            "Persisted records: {} inserted, {} upserted, {} failed",
            outcome.inserted,
            outcome.upserted,
            outcome.failed
        ),
        Err(e) => {
            tracing::error!(
                "Persistence failed after scoring {} records: {e}",
                result.summary.total
            );
            std::process::exit(1);
        }
    }

    let batch_alerts = alerts::generate_alerts(&result.predictions);
    match db.store_alerts(&batch_alerts) {
        Ok(written) => tracing::info!("Raised {written} alerts"),
        Err(e) => tracing::error!("Failed to persist alerts: {e}"),
    }

    let rollup = stats::aggregate(&result.predictions, None);
    tracing::info!(
        "Summary: {} scored, {} fraudulent, {} high / {} medium / {} low, avg probability {:.3}",
        rollup.total,
        rollup.fraud_count,
        rollup.risk_counts.high,
        rollup.risk_counts.medium,
        rollup.risk_counts.low,
        rollup.average_probability
    );

    if config.export.enabled {
        match export::write_report(Path::new(&config.export.dir), &result.predictions) {
            Ok(path) => tracing::info!("Report written to {}", path.display()),
            Err(e) => tracing::error!("Failed to write report: {e}"),
        }
    }
}
