use std::fs::File;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::core::RawRecord;

/// Batch-level input failure. Unlike row rejection this is fatal: the run
/// produces no partial output.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed CSV input: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed JSON input: {0}")]
    Json(#[from] serde_json::Error),
    #[error("JSON input must be an array of objects")]
    JsonShape,
    #[error("input contains no data rows")]
    Empty,
}

/// Read a batch of raw rows, dispatching on file extension. `.json` parses
/// as a JSON array of objects; everything else is treated as delimited
/// tabular data with a header row.
pub fn read_rows(path: &Path) -> Result<Vec<RawRecord>, IngestError> {
    let rows = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => read_json(path)?,
        _ => read_csv(path)?,
    };
    if rows.is_empty() {
        return Err(IngestError::Empty);
    }
    info!("Read {} raw rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Header row + data rows, comma-separated, UTF-8. Every cell comes in as a
/// string; the normalizer handles typing.
pub fn read_csv(path: &Path) -> Result<Vec<RawRecord>, IngestError> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(file);
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut row = RawRecord::new();
        for (header, cell) in headers.iter().zip(record.iter()) {
            row.insert(header.to_string(), Value::String(cell.to_string()));
        }
        rows.push(row);
    }
    Ok(rows)
}

/// A JSON array of objects with the same field aliases as the CSV headers.
pub fn read_json(path: &Path) -> Result<Vec<RawRecord>, IngestError> {
    let contents = std::fs::read_to_string(path)?;
    let parsed: Value = serde_json::from_str(&contents)?;
    let Value::Array(items) = parsed else {
        return Err(IngestError::JsonShape);
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            _ => Err(IngestError::JsonShape),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "fraudlens_ingest_{}_{}_{}",
            std::process::id(),
            id,
            name
        ));
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_csv_with_headers() {
        let path = temp_file(
            "batch.csv",
            "Transaction_ID,Amount,Category\nTX1,100.50,Retail\nTX2,\"$2,000\",ATM\n",
        );
        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Transaction_ID"], Value::String("TX1".to_string()));
        assert_eq!(rows[1]["Amount"], Value::String("$2,000".to_string()));
    }

    #[test]
    fn reads_json_array() {
        let path = temp_file(
            "batch.json",
            r#"[{"transaction_id":"TX1","amount":50.5},{"transaction_id":"TX2","amount":"75"}]"#,
        );
        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["transaction_id"], Value::String("TX1".to_string()));
        assert!(rows[0]["amount"].is_number());
    }

    #[test]
    fn header_only_csv_is_empty_error() {
        let path = temp_file("empty.csv", "Transaction_ID,Amount\n");
        assert!(matches!(read_rows(&path), Err(IngestError::Empty)));
    }

    #[test]
    fn empty_json_array_is_empty_error() {
        let path = temp_file("empty.json", "[]");
        assert!(matches!(read_rows(&path), Err(IngestError::Empty)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = Path::new("/nonexistent/batch.csv");
        assert!(matches!(read_rows(path), Err(IngestError::Io(_))));
    }

    #[test]
    fn malformed_json_is_fatal() {
        let path = temp_file("broken.json", "{not json");
        assert!(matches!(read_rows(&path), Err(IngestError::Json(_))));
    }

    #[test]
    fn json_non_object_elements_rejected() {
        let path = temp_file("shape.json", r#"[1, 2, 3]"#);
        assert!(matches!(read_rows(&path), Err(IngestError::JsonShape)));
    }

    #[test]
    fn json_non_array_rejected() {
        let path = temp_file("obj.json", r#"{"transaction_id":"TX1"}"#);
        assert!(matches!(read_rows(&path), Err(IngestError::JsonShape)));
    }
}
