pub mod schema;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::alerts::{AlertRecord, AlertStatus};
use crate::core::ScoredRecord;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A scored record as persisted. Timestamps are stored as formatted text,
/// reasons as a JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub transaction_id: String,
    pub fraud_probability: f64,
    pub fraud_flag: bool,
    pub risk_level: String,
    pub reasons: Vec<String>,
    pub amount: f64,
    pub merchant: String,
    pub category: String,
    pub hour_of_day: u32,
    pub created_at: String,
    pub updated_at: String,
}

/// A persisted alert row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAlert {
    pub transaction_id: String,
    pub risk_level: String,
    pub reasons: Vec<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Outcome of a batch persistence call. Per-record failures after the upsert
/// fallback are counted here, never raised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistOutcome {
    pub inserted: usize,
    pub upserted: usize,
    pub failed: usize,
}

pub struct Database {
    conn: Connection,
}

/// Thread-safe wrapper around Database.
#[derive(Clone)]
pub struct SharedDatabase {
    inner: Arc<Mutex<Database>>,
}

impl SharedDatabase {
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let db = Database::open(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(db)),
        })
    }

    /// Insert or replace one scored record, keyed by transaction id.
    pub fn upsert_record(&self, record: &ScoredRecord) -> Result<(), rusqlite::Error> {
        let db = self.inner.lock().unwrap();
        db.upsert_record(record)
    }

    /// Persist a batch: bulk insert first, falling back to per-record upsert
    /// when the bulk insert hits a duplicate key.
    pub fn store_records_batch(&self, records: &[ScoredRecord]) -> Result<PersistOutcome, rusqlite::Error> {
        let db = self.inner.lock().unwrap();
        db.store_records_batch(records)
    }

    pub fn get_recent_records(&self, limit: usize) -> Result<Vec<StoredRecord>, rusqlite::Error> {
        let db = self.inner.lock().unwrap();
        db.get_recent_records(limit)
    }

    pub fn get_records_by_timerange(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StoredRecord>, rusqlite::Error> {
        let db = self.inner.lock().unwrap();
        db.get_records_by_timerange(from, to)
    }

    pub fn get_records_by_risk(&self, risk_level: &str, limit: usize) -> Result<Vec<StoredRecord>, rusqlite::Error> {
        let db = self.inner.lock().unwrap();
        db.get_records_by_risk(risk_level, limit)
    }

    pub fn get_flagged_records(&self, limit: usize) -> Result<Vec<StoredRecord>, rusqlite::Error> {
        let db = self.inner.lock().unwrap();
        db.get_flagged_records(limit)
    }

    pub fn record_count(&self) -> Result<usize, rusqlite::Error> {
        let db = self.inner.lock().unwrap();
        db.record_count()
    }

    /// Insert or replace one alert, keyed by transaction id. Re-submitting a
    /// batch therefore never duplicates alerts.
    pub fn upsert_alert(&self, alert: &AlertRecord) -> Result<(), rusqlite::Error> {
        let db = self.inner.lock().unwrap();
        db.upsert_alert(alert)
    }

    /// Upsert a set of alerts, returning how many were written.
    pub fn store_alerts(&self, alerts: &[AlertRecord]) -> Result<usize, rusqlite::Error> {
        let db = self.inner.lock().unwrap();
        db.store_alerts(alerts)
    }

    pub fn get_open_alerts(&self, limit: usize) -> Result<Vec<StoredAlert>, rusqlite::Error> {
        let db = self.inner.lock().unwrap();
        db.get_open_alerts(limit)
    }

    /// Move an alert through its review lifecycle. Returns false if the
    /// transaction id is unknown.
    pub fn update_alert_status(&self, transaction_id: &str, status: AlertStatus) -> Result<bool, rusqlite::Error> {
        let db = self.inner.lock().unwrap();
        db.update_alert_status(transaction_id, status)
    }

    pub fn alert_count(&self) -> Result<usize, rusqlite::Error> {
        let db = self.inner.lock().unwrap();
        db.alert_count()
    }
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    fn reasons_json(reasons: &[String]) -> String {
        serde_json::to_string(reasons).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn upsert_record(&self, record: &ScoredRecord) -> Result<(), rusqlite::Error> {
        let now = Utc::now().format(TIME_FORMAT).to_string();
        self.conn.execute(
            "INSERT INTO scored_records
                (transaction_id, fraud_probability, fraud_flag, risk_level, reasons,
                 amount, merchant, category, hour_of_day, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
             ON CONFLICT(transaction_id) DO UPDATE SET
                fraud_probability = excluded.fraud_probability,
                fraud_flag = excluded.fraud_flag,
                risk_level = excluded.risk_level,
                reasons = excluded.reasons,
                amount = excluded.amount,
                merchant = excluded.merchant,
                category = excluded.category,
                hour_of_day = excluded.hour_of_day,
                updated_at = excluded.updated_at",
            rusqlite::params![
                record.transaction_id(),
                record.fraud_probability,
                record.fraud_flag as i32,
                record.risk_level.as_str(),
                Self::reasons_json(&record.reasons),
                record.features.record.amount,
                record.features.record.merchant,
                record.features.record.category.as_str(),
                record.features.hour_of_day,
                now,
            ],
        )?;
        Ok(())
    }

    fn insert_records_bulk(&self, records: &[ScoredRecord]) -> Result<(), rusqlite::Error> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO scored_records
                    (transaction_id, fraud_probability, fraud_flag, risk_level, reasons,
                     amount, merchant, category, hour_of_day, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            )?;
            let now = Utc::now().format(TIME_FORMAT).to_string();
            for record in records {
                stmt.execute(rusqlite::params![
                    record.transaction_id(),
                    record.fraud_probability,
                    record.fraud_flag as i32,
                    record.risk_level.as_str(),
                    Self::reasons_json(&record.reasons),
                    record.features.record.amount,
                    record.features.record.merchant,
                    record.features.record.category.as_str(),
                    record.features.hour_of_day,
                    now,
                ])?;
            }
        }
        tx.commit()
    }

    pub fn store_records_batch(&self, records: &[ScoredRecord]) -> Result<PersistOutcome, rusqlite::Error> {
        match self.insert_records_bulk(records) {
            Ok(()) => Ok(PersistOutcome {
                inserted: records.len(),
                ..PersistOutcome::default()
            }),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                // Duplicate keys in the batch or already-persisted ids:
                // retry record-by-record as upserts.
                warn!("Bulk insert hit a duplicate key, retrying batch as per-record upserts");
                let mut outcome = PersistOutcome::default();
                for record in records {
                    match self.upsert_record(record) {
                        Ok(()) => outcome.upserted += 1,
                        Err(e) => {
                            warn!("Failed to upsert record {}: {e}", record.transaction_id());
                            outcome.failed += 1;
                        }
                    }
                }
                Ok(outcome)
            }
            Err(e) => Err(e),
        }
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<StoredRecord> {
        let flag: i32 = row.get(2)?;
        let reasons_json: Option<String> = row.get(4)?;
        Ok(StoredRecord {
            transaction_id: row.get(0)?,
            fraud_probability: row.get(1)?,
            fraud_flag: flag != 0,
            risk_level: row.get(3)?,
            reasons: reasons_json
                .and_then(|json| serde_json::from_str(&json).ok())
                .unwrap_or_default(),
            amount: row.get(5)?,
            merchant: row.get(6)?,
            category: row.get(7)?,
            hour_of_day: row.get::<_, i64>(8)? as u32,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    const RECORD_COLUMNS: &'static str = "transaction_id, fraud_probability, fraud_flag, risk_level, reasons, \
         amount, merchant, category, hour_of_day, created_at, updated_at";

    pub fn get_recent_records(&self, limit: usize) -> Result<Vec<StoredRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM scored_records ORDER BY created_at DESC LIMIT ?1",
            Self::RECORD_COLUMNS
        ))?;
        let rows = stmt.query_map(rusqlite::params![limit as i64], Self::row_to_record)?;
        rows.collect()
    }

    pub fn get_records_by_timerange(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StoredRecord>, rusqlite::Error> {
        let from_str = from.format(TIME_FORMAT).to_string();
        let to_str = to.format(TIME_FORMAT).to_string();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM scored_records WHERE created_at >= ?1 AND created_at <= ?2 ORDER BY created_at DESC",
            Self::RECORD_COLUMNS
        ))?;
        let rows = stmt.query_map(rusqlite::params![from_str, to_str], Self::row_to_record)?;
        rows.collect()
    }

    pub fn get_records_by_risk(&self, risk_level: &str, limit: usize) -> Result<Vec<StoredRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM scored_records WHERE risk_level = ?1 ORDER BY fraud_probability DESC LIMIT ?2",
            Self::RECORD_COLUMNS
        ))?;
        let rows = stmt.query_map(rusqlite::params![risk_level, limit as i64], Self::row_to_record)?;
        rows.collect()
    }

    pub fn get_flagged_records(&self, limit: usize) -> Result<Vec<StoredRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM scored_records WHERE fraud_flag = 1 ORDER BY fraud_probability DESC LIMIT ?1",
            Self::RECORD_COLUMNS
        ))?;
        let rows = stmt.query_map(rusqlite::params![limit as i64], Self::row_to_record)?;
        rows.collect()
    }

    pub fn record_count(&self) -> Result<usize, rusqlite::Error> {
        self.conn
            .query_row("SELECT COUNT(*) FROM scored_records", [], |row| {
                row.get::<_, i64>(0).map(|c| c as usize)
            })
    }

    pub fn upsert_alert(&self, alert: &AlertRecord) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO alerts (transaction_id, risk_level, reasons, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(transaction_id) DO UPDATE SET
                risk_level = excluded.risk_level,
                reasons = excluded.reasons,
                updated_at = excluded.updated_at",
            rusqlite::params![
                alert.transaction_id,
                alert.risk_level.as_str(),
                Self::reasons_json(&alert.reasons),
                alert.status.as_str(),
                alert.created_at.format(TIME_FORMAT).to_string(),
                alert.updated_at.format(TIME_FORMAT).to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn store_alerts(&self, alerts: &[AlertRecord]) -> Result<usize, rusqlite::Error> {
        let tx = self.conn.unchecked_transaction()?;
        let mut written = 0;
        for alert in alerts {
            self.upsert_alert(alert)?;
            written += 1;
        }
        tx.commit()?;
        Ok(written)
    }

    fn row_to_alert(row: &rusqlite::Row) -> rusqlite::Result<StoredAlert> {
        let reasons_json: Option<String> = row.get(2)?;
        Ok(StoredAlert {
            transaction_id: row.get(0)?,
            risk_level: row.get(1)?,
            reasons: reasons_json
                .and_then(|json| serde_json::from_str(&json).ok())
                .unwrap_or_default(),
            status: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    pub fn get_open_alerts(&self, limit: usize) -> Result<Vec<StoredAlert>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT transaction_id, risk_level, reasons, status, created_at, updated_at
             FROM alerts WHERE status = 'open' ORDER BY created_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(rusqlite::params![limit as i64], Self::row_to_alert)?;
        rows.collect()
    }

    pub fn update_alert_status(&self, transaction_id: &str, status: AlertStatus) -> Result<bool, rusqlite::Error> {
        let now = Utc::now().format(TIME_FORMAT).to_string();
        let changed = self.conn.execute(
            "UPDATE alerts SET status = ?1, updated_at = ?2 WHERE transaction_id = ?3",
            rusqlite::params![status.as_str(), now, transaction_id],
        )?;
        Ok(changed > 0)
    }

    pub fn alert_count(&self) -> Result<usize, rusqlite::Error> {
        self.conn.query_row("SELECT COUNT(*) FROM alerts", [], |row| {
            row.get::<_, i64>(0).map(|c| c as usize)
        })
    }
}
