use rusqlite::Connection;

pub fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS scored_records (
            transaction_id    TEXT PRIMARY KEY,
            fraud_probability REAL NOT NULL,
            fraud_flag        INTEGER NOT NULL,
            risk_level        TEXT NOT NULL,
            reasons           TEXT, -- JSON array
            amount            REAL NOT NULL,
            merchant          TEXT NOT NULL,
            category          TEXT NOT NULL,
            hour_of_day       INTEGER NOT NULL,
            created_at        TEXT NOT NULL,
            updated_at        TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS alerts (
            transaction_id TEXT PRIMARY KEY,
            risk_level     TEXT NOT NULL,
            reasons        TEXT, -- JSON array
            status         TEXT NOT NULL,
            created_at     TEXT NOT NULL,
            updated_at     TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_records_risk ON scored_records(risk_level);
        CREATE INDEX IF NOT EXISTS idx_records_flag ON scored_records(fraud_flag);
        CREATE INDEX IF NOT EXISTS idx_records_created ON scored_records(created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_alerts_status ON alerts(status);
        CREATE INDEX IF NOT EXISTS idx_alerts_created ON alerts(created_at DESC);
        ",
    )?;
    Ok(())
}
