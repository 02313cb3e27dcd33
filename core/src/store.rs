//! SQLite adapter for the processed records table.
//!
//! RULE: Only store.rs talks to the database.
//! The engines never execute SQL; they receive records already loaded.
//!
//! Months are stored as TEXT `YYYY-MM-01`. Metric columns are nullable
//! REAL, NULL meaning absent.

use crate::{
    error::{EngineError, EngineResult},
    record::{Metric, Record},
    types::Month,
};
use chrono::NaiveDate;
use rusqlite::{params_from_iter, types::Value, Connection, ErrorCode};

const MONTH_FORMAT: &str = "%Y-%m-%d";

pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Open (or create) the records database at `path`.
    pub fn open(path: &str) -> EngineResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> EngineResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> EngineResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_records.sql"))?;
        Ok(())
    }

    // ── Writes ─────────────────────────────────────────────────

    pub fn insert_record(&self, record: &Record) -> EngineResult<()> {
        insert_into(&self.conn, record)
    }

    /// Insert many records in one transaction. Any failure rolls back all.
    pub fn insert_records(&mut self, records: &[Record]) -> EngineResult<usize> {
        let tx = self.conn.transaction()?;
        for r in records {
            insert_into(&tx, r)?;
        }
        tx.commit()?;
        log::info!("Imported {} records", records.len());
        Ok(records.len())
    }

    // ── Reads ──────────────────────────────────────────────────

    pub fn all_records(&self) -> EngineResult<Vec<Record>> {
        self.query_records("", &[])
    }

    pub fn records_for_month(&self, month: Month) -> EngineResult<Vec<Record>> {
        let month = month.format(MONTH_FORMAT).to_string();
        self.query_records("WHERE month = ?1", &[Value::Text(month)])
    }

    /// Distinct months present, oldest first.
    pub fn months(&self) -> EngineResult<Vec<Month>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT month FROM record ORDER BY month ASC")?;
        let raw = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        raw.iter().map(|m| parse_month(m)).collect()
    }

    fn query_records(&self, filter: &str, args: &[Value]) -> EngineResult<Vec<Record>> {
        let sql = format!(
            "SELECT state, district, month, {} FROM record {filter}
             ORDER BY month ASC, state ASC, district ASC",
            metric_columns().join(", ")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                let metrics = (0..Metric::ALL.len())
                    .map(|i| row.get::<_, Option<f64>>(i + 3))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    metrics,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(state, district, month, metrics)| {
                let mut record = Record::new(state, district, parse_month(&month)?);
                for (metric, value) in Metric::ALL.iter().zip(metrics) {
                    if let Some(v) = value {
                        record.set(*metric, v);
                    }
                }
                Ok(record)
            })
            .collect()
    }
}

fn insert_into(conn: &Connection, record: &Record) -> EngineResult<()> {
    let columns = metric_columns().join(", ");
    let placeholders = (1..=Metric::ALL.len() + 3)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO record (state, district, month, {columns}) VALUES ({placeholders})"
    );

    let mut values: Vec<Value> = vec![
        Value::Text(record.state.clone()),
        Value::Text(record.district.clone()),
        Value::Text(record.month.format(MONTH_FORMAT).to_string()),
    ];
    values.extend(Metric::ALL.iter().map(|m| match record.get(*m) {
        Some(v) => Value::Real(v),
        None => Value::Null,
    }));

    match conn.execute(&sql, params_from_iter(values)) {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            Err(EngineError::DuplicateRecord {
                state:    record.state.clone(),
                district: record.district.clone(),
                month:    record.month,
            })
        }
        Err(e) => Err(e.into()),
    }
}

fn metric_columns() -> Vec<&'static str> {
    Metric::ALL.iter().map(|m| m.name()).collect()
}

fn parse_month(raw: &str) -> EngineResult<Month> {
    NaiveDate::parse_from_str(raw, MONTH_FORMAT)
        .map_err(|e| EngineError::Other(anyhow::anyhow!("Bad month '{raw}' in record table: {e}")))
}
