//! Patient record provider.
//!
//! A record is an ordered mapping of field name to value; its rendered
//! string form is embedded verbatim into the initial prompt. No field-level
//! validation occurs here.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::StoreError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS patients (
    imaging_id TEXT PRIMARY KEY NOT NULL,
    fields_json TEXT NOT NULL
);
"#;

/// One patient's record, keyed by imaging id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientRecord {
    pub imaging_id: String,
    /// Field name/value pairs in their stored order.
    pub fields: Vec<(String, String)>,
}

impl PatientRecord {
    pub fn new(imaging_id: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        Self {
            imaging_id: imaging_id.into(),
            fields,
        }
    }

    /// Render the record as `field: value` lines for prompt embedding.
    pub fn render(&self) -> String {
        let mut out = format!("imaging_id: {}", self.imaging_id);
        for (name, value) in &self.fields {
            out.push('\n');
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
        }
        out
    }

    /// Render the first `limit` fields, for echoing back to the user before
    /// analysis starts.
    pub fn preview(&self, limit: usize) -> String {
        self.fields
            .iter()
            .take(limit)
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Read-side store for patient records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up a record. A missing id is `Ok(None)` - the caller reports it
    /// before any agent is constructed; no partial run is attempted.
    async fn lookup(&self, imaging_id: &str) -> Result<Option<PatientRecord>, StoreError>;
}

/// SQLite-backed record store.
///
/// rusqlite is synchronous; every database call runs inside
/// `spawn_blocking` so it never blocks an executor thread.
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// Open (creating if needed) the patient database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, StoreError> {
            let conn = Connection::open(&path)?;
            conn.execute_batch(SCHEMA)?;
            Ok(conn)
        })
        .await
        .map_err(|e| StoreError::Corrupt(format!("task join error: {e}")))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert or replace one record. Used for seeding and tests.
    pub async fn insert(&self, record: &PatientRecord) -> Result<(), StoreError> {
        let fields_json = serde_json::to_string(&record.fields)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let imaging_id = record.imaging_id.clone();
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT OR REPLACE INTO patients (imaging_id, fields_json) VALUES (?1, ?2)",
                params![imaging_id, fields_json],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Corrupt(format!("task join error: {e}")))??;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn lookup(&self, imaging_id: &str) -> Result<Option<PatientRecord>, StoreError> {
        let imaging_id = imaging_id.to_string();
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<Option<PatientRecord>, StoreError> {
            let conn = conn.blocking_lock();
            let row: Option<String> = conn
                .query_row(
                    "SELECT fields_json FROM patients WHERE imaging_id = ?1",
                    params![imaging_id],
                    |row| row.get(0),
                )
                .optional()?;

            match row {
                Some(fields_json) => {
                    let fields: Vec<(String, String)> = serde_json::from_str(&fields_json)
                        .map_err(|e| StoreError::Corrupt(e.to_string()))?;
                    Ok(Some(PatientRecord::new(imaging_id, fields)))
                }
                None => Ok(None),
            }
        })
        .await
        .map_err(|e| StoreError::Corrupt(format!("task join error: {e}")))?
    }
}

/// In-memory record store (non-persistent, for tests).
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<HashMap<String, PatientRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: PatientRecord) {
        self.records
            .lock()
            .await
            .insert(record.imaging_id.clone(), record);
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn lookup(&self, imaging_id: &str) -> Result<Option<PatientRecord>, StoreError> {
        Ok(self.records.lock().await.get(imaging_id).cloned())
    }
}
