//! Result sink - persists one row per completed run, keyed by patient id.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::hierarchy::RunResult;

use super::StoreError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS reports (
    run_id TEXT PRIMARY KEY NOT NULL,
    imaging_id TEXT NOT NULL,
    question TEXT NOT NULL,
    reasoning_trace TEXT NOT NULL,
    final_report TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reports_imaging_id ON reports(imaging_id);
"#;

/// A persisted run, as read back from the sink.
#[derive(Debug, Clone)]
pub struct SavedReport {
    pub run_id: Uuid,
    pub imaging_id: String,
    pub question: String,
    pub reasoning_trace: String,
    pub final_report: String,
    pub created_at: String,
}

/// Write-side sink for completed runs.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Persist one run. Returns the run id assigned to the row.
    async fn save(
        &self,
        imaging_id: &str,
        question: &str,
        result: &RunResult,
    ) -> Result<Uuid, StoreError>;
}

/// SQLite-backed report sink.
///
/// As with the record store, every database call runs inside
/// `spawn_blocking`.
pub struct SqliteReportSink {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteReportSink {
    /// Open (creating if needed) the report database at `path`.
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

    /// List all saved runs for one patient, oldest first.
    pub async fn list_for_patient(&self, imaging_id: &str) -> Result<Vec<SavedReport>, StoreError> {
        let imaging_id = imaging_id.to_string();
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<SavedReport>, StoreError> {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(
                "SELECT run_id, imaging_id, question, reasoning_trace, final_report, created_at
                 FROM reports WHERE imaging_id = ?1 ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map(params![imaging_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?;

            let mut reports = Vec::new();
            for row in rows {
                let (run_id, imaging_id, question, reasoning_trace, final_report, created_at) =
                    row?;
                let run_id = Uuid::parse_str(&run_id)
                    .map_err(|e| StoreError::Corrupt(format!("bad run id: {e}")))?;
                reports.push(SavedReport {
                    run_id,
                    imaging_id,
                    question,
                    reasoning_trace,
                    final_report,
                    created_at,
                });
            }
            Ok(reports)
        })
        .await
        .map_err(|e| StoreError::Corrupt(format!("task join error: {e}")))?
    }
}

#[async_trait]
impl ReportSink for SqliteReportSink {
    async fn save(
        &self,
        imaging_id: &str,
        question: &str,
        result: &RunResult,
    ) -> Result<Uuid, StoreError> {
        let run_id = Uuid::new_v4();
        let imaging_id = imaging_id.to_string();
        let question = question.to_string();
        let reasoning_trace = result.trace.render();
        let final_report = result.final_report.clone();
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO reports (run_id, imaging_id, question, reasoning_trace, final_report, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    run_id.to_string(),
                    imaging_id,
                    question,
                    reasoning_trace,
                    final_report,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Corrupt(format!("task join error: {e}")))??;
        Ok(run_id)
    }
}

/// In-memory report sink (non-persistent, for tests).
#[derive(Default)]
pub struct InMemoryReportSink {
    saved: Mutex<Vec<SavedReport>>,
}

impl InMemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn saved(&self) -> Vec<SavedReport> {
        self.saved.lock().await.clone()
    }
}

#[async_trait]
impl ReportSink for InMemoryReportSink {
    async fn save(
        &self,
        imaging_id: &str,
        question: &str,
        result: &RunResult,
    ) -> Result<Uuid, StoreError> {
        let run_id = Uuid::new_v4();
        self.saved.lock().await.push(SavedReport {
            run_id,
            imaging_id: imaging_id.to_string(),
            question: question.to_string(),
            reasoning_trace: result.trace.render(),
            final_report: result.final_report.clone(),
            created_at: Utc::now().to_rfc3339(),
        });
        Ok(run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::ReasoningTrace;

    fn sample_result() -> RunResult {
        let mut trace = ReasoningTrace::new();
        trace.push("[chief] decomposed");
        trace.push("[worker] BP elevated");
        RunResult {
            trace,
            final_report: "the report".to_string(),
        }
    }

    #[tokio::test]
    async fn test_sqlite_one_row_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SqliteReportSink::open(dir.path().join("reports.db"))
            .await
            .unwrap();

        let first = sink.save("10578915", "q1", &sample_result()).await.unwrap();
        let second = sink.save("10578915", "q2", &sample_result()).await.unwrap();
        assert_ne!(first, second);

        let rows = sink.list_for_patient("10578915").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].final_report, "the report");
        assert!(rows[0].reasoning_trace.contains("BP elevated"));

        assert!(sink.list_for_patient("other").await.unwrap().is_empty());
    }

    // Writes run off the executor; saves issued from concurrent tasks must
    // all land even on a small worker pool.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sqlite_concurrent_saves() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(
            SqliteReportSink::open(dir.path().join("reports.db"))
                .await
                .unwrap(),
        );

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = sink.clone();
                tokio::spawn(async move {
                    sink.save("10578915", &format!("q{i}"), &sample_result())
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let rows = sink.list_for_patient("10578915").await.unwrap();
        assert_eq!(rows.len(), 8);
    }

    #[tokio::test]
    async fn test_in_memory_sink_records_runs() {
        let sink = InMemoryReportSink::new();
        sink.save("id", "question", &sample_result()).await.unwrap();
        let saved = sink.saved().await;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].question, "question");
    }
}
