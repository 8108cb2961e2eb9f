//! Storage module with pluggable backends.
//!
//! Two concerns live here, both trait-based so tests can swap in memory
//! backends:
//! - patient records (read side - the pipeline's input)
//! - diagnostic reports (write side - one row per run, keyed by patient id)

mod record;
mod report;

pub use record::{InMemoryRecordStore, PatientRecord, RecordStore, SqliteRecordStore};
pub use report::{InMemoryReportSink, ReportSink, SavedReport, SqliteReportSink};

use thiserror::Error;

/// Errors from storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}
