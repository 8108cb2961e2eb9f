//! Hierarchical orchestration - the three-tier decomposition, execution and
//! aggregation protocol.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     HierarchicalRunner                   │
//! └───────────────────────────┬──────────────────────────────┘
//!                             │ decompose(initial input)
//!                             ▼
//!                        ┌─────────┐
//!                        │  Chief  │────────────► final report
//!                        └────┬────┘   aggregate
//!            ┌────────────────┼────────────────┐
//!            ▼                ▼                ▼
//!      ┌──────────┐     ┌──────────┐     ┌──────────┐
//!      │ Manager  │     │ Manager  │     │ Manager  │  one per task
//!      └────┬─────┘     └────┬─────┘     └────┬─────┘
//!        ┌──┴──┐          ┌──┴──┐          ┌──┴──┐
//!        ▼     ▼          ▼     ▼          ▼     ▼
//!       W1    W2         W3    W4         W5    W6    one per step
//! ```
//!
//! Steps within a task are causally chained: each Worker sees the initial
//! input plus every earlier step's output, threaded through one growing
//! context string. Sibling tasks share nothing.

mod runner;

pub use runner::{HierarchicalRunner, RunnerParams, NO_SUBTASKS_MESSAGE};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agents::AgentError;

/// Ordered, append-only log of every tier's intermediate output.
///
/// Observability only - nothing reads it to make control decisions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReasoningTrace {
    entries: Vec<String>,
}

impl ReasoningTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the trace as one string, entries separated by blank lines.
    pub fn render(&self) -> String {
        self.entries.join("\n\n")
    }
}

/// Outcome of one full hierarchical run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub trace: ReasoningTrace,
    pub final_report: String,
}

/// Errors that abort a run.
///
/// Worker and Manager failures degrade locally and never surface here; the
/// only whole-run failure paths are listed below.
#[derive(Debug, Error)]
pub enum RunError {
    /// The Chief's final aggregation call failed. Without it there is no
    /// report to salvage.
    #[error("final aggregation failed: {0}")]
    Completion(#[from] AgentError),
}

/// Derive a trace-friendly agent name from a task or step name.
///
/// Whitespace runs become single underscores. Used only for traceability,
/// never for lookup.
pub fn sanitize_name(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last_was_sep = false;
    for ch in value.trim().chars() {
        if ch.is_whitespace() {
            if !last_was_sep {
                out.push('_');
                last_was_sep = true;
            }
        } else {
            out.push(ch);
            last_was_sep = false;
        }
    }
    if out.is_empty() {
        "unnamed".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("check vitals"), "check_vitals");
        assert_eq!(sanitize_name("  a   b  "), "a_b");
        assert_eq!(sanitize_name("plain"), "plain");
        assert_eq!(sanitize_name("   "), "unnamed");
    }

    #[test]
    fn test_trace_is_append_only_and_ordered() {
        let mut trace = ReasoningTrace::new();
        trace.push("first");
        trace.push("second");
        assert_eq!(trace.entries(), ["first", "second"]);
        assert_eq!(trace.render(), "first\n\nsecond");
    }
}
