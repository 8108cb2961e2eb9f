//! # consilium
//!
//! Hierarchical LLM agent pipeline for patient-record diagnostic reports.
//!
//! A top-level Chief decomposes a free-form request into sub-tasks, a
//! Manager per sub-task decomposes it into executable steps, Workers execute
//! the steps against a linearly growing context, and the results are
//! summarized bottom-up into one written report.
//!
//! ## Task Flow
//! 1. Look up the patient record (abort early on a miss)
//! 2. Enrich the prompt with PubMed literature (best effort)
//! 3. Run the three-tier hierarchy over the assembled input
//! 4. Persist `{reasoning trace, final report}` keyed by patient id
//!
//! ## Modules
//! - `agents`: the Agent type, bounded memory, decomposition, prompts
//! - `hierarchy`: the orchestration protocol and its state machine
//! - `llm`: completion client abstraction + OpenAI-compatible HTTP client
//! - `literature`: PubMed E-utilities enrichment
//! - `store`: patient record provider and report sink (SQLite + in-memory)

pub mod agents;
pub mod config;
pub mod hierarchy;
pub mod literature;
pub mod llm;
pub mod store;

pub use config::Config;
pub use hierarchy::{HierarchicalRunner, RunResult, RunnerParams};
