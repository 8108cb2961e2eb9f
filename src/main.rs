//! consilium - CLI entry point.
//!
//! Reads a patient imaging id (and optionally a question) from stdin, runs
//! the hierarchical analysis, persists the result, and prints the final
//! report.

use std::io::{self, BufRead, Write as _};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use consilium::agents::prompts;
use consilium::config::Config;
use consilium::hierarchy::{HierarchicalRunner, RunnerParams};
use consilium::literature::{LiteratureClient, PubMedClient};
use consilium::llm::OpenAiCompatClient;
use consilium::store::{RecordStore, ReportSink, SqliteRecordStore, SqliteReportSink};

const DEFAULT_QUESTION: &str =
    "Analyze this patient's data and produce a diagnostic report.";

/// Fallback literature search term when the record carries no disease field.
const DEFAULT_SEARCH_TERM: &str = "Thymus";

/// How many record fields to echo back to the user before analysis.
const RECORD_PREVIEW_FIELDS: usize = 5;

fn main() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async_main())
}

async fn async_main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "consilium=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(model = %config.model, "Loaded configuration");

    let imaging_id = prompt_line("Imaging id: ")?;
    if imaging_id.is_empty() {
        anyhow::bail!("an imaging id is required");
    }
    let question = match prompt_line("Question (blank for default): ")?.as_str() {
        "" => DEFAULT_QUESTION.to_string(),
        other => other.to_string(),
    };

    // Look up the patient record; a miss terminates before any agent exists.
    let record_store = SqliteRecordStore::open(&config.patient_db).await?;
    let Some(record) = record_store.lookup(&imaging_id).await? else {
        println!("No data found for imaging id '{imaging_id}'.");
        return Ok(());
    };
    info!(imaging_id = %imaging_id, fields = record.fields.len(), "Patient record loaded");
    println!("Patient record found:");
    println!("{}", record.preview(RECORD_PREVIEW_FIELDS));

    // Literature enrichment is best effort: a failure degrades to an
    // empty citation list, never to a run failure.
    let term = record
        .fields
        .iter()
        .find(|(name, _)| name == "disease")
        .map(|(_, value)| value.clone())
        .unwrap_or_else(|| DEFAULT_SEARCH_TERM.to_string());
    let citations = match PubMedClient::new()
        .search(&term, config.pubmed_max_results)
        .await
    {
        Ok(citations) => citations,
        Err(e) => {
            warn!(term = %term, error = %e, "Literature lookup failed; continuing without it");
            Vec::new()
        }
    };
    info!(citations = citations.len(), "Literature enrichment done");

    let initial_input = prompts::initial_input(&record, &citations, &question);

    let client = Arc::new(OpenAiCompatClient::new(
        &config.base_url,
        &config.api_key,
        Duration::from_secs(config.timeout_secs),
    ));
    let params = RunnerParams {
        model: config.model.clone(),
        temperature: config.temperature,
        max_context_chars: config.max_context_chars,
        ..RunnerParams::default()
    };
    let result = HierarchicalRunner::new(client, params)
        .run(&initial_input)
        .await?;

    if let Some(parent) = config.report_db.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let sink = SqliteReportSink::open(&config.report_db).await?;
    let run_id = sink.save(&imaging_id, &question, &result).await?;
    info!(run_id = %run_id, "Report persisted");

    println!("\n=== Final report (run {run_id}) ===\n");
    println!("{}", result.final_report);

    Ok(())
}

fn prompt_line(prompt: &str) -> io::Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
