//! The hierarchical runner - drives the decomposition, execution and
//! aggregation protocol across the three tiers.
//!
//! # Control flow
//! 1. Chief decomposes the initial input into tasks. An empty decomposition
//!    here is the only whole-run failure path: the run terminates with a
//!    fixed message and no Manager or Worker is ever constructed.
//! 2. Per task, in chief order: a fresh Manager decomposes the sub-task goal
//!    into steps. Empty means this task is skipped with a note; the run
//!    continues.
//! 3. Per step, in manager order: a fresh Worker executes the instruction
//!    against the accumulated step context. Context grows monotonically;
//!    step j's prompt never contains step j+1's output.
//! 4. The Manager summarizes its task from the full step context.
//! 5. The Chief aggregates all summaries plus the original input into the
//!    final report.
//!
//! # Failure policy
//! Completion failures are typed at the agent boundary; the runner decides
//! per tier. Worker and Manager-summary failures are tolerated and recorded
//! as `Error: <cause>` fragments (so the report may embed them). A Chief
//! aggregation failure aborts the run.

use std::sync::Arc;

use tracing::{info, warn};

use crate::agents::{
    decompose_steps, decompose_tasks, prompts, Agent, AgentParams, AgentRole,
};
use crate::llm::CompletionClient;

use super::{sanitize_name, ReasoningTrace, RunError, RunResult};

/// Terminal message when the Chief cannot decompose the request at all.
pub const NO_SUBTASKS_MESSAGE: &str =
    "The chief could not decompose the request into sub-tasks; no analysis was produced.";

/// Marker inserted when the step context exceeds its character budget.
const CONTEXT_ELISION_MARKER: &str = "\n\n[...earlier step results elided...]\n\n";

/// Tunable parameters for a run.
#[derive(Debug, Clone)]
pub struct RunnerParams {
    /// Model identifier used by every tier.
    pub model: String,
    /// Sampling temperature for every tier.
    pub temperature: f64,
    /// Output ceilings per tier.
    pub chief_max_tokens: u64,
    pub manager_max_tokens: u64,
    pub worker_max_tokens: u64,
    /// Character budget for the growing step context. Defensive; the
    /// completion endpoint has an input limit this protocol does not model.
    pub max_context_chars: usize,
}

impl Default for RunnerParams {
    fn default() -> Self {
        Self {
            model: "qwen-plus".to_string(),
            temperature: 0.7,
            chief_max_tokens: 1000,
            manager_max_tokens: 500,
            worker_max_tokens: 500,
            max_context_chars: 60_000,
        }
    }
}

impl RunnerParams {
    fn chief_params(&self) -> AgentParams {
        AgentParams {
            model: self.model.clone(),
            max_tokens: self.chief_max_tokens,
            temperature: self.temperature,
        }
    }

    fn manager_params(&self) -> AgentParams {
        self.chief_params().with_max_tokens(self.manager_max_tokens)
    }

    fn worker_params(&self) -> AgentParams {
        self.chief_params().with_max_tokens(self.worker_max_tokens)
    }
}

/// Drives one strictly sequential run of the three-tier hierarchy.
///
/// Agents are created on demand (one Manager per task, one Worker per step,
/// plus the singleton Chief), never reused across runs, and each instance's
/// memory is mutated only by the runner step that owns it.
pub struct HierarchicalRunner {
    client: Arc<dyn CompletionClient>,
    params: RunnerParams,
}

impl HierarchicalRunner {
    pub fn new(client: Arc<dyn CompletionClient>, params: RunnerParams) -> Self {
        Self { client, params }
    }

    /// Run the full protocol over `initial_input`.
    pub async fn run(&self, initial_input: &str) -> Result<RunResult, RunError> {
        let mut trace = ReasoningTrace::new();

        let mut chief = Agent::new(
            "chief",
            AgentRole::Chief,
            prompts::CHIEF_INSTRUCTION,
            self.params.chief_params(),
            Arc::clone(&self.client),
        );

        let tasks = decompose_tasks(&mut chief, initial_input).await;
        if tasks.is_empty() {
            warn!("Chief produced no sub-tasks; terminating run");
            trace.push(NO_SUBTASKS_MESSAGE);
            return Ok(RunResult {
                trace,
                final_report: NO_SUBTASKS_MESSAGE.to_string(),
            });
        }

        let task_names: Vec<&str> = tasks.iter().map(|t| t.name.as_str()).collect();
        info!(tasks = tasks.len(), "Chief decomposed the request");
        trace.push(format!(
            "[chief] decomposed the request into {} sub-tasks: {}",
            tasks.len(),
            task_names.join(", ")
        ));

        let mut summaries: Vec<(String, String)> = Vec::with_capacity(tasks.len());

        for task in &tasks {
            let manager_name = format!("manager_{}", sanitize_name(&task.name));
            let mut manager = Agent::new(
                &manager_name,
                AgentRole::Manager,
                prompts::MANAGER_INSTRUCTION,
                self.params.manager_params(),
                Arc::clone(&self.client),
            );

            let goal = prompts::manager_goal(initial_input, &task.description);
            let steps = decompose_steps(&mut manager, &goal).await;
            if steps.is_empty() {
                // Local degradation: this task contributes a note, not content.
                warn!(task = %task.name, "Manager failed to decompose sub-task");
                let note = format!(
                    "Manager '{}' failed to decompose sub-task '{}'.",
                    manager_name, task.name
                );
                trace.push(note.clone());
                summaries.push((task.name.clone(), note));
                continue;
            }

            let step_names: Vec<&str> = steps.iter().map(|s| s.name.as_str()).collect();
            trace.push(format!(
                "[{}] planned {} steps: {}",
                manager_name,
                steps.len(),
                step_names.join(", ")
            ));

            let mut step_context = initial_input.to_string();

            for step in &steps {
                let worker_name = format!(
                    "worker_{}_{}",
                    sanitize_name(&task.name),
                    sanitize_name(&step.name)
                );
                let mut worker = Agent::new(
                    &worker_name,
                    AgentRole::Worker,
                    prompts::WORKER_INSTRUCTION,
                    self.params.worker_params(),
                    Arc::clone(&self.client),
                );

                let prompt = prompts::worker_prompt(&step_context, &step.instruction);
                let output = match worker.respond(&prompt).await {
                    Ok(text) => text,
                    Err(e) => {
                        // Tolerated at this tier: the fragment flows into
                        // context and trace like any other output.
                        warn!(worker = %worker_name, error = %e, "Worker step failed");
                        format!("Error: {e}")
                    }
                };

                trace.push(format!("[{}] {}", worker_name, output));
                step_context.push_str(&format!(
                    "\n\nresult of step '{}':\n{}",
                    step.name, output
                ));
                step_context = cap_context(
                    step_context,
                    self.params.max_context_chars,
                    initial_input.len(),
                );
            }

            let summary_prompt = prompts::manager_summary_prompt(&task.name, &step_context);
            let summary = match manager.respond(&summary_prompt).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(manager = %manager_name, error = %e, "Manager summary failed");
                    format!("Error: {e}")
                }
            };

            trace.push(format!("[{}] summary: {}", manager_name, summary));
            summaries.push((task.name.clone(), summary));
        }

        let report_prompt = prompts::chief_report_prompt(initial_input, &summaries);
        let final_report = chief.respond(&report_prompt).await?;

        info!(chars = final_report.len(), "Final report produced");
        trace.push(format!("[chief] final report:\n{final_report}"));

        Ok(RunResult {
            trace,
            final_report,
        })
    }
}

/// Cap the step context at `max_chars`, keeping the head (the initial input)
/// and the most recent tail, eliding the middle.
fn cap_context(context: String, max_chars: usize, head_len: usize) -> String {
    if context.len() <= max_chars {
        return context;
    }

    let head_len = floor_char_boundary(&context, head_len.min(max_chars / 2));
    let budget = max_chars.saturating_sub(head_len + CONTEXT_ELISION_MARKER.len());
    let tail_start = floor_char_boundary(&context, context.len().saturating_sub(budget));

    let mut capped = String::with_capacity(max_chars + CONTEXT_ELISION_MARKER.len());
    capped.push_str(&context[..head_len]);
    capped.push_str(CONTEXT_ELISION_MARKER);
    capped.push_str(&context[tail_start..]);
    capped
}

/// Largest char boundary not past `index`.
fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
