//! System instructions and prompt builders for the three agent tiers.

use crate::literature::Citation;
use crate::store::PatientRecord;

/// System instruction for the Chief (top-level planner).
pub const CHIEF_INSTRUCTION: &str = "You are the chief of a medical analysis project. \
Your job is to understand a complex request about patient data, break it into a few \
logically clear, mutually independent sub-tasks, and set an explicit goal for each. \
When asked for a plan your output must be structured JSON. \
Keep your output under 1000 tokens.";

/// System instruction for a Manager (per-sub-task planner and summarizer).
pub const MANAGER_INSTRUCTION: &str = "You are a project manager on a medical analysis team. \
You receive one sub-task goal and break it into a series of concrete steps that can be \
executed in order. When asked for a plan your output must be structured JSON. \
Keep your output under 500 tokens.";

/// System instruction for a Worker (leaf analyst).
pub const WORKER_INSTRUCTION: &str = "You are a professional medical data analyst. \
Execute the given instruction precisely, using the provided context, and produce a \
clear, accurate result. Answer directly without unrelated content. \
Keep your output under 500 tokens.";

/// Prompt asking the Chief for a JSON array of sub-tasks.
pub fn task_decomposition_prompt(goal: &str) -> String {
    format!(
        r#"Break the following request into sub-tasks.

Request:
{goal}

Respond with a JSON array of objects, each with exactly two fields:
[
    {{"task_name": "short name", "task_description": "what this sub-task must achieve"}}
]

Respond ONLY with the JSON array."#
    )
}

/// Prompt asking a Manager for a JSON array of executable steps.
pub fn step_decomposition_prompt(goal: &str) -> String {
    format!(
        r#"Break the following sub-task into steps that can be executed one after another.

Sub-task:
{goal}

Respond with a JSON array of objects, each with exactly two fields:
[
    {{"step_name": "short name", "step_instruction": "the exact instruction to execute"}}
]

Respond ONLY with the JSON array."#
    )
}

/// Goal handed to a Manager: the original request plus its sub-task.
pub fn manager_goal(initial_input: &str, task_description: &str) -> String {
    format!("{initial_input}\n\nsub-task goal: {task_description}")
}

/// Prompt a Worker executes: accumulated context plus one instruction.
pub fn worker_prompt(context: &str, instruction: &str) -> String {
    format!("Context:\n{context}\n\nInstruction:\n{instruction}")
}

/// Prompt asking a Manager to summarize its sub-task from the full step context.
pub fn manager_summary_prompt(task_name: &str, step_context: &str) -> String {
    format!(
        "All steps of sub-task '{task_name}' have been executed. \
Using everything below, write a concise summary of this sub-task's findings.\n\n{step_context}"
    )
}

/// Prompt asking the Chief to aggregate all sub-task summaries into the
/// final report. Summaries are given in task order.
pub fn chief_report_prompt(initial_input: &str, summaries: &[(String, String)]) -> String {
    let mut prompt = String::from(
        "All sub-tasks are complete. Write the final diagnostic report, \
grounded in the sub-task summaries below and addressing the original request.\n\n",
    );
    prompt.push_str("Original request:\n");
    prompt.push_str(initial_input);
    for (name, summary) in summaries {
        prompt.push_str(&format!("\n\nSummary of sub-task '{name}':\n{summary}"));
    }
    prompt
}

/// Assemble the initial input from the patient record, literature
/// enrichment, and the user's question.
pub fn initial_input(record: &PatientRecord, citations: &[Citation], question: &str) -> String {
    let mut input = format!("[Patient record]:\n{}", record.render());
    if !citations.is_empty() {
        input.push_str("\n\n[Related literature]:");
        for citation in citations {
            input.push_str(&format!("\n- {}", citation.title));
            if !citation.abstract_text.is_empty() {
                input.push_str(&format!("\n  {}", citation.abstract_text));
            }
        }
    }
    input.push_str(&format!("\n\n[Question]:\n{question}"));
    input
}
