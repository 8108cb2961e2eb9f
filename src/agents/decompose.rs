//! LLM-backed goal decomposition.
//!
//! Decomposition is delegated to the same general-purpose text model used for
//! execution - there is no separate planning algorithm - so parsing must
//! tolerate malformed output without crashing the pipeline. The contract is
//! uniform: any completion failure or parse problem yields an empty list, and
//! callers treat emptiness as the give-up signal for that tier.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::agent::Agent;
use super::prompts;

/// A sub-task produced by the Chief's decomposition. Immutable once parsed;
/// one Manager is spawned per task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskBrief {
    pub name: String,
    pub description: String,
}

/// A concrete step produced by a Manager's decomposition. Immutable; one
/// Worker is spawned per step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepBrief {
    pub name: String,
    pub instruction: String,
}

/// Ask the Chief to break the initial request into named sub-tasks.
///
/// Never fails: malformed model output (or a failed completion) returns an
/// empty vec.
pub async fn decompose_tasks(chief: &mut Agent, goal: &str) -> Vec<TaskBrief> {
    let prompt = prompts::task_decomposition_prompt(goal);
    let reply = match chief.respond(&prompt).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(agent = %chief.name(), error = %e, "Decomposition call failed");
            return Vec::new();
        }
    };

    parse_pairs(&reply, "task_name", "task_description")
        .into_iter()
        .map(|(name, description)| TaskBrief { name, description })
        .collect()
}

/// Ask a Manager to break one sub-task goal into ordered executable steps.
pub async fn decompose_steps(manager: &mut Agent, goal: &str) -> Vec<StepBrief> {
    let prompt = prompts::step_decomposition_prompt(goal);
    let reply = match manager.respond(&prompt).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(agent = %manager.name(), error = %e, "Decomposition call failed");
            return Vec::new();
        }
    };

    parse_pairs(&reply, "step_name", "step_instruction")
        .into_iter()
        .map(|(name, instruction)| StepBrief { name, instruction })
        .collect()
}

/// Extract the JSON array embedded in `text`, tolerating surrounding prose.
///
/// Models frequently wrap the requested JSON in commentary or code fences;
/// taking the substring between the first `[` and the last `]` is the only
/// defense applied. Returns `None` when no bracket pair exists or the
/// enclosed text is not a JSON array.
fn extract_json_array(text: &str) -> Option<Vec<Value>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

/// Parse a model reply into `(key_a, key_b)` string pairs, in source order.
///
/// Elements are validated individually: anything that is not an object with
/// both keys present and non-empty is dropped, and well-formed siblings
/// survive.
fn parse_pairs(text: &str, key_a: &str, key_b: &str) -> Vec<(String, String)> {
    let Some(items) = extract_json_array(text) else {
        tracing::warn!("No parseable JSON array in decomposition reply");
        return Vec::new();
    };

    let total = items.len();
    let pairs: Vec<(String, String)> = items
        .into_iter()
        .filter_map(|item| {
            let a = item.get(key_a)?.as_str()?.trim().to_string();
            let b = item.get(key_b)?.as_str()?.trim().to_string();
            if a.is_empty() || b.is_empty() {
                return None;
            }
            Some((a, b))
        })
        .collect();

    if pairs.len() < total {
        tracing::warn!(
            kept = pairs.len(),
            total = total,
            "Dropped malformed decomposition elements"
        );
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentParams, AgentRole};
    use crate::llm::test_support::ScriptedClient;
    use crate::llm::LlmError;
    use std::sync::Arc;

    fn chief(client: Arc<ScriptedClient>) -> Agent {
        Agent::new(
            "chief",
            AgentRole::Chief,
            "You plan.",
            AgentParams {
                model: "test-model".to_string(),
                max_tokens: 1000,
                temperature: 0.7,
            },
            client,
        )
    }

    #[test]
    fn test_parse_preserves_order() {
        let text = r#"[
            {"task_name": "vitals", "task_description": "check vitals"},
            {"task_name": "labs", "task_description": "review labs"},
            {"task_name": "imaging", "task_description": "read the scan"}
        ]"#;
        let pairs = parse_pairs(text, "task_name", "task_description");
        let names: Vec<_> = pairs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["vitals", "labs", "imaging"]);
    }

    #[test]
    fn test_parse_tolerates_prose_wrapping() {
        let text = "Sure! Here is the plan:\n```json\n[{\"step_name\": \"a\", \"step_instruction\": \"do a\"}]\n```\nLet me know.";
        let pairs = parse_pairs(text, "step_name", "step_instruction");
        assert_eq!(pairs, vec![("a".to_string(), "do a".to_string())]);
    }

    #[test]
    fn test_malformed_text_yields_empty() {
        for text in [
            "not json",
            "[{\"task_name\": \"x\"",            // truncated
            "{\"task_name\": \"x\"}",            // no array brackets
            "] backwards [",                     // brackets out of order
            "[\"just\", \"strings\"]",           // array of non-objects
        ] {
            assert!(
                parse_pairs(text, "task_name", "task_description").is_empty(),
                "expected empty for {:?}",
                text
            );
        }
    }

    #[test]
    fn test_object_wrapped_array_is_still_found() {
        let text = r#"{"subtasks": [{"task_name": "x", "task_description": "y"}]}"#;
        // First '[' to last ']' encloses a valid array here, which is the
        // permissive heuristic working as intended.
        let pairs = parse_pairs(text, "task_name", "task_description");
        assert_eq!(pairs.len(), 1);

        let object_only = r#"{"task_name": "x", "task_description": "y"}"#;
        assert!(parse_pairs(object_only, "task_name", "task_description").is_empty());
    }

    #[test]
    fn test_malformed_elements_dropped_individually() {
        let text = r#"[
            {"task_name": "good", "task_description": "fine"},
            {"task_name": "missing description"},
            {"task_name": "", "task_description": "empty name"},
            {"task_name": 7, "task_description": "wrong type"},
            {"task_name": "also good", "task_description": "ok"}
        ]"#;
        let pairs = parse_pairs(text, "task_name", "task_description");
        let names: Vec<_> = pairs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["good", "also good"]);
    }

    #[tokio::test]
    async fn test_decompose_tasks_happy_path() {
        let client = Arc::new(ScriptedClient::from_texts(&[
            r#"[{"task_name": "vitals", "task_description": "check vitals"}]"#,
        ]));
        let mut agent = chief(client);
        let tasks = decompose_tasks(&mut agent, "analyze patient X").await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name, "vitals");
        assert_eq!(tasks[0].description, "check vitals");
    }

    #[tokio::test]
    async fn test_decompose_swallows_completion_failure() {
        let client = Arc::new(ScriptedClient::new(vec![Err(LlmError::network_error(
            "down",
        ))]));
        let mut agent = chief(client);
        assert!(decompose_tasks(&mut agent, "goal").await.is_empty());
    }
}
