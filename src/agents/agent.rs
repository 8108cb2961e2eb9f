//! Agent implementation - one named unit pairing a role instruction with the
//! completion client and a bounded memory of past exchanges.

use std::sync::Arc;

use crate::llm::{ChatMessage, ChatOptions, CompletionClient, LlmError};

use super::memory::MemoryWindow;
use super::{AgentParams, AgentRole};

/// Errors from agent operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AgentError {
    /// The underlying completion call failed (network/auth/timeout/parse).
    #[error("completion failed: {0}")]
    Completion(#[from] LlmError),

    /// The provider answered but produced no text content.
    #[error("completion returned no content")]
    EmptyCompletion,
}

/// A single agent. There is no type-level distinction between tiers: a Chief,
/// a Manager and a Worker are the same struct with different role tags and
/// instructions, and the orchestrator decides what to do with their output.
///
/// Memory is exclusively owned: each agent instance is created for one caller
/// and discarded after the run.
pub struct Agent {
    name: String,
    role: AgentRole,
    instruction: String,
    params: AgentParams,
    memory: MemoryWindow,
    client: Arc<dyn CompletionClient>,
}

impl Agent {
    /// Create a new agent.
    pub fn new(
        name: impl Into<String>,
        role: AgentRole,
        instruction: impl Into<String>,
        params: AgentParams,
        client: Arc<dyn CompletionClient>,
    ) -> Self {
        let name = name.into();
        tracing::debug!(agent = %name, role = %role, "Creating agent");
        Self {
            name,
            role,
            instruction: instruction.into(),
            params,
            memory: MemoryWindow::new(),
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    /// Number of remembered exchanges.
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    /// Ask the agent to respond to `user_message`.
    ///
    /// The effective system instruction is the fixed role instruction plus a
    /// rendered view of the memory window; the raw user message is sent as
    /// the user turn. On success the exchange is appended to memory (evicting
    /// the oldest past the window bound). On failure memory is untouched and
    /// the typed error is returned - the caller decides whether the failure
    /// is tolerable at its tier.
    pub async fn respond(&mut self, user_message: &str) -> Result<String, AgentError> {
        let system = format!("{}{}", self.instruction, self.memory.render());
        let messages = [
            ChatMessage::system(system),
            ChatMessage::user(user_message),
        ];
        let options = ChatOptions {
            temperature: Some(self.params.temperature),
            max_tokens: Some(self.params.max_tokens),
        };

        let response = self
            .client
            .chat_completion(&self.params.model, &messages, options)
            .await?;

        let text = response
            .content
            .filter(|c| !c.is_empty())
            .ok_or(AgentError::EmptyCompletion)?;

        self.memory.push(user_message, text.clone());

        tracing::debug!(
            agent = %self.name,
            chars = text.len(),
            "Agent responded"
        );
        Ok(text)
    }
}
