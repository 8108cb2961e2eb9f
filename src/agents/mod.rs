//! Agents module - the building blocks of the hierarchy.
//!
//! # Agent tiers
//! - **Chief**: decomposes the initial request into sub-tasks and writes the
//!   final report
//! - **Manager**: decomposes one sub-task into steps and summarizes it
//! - **Worker**: executes one step against the accumulated context
//!
//! All three are the same concrete [`Agent`] type with different role tags
//! and instructions; decomposition and execution are free functions the
//! orchestrator dispatches, not subclasses.

mod agent;
mod decompose;
mod memory;
pub mod prompts;

pub use agent::{Agent, AgentError};
pub use decompose::{decompose_steps, decompose_tasks, StepBrief, TaskBrief};
pub use memory::{Exchange, MemoryWindow, MEMORY_CAPACITY};

use serde::{Deserialize, Serialize};

/// Tier of an agent in the hierarchy. A plain tag, used for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Chief,
    Manager,
    Worker,
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentRole::Chief => write!(f, "chief"),
            AgentRole::Manager => write!(f, "manager"),
            AgentRole::Worker => write!(f, "worker"),
        }
    }
}

/// Model parameters for one agent.
#[derive(Debug, Clone)]
pub struct AgentParams {
    /// Model identifier in provider format.
    pub model: String,
    /// Maximum output tokens for this tier.
    pub max_tokens: u64,
    /// Sampling temperature.
    pub temperature: f64,
}

impl AgentParams {
    /// Same model and temperature, different output ceiling.
    pub fn with_max_tokens(&self, max_tokens: u64) -> Self {
        Self {
            model: self.model.clone(),
            max_tokens,
            temperature: self.temperature,
        }
    }
}
