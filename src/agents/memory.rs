//! Bounded conversational memory for agents.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Number of exchanges an agent remembers. Older exchanges are evicted.
pub const MEMORY_CAPACITY: usize = 5;

/// One remembered turn: what the agent was asked and what it answered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exchange {
    pub input: String,
    pub output: String,
}

/// Bounded FIFO window of past exchanges.
///
/// # Invariants
/// - `len() <= MEMORY_CAPACITY` after any number of pushes
/// - Iteration order is chronological (oldest first)
#[derive(Debug, Clone, Default)]
pub struct MemoryWindow {
    entries: VecDeque<Exchange>,
}

impl MemoryWindow {
    /// Create an empty memory window.
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(MEMORY_CAPACITY),
        }
    }

    /// Append an exchange, evicting the oldest entry if full.
    pub fn push(&mut self, input: impl Into<String>, output: impl Into<String>) {
        if self.entries.len() == MEMORY_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(Exchange {
            input: input.into(),
            output: output.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate exchanges oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = &Exchange> {
        self.entries.iter()
    }

    /// Render the window for inclusion in a system instruction.
    ///
    /// Returns an empty string when there is no history, so callers can
    /// concatenate unconditionally.
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        let mut out = String::from("\n\nRecent exchanges:");
        for exchange in &self.entries {
            out.push_str("\ninput: ");
            out.push_str(&exchange.input);
            out.push_str("\noutput: ");
            out.push_str(&exchange.output);
        }
        out
    }
}
