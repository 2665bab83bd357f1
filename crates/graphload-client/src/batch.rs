//! Batched writes.
//!
//! Commands accumulate in order in a [`BatchBuffer`] and leave it as a single
//! `POST /batch/{database}` request carrying one script operation. Taking the
//! request drains the buffer, so a long-lived buffer only ever holds the
//! commands added since its last flush.

use serde::{Deserialize, Serialize};

/// Wire body of `POST /batch/{database}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub transaction: bool,
    pub operations: Vec<BatchOperation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOperation {
    #[serde(rename = "type")]
    pub kind: String,
    pub language: String,
    pub script: Vec<String>,
}

impl BatchRequest {
    /// Total number of commands across all operations.
    pub fn command_count(&self) -> usize {
        self.operations.iter().map(|op| op.script.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub transaction: bool,
    /// Flush once this many commands are buffered (`None` = only at the end).
    pub auto_flush_at: Option<usize>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            transaction: true,
            auto_flush_at: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchBuffer {
    language: String,
    options: BatchOptions,
    commands: Vec<String>,
}

impl BatchBuffer {
    pub fn new(language: &str, options: BatchOptions) -> Self {
        Self {
            language: language.to_string(),
            options,
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, command: impl Into<String>) {
        self.commands.push(command.into());
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Whether the auto-flush threshold has been reached.
    pub fn should_flush(&self) -> bool {
        match self.options.auto_flush_at {
            Some(threshold) => threshold > 0 && self.commands.len() >= threshold,
            None => false,
        }
    }

    /// Drain the buffer into one request. `None` when there is nothing to send.
    pub fn take_request(&mut self) -> Option<BatchRequest> {
        if self.commands.is_empty() {
            return None;
        }
        let script = std::mem::take(&mut self.commands);
        Some(BatchRequest {
            transaction: self.options.transaction,
            operations: vec![BatchOperation {
                kind: "script".to_string(),
                language: self.language.clone(),
                script,
            }],
        })
    }
}
