//! Prompt templates stored by name.

use serde::{Deserialize, Serialize};

/// A named prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    pub content: String,
    /// Inactive prompts are treated as missing
    pub is_active: bool,
    pub version: i32,
}

impl Prompt {
    /// Create an active prompt at version 1.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            is_active: true,
            version: 1,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }
}
