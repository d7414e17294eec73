//! Preference example schema

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a preference example violates the shared-prompt layout
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExampleError {
    #[error("{side} conversation must have exactly 2 messages, found {found}")]
    WrongLength { side: &'static str, found: usize },
    #[error("{side} conversation message {index} has role {found}, expected {expected}")]
    WrongRole {
        side: &'static str,
        index: usize,
        found: Role,
        expected: Role,
    },
    #[error("chosen and rejected conversations start with different prompts")]
    PromptMismatch,
}

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        f.write_str(name)
    }
}

/// A single chat turn
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Raw preference record as published by the source datasets
///
/// The prompt column is called `instruction` in some dumps and `prompt` in
/// others; both spellings are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPreferenceRecord {
    #[serde(alias = "prompt")]
    pub instruction: String,
    pub chosen: String,
    pub rejected: String,
}

/// A chosen/rejected pair of two-turn conversations sharing one user prompt
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreferenceExample {
    pub chosen: Vec<Message>,
    pub rejected: Vec<Message>,
}

impl PreferenceExample {
    /// Build an example from a prompt and the two competing answers
    pub fn new(
        prompt: impl Into<String>,
        chosen: impl Into<String>,
        rejected: impl Into<String>,
    ) -> Self {
        let prompt = prompt.into();
        Self {
            chosen: vec![Message::user(prompt.clone()), Message::assistant(chosen)],
            rejected: vec![Message::user(prompt), Message::assistant(rejected)],
        }
    }

    /// The user prompt shared by both conversations
    ///
    /// Returns `None` when the chosen conversation does not open with a
    /// user turn.
    pub fn prompt(&self) -> Option<&str> {
        self.chosen
            .first()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// The preferred assistant answer
    pub fn chosen_response(&self) -> Option<&str> {
        self.chosen.get(1).map(|m| m.content.as_str())
    }

    /// The dispreferred assistant answer
    pub fn rejected_response(&self) -> Option<&str> {
        self.rejected.get(1).map(|m| m.content.as_str())
    }

    /// Check the user/assistant layout and that both sides share the prompt
    pub fn validate(&self) -> Result<(), ExampleError> {
        for (side, messages) in [("chosen", &self.chosen), ("rejected", &self.rejected)] {
            if messages.len() != 2 {
                return Err(ExampleError::WrongLength {
                    side,
                    found: messages.len(),
                });
            }
            for (index, expected) in [(0, Role::User), (1, Role::Assistant)] {
                let found = messages[index].role;
                if found != expected {
                    return Err(ExampleError::WrongRole {
                        side,
                        index,
                        found,
                        expected,
                    });
                }
            }
        }

        if self.chosen[0] != self.rejected[0] {
            return Err(ExampleError::PromptMismatch);
        }

        Ok(())
    }
}

impl From<RawPreferenceRecord> for PreferenceExample {
    fn from(record: RawPreferenceRecord) -> Self {
        Self::new(record.instruction, record.chosen, record.rejected)
    }
}

/// Convert raw records into preference examples, preserving order
pub fn convert_records(records: Vec<RawPreferenceRecord>) -> Vec<PreferenceExample> {
    records.into_iter().map(PreferenceExample::from).collect()
}
