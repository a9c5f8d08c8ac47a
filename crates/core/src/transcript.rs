use serde::{Deserialize, Serialize};
use std::fmt;

pub const GREETING: &str = "Hi, I'm your case advisor. Ask me about this patient or any drug class. \
My answers are for education only and are not medical advice.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Advisor,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Advisor => write!(f, "advisor"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub text: String,
}

/// Append-only conversation between the learner and the advisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChatTranscript {
    entries: Vec<ChatEntry>,
}

impl Default for ChatTranscript {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatTranscript {
    /// A transcript holding only the advisor greeting.
    pub fn new() -> Self {
        Self {
            entries: vec![ChatEntry {
                role: ChatRole::Advisor,
                text: GREETING.to_string(),
            }],
        }
    }

    /// Appends an entry and returns a reference to it.
    pub fn push(&mut self, role: ChatRole, text: impl Into<String>) -> &ChatEntry {
        self.entries.push(ChatEntry {
            role,
            text: text.into(),
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
