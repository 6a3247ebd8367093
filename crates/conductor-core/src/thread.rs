//! Conversation threads and messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// A human prompt
    User,
    /// An agent reply
    Agent,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Agent => write!(f, "agent"),
        }
    }
}

/// One content item inside a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    /// Plain text
    Text { text: String },
    /// A reference to an uploaded file (e.g. a generated chart)
    ImageFile { file_id: String },
    /// Any other structured payload
    Json { value: serde_json::Value },
}

impl MessageContent {
    /// Create a text content item
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// A single message within a conversation thread
///
/// Messages are append-only: once posted, neither content nor order changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message id
    pub id: String,
    /// Author role
    pub role: MessageRole,
    /// Ordered content items
    pub content: Vec<MessageContent>,
    /// Creation timestamp, also the ordering key within a thread
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a message holding a single text item
    pub fn text(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            id: format!("msg_{}", uuid::Uuid::new_v4().simple()),
            role,
            content: vec![MessageContent::text(text)],
            created_at: Utc::now(),
        }
    }

    /// Concatenated text of every text content item
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|item| match item {
                MessageContent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Listing order for thread messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListOrder {
    /// Oldest first
    #[default]
    Ascending,
    /// Newest first
    Descending,
}
