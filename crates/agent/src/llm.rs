use anyhow::Result;
use async_trait::async_trait;

use barista_core::conversation::{Message, Role};

/// One role-attributed turn handed to the completion service.
///
/// Memory blocks never cross this boundary. Converting a conversation
/// message into a chat turn keeps only the role and the visible text, so
/// pipeline state stays out of the upstream request by construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }

    pub fn from_message(message: &Message) -> Self {
        Self { role: message.role, content: message.content.clone() }
    }

    pub fn from_history(history: &[Message]) -> Vec<ChatTurn> {
        history.iter().map(ChatTurn::from_message).collect()
    }
}

/// Pluggable completion backend.
///
/// The pipeline only ever talks to this trait, so tests can script replies
/// and the Gemini client stays an implementation detail.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send a chat exchange and return the raw completion text.
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String>;

    /// Embed a piece of text for retrieval.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
