use serde::{Deserialize, Serialize};

use crate::order::OrderLine;

/// Destination agents a classified turn can be routed to. The set is
/// closed; dispatch tables are keyed by this enum rather than by name
/// strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    #[serde(rename = "details_agent")]
    Details,
    #[serde(rename = "order_taking_agent")]
    OrderTaking,
    #[serde(rename = "recommendation_agent")]
    Recommendation,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Details => "details_agent",
            Self::OrderTaking => "order_taking_agent",
            Self::Recommendation => "recommendation_agent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "details_agent" => Some(Self::Details),
            "order_taking_agent" => Some(Self::OrderTaking),
            "recommendation_agent" => Some(Self::Recommendation),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardDecision {
    #[serde(rename = "allowed")]
    Allowed,
    #[serde(rename = "not allowed")]
    NotAllowed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Durable per-agent state carried on assistant messages. This is the only
/// persistence mechanism in the system: the caller re-submits these blocks
/// with the next turn's history and the pipeline re-derives everything it
/// needs from them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "agent")]
pub enum ConversationMemory {
    #[serde(rename = "guard_agent")]
    Guard { guard_decision: GuardDecision },
    #[serde(rename = "classification_agent")]
    Classification { classification_decision: AgentKind },
    #[serde(rename = "order_taking_agent")]
    OrderTaking {
        /// Opaque, model-chosen progress token. Passed through verbatim;
        /// never enumerated or validated.
        #[serde(alias = "step number")]
        step_number: String,
        order: Vec<OrderLine>,
        asked_recommendation_before: bool,
    },
    #[serde(rename = "details_agent")]
    Details,
    #[serde(rename = "recommendation_agent")]
    Recommendation,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<ConversationMemory>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into(), memory: None }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), memory: None }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), memory: None }
    }

    pub fn assistant_with_memory(content: impl Into<String>, memory: ConversationMemory) -> Self {
        Self { role: Role::Assistant, content: content.into(), memory: Some(memory) }
    }
}

/// Order-taking state as recovered from history. `Default` is the
/// start-of-conversation state.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderState {
    pub step_number: String,
    pub order: Vec<OrderLine>,
    pub asked_recommendation_before: bool,
}

impl Default for OrderState {
    fn default() -> Self {
        Self { step_number: "1".to_owned(), order: Vec::new(), asked_recommendation_before: false }
    }
}

impl OrderState {
    /// Pure function of history: walk backwards to the most recent
    /// assistant message carrying order-taking memory and lift its state
    /// out. No server-side store is consulted.
    pub fn recover(history: &[Message]) -> Self {
        for message in history.iter().rev() {
            if message.role != Role::Assistant {
                continue;
            }
            if let Some(ConversationMemory::OrderTaking {
                step_number,
                order,
                asked_recommendation_before,
            }) = &message.memory
            {
                return Self {
                    step_number: step_number.clone(),
                    order: order.clone(),
                    asked_recommendation_before: *asked_recommendation_before,
                };
            }
        }

        Self::default()
    }

    /// Textual rendering prepended to the latest user message so the model
    /// sees where the order stands.
    pub fn as_context_text(&self) -> String {
        let order = serde_json::to_string(&self.order).unwrap_or_else(|_| "[]".to_owned());
        format!("step number: {}\norder: {}", self.step_number, order)
    }
}

/// The trailing `window` messages of a history, the slice most prompt
/// builders operate on.
pub fn tail(history: &[Message], window: usize) -> &[Message] {
    let start = history.len().saturating_sub(window);
    &history[start..]
}
