//! Relevance guard, the first stage of every turn.
//!
//! The guard fails open: if the completion service is down or replies with
//! garbage, the turn is treated as allowed and flows on to classification.
//! Blocking a customer over an infrastructure hiccup is worse than letting
//! an off-topic question through.

use serde::Deserialize;

use barista_core::conversation::{tail, ConversationMemory, GuardDecision, Message};

use crate::decode;
use crate::errors::AgentError;
use crate::llm::{ChatTurn, CompletionClient};
use crate::prompts;

const STAGE: &str = "guard";

#[derive(Debug, Deserialize)]
struct GuardVerdict {
    #[serde(default)]
    decision: String,
    #[serde(default)]
    message: String,
}

#[derive(Clone, Debug)]
pub struct GuardStage {
    history_window: usize,
}

impl GuardStage {
    pub fn new(history_window: usize) -> Self {
        Self { history_window }
    }

    /// Decide whether the latest user message is in scope for the shop.
    pub async fn evaluate(&self, client: &dyn CompletionClient, history: &[Message]) -> Message {
        match self.try_evaluate(client, history).await {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(
                    event_name = "guard.failed_open",
                    error = %error,
                    "guard could not produce a verdict, allowing the turn"
                );
                allowed_message()
            }
        }
    }

    async fn try_evaluate(
        &self,
        client: &dyn CompletionClient,
        history: &[Message],
    ) -> Result<Message, AgentError> {
        let mut turns = vec![ChatTurn::system(prompts::GUARD_PROMPT)];
        turns.extend(ChatTurn::from_history(tail(history, self.history_window)));

        let raw = client.complete(&turns).await.map_err(|error| {
            AgentError::UpstreamUnavailable { stage: STAGE, reason: error.to_string() }
        })?;
        let verdict: GuardVerdict = decode::decode(STAGE, &raw)?;

        if verdict.decision.trim() == "not allowed" {
            let content = if verdict.message.trim().is_empty() {
                prompts::REFUSAL_REPLY.to_string()
            } else {
                verdict.message
            };
            return Ok(Message::assistant_with_memory(
                content,
                ConversationMemory::Guard { guard_decision: GuardDecision::NotAllowed },
            ));
        }

        Ok(allowed_message())
    }
}

/// True when a guard reply blocks the turn.
pub fn is_blocked(message: &Message) -> bool {
    matches!(
        message.memory,
        Some(ConversationMemory::Guard { guard_decision: GuardDecision::NotAllowed })
    )
}

fn allowed_message() -> Message {
    Message::assistant_with_memory(
        "",
        ConversationMemory::Guard { guard_decision: GuardDecision::Allowed },
    )
}
