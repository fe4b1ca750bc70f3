//! Order-taking stage.
//!
//! The caller owns all state: step number, accumulated order and the
//! cross-sell flag ride on earlier assistant messages and are recovered
//! from the history each turn. The stage prepends the recovered state to
//! the latest user turn so the model can continue the order, then writes
//! the updated state into the reply's memory block.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use barista_core::catalog::Menu;
use barista_core::conversation::{ConversationMemory, Message, OrderState};
use barista_core::order::normalize_order;

use crate::decode;
use crate::errors::AgentError;
use crate::llm::{ChatTurn, CompletionClient};
use crate::prompts;
use crate::recommend::RecommendationStage;

const STAGE: &str = "order_taking";

#[derive(Debug, Deserialize)]
struct OrderTakingVerdict {
    #[serde(default, alias = "step number")]
    step_number: Option<String>,
    #[serde(default)]
    order: Value,
    #[serde(default)]
    response: String,
}

pub struct OrderTakingStage {
    menu: Arc<Menu>,
    recommendation: Arc<RecommendationStage>,
}

impl OrderTakingStage {
    pub fn new(menu: Arc<Menu>, recommendation: Arc<RecommendationStage>) -> Self {
        Self { menu, recommendation }
    }

    pub async fn respond(&self, client: &dyn CompletionClient, history: &[Message]) -> Message {
        let state = OrderState::recover(history);

        let mut conversation = ChatTurn::from_history(history);
        if let Some(last) = conversation.last_mut() {
            last.content = format!("{}\n{}", state.as_context_text(), last.content);
        }
        let mut turns =
            vec![ChatTurn::system(prompts::order_taking_prompt(&self.menu.price_list()))];
        turns.extend(conversation);

        let verdict = match self.fetch_verdict(client, &turns).await {
            Ok(verdict) => verdict,
            Err(error) => {
                tracing::warn!(
                    event_name = "order.turn_failed",
                    error = %error,
                    "replying with the fixed fallback and an empty order"
                );
                return fallback_message(&state);
            }
        };

        let step_number = verdict.step_number.unwrap_or_else(|| "1".to_string());
        let order = normalize_order(&verdict.order);
        let mut response = verdict.response;
        let mut asked_recommendation_before = state.asked_recommendation_before;

        // One cross-sell per conversation, and only once something is in
        // the order.
        if !asked_recommendation_before && !order.is_empty() {
            let offer = self.recommendation.respond_for_order(client, history, &order).await;
            response = offer.content;
            asked_recommendation_before = true;
            tracing::info!(
                event_name = "order.cross_sell_offered",
                items = order.len(),
                "replaced reply with a recommendation offer"
            );
        }

        Message::assistant_with_memory(
            response,
            ConversationMemory::OrderTaking { step_number, order, asked_recommendation_before },
        )
    }

    async fn fetch_verdict(
        &self,
        client: &dyn CompletionClient,
        turns: &[ChatTurn],
    ) -> Result<OrderTakingVerdict, AgentError> {
        let raw = client.complete(turns).await.map_err(|error| {
            AgentError::UpstreamUnavailable { stage: STAGE, reason: error.to_string() }
        })?;
        decode::decode_with_repair(STAGE, &raw, client).await
    }
}

/// Safe reply when the turn cannot be decoded. The order resets but the
/// cross-sell flag survives, offers stay once-per-conversation.
fn fallback_message(state: &OrderState) -> Message {
    Message::assistant_with_memory(
        prompts::ORDER_FALLBACK_REPLY,
        ConversationMemory::OrderTaking {
            step_number: "1".to_string(),
            order: Vec::new(),
            asked_recommendation_before: state.asked_recommendation_before,
        },
    )
}
