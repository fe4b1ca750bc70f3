//! Routing stage. Picks which specialist agent handles the turn.

use serde::Deserialize;

use barista_core::conversation::{tail, AgentKind, Message};

use crate::decode;
use crate::llm::{ChatTurn, CompletionClient};
use crate::prompts;

const STAGE: &str = "classification";

#[derive(Debug, Deserialize)]
struct ClassificationVerdict {
    #[serde(default)]
    decision: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ClassificationStage {
    history_window: usize,
}

impl ClassificationStage {
    pub fn new(history_window: usize) -> Self {
        Self { history_window }
    }

    /// Route the latest turn. Never fails, the details agent is the
    /// fallback for anything the router cannot make sense of.
    pub async fn classify(&self, client: &dyn CompletionClient, history: &[Message]) -> AgentKind {
        let mut turns = vec![ChatTurn::system(prompts::CLASSIFICATION_PROMPT)];
        turns.extend(ChatTurn::from_history(tail(history, self.history_window)));

        let raw = match client.complete(&turns).await {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(
                    event_name = "classification.upstream_failed",
                    error = %error,
                    "routing without a verdict, defaulting to details"
                );
                return AgentKind::Details;
            }
        };

        match decode::decode::<ClassificationVerdict>(STAGE, &raw) {
            Ok(verdict) => verdict
                .decision
                .as_deref()
                .and_then(AgentKind::parse)
                .unwrap_or(AgentKind::Details),
            Err(error) => {
                tracing::warn!(
                    event_name = "classification.decode_failed",
                    error = %error,
                    "falling back to keyword routing"
                );
                route_by_keyword(&raw)
            }
        }
    }
}

/// Last-resort routing over the raw completion text. Order intent wins
/// over recommendation intent when both tokens appear.
fn route_by_keyword(raw: &str) -> AgentKind {
    if raw.contains("order_taking_agent") {
        AgentKind::OrderTaking
    } else if raw.contains("recommendation_agent") {
        AgentKind::Recommendation
    } else {
        AgentKind::Details
    }
}

#[cfg(test)]
mod tests {
    use barista_core::conversation::{AgentKind, Message};

    use crate::testing::ScriptedClient;

    use super::{route_by_keyword, ClassificationStage};

    fn history(text: &str) -> Vec<Message> {
        vec![Message::user(text)]
    }

    #[tokio::test]
    async fn order_intent_routes_to_order_taking() {
        let client = ScriptedClient::with_replies(&[
            r#"{"chain of thought": "the user wants to buy", "decision": "order_taking_agent", "message": ""}"#,
        ]);
        let stage = ClassificationStage::new(3);

        let route = stage.classify(&client, &history("I want 2 cappuccinos")).await;
        assert_eq!(route, AgentKind::OrderTaking);
    }

    #[tokio::test]
    async fn unknown_decision_defaults_to_details() {
        let client = ScriptedClient::with_replies(&[r#"{"decision": "barista_agent"}"#]);
        let stage = ClassificationStage::new(3);

        let route = stage.classify(&client, &history("hello")).await;
        assert_eq!(route, AgentKind::Details);
    }

    #[tokio::test]
    async fn upstream_failure_defaults_to_details() {
        let client = ScriptedClient::failing();
        let stage = ClassificationStage::new(3);

        let route = stage.classify(&client, &history("hello")).await;
        assert_eq!(route, AgentKind::Details);
    }

    #[tokio::test]
    async fn keyword_fallback_reads_the_raw_text() {
        let client = ScriptedClient::with_replies(&[
            "I believe the recommendation_agent is the right choice here",
        ]);
        let stage = ClassificationStage::new(3);

        let route = stage.classify(&client, &history("what should I get?")).await;
        assert_eq!(route, AgentKind::Recommendation);
    }

    #[test]
    fn keyword_routing_prefers_order_taking() {
        assert_eq!(
            route_by_keyword("either order_taking_agent or recommendation_agent"),
            AgentKind::OrderTaking
        );
        assert_eq!(route_by_keyword("no agent name at all"), AgentKind::Details);
    }
}
