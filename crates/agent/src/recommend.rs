//! Recommendation stage.
//!
//! Selection is deterministic: the model only picks a strategy and writes
//! the final prose. Which items get recommended is decided by the
//! association and popularity tables in core, and the synthesis prompt
//! names those items verbatim so the model cannot substitute its own.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use barista_core::conversation::{tail, ConversationMemory, Message};
use barista_core::order::OrderLine;
use barista_core::recommendations::RecommendationEngine;

use crate::decode;
use crate::llm::{ChatTurn, CompletionClient};
use crate::prompts;

const STAGE: &str = "recommendation_classification";

/// Which selection path a turn should use.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Strategy {
    Apriori,
    Popular,
    PopularByCategory,
}

impl Strategy {
    /// Unknown spellings fall back to overall popularity.
    fn parse(value: &str) -> Self {
        match value.trim() {
            "apriori" => Strategy::Apriori,
            "popular by category" => Strategy::PopularByCategory,
            _ => Strategy::Popular,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StrategyVerdict {
    #[serde(default)]
    recommendation_type: Option<String>,
    #[serde(default)]
    parameters: Vec<Value>,
}

pub struct RecommendationStage {
    engine: Arc<RecommendationEngine>,
    history_window: usize,
    top_k: usize,
}

impl RecommendationStage {
    pub fn new(engine: Arc<RecommendationEngine>, history_window: usize, top_k: usize) -> Self {
        Self { engine, history_window, top_k }
    }

    /// Answer an explicit "what should I get?" turn.
    pub async fn respond(&self, client: &dyn CompletionClient, history: &[Message]) -> Message {
        let (strategy, parameters) = self.classify_strategy(client, history).await;

        let recommendations = match strategy {
            Strategy::Apriori => self.engine.apriori(&parameters, self.top_k),
            Strategy::Popular => self.engine.popular(None, self.top_k),
            Strategy::PopularByCategory => {
                self.engine.popular(Some(parameters.as_slice()), self.top_k)
            }
        };

        if recommendations.is_empty() {
            tracing::warn!(
                event_name = "recommendation.nothing_to_suggest",
                strategy = ?strategy,
                "redirecting to ordering"
            );
            return Message::assistant(prompts::REFUSAL_REPLY);
        }

        self.synthesize(
            client,
            history,
            prompts::RECOMMEND_FROM_MESSAGE_SYSTEM,
            &recommendations,
        )
        .await
    }

    /// Cross-sell entry point used by order taking. Goes straight to the
    /// association table with the items already in the order.
    pub async fn respond_for_order(
        &self,
        client: &dyn CompletionClient,
        history: &[Message],
        order: &[OrderLine],
    ) -> Message {
        let products: Vec<String> = order.iter().map(|line| line.item.clone()).collect();
        let recommendations = self.engine.apriori(&products, self.top_k);

        if recommendations.is_empty() {
            tracing::warn!(
                event_name = "recommendation.nothing_to_suggest",
                "order items have no associations, redirecting"
            );
            return Message::assistant(prompts::REFUSAL_REPLY);
        }

        self.synthesize(client, history, prompts::RECOMMEND_FROM_ORDER_SYSTEM, &recommendations)
            .await
    }

    /// One model call to pick the strategy. Decode failure means overall
    /// popularity with no parameters.
    async fn classify_strategy(
        &self,
        client: &dyn CompletionClient,
        history: &[Message],
    ) -> (Strategy, Vec<String>) {
        let prompt = prompts::recommendation_classification_prompt(
            &self.engine.product_names(),
            &self.engine.category_names(),
        );
        let mut turns = vec![ChatTurn::system(prompt)];
        turns.extend(ChatTurn::from_history(tail(history, self.history_window)));

        let raw = match client.complete(&turns).await {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(
                    event_name = "recommendation.upstream_failed",
                    error = %error,
                    "defaulting to popular recommendations"
                );
                return (Strategy::Popular, Vec::new());
            }
        };

        match decode::decode_with_repair::<StrategyVerdict>(STAGE, &raw, client).await {
            Ok(verdict) => {
                let strategy = verdict
                    .recommendation_type
                    .as_deref()
                    .map(Strategy::parse)
                    .unwrap_or(Strategy::Popular);
                let parameters = verdict
                    .parameters
                    .iter()
                    .filter_map(|value| value.as_str().map(str::to_owned))
                    .collect();
                (strategy, parameters)
            }
            Err(error) => {
                tracing::warn!(
                    event_name = "recommendation.decode_failed",
                    error = %error,
                    "defaulting to popular recommendations"
                );
                (Strategy::Popular, Vec::new())
            }
        }
    }

    /// Ask the model to present the selected items, nothing more.
    async fn synthesize(
        &self,
        client: &dyn CompletionClient,
        history: &[Message],
        system_prompt: &str,
        recommendations: &[String],
    ) -> Message {
        let window = tail(history, self.history_window);
        let mut turns = vec![ChatTurn::system(system_prompt)];
        turns.extend(ChatTurn::from_history(window));
        if let Some(last) = turns.last_mut() {
            last.content = prompts::recommendation_request(&last.content, recommendations);
        }

        let content = match client.complete(&turns).await {
            Ok(reply) => reply,
            Err(error) => {
                tracing::warn!(
                    event_name = "recommendation.upstream_failed",
                    error = %error,
                    "redirecting to ordering"
                );
                return Message::assistant(prompts::REFUSAL_REPLY);
            }
        };

        Message::assistant_with_memory(content, ConversationMemory::Recommendation)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use barista_core::conversation::{ConversationMemory, Message};
    use barista_core::order::OrderLine;
    use barista_core::recommendations::{
        AprioriCandidate, AprioriTable, PopularityRow, PopularityTable, RecommendationEngine,
    };

    use crate::prompts;
    use crate::testing::ScriptedClient;

    use super::{RecommendationStage, Strategy};

    fn engine() -> Arc<RecommendationEngine> {
        let apriori = AprioriTable::new(
            [(
                "Cappuccino".to_string(),
                vec![
                    AprioriCandidate {
                        product: "Chocolate Croissant".to_string(),
                        product_category: "Bakery".to_string(),
                        confidence: 0.9,
                    },
                    AprioriCandidate {
                        product: "Hazelnut Biscotti".to_string(),
                        product_category: "Bakery".to_string(),
                        confidence: 0.7,
                    },
                ],
            )]
            .into_iter()
            .collect(),
        );
        let popularity = PopularityTable::new(vec![
            PopularityRow {
                product: "Latte".to_string(),
                product_category: "Coffee".to_string(),
                number_of_transactions: 120,
            },
            PopularityRow {
                product: "Croissant".to_string(),
                product_category: "Bakery".to_string(),
                number_of_transactions: 95,
            },
        ]);
        Arc::new(RecommendationEngine::new(apriori, popularity))
    }

    fn stage() -> RecommendationStage {
        RecommendationStage::new(engine(), 3, 5)
    }

    fn history(text: &str) -> Vec<Message> {
        vec![Message::user(text)]
    }

    #[test]
    fn unknown_strategy_spelling_falls_back_to_popular() {
        assert_eq!(Strategy::parse("apriori"), Strategy::Apriori);
        assert_eq!(Strategy::parse("popular by category"), Strategy::PopularByCategory);
        assert_eq!(Strategy::parse("trending"), Strategy::Popular);
    }

    #[tokio::test]
    async fn popular_turn_presents_ranked_items() {
        let client = ScriptedClient::with_replies(&[
            r#"{"recommendation_type": "popular", "parameters": []}"#,
            "- Latte: our most loved coffee\n- Croissant: flaky and fresh",
        ]);
        let stage = stage();

        let reply = stage.respond(&client, &history("What should I get?")).await;
        assert_eq!(reply.memory, Some(ConversationMemory::Recommendation));
        assert!(client.prompt(1).contains("Please recommend these items exactly: Latte, Croissant"));
    }

    #[tokio::test]
    async fn apriori_turn_uses_mentioned_products() {
        let client = ScriptedClient::with_replies(&[
            r#"{"recommendation_type": "apriori", "parameters": ["Cappuccino"]}"#,
            "- Chocolate Croissant\n- Hazelnut Biscotti",
        ]);
        let stage = stage();

        let reply = stage.respond(&client, &history("What goes with a cappuccino?")).await;
        assert_eq!(reply.content, "- Chocolate Croissant\n- Hazelnut Biscotti");
        assert!(client
            .prompt(1)
            .contains("Please recommend these items exactly: Chocolate Croissant, Hazelnut Biscotti"));
    }

    #[tokio::test]
    async fn unknown_category_redirects_without_synthesis() {
        let client = ScriptedClient::with_replies(&[
            r#"{"recommendation_type": "popular by category", "parameters": ["Sandwiches"]}"#,
        ]);
        let stage = stage();

        let reply = stage.respond(&client, &history("Recommend me a sandwich")).await;
        assert_eq!(reply.content, prompts::REFUSAL_REPLY);
        assert!(reply.memory.is_none());
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn garbled_strategy_verdict_defaults_to_popular() {
        let client = ScriptedClient::with_replies(&[
            "definitely the apriori one",
            "still not json",
            "- Latte\n- Croissant",
        ]);
        let stage = stage();

        let reply = stage.respond(&client, &history("Surprise me")).await;
        assert_eq!(reply.content, "- Latte\n- Croissant");
        // strategy call, repair attempt, synthesis
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn order_cross_sell_skips_strategy_classification() {
        let client = ScriptedClient::with_replies(&["- Chocolate Croissant\n- Hazelnut Biscotti"]);
        let stage = stage();
        let order = vec![OrderLine::new("Cappuccino", 2, 750.0)];

        let reply = stage.respond_for_order(&client, &history("Two cappuccinos"), &order).await;
        assert_eq!(reply.memory, Some(ConversationMemory::Recommendation));
        assert_eq!(client.call_count(), 1);
        assert!(client.prompt(0).contains("based on their current order"));
    }

    #[tokio::test]
    async fn order_without_associations_redirects() {
        let client = ScriptedClient::with_replies(&[]);
        let stage = stage();
        let order = vec![OrderLine::new("Espresso shot", 1, 165.0)];

        let reply = stage.respond_for_order(&client, &history("One espresso"), &order).await;
        assert_eq!(reply.content, prompts::REFUSAL_REPLY);
        assert_eq!(client.call_count(), 0);
    }
}
