//! End-to-end pipeline behaviour over a scripted completion backend.
//!
//! These tests drive the orchestrator the way a front end would: build up
//! a history, ask for a reply, append it, continue. They verify the
//! contracts that matter across stages, guard short-circuiting, fail-open,
//! caller-owned order state and the once-per-conversation cross-sell.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use barista_agent::{ChatTurn, CompletionClient, Orchestrator};
use barista_core::catalog::{Menu, MenuItem};
use barista_core::config::AppConfig;
use barista_core::conversation::{ConversationMemory, Message};
use barista_core::order::OrderLine;
use barista_core::recommendations::{
    AprioriCandidate, AprioriTable, PopularityRow, PopularityTable, RecommendationEngine,
};

struct ScriptedClient {
    replies: Mutex<Vec<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn with_replies(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|reply| Ok((*reply).to_string())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn prompt(&self, index: usize) -> String {
        self.prompts.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String> {
        let flattened = turns
            .iter()
            .map(|turn| format!("{:?}: {}", turn.role, turn.content))
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().unwrap().push(flattened);

        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Err(anyhow!("scripted replies exhausted"));
        }
        match replies.remove(0) {
            Ok(text) => Ok(text),
            Err(reason) => Err(anyhow!(reason)),
        }
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.0; 8])
    }
}

fn menu() -> Arc<Menu> {
    Arc::new(Menu::new(vec![
        MenuItem {
            name: "Cappuccino".to_string(),
            category: "Coffee".to_string(),
            price: 375.0,
            description: "Espresso with thick steamed foam.".to_string(),
        },
        MenuItem {
            name: "Croissant".to_string(),
            category: "Bakery".to_string(),
            price: 270.0,
            description: "Buttery and flaky.".to_string(),
        },
        MenuItem {
            name: "Latte".to_string(),
            category: "Coffee".to_string(),
            price: 395.0,
            description: "Espresso with steamed milk.".to_string(),
        },
    ]))
}

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

fn pipeline(client: Arc<ScriptedClient>) -> Orchestrator {
    Orchestrator::new(AppConfig::default().pipeline, menu(), engine(), client, None)
}

const ALLOWED: &str = r#"{"chain of thought": "on topic", "decision": "allowed", "message": ""}"#;

#[tokio::test]
async fn two_turn_order_keeps_state_on_the_history() {
    let client = Arc::new(ScriptedClient::with_replies(&[
        // turn 1: guard, classification, details reply
        ALLOWED,
        r#"{"decision": "details_agent", "message": ""}"#,
        "We do! A latte is \u{20b9}395.",
        // turn 2: guard, classification, order verdict, cross-sell synthesis
        ALLOWED,
        r#"{"decision": "order_taking_agent", "message": ""}"#,
        r#"{"step number": "3", "order": [{"item": "Cappuccino", "quantity": 2, "price": 750}, {"item": "Croissant", "quantity": 1, "price": 270}], "response": "Anything else?"}"#,
        "- Chocolate Croissant: great with a cappuccino\n- Hazelnut Biscotti: a crunchy match",
    ]));
    let pipeline = pipeline(Arc::clone(&client));

    let mut history = vec![Message::user("Do you have lattes?")];
    let first_reply = pipeline.respond(&history).await;
    assert_eq!(first_reply.content, "We do! A latte is \u{20b9}395.");
    assert_eq!(first_reply.memory, Some(ConversationMemory::Details));

    history.push(first_reply);
    history.push(Message::user("I want 2 cappuccinos and a croissant"));
    let second_reply = pipeline.respond(&history).await;

    // The cross-sell replaces the order confirmation.
    assert_eq!(
        second_reply.content,
        "- Chocolate Croissant: great with a cappuccino\n- Hazelnut Biscotti: a crunchy match"
    );
    match second_reply.memory {
        Some(ConversationMemory::OrderTaking {
            ref step_number,
            ref order,
            asked_recommendation_before,
        }) => {
            assert_eq!(step_number, "3");
            assert_eq!(
                order,
                &vec![
                    OrderLine::new("Cappuccino", 2, 750.0),
                    OrderLine::new("Croissant", 1, 270.0),
                ]
            );
            assert!(asked_recommendation_before);
        }
        ref other => panic!("expected order memory, got {other:?}"),
    }

    // With no prior order memory the recovered state is the default.
    assert!(client.prompt(5).contains("step number: 1\norder: []"));
    assert_eq!(client.call_count(), 7);
}

#[tokio::test]
async fn off_topic_turn_is_refused_without_routing() {
    let client = Arc::new(ScriptedClient::with_replies(&[
        r#"{"decision": "not allowed", "message": "Sorry, I can't help with that. Can I help you with your order?"}"#,
    ]));
    let pipeline = pipeline(Arc::clone(&client));

    let reply = pipeline.respond(&[Message::user("Who wins the election?")]).await;
    assert!(reply.content.starts_with("Sorry, I can't help"));
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn empty_guard_completion_fails_open() {
    let client = Arc::new(ScriptedClient::with_replies(&[
        "",
        r#"{"decision": "details_agent", "message": ""}"#,
        "Happy to help with the menu!",
    ]));
    let pipeline = pipeline(Arc::clone(&client));

    let reply = pipeline.respond(&[Message::user("What's on the menu?")]).await;
    assert_eq!(reply.content, "Happy to help with the menu!");
}

#[tokio::test]
async fn fenced_verdicts_decode_end_to_end() {
    let client = Arc::new(ScriptedClient::with_replies(&[
        "```json\n{\"decision\": \"allowed\", \"message\": \"\"}\n```",
        "```json\n{\"decision\": \"recommendation_agent\", \"message\": \"\"}\n```",
        r#"{"recommendation_type": "popular", "parameters": []}"#,
        "- Latte: the crowd favourite\n- Croissant: always fresh",
    ]));
    let pipeline = pipeline(Arc::clone(&client));

    let reply = pipeline.respond(&[Message::user("What should I get?")]).await;
    assert_eq!(reply.content, "- Latte: the crowd favourite\n- Croissant: always fresh");
    assert_eq!(reply.memory, Some(ConversationMemory::Recommendation));
    assert!(client.prompt(3).contains("Please recommend these items exactly: Latte, Croissant"));
}

#[tokio::test]
async fn cross_sell_is_offered_at_most_once_per_conversation() {
    let client = Arc::new(ScriptedClient::with_replies(&[
        // turn 1: first items land in the order, offer fires
        ALLOWED,
        r#"{"decision": "order_taking_agent", "message": ""}"#,
        r#"{"step number": "3", "order": [{"item": "Cappuccino", "quantity": 2, "price": 750}], "response": "Anything else?"}"#,
        "- Chocolate Croissant: great with a cappuccino",
        // turn 2: more items, no second offer
        ALLOWED,
        r#"{"decision": "order_taking_agent", "message": ""}"#,
        r#"{"step number": "4", "order": [{"item": "Cappuccino", "quantity": 2, "price": 750}, {"item": "Latte", "quantity": 1, "price": 395}], "response": "Added a latte. Anything else?"}"#,
    ]));
    let pipeline = pipeline(Arc::clone(&client));

    let mut history = vec![Message::user("I want 2 cappuccinos")];
    let first_reply = pipeline.respond(&history).await;
    assert_eq!(first_reply.content, "- Chocolate Croissant: great with a cappuccino");

    history.push(first_reply);
    history.push(Message::user("Add a latte"));
    let second_reply = pipeline.respond(&history).await;

    assert_eq!(second_reply.content, "Added a latte. Anything else?");
    match second_reply.memory {
        Some(ConversationMemory::OrderTaking { asked_recommendation_before, .. }) => {
            assert!(asked_recommendation_before);
        }
        ref other => panic!("expected order memory, got {other:?}"),
    }
    assert_eq!(client.call_count(), 7);
}

#[tokio::test]
async fn garbled_classification_still_reaches_an_agent() {
    let client = Arc::new(ScriptedClient::with_replies(&[
        ALLOWED,
        "hmm, this should go to the order_taking_agent I believe",
        r#"{"step number": "1", "order": [], "response": "What would you like to order?"}"#,
    ]));
    let pipeline = pipeline(Arc::clone(&client));

    let reply = pipeline.respond(&[Message::user("I'd like to order")]).await;
    assert_eq!(reply.content, "What would you like to order?");
    match reply.memory {
        Some(ConversationMemory::OrderTaking { ref order, .. }) => assert!(order.is_empty()),
        ref other => panic!("expected order memory, got {other:?}"),
    }
}
