//! Shop-details stage. Answers menu, ingredient and store questions,
//! grounded in retrieved context with the local catalog as fallback.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use barista_core::catalog::Menu;
use barista_core::conversation::{tail, ConversationMemory, Message};

use crate::llm::{ChatTurn, CompletionClient};
use crate::prompts;

/// Vector-store lookup for menu knowledge.
///
/// Implementations return ranked context snippets for an embedded query.
/// The stage treats any failure, and an empty result, as a signal to fall
/// back to snippets rendered from the local catalog.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<String>>;
}

pub struct DetailsStage {
    menu: Arc<Menu>,
    history_window: usize,
    retrieval_top_k: usize,
}

impl DetailsStage {
    pub fn new(menu: Arc<Menu>, history_window: usize, retrieval_top_k: usize) -> Self {
        Self { menu, history_window, retrieval_top_k }
    }

    pub async fn respond(
        &self,
        client: &dyn CompletionClient,
        retriever: Option<&dyn Retriever>,
        history: &[Message],
    ) -> Message {
        let query = history.last().map(|message| message.content.clone()).unwrap_or_default();
        let context = self.gather_context(client, retriever, &query).await;

        let window = tail(history, self.history_window);
        let mut turns = vec![ChatTurn::system(prompts::DETAILS_SYSTEM_PROMPT)];
        turns.extend(ChatTurn::from_history(window));
        if let Some(last) = turns.last_mut() {
            last.content = prompts::details_request(&context, &query);
        }

        let content = match client.complete(&turns).await {
            Ok(reply) => reply,
            Err(error) => {
                tracing::warn!(
                    event_name = "details.upstream_failed",
                    error = %error,
                    "replying with the fixed fallback"
                );
                prompts::DETAILS_FALLBACK_REPLY.to_string()
            }
        };

        Message::assistant_with_memory(content, ConversationMemory::Details)
    }

    /// Retrieval first, catalog snippets when retrieval is missing, fails
    /// or comes back empty.
    async fn gather_context(
        &self,
        client: &dyn CompletionClient,
        retriever: Option<&dyn Retriever>,
        query: &str,
    ) -> String {
        if let Some(retriever) = retriever {
            match self.retrieve(client, retriever, query).await {
                Ok(snippets) if !snippets.is_empty() => return snippets.join("\n"),
                Ok(_) => {
                    tracing::debug!(
                        event_name = "details.retrieval_empty",
                        "no matches, using catalog snippets"
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        event_name = "details.retrieval_failed",
                        error = %error,
                        "using catalog snippets"
                    );
                }
            }
        }
        self.menu.context_snippets()
    }

    async fn retrieve(
        &self,
        client: &dyn CompletionClient,
        retriever: &dyn Retriever,
        query: &str,
    ) -> Result<Vec<String>> {
        let embedding = client.embed(query).await?;
        retriever.query(&embedding, self.retrieval_top_k).await
    }
}
