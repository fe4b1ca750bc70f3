//! Conversation pipeline for the ordering assistant.
//!
//! Every user turn flows through the same stages:
//! 1. **Guard** (`guard`) - is the message in scope for the shop at all?
//! 2. **Classification** (`classify`) - which specialist agent takes it?
//! 3. **Dispatch** (`pipeline`) - details, order taking or recommendation.
//!
//! # Key Types
//!
//! - `Orchestrator` - runs the per-turn pipeline (see `pipeline` module)
//! - `CompletionClient` - pluggable completion backend, with `GeminiClient`
//!   as the production implementation
//! - `Retriever` - optional vector-store lookup for the details stage
//!
//! # State Principle
//!
//! The pipeline holds no conversation state. Order progress, the
//! cross-sell flag and routing decisions ride on the messages themselves
//! as memory blocks, and the caller re-submits them with the next turn.
//! Losing the history loses the order, by contract.
//!
//! The model is also never trusted with selection: which items get
//! recommended is computed from the data tables in `barista-core`, and the
//! model only phrases the reply.

pub mod classify;
pub mod decode;
pub mod details;
pub mod errors;
pub mod gemini;
pub mod guard;
pub mod llm;
pub mod order_taking;
pub mod pipeline;
pub mod prompts;
pub mod recommend;

pub use errors::AgentError;
pub use gemini::GeminiClient;
pub use llm::{ChatTurn, CompletionClient};
pub use pipeline::Orchestrator;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use crate::llm::{ChatTurn, CompletionClient};

    /// Completion fake that replays scripted replies in order and records
    /// every prompt it was asked to complete.
    pub struct ScriptedClient {
        replies: Mutex<Vec<Result<String, String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        pub fn with_replies(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(
                    replies.iter().map(|reply| Ok((*reply).to_string())).collect(),
                ),
                prompts: Mutex::new(Vec::new()),
            }
        }

        /// A client whose every call fails, for upstream-outage paths.
        pub fn failing() -> Self {
            Self {
                replies: Mutex::new(vec![Err("completion backend down".to_string()); 8]),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        /// Flattened prompt of the `index`-th completion call.
        pub fn prompt(&self, index: usize) -> String {
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
}
