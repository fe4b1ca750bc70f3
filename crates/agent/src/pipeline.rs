//! Per-turn orchestration: guard, route, dispatch.
//!
//! The orchestrator is stateless across turns. Everything it needs to
//! continue a conversation rides on the history the caller passes in, which
//! is also why `respond` takes the full history instead of a single
//! message.

use std::sync::Arc;

use uuid::Uuid;

use barista_core::catalog::Menu;
use barista_core::config::PipelineConfig;
use barista_core::conversation::{AgentKind, Message};
use barista_core::recommendations::RecommendationEngine;

use crate::classify::ClassificationStage;
use crate::details::{DetailsStage, Retriever};
use crate::guard::{is_blocked, GuardStage};
use crate::llm::CompletionClient;
use crate::order_taking::OrderTakingStage;
use crate::recommend::RecommendationStage;

/// Routes an allowed turn to exactly one specialist stage.
///
/// Built once at construction; there is one entry per [`AgentKind`] and the
/// order-taking entry shares the recommendation stage for cross-sell.
struct DispatchTable {
    details: DetailsStage,
    order_taking: OrderTakingStage,
    recommendation: Arc<RecommendationStage>,
}

impl DispatchTable {
    async fn dispatch(
        &self,
        route: AgentKind,
        client: &dyn CompletionClient,
        retriever: Option<&dyn Retriever>,
        history: &[Message],
    ) -> Message {
        match route {
            AgentKind::Details => self.details.respond(client, retriever, history).await,
            AgentKind::OrderTaking => self.order_taking.respond(client, history).await,
            AgentKind::Recommendation => self.recommendation.respond(client, history).await,
        }
    }
}

pub struct Orchestrator {
    client: Arc<dyn CompletionClient>,
    retriever: Option<Arc<dyn Retriever>>,
    guard: GuardStage,
    classifier: ClassificationStage,
    table: DispatchTable,
}

impl Orchestrator {
    pub fn new(
        pipeline: PipelineConfig,
        menu: Arc<Menu>,
        engine: Arc<RecommendationEngine>,
        client: Arc<dyn CompletionClient>,
        retriever: Option<Arc<dyn Retriever>>,
    ) -> Self {
        let recommendation = Arc::new(RecommendationStage::new(
            engine,
            pipeline.history_window,
            pipeline.recommendation_top_k,
        ));
        let table = DispatchTable {
            details: DetailsStage::new(
                Arc::clone(&menu),
                pipeline.history_window,
                pipeline.retrieval_top_k,
            ),
            order_taking: OrderTakingStage::new(menu, Arc::clone(&recommendation)),
            recommendation,
        };

        Self {
            client,
            retriever,
            guard: GuardStage::new(pipeline.history_window),
            classifier: ClassificationStage::new(pipeline.history_window),
            table,
        }
    }

    /// Produce the assistant reply for the latest turn in `history`.
    ///
    /// Never fails: every stage degrades to a documented safe reply, so the
    /// caller always gets a well-formed message to append to the history.
    pub async fn respond(&self, history: &[Message]) -> Message {
        let turn_id = Uuid::new_v4();
        let client = self.client.as_ref();

        let guard_reply = self.guard.evaluate(client, history).await;
        if is_blocked(&guard_reply) {
            tracing::info!(
                event_name = "pipeline.turn_blocked",
                %turn_id,
                "guard refused the turn"
            );
            return guard_reply;
        }

        let route = self.classifier.classify(client, history).await;
        let reply = self
            .table
            .dispatch(route, client, self.retriever.as_deref(), history)
            .await;

        tracing::info!(
            event_name = "pipeline.turn_completed",
            %turn_id,
            route = route.as_str(),
            "turn handled"
        );
        reply
    }
}
