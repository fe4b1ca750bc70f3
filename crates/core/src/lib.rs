pub mod catalog;
pub mod config;
pub mod conversation;
pub mod errors;
pub mod order;
pub mod recommendations;

pub use catalog::{Menu, MenuItem};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use conversation::{
    AgentKind, ConversationMemory, GuardDecision, Message, OrderState, Role,
};
pub use errors::DomainError;
pub use order::{normalize_order, OrderLine};
pub use recommendations::{
    AprioriCandidate, AprioriTable, PopularityRow, PopularityTable, RecommendationEngine,
};
