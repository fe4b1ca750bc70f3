use thiserror::Error;

/// Failures inside a single pipeline stage.
///
/// These never cross the pipeline boundary. Every stage catches its own
/// errors and falls back to a documented safe reply, so a conversation turn
/// always produces a well-formed assistant message.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("completion service unavailable during {stage}: {reason}")]
    UpstreamUnavailable { stage: &'static str, reason: String },

    #[error("completion service returned an empty reply during {stage}")]
    EmptyCompletion { stage: &'static str },

    #[error("completion could not be decoded as JSON during {stage}")]
    MalformedCompletion { stage: &'static str },
}

impl AgentError {
    /// Stage name for log correlation.
    pub fn stage(&self) -> &'static str {
        match self {
            AgentError::UpstreamUnavailable { stage, .. } => stage,
            AgentError::EmptyCompletion { stage } => stage,
            AgentError::MalformedCompletion { stage } => stage,
        }
    }
}
