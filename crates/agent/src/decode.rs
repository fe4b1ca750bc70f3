//! Shared decoder for structured completions.
//!
//! Every stage that expects JSON from the model goes through the same
//! ladder: empty check, fence strip, outermost brace slice, strict parse.
//! Stages that can afford a second model call may add one repair round trip
//! on top. Callers translate a decode failure into their own safe default,
//! the error never reaches the user.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::AgentError;
use crate::llm::{ChatTurn, CompletionClient};
use crate::prompts;

/// Cuts a JSON candidate out of raw completion text.
///
/// Strips a leading markdown fence (and the matching closing fence line),
/// then slices from the first `{` to the last `}` when both are present.
/// Returns `None` only for blank input.
pub fn extract_candidate(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut candidate = if trimmed.starts_with("```") {
        let mut lines: Vec<&str> = trimmed.lines().collect();
        lines.remove(0);
        while let Some(last) = lines.last() {
            if last.trim().is_empty() {
                lines.pop();
                continue;
            }
            if last.trim().starts_with("```") {
                lines.pop();
            }
            break;
        }
        lines.join("\n").trim().to_string()
    } else {
        trimmed.to_string()
    };

    if let (Some(start), Some(end)) = (candidate.find('{'), candidate.rfind('}')) {
        if start < end {
            candidate = candidate[start..=end].to_string();
        }
    }

    Some(candidate)
}

/// Runs the full ladder and parses the candidate as a JSON value.
pub fn decode_value(stage: &'static str, raw: &str) -> Result<Value, AgentError> {
    let candidate = extract_candidate(raw).ok_or(AgentError::EmptyCompletion { stage })?;
    serde_json::from_str(&candidate).map_err(|_| AgentError::MalformedCompletion { stage })
}

/// Runs the full ladder and deserializes into the stage's payload type.
pub fn decode<T: DeserializeOwned>(stage: &'static str, raw: &str) -> Result<T, AgentError> {
    let value = decode_value(stage, raw)?;
    serde_json::from_value(value).map_err(|_| AgentError::MalformedCompletion { stage })
}

/// Like [`decode`], but on a parse failure asks the completion service to
/// repair the payload once and decodes the repaired text.
///
/// Empty completions skip the repair, there is nothing to fix.
pub async fn decode_with_repair<T: DeserializeOwned>(
    stage: &'static str,
    raw: &str,
    client: &dyn CompletionClient,
) -> Result<T, AgentError> {
    let first_error = match decode::<T>(stage, raw) {
        Ok(payload) => return Ok(payload),
        Err(error @ AgentError::EmptyCompletion { .. }) => return Err(error),
        Err(error) => error,
    };

    tracing::warn!(
        event_name = "decode.repairing",
        stage,
        "completion was not valid JSON, requesting a repair"
    );

    let instruction = prompts::repair_instruction(raw);
    let repaired = match client.complete(&[ChatTurn::user(instruction)]).await {
        Ok(text) => text,
        Err(error) => {
            tracing::warn!(
                event_name = "decode.repair_unavailable",
                stage,
                error = %error,
                "repair call failed, keeping original decode error"
            );
            return Err(first_error);
        }
    };

    decode(stage, &repaired)
}
