//! Gemini REST client.
//!
//! Chat turns are flattened into a single role-prefixed transcript before
//! the request goes out, and every call pins the same deterministic
//! generation settings (temperature 0) so structured replies stay stable.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use barista_core::conversation::Role;

use crate::llm::{ChatTurn, CompletionClient};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const TEMPERATURE: f64 = 0.0;
const TOP_P: f64 = 0.8;
const MAX_OUTPUT_TOKENS: u32 = 2000;

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: SecretString,
    completion_model: String,
    embedding_model: String,
}

impl GeminiClient {
    pub fn new(
        api_key: SecretString,
        completion_model: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            completion_model: completion_model.into(),
            embedding_model: embedding_model.into(),
        }
    }

    fn generate_url(&self) -> String {
        format!(
            "{API_BASE}/{}:generateContent?key={}",
            self.completion_model,
            self.api_key.expose_secret()
        )
    }

    fn embed_url(&self) -> String {
        format!(
            "{API_BASE}/{}:embedContent?key={}",
            self.embedding_model,
            self.api_key.expose_secret()
        )
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content { parts: vec![Part { text: flatten_turns(turns) }] }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_p: TOP_P,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response: GenerateResponse = self
            .http
            .post(self.generate_url())
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(anyhow!("Gemini API error: {}", error.message));
        }

        response
            .candidates
            .and_then(|candidates| {
                candidates
                    .into_iter()
                    .next()
                    .and_then(|candidate| candidate.content.parts.into_iter().next())
                    .map(|part| part.text)
            })
            .ok_or_else(|| anyhow!("Gemini response contained no candidates"))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            content: Content { parts: vec![Part { text: text.to_string() }] },
            task_type: "RETRIEVAL_DOCUMENT",
        };

        let response: EmbedResponse = self
            .http
            .post(self.embed_url())
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(anyhow!("Gemini API error: {}", error.message));
        }

        response
            .embedding
            .map(|embedding| embedding.values)
            .ok_or_else(|| anyhow!("Gemini response contained no embedding"))
    }
}

/// Renders a chat exchange as the single-text prompt the API expects.
fn flatten_turns(turns: &[ChatTurn]) -> String {
    turns
        .iter()
        .map(|turn| {
            let prefix = match turn.role {
                Role::System => "System",
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            format!("{prefix}: {}", turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "topP")]
    top_p: f64,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    content: Content,
    #[serde(rename = "taskType")]
    task_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Option<Embedding>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Embedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
