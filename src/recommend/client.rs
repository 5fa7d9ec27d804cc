//! Text-generation collaborator client
//!
//! The service is an opaque, possibly slow, possibly failing remote call.
//! No retries here: a failed or timed-out request is a per-sample task
//! failure the dispatcher records and moves past.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::prompts;
use crate::config::RecommendConfig;
use crate::types::BreachRecord;

/// Recommendation errors. All of them are task-level: none aborts a batch.
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned status {0}")]
    ServerError(reqwest::StatusCode),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("API key not configured (env {0})")]
    MissingApiKey(String),
}

/// Request payload for one recommendation: the sample's equipment identity
/// and its ordered breach records.
#[derive(Debug, Clone)]
pub struct RecommendationRequest {
    pub sample_number: String,
    pub component: String,
    pub machine: String,
    pub machine_model: Option<String>,
    pub breaches: Vec<BreachRecord>,
}

/// Narrow seam to the text-generation collaborator.
///
/// The pipeline only ever needs "request in, free text out"; tests swap in
/// a fake, production uses [`ChatClient`].
#[async_trait]
pub trait Recommender: Send + Sync {
    async fn generate(&self, request: &RecommendationRequest) -> Result<String, RecommendError>;
}

// ============================================================================
// OpenAI-compatible chat client
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// HTTP client for an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl ChatClient {
    /// Build a client from config. The API key comes from the environment
    /// variable named in `config.api_key_env`.
    pub fn from_config(config: &RecommendConfig) -> Result<Self, RecommendError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| RecommendError::MissingApiKey(config.api_key_env.clone()))?;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl Recommender for ChatClient {
    async fn generate(&self, request: &RecommendationRequest) -> Result<String, RecommendError> {
        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": prompts::SYSTEM_PROMPT,
        })];
        for (user, assistant) in prompts::FEW_SHOT_EXAMPLES {
            messages.push(serde_json::json!({"role": "user", "content": user}));
            messages.push(serde_json::json!({"role": "assistant", "content": assistant}));
        }
        messages.push(serde_json::json!({
            "role": "user",
            "content": prompts::analysis_prompt(
                &request.component,
                &request.machine,
                request.machine_model.as_deref(),
                &request.breaches,
            ),
        }));

        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(RecommendError::ServerError(resp.status()));
        }

        let parsed: ChatResponse = resp.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| RecommendError::MalformedResponse("empty choices".to_string()))?;

        debug!(
            sample = %request.sample_number,
            chars = content.len(),
            "Recommendation generated"
        );
        Ok(content)
    }
}
