//! OpenAI embedding and chat-completion adapters.
//!
//! One client implements both provider traits: `POST /v1/embeddings` for
//! [`Embedder`] and `POST /v1/chat/completions` for [`CompletionModel`].
//! Requires the `OPENAI_API_KEY` environment variable.
//!
//! # Retry Strategy
//!
//! Transient failures inside a single logical call are retried with
//! exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use docqa_core::completion::{CompletionModel, CompletionRequest};
use docqa_core::embedding::Embedder;

use crate::config::ModelsConfig;

const EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Fallback system prompt when a request does not carry its own.
const DEFAULT_SYSTEM_PROMPT: &str = "You are a concise, reliable assistant.";

/// OpenAI-backed embedding and completion provider.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    embed_model: String,
    embed_dims: usize,
    chat_model: String,
    temperature: f32,
    max_retries: u32,
}

impl OpenAiClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `OPENAI_API_KEY` is not in the environment or
    /// the HTTP client cannot be built.
    pub fn new(config: &ModelsConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key,
            embed_model: config.embed_model.clone(),
            embed_dims: config.embed_dims,
            chat_model: config.chat_model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }

    async fn post_with_backoff(&self, url: &str, body: &Value) -> Result<Value> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .http
                .post(url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response.json().await?);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow!("OpenAI API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("OpenAI request failed after retries")))
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.embed_model
    }

    fn dims(&self) -> usize {
        self.embed_dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = json!({
            "model": self.embed_model,
            "input": text.trim(),
        });
        let response = self.post_with_backoff(EMBEDDINGS_URL, &body).await?;

        let embedding = response
            .pointer("/data/0/embedding")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("Invalid embeddings response: missing data[0].embedding"))?;

        Ok(embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect())
    }
}

#[async_trait]
impl CompletionModel for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.chat_model
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<String> {
        let system = req.system.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let mut body = json!({
            "model": self.chat_model,
            "temperature": req.temperature.unwrap_or(self.temperature),
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": req.prompt },
            ],
        });
        if req.json {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let response = self.post_with_backoff(CHAT_URL, &body).await?;
        let content = response
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Ok(content.to_string())
    }
}
