//! Completion-model trait.
//!
//! The answer and judgment calls both go through [`CompletionModel`];
//! the concrete OpenAI chat adapter lives in the `docqa` app crate.

use anyhow::Result;
use async_trait::async_trait;

/// Options for one completion call.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub prompt: String,
    /// System prompt; the adapter supplies its default when absent.
    pub system: Option<String>,
    /// Sampling temperature; the adapter supplies its default when absent.
    pub temperature: Option<f32>,
    /// Ask the service to constrain the response to a JSON object.
    pub json: bool,
}

/// Language-model completion service: prompt in, text out.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;
    /// Run one completion and return the raw response text.
    async fn complete(&self, req: &CompletionRequest) -> Result<String>;
}
