//! Grounded answer generation and completeness judging.
//!
//! Two completion calls per answered question: one to produce the answer
//! strictly from the retrieved context (with inline `[#n]` citations),
//! and one asking the model to judge how completely that answer covers
//! the question. The two are deliberately decoupled — a judgment failure
//! never blocks returning a usable answer.

use serde_json::Value;

use crate::completion::{CompletionModel, CompletionRequest};
use crate::error::ServiceError;
use crate::models::{Completeness, ContextPassage};

/// Default assistant behaviour for both completion calls.
const SYSTEM_PROMPT: &str = "You are a concise, reliable assistant.";

/// Answer returned when retrieval produced no context at all.
pub const NO_CONTEXT_ANSWER: &str = "I couldn't find relevant information in your documents.";

/// Score substituted when the judge call fails or returns a non-numeric
/// score.
const DEFAULT_JUDGE_SCORE: f64 = 0.7;

/// Fixed score for the empty-context response.
const EMPTY_CONTEXT_SCORE: f64 = 0.2;

/// The fixed judgment for the empty-context response: a low score plus
/// remediation hints for the user.
pub fn empty_context_completeness() -> Completeness {
    Completeness {
        score: EMPTY_CONTEXT_SCORE,
        missing: vec![
            "Upload .txt documents that contain the information you're asking for".to_string(),
            "Ask a more specific question using terms present in your files".to_string(),
        ],
        reasons: vec!["No matching content found".to_string()],
    }
}

/// Build the grounded answer prompt, labelling each passage
/// `[#n] (docName) text` so the model can cite inline.
pub fn build_answer_prompt(question: &str, contexts: &[ContextPassage]) -> String {
    let ctx_block = contexts
        .iter()
        .enumerate()
        .map(|(i, c)| format!("[#{}] ({}) {}", i + 1, c.doc_name, c.text))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Answer the question strictly from the context. Use inline citations like [#n].\n\n\
         Question:\n{question}\n\nContext:\n{ctx_block}\n"
    )
}

/// Build the judgment prompt asking for a structured completeness verdict.
pub fn build_judge_prompt(question: &str, answer: &str, context_count: usize) -> String {
    format!(
        "Return JSON {{\"score\":0..1,\"missing\":[\"...\"],\"reasons\":[\"...\"]}} judging completeness.\n\n\
         Question: {question}\nAnswer: {answer}\nContextChunks: {context_count}\n"
    )
}

/// Parse the judge's structured output defensively.
///
/// The response has no guaranteed shape: code fences are stripped, a
/// numeric `score` is clamped to `[0, 1]`, and any field that fails to
/// parse keeps its default (score 0.7, empty lists). This function never
/// fails.
pub fn parse_judgment(raw: &str) -> Completeness {
    let mut judgment = Completeness {
        score: DEFAULT_JUDGE_SCORE,
        missing: Vec::new(),
        reasons: Vec::new(),
    };

    let cleaned = raw.replace("```json", "").replace("```", "");
    let value: Value = match serde_json::from_str(cleaned.trim()) {
        Ok(v) => v,
        Err(_) => return judgment,
    };

    if let Some(score) = value.get("score").and_then(Value::as_f64) {
        judgment.score = score.clamp(0.0, 1.0);
    }
    if let Some(list) = value.get("missing").and_then(Value::as_array) {
        judgment.missing = list
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
    }
    if let Some(list) = value.get("reasons").and_then(Value::as_array) {
        judgment.reasons = list
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
    }
    judgment
}

/// Generate a grounded answer and judge its completeness.
///
/// With an empty context list this short-circuits to the fixed
/// no-relevant-information response without calling the model. Otherwise
/// the answer call's failure propagates (the answer is the primary
/// deliverable), while a judge failure is logged and replaced with
/// defaults.
pub async fn answer_with_judgment(
    model: &dyn CompletionModel,
    question: &str,
    contexts: &[ContextPassage],
) -> Result<(String, Completeness), ServiceError> {
    if contexts.is_empty() {
        return Ok((NO_CONTEXT_ANSWER.to_string(), empty_context_completeness()));
    }

    let answer = model
        .complete(&CompletionRequest {
            prompt: build_answer_prompt(question, contexts),
            system: Some(SYSTEM_PROMPT.to_string()),
            temperature: None,
            json: false,
        })
        .await
        .map_err(ServiceError::upstream)?;

    let judge_request = CompletionRequest {
        prompt: build_judge_prompt(question, &answer, contexts.len()),
        system: Some(SYSTEM_PROMPT.to_string()),
        temperature: None,
        json: true,
    };
    let completeness = match model.complete(&judge_request).await {
        Ok(raw) => parse_judgment(&raw),
        Err(err) => {
            tracing::warn!(error = %err, "completeness judge call failed; using defaults");
            Completeness {
                score: DEFAULT_JUDGE_SCORE,
                missing: Vec::new(),
                reasons: Vec::new(),
            }
        }
    };

    Ok((answer, completeness))
}
