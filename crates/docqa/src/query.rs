//! Question answering over the indexed documents.

use docqa_core::answer::answer_with_judgment;
use docqa_core::completion::CompletionModel;
use docqa_core::embedding::Embedder;
use docqa_core::error::ServiceError;
use docqa_core::models::QueryResponse;
use docqa_core::retrieve::{retrieve_contexts, RetrievalParams};
use docqa_core::store::{DistanceMeasure, Store};

use crate::config::RetrievalConfig;

/// A question with optional per-request retrieval overrides.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub question: String,
    pub k: Option<usize>,
    pub distance_measure: Option<DistanceMeasure>,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            k: None,
            distance_measure: None,
        }
    }
}

/// Answer a question: retrieve context, generate a grounded answer, and
/// attach the completeness judgment.
///
/// When nothing relevant is found anywhere, the fixed empty-context
/// response is returned (score 0.2 with remediation hints) — that is a
/// designed outcome, not an error.
pub async fn answer_query<S: Store>(
    store: &S,
    embedder: &dyn Embedder,
    model: &dyn CompletionModel,
    config: &RetrievalConfig,
    req: &QueryRequest,
) -> Result<QueryResponse, ServiceError> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(ServiceError::validation("missing question"));
    }

    let params = RetrievalParams {
        k: req.k.unwrap_or(config.k),
        measure: req.distance_measure.unwrap_or(config.distance_measure),
    };

    let contexts = retrieve_contexts(store, embedder, question, &params).await?;
    let (answer, completeness) = answer_with_judgment(model, question, &contexts).await?;

    Ok(QueryResponse {
        answer,
        contexts,
        completeness,
    })
}
