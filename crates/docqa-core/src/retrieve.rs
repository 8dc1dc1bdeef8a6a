//! Retrieval orchestration: vector search with lexical fallback and
//! document-name resolution.
//!
//! The orchestrator operates entirely through the [`Store`] and
//! [`Embedder`] traits. The calling application is responsible for
//! constructing [`RetrievalParams`] and passing the appropriate backend
//! implementations.

use std::collections::HashMap;

use crate::embedding::Embedder;
use crate::error::ServiceError;
use crate::models::ContextPassage;
use crate::search::{lexical_fallback, PreviewEntry};
use crate::store::{DistanceMeasure, Store};

/// Tuning for one retrieval pass.
#[derive(Debug, Clone)]
pub struct RetrievalParams {
    /// Number of nearest chunks requested from the vector index.
    pub k: usize,
    pub measure: DistanceMeasure,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            k: 8,
            measure: DistanceMeasure::Cosine,
        }
    }
}

/// Retrieve a ranked, named context list for a question.
///
/// Vector search runs first; when it yields nothing, the lexical fallback
/// runs over the cached previews instead — the result is always one source
/// or the other, never a mix. Vector hits keep the index's native ranking
/// order, with each passage's `order` field carrying the chunk's position
/// within its document.
///
/// An empty result is a designed terminal state, not an error: the caller
/// renders the fixed no-relevant-content response.
pub async fn retrieve_contexts<S: Store>(
    store: &S,
    embedder: &dyn Embedder,
    question: &str,
    params: &RetrievalParams,
) -> Result<Vec<ContextPassage>, ServiceError> {
    let query_vec = embedder
        .embed(question)
        .await
        .map_err(ServiceError::upstream)?;

    let hits = store
        .nearest_chunks(&query_vec, params.k, params.measure)
        .await
        .map_err(ServiceError::store)?;

    if hits.is_empty() {
        tracing::debug!("vector index returned no hits; running lexical fallback");
        let docs = store.list_documents().await.map_err(ServiceError::store)?;
        let names: HashMap<String, String> =
            docs.into_iter().map(|d| (d.id, d.name)).collect();

        let previews = store.list_previews().await.map_err(ServiceError::store)?;
        let entries: Vec<PreviewEntry> = previews
            .into_iter()
            .map(|record| PreviewEntry {
                name: names
                    .get(&record.doc_id)
                    .cloned()
                    .unwrap_or_else(|| record.doc_id.clone()),
                doc_id: record.doc_id,
                preview: record.preview,
            })
            .collect();

        return Ok(lexical_fallback(question, &entries));
    }

    // one name lookup per distinct parent document
    let mut names: HashMap<String, String> = HashMap::new();
    for hit in &hits {
        if !names.contains_key(&hit.doc_id) {
            let name = store
                .get_document(&hit.doc_id)
                .await
                .map_err(ServiceError::store)?
                .map(|d| d.name)
                .unwrap_or_else(|| hit.doc_id.clone());
            names.insert(hit.doc_id.clone(), name);
        }
    }

    Ok(hits
        .into_iter()
        .map(|hit| ContextPassage {
            id: hit.id,
            doc_name: names
                .get(&hit.doc_id)
                .cloned()
                .unwrap_or_else(|| hit.doc_id.clone()),
            doc_id: hit.doc_id,
            order: hit.order,
            text: hit.text,
        })
        .collect())
}
