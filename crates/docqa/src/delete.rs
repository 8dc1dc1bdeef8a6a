//! Cascading document deletion in bounded batches.

use docqa_core::error::ServiceError;
use docqa_core::store::Store;

/// Delete everything under a document id: chunks first, then file parts,
/// then the document and file record in one final atomic batch.
///
/// Each round fetches up to `batch_size` matching records and deletes
/// them atomically, yielding between rounds, until a fetch returns none.
/// Re-running after a mid-sequence failure is safe — already-deleted
/// records simply stop matching.
pub async fn delete_document<S: Store>(
    store: &S,
    batch_size: usize,
    doc_id: &str,
) -> Result<(), ServiceError> {
    loop {
        let ids = store
            .chunk_ids_for_document(doc_id, batch_size)
            .await
            .map_err(ServiceError::store)?;
        if ids.is_empty() {
            break;
        }
        store.delete_chunks(&ids).await.map_err(ServiceError::store)?;
        tokio::task::yield_now().await;
    }

    loop {
        let idxs = store
            .file_part_idxs(doc_id, batch_size)
            .await
            .map_err(ServiceError::store)?;
        if idxs.is_empty() {
            break;
        }
        store
            .delete_file_parts(doc_id, &idxs)
            .await
            .map_err(ServiceError::store)?;
        tokio::task::yield_now().await;
    }

    store
        .delete_document_and_file(doc_id)
        .await
        .map_err(ServiceError::store)
}
