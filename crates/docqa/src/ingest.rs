//! Upload acceptance and background indexing.
//!
//! [`upload_document`] validates the payload, stores the raw text, and
//! returns the new document immediately; [`index_document`] then runs as
//! a fire-and-forget task, observable only through the document's status
//! field. Exactly one indexing run happens per upload — re-uploading
//! creates a new document id.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use docqa_core::chunk::{floor_char_boundary, Segments};
use docqa_core::embedding::Embedder;
use docqa_core::error::ServiceError;
use docqa_core::models::{ChunkRecord, Document, FilePart, FileRecord, NewDocument};
use docqa_core::store::Store;

use crate::config::{ChunkingConfig, Config, IndexingConfig, UploadConfig};

/// A plain-text payload as received from the caller.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Validate and accept an upload.
///
/// Stores the raw text (preview plus bounded parts), creates the document
/// record in `indexing` status, spawns the background indexer, and
/// returns. The caller is acknowledged before indexing completes; poll
/// [`Store::get_document`] for the terminal status.
pub async fn upload_document<S: Store + 'static>(
    store: Arc<S>,
    embedder: Arc<dyn Embedder>,
    config: &Config,
    req: UploadRequest,
) -> Result<Document, ServiceError> {
    if !req.file_name.to_lowercase().ends_with(".txt") {
        return Err(ServiceError::validation("only .txt files are accepted"));
    }
    if req.bytes.len() > config.upload.max_upload_bytes {
        return Err(ServiceError::validation(format!(
            "file exceeds the {} byte upload limit",
            config.upload.max_upload_bytes
        )));
    }

    let mut text = String::from_utf8_lossy(&req.bytes).trim().to_string();
    if text.is_empty() {
        return Err(ServiceError::validation("empty text file"));
    }
    if text.chars().count() > config.upload.max_text_chars {
        text = text.chars().take(config.upload.max_text_chars).collect();
    }

    // the document record first, so it is immediately listable
    let doc = store
        .create_document(NewDocument {
            name: req.file_name.clone(),
            size: req.bytes.len() as u64,
            mime: "text/plain".to_string(),
        })
        .await
        .map_err(ServiceError::store)?;

    store_original_text(&*store, &doc.id, &text, &config.upload)
        .await
        .map_err(ServiceError::store)?;

    // acknowledge the caller; indexing continues on its own
    let store_bg = Arc::clone(&store);
    let embedder_bg = Arc::clone(&embedder);
    let chunking = config.chunking.clone();
    let indexing = config.indexing.clone();
    let doc_id = doc.id.clone();
    tokio::spawn(async move {
        match index_document(
            &*store_bg,
            &*embedder_bg,
            &chunking,
            &indexing,
            &doc_id,
            &text,
        )
        .await
        {
            Ok(count) => info!(doc_id = %doc_id, chunks = count, "indexing complete"),
            Err(err) => {
                error!(doc_id = %doc_id, error = %err, "indexing failed");
                if let Err(update_err) =
                    store_bg.mark_document_error(&doc_id, &err.to_string()).await
                {
                    error!(doc_id = %doc_id, error = %update_err, "failed to record indexing error");
                }
            }
        }
    });

    Ok(doc)
}

/// Store the raw text as a bounded preview plus fixed-size parts, so no
/// single record exceeds the store's size ceiling.
async fn store_original_text<S: Store>(
    store: &S,
    doc_id: &str,
    text: &str,
    config: &UploadConfig,
) -> anyhow::Result<()> {
    let total_chars = text.chars().count();
    let preview: String = text.chars().take(config.preview_chars).collect();

    store
        .put_file_record(
            doc_id,
            &FileRecord {
                preview,
                parts_count: total_chars.div_ceil(config.part_chars) as u32,
                mime: "text/plain".to_string(),
                created_at: Utc::now(),
            },
        )
        .await?;

    let mut chars = text.chars();
    let mut idx = 0u32;
    loop {
        let content: String = chars.by_ref().take(config.part_chars).collect();
        if content.is_empty() {
            break;
        }
        store.put_file_part(doc_id, &FilePart { idx, content }).await?;
        idx += 1;
    }
    Ok(())
}

/// Chunk, embed, and commit a document's text, then set the terminal
/// status.
///
/// Embedding calls run sequentially, one per chunk. Records accumulate
/// into batches of `indexing.batch_size` and each batch commits
/// atomically, with a cooperative yield between commits. The first
/// failure aborts the run: chunks already committed remain visible, and
/// the caller records the error status.
pub async fn index_document<S: Store>(
    store: &S,
    embedder: &dyn Embedder,
    chunking: &ChunkingConfig,
    indexing: &IndexingConfig,
    doc_id: &str,
    text: &str,
) -> anyhow::Result<u32> {
    let segments = Segments::new(text, chunking.target_chars, chunking.overlap_chars)?;

    let mut batch: Vec<ChunkRecord> = Vec::new();
    let mut count: u32 = 0;

    for segment in segments {
        let mut chunk_text = segment.text;
        if chunk_text.len() > chunking.max_chunk_chars {
            chunk_text.truncate(floor_char_boundary(&chunk_text, chunking.max_chunk_chars));
        }

        let embedding = embedder.embed(&chunk_text).await?;
        batch.push(ChunkRecord {
            doc_id: doc_id.to_string(),
            page: segment.page,
            order: segment.order,
            text: chunk_text,
            embedding,
            created_at: Utc::now(),
        });
        count += 1;

        if batch.len() >= indexing.batch_size {
            store.insert_chunks(&batch).await?;
            batch.clear();
            tokio::task::yield_now().await;
        }
    }

    if !batch.is_empty() {
        store.insert_chunks(&batch).await?;
    }

    store.mark_document_ready(doc_id, count).await?;
    Ok(count)
}
