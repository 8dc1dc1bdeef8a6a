//! # docqa
//!
//! **A retrieval-augmented Q&A engine for plain-text documents.**
//!
//! docqa ingests `.txt` uploads, chunks and embeds them in a background
//! task, and answers natural-language questions by retrieving the nearest
//! chunks (with a lexical fallback over cached previews) and generating a
//! grounded, cited answer plus a self-assessed completeness judgment.
//!
//! ## Data Flow
//!
//! 1. **Upload** ([`ingest`]) validates the payload, stores the raw text
//!    as a preview plus bounded parts, creates the document record, and
//!    returns immediately; a spawned indexer chunks, embeds, and commits
//!    in atomic batches, then flips the document to `ready` or `error`.
//! 2. **Query** ([`query`]) embeds the question, fetches the nearest
//!    chunks ([`docqa_core::retrieve`]), falls back to the lexical search
//!    when the vector index is empty, and runs the two-call answer/judge
//!    engine ([`docqa_core::answer`]).
//! 3. **Delete** ([`delete`]) cascades through chunks and file parts in
//!    bounded batches before removing the document and file record.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | SQLite connection pool with WAL mode, schema migrations |
//! | [`sqlite_store`] | SQLite implementation of the core `Store` trait |
//! | [`openai`] | OpenAI embedding and chat-completion adapters |
//! | [`ingest`] | Upload acceptance and the background indexer |
//! | [`query`] | Question answering over the indexed documents |
//! | [`delete`] | Cascading batched deletion |

pub mod config;
pub mod db;
pub mod delete;
pub mod ingest;
pub mod openai;
pub mod query;
pub mod sqlite_store;

pub use docqa_core::error::{ErrorKind, ServiceError};
pub use docqa_core::models;
pub use docqa_core::store;
