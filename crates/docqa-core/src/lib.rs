//! # docqa core
//!
//! Runtime-agnostic logic for docqa: data models, the overlapping-window
//! chunker, the store abstraction, the lexical fallback search, the
//! retrieval orchestrator, and the grounded answer / completeness engine.
//!
//! This crate contains no tokio, sqlx, or HTTP dependencies. Concrete
//! store and provider implementations live in the `docqa` app crate; an
//! in-memory store is included here for tests and embedded use.

pub mod answer;
pub mod chunk;
pub mod completion;
pub mod embedding;
pub mod error;
pub mod models;
pub mod retrieve;
pub mod search;
pub mod store;
