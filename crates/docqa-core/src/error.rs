//! Error taxonomy for the docqa pipelines.
//!
//! Every user-facing failure carries a human-readable message and a
//! coarse classification ([`ServiceError::kind`]) so callers can
//! distinguish bad input from external-service trouble from store
//! failures without parsing message strings.

use thiserror::Error;

/// Coarse classification of a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself was invalid; retrying unchanged cannot succeed.
    Validation,
    /// An external service (embedding or completion) failed; the same
    /// request may succeed later.
    Transient,
    /// The store rejected or lost data.
    Fatal,
}

/// Failure of one docqa operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Rejected input: bad file type, empty or oversized payload,
    /// missing question, invalid chunker configuration.
    #[error("{0}")]
    Validation(String),

    /// A referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The embedding or completion service failed.
    #[error("upstream service error: {0}")]
    Upstream(anyhow::Error),

    /// A store read or commit failed.
    #[error("store error: {0}")]
    Store(anyhow::Error),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn upstream(err: impl Into<anyhow::Error>) -> Self {
        Self::Upstream(err.into())
    }

    pub fn store(err: impl Into<anyhow::Error>) -> Self {
        Self::Store(err.into())
    }

    /// The classification callers branch on.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Validation(_) | ServiceError::NotFound(_) => ErrorKind::Validation,
            ServiceError::Upstream(_) => ErrorKind::Transient,
            ServiceError::Store(_) => ErrorKind::Fatal,
        }
    }
}
