//! Error types shared by the trace pipeline.

use thiserror::Error;

/// Errors raised while encoding or persisting trace events.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("session logger is closed")]
    LoggerClosed,
}

/// Convenience result type for trace operations.
pub type TraceResult<T> = Result<T, TraceError>;
