//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`BridgeError`]
//! via `#[from]`.

/// Top-level error returned by every bridge operation.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("invalid pattern")]
    Pattern(#[from] PatternError),

    #[error("serialization error")]
    Serialization(#[from] serde_json::Error),

    /// The pending result was dropped before the queued request completed.
    #[error("pending request was dropped before completion")]
    Cancelled,
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("object id must not be empty")]
    EmptyObjectId,

    #[error("listener id must not be empty")]
    EmptyListenerId,

    #[error("object {0} does not exist and the patch carries no type")]
    MissingObjectType(String),

    #[error("unknown log level: {0}")]
    UnknownLogLevel(String),
}

/// A lookup that found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// A rejected call to the object graph gateway.
///
/// The message always names the operation and the offending id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to {operation} {id}: {reason}")]
pub struct GatewayError {
    pub operation: &'static str,
    pub id: String,
    pub reason: String,
}

impl GatewayError {
    #[must_use]
    pub fn new(operation: &'static str, id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            operation,
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// A wildcard pattern that could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("pattern must not be empty")]
    Empty,

    #[error("pattern {pattern:?} cannot be compiled: {reason}")]
    Invalid { pattern: String, reason: String },
}
