//! Errors of the in-memory gateway.

use std::path::PathBuf;

use iobridge_domain::error::{BridgeError, GatewayError};

#[derive(Debug, thiserror::Error)]
pub enum MemoryGatewayError {
    /// The snapshot file could not be read.
    #[error("failed to read snapshot {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot is not valid JSON or does not match the object model.
    #[error("malformed snapshot")]
    Json(#[from] serde_json::Error),

    /// An id was configured to reject every call.
    #[error("failed to {operation} {id}: rejected by the gateway")]
    Rejected { operation: &'static str, id: String },
}

impl From<MemoryGatewayError> for BridgeError {
    fn from(err: MemoryGatewayError) -> Self {
        match err {
            MemoryGatewayError::Json(err) => Self::Serialization(err),
            MemoryGatewayError::Io { path, source } => {
                GatewayError::new("load snapshot", path.display().to_string(), source.to_string())
                    .into()
            }
            MemoryGatewayError::Rejected { operation, id } => {
                GatewayError::new(operation, id, "rejected by the gateway").into()
            }
        }
    }
}
