//! Transport-level error types.

use thiserror::Error;

use crate::request::RpcError;

/// Errors that can occur during an RPC transport operation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection-level HTTP failure (refused, reset, DNS, TLS).
    #[error("http error: {0}")]
    Http(String),

    /// The gateway answered with a non-success HTTP status.
    #[error("http status {status}: {body}")]
    Status { status: u16, body: String },

    /// The gateway is throttling this connection (HTTP 429 class).
    ///
    /// This is the error a descriptor's retry hook gets to rule on.
    #[error("throttled by gateway (status {status})")]
    Throttled { status: u16 },

    /// Request timed out after the configured duration.
    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// JSON-RPC protocol-level error returned by the node.
    #[error("rpc error {}: {}", .0.code, .0.message)]
    Rpc(RpcError),

    /// The response arrived but made no sense.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Response could not be deserialized.
    #[error("deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// An unexpected error.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Returns `true` if this error is transient and worth re-attempting.
    ///
    /// Server-side 5xx statuses count; everything the node itself decided
    /// (execution errors, malformed requests) does not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout { .. } | Self::Throttled { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` for gateway throttling specifically.
    pub fn is_throttle(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }
}
