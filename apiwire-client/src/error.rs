//! Client error types.

use apiwire_core::SerializeError;
use http::StatusCode;
use serde_json::Value;

use crate::transport::TransportError;

/// Error produced while executing a request.
///
/// Serialization, validation and transport failures always surface as an
/// `Err`. HTTP-level failures (a completed exchange with a non-2xx status)
/// surface as [`Http`](ClientError::Http) only when the client is configured
/// to throw on error; otherwise they are returned as a structured outcome.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ClientError {
    /// Building the request failed (parameters, headers or body).
    #[error(transparent)]
    Serialization(#[from] SerializeError),

    /// A request or response validator rejected the payload.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The exchange never completed (connect failure, timeout, cancellation).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        /// True when the request was cancelled or timed out rather than
        /// failing outright.
        cancelled: bool,
    },

    /// Decoding a successful response body failed.
    #[error("decode error: {0}")]
    Decode(String),

    /// The server answered with a non-2xx status and the client is in
    /// throw-on-error mode. Carries the decoded error payload.
    #[error("HTTP status {status}")]
    Http {
        status: StatusCode,
        /// Decoded error body: JSON if it parsed, the raw text otherwise,
        /// or `{}` when the body was empty.
        error: Value,
    },
}

impl ClientError {
    /// Create a transport error.
    pub fn transport<S: Into<String>>(message: S) -> Self {
        ClientError::Transport {
            message: message.into(),
            cancelled: false,
        }
    }

    /// Create a transport error marked as a cancellation.
    pub fn cancelled<S: Into<String>>(message: S) -> Self {
        ClientError::Transport {
            message: message.into(),
            cancelled: true,
        }
    }

    /// Whether this error represents a cancelled or timed-out request.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            ClientError::Transport {
                cancelled: true,
                ..
            }
        )
    }

    /// The HTTP status, for [`Http`](ClientError::Http) errors.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        ClientError::Transport {
            message: err.message,
            cancelled: err.cancelled,
        }
    }
}
