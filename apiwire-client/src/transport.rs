//! Pluggable request transports.
//!
//! A [`Transport`] performs one HTTP exchange: it receives the fully-built
//! [`WireRequest`] and resolves to a [`RawResponse`] or a network-level
//! failure. The default transport is hyper-based; tests and adapters for
//! other runtimes supply their own implementations.

mod hyper;

pub use hyper::{HyperTransport, HyperTransportBuilder};

use crate::interceptor::BoxFuture;
use crate::request::WireRequest;
use crate::response::RawResponse;

/// A network-level failure: the exchange never produced a response.
///
/// HTTP error statuses are not transport errors; a completed exchange with
/// a 4xx or 5xx status comes back as a normal [`RawResponse`].
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    /// True when the request was cancelled or timed out.
    pub cancelled: bool,
}

impl TransportError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            cancelled: false,
        }
    }

    pub fn cancelled<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            cancelled: true,
        }
    }
}

/// Performs a single HTTP exchange.
pub trait Transport: Send + Sync {
    /// Send the request and resolve to the raw response. The response body
    /// may still be streaming when this future resolves.
    fn send(&self, request: WireRequest) -> BoxFuture<'static, Result<RawResponse, TransportError>>;
}
