//! The fully-built request handed to the transport.

use bytes::Bytes;
use http::{HeaderMap, Method};

/// An HTTP request ready to send: final URL, folded headers and serialized
/// body. Request interceptors receive and may rewrite this value.
#[derive(Clone, Debug)]
pub struct WireRequest {
    pub method: Method,
    /// Absolute or base-relative URL, query string included.
    pub url: String,
    pub headers: HeaderMap,
    /// Serialized body bytes. `None` means the request carries no body.
    pub body: Option<Bytes>,
}

impl WireRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Body length in bytes, zero when absent.
    pub fn body_len(&self) -> usize {
        self.body.as_ref().map(|b| b.len()).unwrap_or(0)
    }
}
