//! Hyper-based HTTP transport.
//!
//! This module provides [`HyperTransport`], the default transport built on
//! hyper_util's legacy client with rustls TLS and connection pooling.

use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use http_body_util::{BodyStream, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use rustls::ClientConfig;

use super::{Transport, TransportError};
use crate::interceptor::BoxFuture;
use crate::request::WireRequest;
use crate::response::{RawResponse, ResponseBody};

/// Type alias for the hyper client with HTTPS connector.
type HyperClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// HTTP transport using hyper_util's legacy client.
///
/// Provides HTTP/1.1 and HTTP/2 with TLS, connection pooling, and
/// automatic protocol negotiation via ALPN.
///
/// # Example
///
/// ```ignore
/// use apiwire_client::transport::HyperTransport;
///
/// let transport = HyperTransport::builder()
///     .request_timeout(std::time::Duration::from_secs(30))
///     .build()?;
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient,
    /// Overall deadline applied to each exchange.
    request_timeout: Option<Duration>,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a new transport builder.
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::new()
    }

    /// Create a new transport with default settings.
    pub fn new() -> Result<Self, TransportError> {
        Self::builder().build()
    }

    async fn exchange(
        client: HyperClient,
        request: WireRequest,
    ) -> Result<RawResponse, TransportError> {
        let uri: http::Uri = request
            .url
            .parse()
            .map_err(|e| TransportError::new(format!("invalid url `{}`: {}", request.url, e)))?;

        let body = Full::new(request.body.unwrap_or_default());
        let mut http_request = http::Request::builder()
            .method(request.method)
            .uri(uri)
            .body(body)
            .map_err(|e| TransportError::new(format!("invalid request: {}", e)))?;
        *http_request.headers_mut() = request.headers;

        let response = client
            .request(http_request)
            .await
            .map_err(|e| TransportError::new(format!("request failed: {}", e)))?;

        let (parts, body) = response.into_parts();
        let stream = BodyStream::new(body)
            .filter_map(|frame| async move {
                match frame {
                    Ok(frame) => frame.into_data().ok().map(Ok),
                    Err(e) => Some(Err(map_body_error(e))),
                }
            })
            .boxed();

        Ok(RawResponse::new(
            parts.status,
            parts.headers,
            ResponseBody::Stream(stream),
        ))
    }
}

fn map_body_error(err: hyper::Error) -> TransportError {
    if err.is_canceled() {
        TransportError::cancelled(format!("body read cancelled: {}", err))
    } else {
        TransportError::new(format!("body read failed: {}", err))
    }
}

impl Transport for HyperTransport {
    fn send(&self, request: WireRequest) -> BoxFuture<'static, Result<RawResponse, TransportError>> {
        let client = self.client.clone();
        let timeout = self.request_timeout;
        Box::pin(async move {
            match timeout {
                Some(deadline) => tokio::time::timeout(deadline, Self::exchange(client, request))
                    .await
                    .map_err(|_| {
                        TransportError::cancelled(format!(
                            "request timed out after {:?}",
                            deadline
                        ))
                    })?,
                None => Self::exchange(client, request).await,
            }
        })
    }
}

/// Builder for [`HyperTransport`].
pub struct HyperTransportBuilder {
    /// Custom TLS configuration; platform roots otherwise.
    tls_config: Option<ClientConfig>,
    /// Force HTTP/2 only (when the server is known to speak HTTP/2).
    http2_only: bool,
    /// Connection pool idle timeout.
    pool_idle_timeout: Option<Duration>,
    /// Maximum idle connections per host.
    pool_max_idle_per_host: usize,
    /// Overall per-request deadline.
    request_timeout: Option<Duration>,
}

impl Default for HyperTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransportBuilder {
    /// Create a new transport builder with default settings.
    pub fn new() -> Self {
        Self {
            tls_config: None,
            http2_only: false,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
            request_timeout: None,
        }
    }

    /// Set a custom TLS configuration (custom roots, client certificates).
    pub fn tls_config(mut self, config: ClientConfig) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Enable HTTP/2 only mode.
    ///
    /// For HTTPS connections HTTP/2 is negotiated via ALPN, so this is
    /// only needed for servers that reject HTTP/1.1 outright.
    pub fn http2_only(mut self, enabled: bool) -> Self {
        self.http2_only = enabled;
        self
    }

    /// Set the connection pool idle timeout.
    ///
    /// Default: 90 seconds.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Set the maximum number of idle connections per host.
    ///
    /// Default: 32.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Set an overall deadline for each request. Exceeding it surfaces as
    /// a cancelled transport error.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<HyperTransport, TransportError> {
        let tls = match self.tls_config {
            Some(config) => hyper_rustls::HttpsConnectorBuilder::new().with_tls_config(config),
            None => hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(|e| {
                    TransportError::new(format!("failed to load native roots: {}", e))
                })?,
        };
        let https_connector = tls.https_or_http().enable_http1().enable_http2().build();

        let mut builder = Client::builder(TokioExecutor::new());
        builder.pool_timer(TokioTimer::new());
        if let Some(timeout) = self.pool_idle_timeout {
            builder.pool_idle_timeout(timeout);
        }
        builder.pool_max_idle_per_host(self.pool_max_idle_per_host);
        if self.http2_only {
            builder.http2_only(true);
        }

        Ok(HyperTransport {
            client: builder.build(https_connector),
            request_timeout: self.request_timeout,
        })
    }
}

impl std::fmt::Debug for HyperTransportBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransportBuilder")
            .field("tls_config", &self.tls_config.is_some())
            .field("http2_only", &self.http2_only)
            .field("pool_idle_timeout", &self.pool_idle_timeout)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
