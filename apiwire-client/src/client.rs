//! The request executor and client handle.
//!
//! A [`Client`] bundles a configuration cell, the interceptor chains and a
//! transport. [`Client::request`] runs the full pipeline: configuration
//! layering, auth resolution, body and parameter serialization, the hook
//! chains around the transport, and response decoding into an [`Outcome`].

use std::sync::Arc;

use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method};
use serde_json::Value;

use apiwire_core::{build_url, scalar_to_string, SerializeError};

use crate::auth::apply_security;
use crate::builder::ClientBuilder;
use crate::config::{merge_configs, shared_config, Config, ConfigPatch, SharedConfigCell};
use crate::error::ClientError;
use crate::headers::merge_headers;
use crate::interceptor::Interceptors;
use crate::options::{RequestOptions, ResolvedOptions};
use crate::request::WireRequest;
use crate::response::{infer_parse_as, ParseAs, ResponseData, ResponseParts};
use crate::transport::Transport;

/// Which configuration cell a client reads from.
#[derive(Clone, Debug)]
pub(crate) enum ConfigCell {
    /// The process-wide cell; `set_config` on any global client is visible
    /// to all of them.
    Shared,
    /// A cell owned by this client and its clones.
    Owned(Arc<SharedConfigCell>),
}

impl ConfigCell {
    fn get(&self) -> &SharedConfigCell {
        match self {
            ConfigCell::Shared => shared_config(),
            ConfigCell::Owned(cell) => cell,
        }
    }
}

/// The result of a completed HTTP exchange.
///
/// Transport and serialization failures never reach this type; they
/// surface as `Err(ClientError)` from [`Client::request`]. An `Outcome`
/// always carries the final request and the response status and headers.
#[derive(Debug)]
pub enum Outcome {
    /// 2xx: the decoded response payload.
    Data {
        data: ResponseData,
        request: WireRequest,
        response: ResponseParts,
    },
    /// Non-2xx: the decoded error payload (JSON if it parsed, raw text
    /// otherwise, `{}` for an empty body).
    Error {
        error: Value,
        request: WireRequest,
        response: ResponseParts,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Data { .. })
    }

    /// The decoded payload of a successful exchange.
    pub fn data(self) -> Option<ResponseData> {
        match self {
            Outcome::Data { data, .. } => Some(data),
            Outcome::Error { .. } => None,
        }
    }

    /// The decoded error payload of a failed exchange.
    pub fn error(self) -> Option<Value> {
        match self {
            Outcome::Error { error, .. } => Some(error),
            Outcome::Data { .. } => None,
        }
    }

    pub fn response(&self) -> &ResponseParts {
        match self {
            Outcome::Data { response, .. } | Outcome::Error { response, .. } => response,
        }
    }

    pub fn request(&self) -> &WireRequest {
        match self {
            Outcome::Data { request, .. } | Outcome::Error { request, .. } => request,
        }
    }
}

/// An HTTP client for generated API operations.
///
/// Cloning is cheap and clones share the configuration cell, interceptor
/// chains and transport.
///
/// # Example
///
/// ```ignore
/// use apiwire_client::{Client, RequestOptions};
///
/// let client = Client::builder()
///     .base_url("https://api.example.com")
///     .build()?;
///
/// let outcome = client
///     .get(RequestOptions::new("/users/{userId}").path("userId", 42))
///     .await?;
/// ```
#[derive(Clone)]
pub struct Client {
    pub(crate) cell: ConfigCell,
    pub(crate) interceptors: Arc<Interceptors>,
    pub(crate) transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("cell", &self.cell)
            .field("interceptors", &self.interceptors)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Snapshot the client's current configuration.
    pub fn config(&self) -> Arc<Config> {
        self.cell.get().snapshot()
    }

    /// Merge a patch into the client's configuration. Requests already in
    /// flight keep the snapshot they started with.
    pub fn set_config(&self, patch: &ConfigPatch) -> Arc<Config> {
        self.cell.get().apply(patch)
    }

    /// The client's interceptor chains.
    pub fn interceptors(&self) -> &Interceptors {
        &self.interceptors
    }

    /// Build the final URL for a call without sending it. Auth query
    /// parameters are not included.
    pub fn build_url(&self, options: &RequestOptions) -> Result<String, ClientError> {
        let config = merge_configs(&self.config(), &options.overrides);
        let base_url = config.base_url.unwrap_or_default();
        Ok(build_url(
            &base_url,
            &options.url,
            Some(&options.path),
            Some(&options.query),
            &config.query_serializer,
        )?)
    }

    /// Execute a request.
    ///
    /// Returns `Ok` with an [`Outcome`] for every completed exchange,
    /// successful or not, unless the resolved configuration asks to throw
    /// on error, in which case a non-2xx status becomes
    /// [`ClientError::Http`]. Serialization, validation and transport
    /// failures are always `Err`.
    pub async fn request(
        &self,
        method: Method,
        options: RequestOptions,
    ) -> Result<Outcome, ClientError> {
        #[cfg(feature = "tracing")]
        let span = tracing::info_span!(
            "request",
            http.method = %method,
            http.url = %options.url,
        );
        let fut = self.execute(method, options);
        #[cfg(feature = "tracing")]
        let fut = tracing::Instrument::instrument(fut, span);
        fut.await
    }

    async fn execute(
        &self,
        method: Method,
        options: RequestOptions,
    ) -> Result<Outcome, ClientError> {
        let config = merge_configs(&self.config(), &options.overrides);

        // Fold header layers, then cookie parameters on top.
        let mut headers = merge_headers(&[&config.headers, &options.headers])?;
        for (name, value) in &options.cookies {
            if value.is_null() {
                continue;
            }
            let rendered = scalar_to_string(value)
                .ok_or_else(|| SerializeError::unsupported_depth(name.as_str()))?;
            let cookie = format!("{}={}", name, rendered);
            let value = HeaderValue::try_from(cookie.as_str()).map_err(|_| {
                SerializeError::InvalidHeader {
                    name: name.clone(),
                }
            })?;
            headers.append(http::header::COOKIE, value);
        }

        let mut query = options.query.clone();
        if !options.security.is_empty() {
            apply_security(&options.security, config.auth.as_ref(), &mut headers, &mut query)
                .await?;
        }

        let base_url = config.base_url.clone().unwrap_or_default();
        let resolved = Arc::new(ResolvedOptions {
            method: method.clone(),
            url: options.url.clone(),
            base_url: base_url.clone(),
            path: options.path.clone(),
            query: query.clone(),
            parse_as: config.parse_as,
            throw_on_error: config.throw_on_error,
            body: options.body.clone(),
        });

        if let Some(validator) = &config.request_validator {
            validator(resolved.clone())
                .await
                .map_err(ClientError::Validation)?;
        }

        let body = match &options.body {
            None => None,
            Some(value) => match &config.body_serializer {
                Some(serializer) => {
                    let bytes = serializer.serialize(value)?;
                    if bytes.is_some() {
                        if let Some(content_type) = serializer.content_type() {
                            if !headers.contains_key(CONTENT_TYPE) {
                                headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
                            }
                        }
                    }
                    bytes
                }
                None => match value {
                    Value::String(text) => Some(bytes::Bytes::from(text.clone())),
                    _ => {
                        return Err(SerializeError::Body(
                            "body serialization is disabled; body must be a string".to_string(),
                        )
                        .into());
                    }
                },
            },
        };

        // A request without body bytes must not advertise a content type.
        if body.as_ref().map(|b| b.is_empty()).unwrap_or(true) {
            headers.remove(CONTENT_TYPE);
        }

        let url = build_url(
            &base_url,
            &options.url,
            Some(&options.path),
            Some(&query),
            &config.query_serializer,
        )?;

        let mut request = WireRequest {
            method,
            url,
            headers,
            body,
        };

        for index in 0..self.interceptors.request.len() {
            if let Some(hook) = self.interceptors.request.get(index) {
                request = hook(request, resolved.clone()).await?;
            }
        }

        let transport = config
            .transport
            .clone()
            .unwrap_or_else(|| self.transport.clone());
        let request_snapshot = Arc::new(request.clone());
        let mut response = transport.send(request.clone()).await?;

        for index in 0..self.interceptors.response.len() {
            if let Some(hook) = self.interceptors.response.get(index) {
                response = hook(response, request_snapshot.clone(), resolved.clone()).await?;
            }
        }

        let parts = response.parts();
        let parse_as = match config.parse_as {
            ParseAs::Auto => infer_parse_as(parts.content_type()),
            explicit => explicit,
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(status = %parts.status, "response received");

        if parts.status.is_success() {
            let mut data = if parts.has_empty_body() {
                ResponseData::empty_for(parse_as)
            } else {
                response.decode(parse_as).await?
            };

            if let ResponseData::Json(value) = &mut data {
                if let Some(validator) = &config.response_validator {
                    validator(value.clone())
                        .await
                        .map_err(ClientError::Validation)?;
                }
                if let Some(transformer) = &config.response_transformer {
                    *value = transformer(std::mem::take(value))
                        .await
                        .map_err(ClientError::Validation)?;
                }
            }

            return Ok(Outcome::Data {
                data,
                request,
                response: parts,
            });
        }

        let mut error = if parts.has_empty_body() {
            Value::Object(Default::default())
        } else {
            let text = response.text().await?;
            if text.is_empty() {
                Value::Object(Default::default())
            } else {
                // Prefer the structured form when the error body is JSON.
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            }
        };

        let parts_snapshot = Arc::new(parts.clone());
        for index in 0..self.interceptors.error.len() {
            if let Some(hook) = self.interceptors.error.get(index) {
                error = hook(
                    error,
                    parts_snapshot.clone(),
                    request_snapshot.clone(),
                    resolved.clone(),
                )
                .await;
            }
        }
        if error.is_null() {
            error = Value::Object(Default::default());
        }

        if config.throw_on_error {
            return Err(ClientError::Http {
                status: parts.status,
                error,
            });
        }

        Ok(Outcome::Error {
            error,
            request,
            response: parts,
        })
    }

    /// Execute a GET request.
    pub async fn get(&self, options: RequestOptions) -> Result<Outcome, ClientError> {
        self.request(Method::GET, options).await
    }

    /// Execute a POST request.
    pub async fn post(&self, options: RequestOptions) -> Result<Outcome, ClientError> {
        self.request(Method::POST, options).await
    }

    /// Execute a PUT request.
    pub async fn put(&self, options: RequestOptions) -> Result<Outcome, ClientError> {
        self.request(Method::PUT, options).await
    }

    /// Execute a PATCH request.
    pub async fn patch(&self, options: RequestOptions) -> Result<Outcome, ClientError> {
        self.request(Method::PATCH, options).await
    }

    /// Execute a DELETE request.
    pub async fn delete(&self, options: RequestOptions) -> Result<Outcome, ClientError> {
        self.request(Method::DELETE, options).await
    }

    /// Execute a HEAD request.
    pub async fn head(&self, options: RequestOptions) -> Result<Outcome, ClientError> {
        self.request(Method::HEAD, options).await
    }

    /// Execute an OPTIONS request.
    pub async fn options(&self, options: RequestOptions) -> Result<Outcome, ClientError> {
        self.request(Method::OPTIONS, options).await
    }

    /// Execute a TRACE request.
    pub async fn trace(&self, options: RequestOptions) -> Result<Outcome, ClientError> {
        self.request(Method::TRACE, options).await
    }
}
