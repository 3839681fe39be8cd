//! Client construction.

use std::sync::Arc;

use serde_json::Value;

use apiwire_core::{BodySerializer, QuerySerializer};

use crate::auth::TokenSource;
use crate::client::{Client, ConfigCell};
use crate::config::{
    merge_configs, shared_config, Config, ConfigPatch, RequestValidator, ResponseTransformer,
    ResponseValidator, SharedConfigCell,
};
use crate::error::ClientError;
use crate::headers::HeaderPatch;
use crate::interceptor::Interceptors;
use crate::response::ParseAs;
use crate::transport::{HyperTransport, Transport};

/// Builder for [`Client`].
///
/// # Example
///
/// ```ignore
/// use apiwire_client::Client;
///
/// let client = Client::builder()
///     .base_url("https://api.example.com")
///     .header("x-api-version", "2024-01-01")
///     .throw_on_error(true)
///     .build()?;
/// ```
pub struct ClientBuilder {
    patch: ConfigPatch,
    /// When true the client reads and writes the process-wide
    /// configuration cell instead of owning one.
    global: bool,
    transport: Option<Arc<dyn Transport>>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Create a builder for an isolated (non-global) client.
    pub fn new() -> Self {
        Self {
            patch: ConfigPatch::new(),
            global: false,
            transport: None,
        }
    }

    /// Set the base URL prefixed to every request path.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.patch.base_url = Some(base_url.into());
        self
    }

    /// Set a default header.
    pub fn header<V: Into<Value>>(mut self, name: impl Into<String>, value: V) -> Self {
        self.patch.headers = self.patch.headers.set(name, value);
        self
    }

    /// Apply a whole header patch on top of the defaults.
    pub fn headers(mut self, headers: HeaderPatch) -> Self {
        self.patch.headers.extend(&headers);
        self
    }

    /// Set the credential source for operations that declare security.
    pub fn auth(mut self, source: TokenSource) -> Self {
        self.patch.auth = Some(source);
        self
    }

    /// Set the default body serializer.
    pub fn body_serializer(mut self, serializer: Arc<dyn BodySerializer>) -> Self {
        self.patch.body_serializer = Some(Some(serializer));
        self
    }

    /// Set the default query serializer.
    pub fn query_serializer(mut self, serializer: impl Into<QuerySerializer>) -> Self {
        self.patch.query_serializer = Some(serializer.into());
        self
    }

    /// Set the default response parse mode.
    pub fn parse_as(mut self, parse_as: ParseAs) -> Self {
        self.patch.parse_as = Some(parse_as);
        self
    }

    /// Surface non-2xx statuses as errors instead of structured outcomes.
    pub fn throw_on_error(mut self, throw: bool) -> Self {
        self.patch.throw_on_error = Some(throw);
        self
    }

    /// Set the default request validator.
    pub fn request_validator(mut self, validator: RequestValidator) -> Self {
        self.patch.request_validator = Some(validator);
        self
    }

    /// Set the default response validator.
    pub fn response_validator(mut self, validator: ResponseValidator) -> Self {
        self.patch.response_validator = Some(validator);
        self
    }

    /// Set the default response transformer.
    pub fn response_transformer(mut self, transformer: ResponseTransformer) -> Self {
        self.patch.response_transformer = Some(transformer);
        self
    }

    /// Bind the client to the process-wide configuration cell. Its
    /// configuration, including this builder's settings, becomes visible
    /// to every other global client.
    pub fn global(mut self, global: bool) -> Self {
        self.global = global;
        self
    }

    /// Use a custom transport instead of the default hyper one.
    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Use an already-shared transport.
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client, ClientError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HyperTransport::new()?),
        };

        let cell = if self.global {
            shared_config().apply(&self.patch);
            ConfigCell::Shared
        } else {
            let config = merge_configs(&Config::default(), &self.patch);
            ConfigCell::Owned(Arc::new(SharedConfigCell::new(config)))
        };

        Ok(Client {
            cell,
            interceptors: Arc::new(Interceptors::new()),
            transport,
        })
    }
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("patch", &self.patch)
            .field("global", &self.global)
            .field("transport", &self.transport.is_some())
            .finish()
    }
}
