//! Client configuration and layering.
//!
//! Configuration resolves in three layers: built-in defaults, the client
//! instance's configuration, and per-call overrides. Later layers win
//! field by field; header patches concatenate so a call can add to or
//! delete from inherited headers.

use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

use serde_json::Value;

use apiwire_core::{BodySerializer, JsonBodySerializer, QuerySerializer};

use crate::auth::TokenSource;
use crate::headers::HeaderPatch;
use crate::interceptor::BoxFuture;
use crate::options::ResolvedOptions;
use crate::response::ParseAs;
use crate::transport::Transport;

/// Validates the resolved call before the request body is serialized.
pub type RequestValidator =
    Arc<dyn Fn(Arc<ResolvedOptions>) -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

/// Validates decoded JSON response data before it is returned.
pub type ResponseValidator =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

/// Rewrites decoded JSON response data (e.g. revives date strings).
pub type ResponseTransformer =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, String>> + Send + Sync>;

/// Fully-resolved client configuration.
#[derive(Clone)]
pub struct Config {
    /// Prefix for every request URL. No trailing slash.
    pub base_url: Option<String>,
    /// Default headers applied under per-call headers.
    pub headers: HeaderPatch,
    /// Body serializer; `None` disables serialization and the body must be
    /// a string sent verbatim.
    pub body_serializer: Option<Arc<dyn BodySerializer>>,
    pub query_serializer: QuerySerializer,
    pub parse_as: ParseAs,
    /// When true, HTTP-level failures surface as errors instead of
    /// structured outcomes.
    pub throw_on_error: bool,
    /// Credential source consulted for operations that declare security.
    pub auth: Option<TokenSource>,
    pub request_validator: Option<RequestValidator>,
    pub response_validator: Option<ResponseValidator>,
    pub response_transformer: Option<ResponseTransformer>,
    /// Per-config transport override; the client's transport otherwise.
    pub transport: Option<Arc<dyn Transport>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            headers: HeaderPatch::new().set("content-type", "application/json"),
            body_serializer: Some(Arc::new(JsonBodySerializer)),
            query_serializer: QuerySerializer::default(),
            parse_as: ParseAs::Auto,
            throw_on_error: false,
            auth: None,
            request_validator: None,
            response_validator: None,
            response_transformer: None,
            transport: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("body_serializer", &self.body_serializer.is_some())
            .field("query_serializer", &self.query_serializer)
            .field("parse_as", &self.parse_as)
            .field("throw_on_error", &self.throw_on_error)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

/// A partial configuration: only the set fields override the base layer.
#[derive(Clone, Default)]
pub struct ConfigPatch {
    pub base_url: Option<String>,
    /// Header edits appended after the base layer's.
    pub headers: HeaderPatch,
    /// `Some(None)` disables body serialization entirely.
    pub body_serializer: Option<Option<Arc<dyn BodySerializer>>>,
    pub query_serializer: Option<QuerySerializer>,
    pub parse_as: Option<ParseAs>,
    pub throw_on_error: Option<bool>,
    pub auth: Option<TokenSource>,
    pub request_validator: Option<RequestValidator>,
    pub response_validator: Option<ResponseValidator>,
    pub response_transformer: Option<ResponseTransformer>,
    pub transport: Option<Arc<dyn Transport>>,
}

impl ConfigPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the patch changes anything.
    pub fn is_empty(&self) -> bool {
        self.base_url.is_none()
            && self.headers.is_empty()
            && self.body_serializer.is_none()
            && self.query_serializer.is_none()
            && self.parse_as.is_none()
            && self.throw_on_error.is_none()
            && self.auth.is_none()
            && self.request_validator.is_none()
            && self.response_validator.is_none()
            && self.response_transformer.is_none()
            && self.transport.is_none()
    }
}

impl fmt::Debug for ConfigPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigPatch")
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("parse_as", &self.parse_as)
            .field("throw_on_error", &self.throw_on_error)
            .finish_non_exhaustive()
    }
}

/// Fold a patch over a base configuration.
///
/// Scalar fields are replaced when the patch sets them; header patches
/// concatenate. A trailing slash on the merged base URL is stripped so
/// path templates can always start with `/`.
pub fn merge_configs(base: &Config, patch: &ConfigPatch) -> Config {
    let mut merged = base.clone();

    if let Some(url) = &patch.base_url {
        merged.base_url = Some(url.clone());
    }
    if let Some(url) = &mut merged.base_url {
        if url.ends_with('/') {
            url.pop();
        }
    }
    if !patch.headers.is_empty() {
        merged.headers.extend(&patch.headers);
    }
    if let Some(serializer) = &patch.body_serializer {
        merged.body_serializer = serializer.clone();
    }
    if let Some(serializer) = &patch.query_serializer {
        merged.query_serializer = serializer.clone();
    }
    if let Some(parse_as) = patch.parse_as {
        merged.parse_as = parse_as;
    }
    if let Some(throw) = patch.throw_on_error {
        merged.throw_on_error = throw;
    }
    if let Some(auth) = &patch.auth {
        merged.auth = Some(auth.clone());
    }
    if let Some(validator) = &patch.request_validator {
        merged.request_validator = Some(validator.clone());
    }
    if let Some(validator) = &patch.response_validator {
        merged.response_validator = Some(validator.clone());
    }
    if let Some(transformer) = &patch.response_transformer {
        merged.response_transformer = Some(transformer.clone());
    }
    if let Some(transport) = &patch.transport {
        merged.transport = Some(transport.clone());
    }

    merged
}

/// A shared, swappable configuration.
///
/// Reads take a cheap snapshot; requests already in flight keep the
/// snapshot they started with when the configuration is swapped.
#[derive(Debug)]
pub struct SharedConfigCell {
    inner: RwLock<Arc<Config>>,
}

impl SharedConfigCell {
    pub fn new(config: Config) -> Self {
        Self {
            inner: RwLock::new(Arc::new(config)),
        }
    }

    /// The current configuration.
    pub fn snapshot(&self) -> Arc<Config> {
        self.inner.read().expect("config cell poisoned").clone()
    }

    /// Merge a patch into the current configuration and install the
    /// result. Returns the new configuration.
    pub fn apply(&self, patch: &ConfigPatch) -> Arc<Config> {
        let mut guard = self.inner.write().expect("config cell poisoned");
        let merged = Arc::new(merge_configs(&guard, patch));
        *guard = merged.clone();
        merged
    }

    /// Replace the configuration wholesale.
    pub fn replace(&self, config: Config) {
        *self.inner.write().expect("config cell poisoned") = Arc::new(config);
    }
}

impl Default for SharedConfigCell {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// The process-wide configuration cell used by clients built in global
/// mode. Clients built with `global(false)` own an isolated cell instead.
pub fn shared_config() -> &'static SharedConfigCell {
    static SHARED: OnceLock<SharedConfigCell> = OnceLock::new();
    SHARED.get_or_init(SharedConfigCell::default)
}
