//! Per-call request options.

use std::fmt;
use std::sync::Arc;

use http::Method;
use indexmap::IndexMap;
use serde_json::Value;

use apiwire_core::{BodySerializer, QuerySerializer};

use crate::auth::{AuthSpec, TokenSource};
use crate::config::{ConfigPatch, RequestValidator, ResponseTransformer, ResponseValidator};
use crate::headers::HeaderPatch;
use crate::response::ParseAs;
use crate::transport::Transport;

/// Options for one request: the path template, its parameters, and any
/// configuration overrides for this call only.
///
/// # Example
///
/// ```ignore
/// use apiwire_client::RequestOptions;
///
/// let options = RequestOptions::new("/users/{userId}/posts")
///     .path("userId", 42)
///     .query("limit", 10)
///     .header("x-request-id", "abc123");
/// ```
#[derive(Clone, Default)]
pub struct RequestOptions {
    /// Path template with `{placeholder}` segments.
    pub url: String,
    pub path: IndexMap<String, Value>,
    pub query: IndexMap<String, Value>,
    pub headers: HeaderPatch,
    /// Cookie parameters, serialized into the `Cookie` header.
    pub cookies: IndexMap<String, Value>,
    /// Structured request body, handed to the body serializer.
    pub body: Option<Value>,
    /// Security schemes this operation accepts, in preference order.
    pub security: Vec<AuthSpec>,
    /// Configuration overrides for this call.
    pub overrides: ConfigPatch,
}

impl RequestOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn path<V: Into<Value>>(mut self, name: impl Into<String>, value: V) -> Self {
        self.path.insert(name.into(), value.into());
        self
    }

    pub fn query<V: Into<Value>>(mut self, name: impl Into<String>, value: V) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn header<V: Into<Value>>(mut self, name: impl Into<String>, value: V) -> Self {
        self.headers = self.headers.set(name, value);
        self
    }

    pub fn cookie<V: Into<Value>>(mut self, name: impl Into<String>, value: V) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn body<V: Into<Value>>(mut self, body: V) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn security(mut self, schemes: Vec<AuthSpec>) -> Self {
        self.security = schemes;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.overrides.base_url = Some(base_url.into());
        self
    }

    pub fn parse_as(mut self, parse_as: ParseAs) -> Self {
        self.overrides.parse_as = Some(parse_as);
        self
    }

    pub fn throw_on_error(mut self, throw: bool) -> Self {
        self.overrides.throw_on_error = Some(throw);
        self
    }

    pub fn auth(mut self, source: TokenSource) -> Self {
        self.overrides.auth = Some(source);
        self
    }

    pub fn body_serializer(mut self, serializer: Arc<dyn BodySerializer>) -> Self {
        self.overrides.body_serializer = Some(Some(serializer));
        self
    }

    /// Send the body verbatim: it must be a string and no serializer runs.
    pub fn raw_body(mut self) -> Self {
        self.overrides.body_serializer = Some(None);
        self
    }

    pub fn query_serializer(mut self, serializer: impl Into<QuerySerializer>) -> Self {
        self.overrides.query_serializer = Some(serializer.into());
        self
    }

    pub fn request_validator(mut self, validator: RequestValidator) -> Self {
        self.overrides.request_validator = Some(validator);
        self
    }

    pub fn response_validator(mut self, validator: ResponseValidator) -> Self {
        self.overrides.response_validator = Some(validator);
        self
    }

    pub fn response_transformer(mut self, transformer: ResponseTransformer) -> Self {
        self.overrides.response_transformer = Some(transformer);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.overrides.transport = Some(transport);
        self
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("url", &self.url)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("headers", &self.headers)
            .field("cookies", &self.cookies)
            .field("body", &self.body)
            .field("security", &self.security)
            .field("overrides", &self.overrides)
            .finish()
    }
}

/// The resolved shape of one call, handed to validators and hooks as
/// shared context.
#[derive(Clone, Debug)]
pub struct ResolvedOptions {
    pub method: Method,
    /// The path template as given, before substitution.
    pub url: String,
    pub base_url: String,
    pub path: IndexMap<String, Value>,
    /// Query parameters, including any credential placed by auth
    /// resolution.
    pub query: IndexMap<String, Value>,
    pub parse_as: ParseAs,
    pub throw_on_error: bool,
    /// The structured body before serialization.
    pub body: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_collects_parameters_in_order() {
        let options = RequestOptions::new("/users/{id}")
            .path("id", 7)
            .query("b", 2)
            .query("a", 1);
        assert_eq!(options.url, "/users/{id}");
        assert_eq!(options.path.get("id"), Some(&json!(7)));
        let keys: Vec<_> = options.query.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_overrides_route_to_config_patch() {
        let options = RequestOptions::new("/x")
            .throw_on_error(true)
            .base_url("https://other.example.com");
        assert_eq!(options.overrides.throw_on_error, Some(true));
        assert_eq!(
            options.overrides.base_url.as_deref(),
            Some("https://other.example.com")
        );
    }

    #[test]
    fn test_raw_body_disables_serializer() {
        let options = RequestOptions::new("/x").raw_body();
        assert!(matches!(options.overrides.body_serializer, Some(None)));
    }
}
