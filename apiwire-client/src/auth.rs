//! Security scheme resolution.
//!
//! Generated operations declare the security schemes they accept, in
//! preference order. Before a request goes out, each scheme is tried in
//! turn; the first one the token source produces a credential for is
//! applied and the rest are skipped. A credential the caller already
//! placed in the request is never overwritten.

use std::fmt;
use std::sync::Arc;

use base64::prelude::*;
use http::header::{HeaderName, HeaderValue, COOKIE};
use http::HeaderMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use apiwire_core::SerializeError;

use crate::error::ClientError;
use crate::interceptor::BoxFuture;

/// Where a credential is placed in the request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthLocation {
    #[default]
    Header,
    Query,
    Cookie,
}

/// How the raw token is formatted before placement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    /// `Bearer <token>`.
    Bearer,
    /// `Basic <base64(token)>`; the token is expected to be `user:password`.
    Basic,
    /// The token verbatim (API keys).
    #[default]
    Raw,
}

/// One security scheme an operation accepts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSpec {
    #[serde(rename = "in", default)]
    pub location: AuthLocation,
    /// Parameter or header name. Defaults to `Authorization`.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub scheme: AuthScheme,
}

impl AuthSpec {
    /// Bearer token in the `Authorization` header.
    pub fn bearer() -> Self {
        Self {
            location: AuthLocation::Header,
            name: None,
            scheme: AuthScheme::Bearer,
        }
    }

    /// Basic credentials in the `Authorization` header.
    pub fn basic() -> Self {
        Self {
            location: AuthLocation::Header,
            name: None,
            scheme: AuthScheme::Basic,
        }
    }

    /// Raw API key under the given name at the given location.
    pub fn api_key(location: AuthLocation, name: impl Into<String>) -> Self {
        Self {
            location,
            name: Some(name.into()),
            scheme: AuthScheme::Raw,
        }
    }

    /// The parameter or header name this scheme writes to.
    pub fn field_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Authorization")
    }
}

/// Async token lookup callback: receives the scheme being tried, returns
/// a raw token or `None` to skip that scheme.
pub type AuthResolverFn =
    Arc<dyn Fn(&AuthSpec) -> BoxFuture<'static, Option<String>> + Send + Sync>;

/// Supplies credentials for security schemes.
#[derive(Clone)]
pub enum TokenSource {
    /// The same raw token for every scheme.
    Static(String),
    /// Per-scheme async lookup.
    Resolver(AuthResolverFn),
}

impl TokenSource {
    /// A fixed token.
    pub fn token(token: impl Into<String>) -> Self {
        TokenSource::Static(token.into())
    }

    /// Resolve the raw token for one scheme.
    pub async fn resolve(&self, spec: &AuthSpec) -> Option<String> {
        match self {
            TokenSource::Static(token) => Some(token.clone()),
            TokenSource::Resolver(resolver) => resolver(spec).await,
        }
    }
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::Static(_) => f.debug_tuple("Static").finish(),
            TokenSource::Resolver(_) => f.debug_tuple("Resolver").finish(),
        }
    }
}

/// Format the raw token per the scheme.
fn format_token(scheme: AuthScheme, token: &str) -> String {
    match scheme {
        AuthScheme::Bearer => format!("Bearer {}", token),
        AuthScheme::Basic => format!("Basic {}", BASE64_STANDARD.encode(token)),
        AuthScheme::Raw => token.to_string(),
    }
}

/// Whether the request already carries a credential under `name`.
fn already_present(name: &str, headers: &HeaderMap, query: &IndexMap<String, Value>) -> bool {
    if headers.contains_key(name) {
        return true;
    }
    if query.get(name).map(|v| !v.is_null()).unwrap_or(false) {
        return true;
    }
    let needle = format!("{}=", name);
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|cookie| cookie.contains(needle.as_str()))
}

/// Resolve the operation's security schemes against the token source and
/// apply the first credential produced.
///
/// Schemes whose target is already populated are skipped without
/// consulting the source. Applying a credential ends the scan.
pub(crate) async fn apply_security(
    security: &[AuthSpec],
    source: Option<&TokenSource>,
    headers: &mut HeaderMap,
    query: &mut IndexMap<String, Value>,
) -> Result<(), ClientError> {
    for spec in security {
        let name = spec.field_name();
        if already_present(name, headers, query) {
            continue;
        }
        let Some(source) = source else {
            continue;
        };
        let Some(token) = source.resolve(spec).await else {
            continue;
        };
        if token.is_empty() {
            continue;
        }
        let formatted = format_token(spec.scheme, &token);

        match spec.location {
            AuthLocation::Header => {
                let header_name =
                    HeaderName::try_from(name).map_err(|_| SerializeError::InvalidHeader {
                        name: name.to_string(),
                    })?;
                let value = HeaderValue::try_from(formatted.as_str()).map_err(|_| {
                    SerializeError::InvalidHeader {
                        name: name.to_string(),
                    }
                })?;
                headers.insert(header_name, value);
            }
            AuthLocation::Query => {
                query.insert(name.to_string(), Value::String(formatted));
            }
            AuthLocation::Cookie => {
                let cookie = format!("{}={}", name, formatted);
                let value = HeaderValue::try_from(cookie.as_str()).map_err(|_| {
                    SerializeError::InvalidHeader {
                        name: COOKIE.as_str().to_string(),
                    }
                })?;
                headers.append(COOKIE, value);
            }
        }
        return Ok(());
    }
    Ok(())
}
