//! HTTP request engine for generated OpenAPI clients.
//!
//! Generated per-operation functions hand this crate a path template,
//! parameter maps and a structured body; the engine serializes them per
//! the OpenAPI style rules, layers configuration, resolves credentials,
//! runs the interceptor chains around a pluggable transport and decodes
//! the response.
//!
//! # Example
//!
//! ```ignore
//! use apiwire_client::{Client, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.com")
//!         .build()?;
//!
//!     let outcome = client
//!         .get(
//!             RequestOptions::new("/users/{userId}")
//!                 .path("userId", 42)
//!                 .query("expand", "profile"),
//!         )
//!         .await?;
//!
//!     if let Some(data) = outcome.data() {
//!         println!("{:?}", data.as_json());
//!     }
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod interceptor;
pub mod options;
pub mod request;
pub mod response;
pub mod transport;

pub use auth::{AuthLocation, AuthResolverFn, AuthScheme, AuthSpec, TokenSource};
pub use builder::ClientBuilder;
pub use client::{Client, Outcome};
pub use config::{
    merge_configs, shared_config, Config, ConfigPatch, RequestValidator, ResponseTransformer,
    ResponseValidator, SharedConfigCell,
};
pub use error::ClientError;
pub use headers::{merge_headers, HeaderEntry, HeaderPatch};
pub use interceptor::{
    BoxFuture, ErrorHook, InterceptorId, Interceptors, Registry, RequestHook, ResponseHook,
};
pub use options::{RequestOptions, ResolvedOptions};
pub use request::WireRequest;
pub use response::{
    infer_parse_as, ByteStream, ParseAs, RawResponse, ResponseBody, ResponseData, ResponseParts,
};
pub use transport::{HyperTransport, HyperTransportBuilder, Transport, TransportError};

// Serialization engine re-exports, so generated code needs one import.
pub use apiwire_core::{
    ArrayStyle, BodySerializer, JsonBodySerializer, ObjectStyle, ParamOverride, QuerySerializer,
    QueryStyle, SerializeError, StyleOptions, UrlEncodedBodySerializer,
};
