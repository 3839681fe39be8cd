//! Serialization primitives for apiwire.
//!
//! This crate provides the pure, transport-independent pieces of the apiwire
//! request engine: OpenAPI parameter serialization (path and query styles,
//! explode semantics, reserved-character handling), URL building, and request
//! body serializers.
//!
//! ## Modules
//!
//! - [`error`]: Serialization error types
//! - [`style`]: OpenAPI serialization style enums and separator tables
//! - [`param`]: Primitive/array/object parameter serializers
//! - [`path`]: Path template substitution and URL building
//! - [`query`]: Query string serialization
//! - [`body`]: Request body serializer trait and implementations

mod body;
mod error;
mod param;
mod path;
mod query;
mod style;

pub use body::*;
pub use error::*;
pub use param::*;
pub use path::*;
pub use query::*;
pub use style::*;
