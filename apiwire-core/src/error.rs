//! Serialization error types.

/// Error produced while serializing parameters or request bodies.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SerializeError {
    /// A parameter value was nested deeper than the default serializers
    /// support (an array or object inside another array or object).
    ///
    /// Supply a custom query serializer to handle these shapes.
    #[error("deeply-nested arrays and objects are not supported for parameter `{name}`")]
    UnsupportedDepth { name: String },

    /// A header name or value could not be canonicalized.
    #[error("invalid header `{name}`")]
    InvalidHeader { name: String },

    /// Body serialization failed.
    #[error("body serialization failed: {0}")]
    Body(String),
}

impl SerializeError {
    /// Create an [`UnsupportedDepth`](SerializeError::UnsupportedDepth) error
    /// for the named parameter.
    pub fn unsupported_depth<S: Into<String>>(name: S) -> Self {
        SerializeError::UnsupportedDepth { name: name.into() }
    }
}
