//! Request body serializers.
//!
//! A [`BodySerializer`] turns the structured body value of a call into wire
//! bytes. The engine deletes the `Content-Type` header when a serializer
//! produces no output, so serializers report "no body" as `None` rather
//! than an empty buffer.

use bytes::Bytes;
use serde_json::Value;

use crate::error::SerializeError;
use crate::param::encode_component;

/// Serializes a structured body value into request bytes.
pub trait BodySerializer: Send + Sync {
    /// Serialize the body. Returning `None` means the request carries no
    /// body at all.
    fn serialize(&self, body: &Value) -> Result<Option<Bytes>, SerializeError>;

    /// The content type this serializer produces, if it has a canonical one.
    fn content_type(&self) -> Option<&'static str> {
        None
    }
}

/// JSON body serializer. The default.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonBodySerializer;

impl BodySerializer for JsonBodySerializer {
    fn serialize(&self, body: &Value) -> Result<Option<Bytes>, SerializeError> {
        if body.is_null() {
            return Ok(None);
        }
        let bytes = serde_json::to_vec(body).map_err(|e| SerializeError::Body(e.to_string()))?;
        Ok(Some(Bytes::from(bytes)))
    }

    fn content_type(&self) -> Option<&'static str> {
        Some("application/json")
    }
}

/// `application/x-www-form-urlencoded` body serializer.
///
/// The body must be an object of scalar or array-of-scalar values; arrays
/// repeat the key once per element.
#[derive(Clone, Copy, Debug, Default)]
pub struct UrlEncodedBodySerializer;

impl BodySerializer for UrlEncodedBodySerializer {
    fn serialize(&self, body: &Value) -> Result<Option<Bytes>, SerializeError> {
        if body.is_null() {
            return Ok(None);
        }
        let map = body
            .as_object()
            .ok_or_else(|| SerializeError::Body("urlencoded body must be an object".into()))?;

        let mut pairs: Vec<String> = Vec::with_capacity(map.len());
        for (key, value) in map {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items {
                        pairs.push(encode_pair(key, item)?);
                    }
                }
                _ => pairs.push(encode_pair(key, value)?),
            }
        }
        if pairs.is_empty() {
            return Ok(None);
        }
        Ok(Some(Bytes::from(pairs.join("&"))))
    }

    fn content_type(&self) -> Option<&'static str> {
        Some("application/x-www-form-urlencoded")
    }
}

fn encode_pair(key: &str, value: &Value) -> Result<String, SerializeError> {
    let scalar = crate::param::scalar_to_string(value)
        .ok_or_else(|| SerializeError::Body(format!("nested value for field `{}`", key)))?;
    Ok(format!(
        "{}={}",
        encode_component(key, false),
        encode_component(&scalar, false)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_serializer() {
        let body = json!({"name": "alex", "age": 30});
        let bytes = JsonBodySerializer.serialize(&body).unwrap().unwrap();
        let round: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(round, body);
    }

    #[test]
    fn test_json_serializer_null_is_no_body() {
        assert!(JsonBodySerializer.serialize(&Value::Null).unwrap().is_none());
    }

    #[test]
    fn test_urlencoded_serializer() {
        let body = json!({"q": "a b", "page": 2});
        let bytes = UrlEncodedBodySerializer.serialize(&body).unwrap().unwrap();
        assert_eq!(&bytes[..], b"q=a%20b&page=2");
    }

    #[test]
    fn test_urlencoded_repeats_array_keys() {
        let body = json!({"tag": ["x", "y"]});
        let bytes = UrlEncodedBodySerializer.serialize(&body).unwrap().unwrap();
        assert_eq!(&bytes[..], b"tag=x&tag=y");
    }

    #[test]
    fn test_urlencoded_rejects_non_object() {
        assert!(UrlEncodedBodySerializer.serialize(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_urlencoded_empty_object_is_no_body() {
        assert!(
            UrlEncodedBodySerializer
                .serialize(&json!({}))
                .unwrap()
                .is_none()
        );
    }
}
