//! Layered header patches.
//!
//! Headers are configured at several levels (client defaults, per-call
//! options) and folded into one [`http::HeaderMap`] at request time. A
//! [`HeaderPatch`] records the edits of one level in insertion order so
//! later layers override or delete what earlier layers set.

use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use indexmap::IndexMap;
use serde_json::Value;

use apiwire_core::SerializeError;

/// One header edit inside a [`HeaderPatch`].
#[derive(Clone, Debug, PartialEq)]
pub enum HeaderEntry {
    /// Remove the header entirely.
    Unset,
    /// Replace the header with a single value. Scalars render as their
    /// string form; arrays and objects render as JSON text.
    Value(Value),
    /// Append each value as its own header line.
    Values(Vec<String>),
}

/// An ordered set of header edits applied on top of a [`HeaderMap`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeaderPatch {
    entries: IndexMap<String, HeaderEntry>,
}

impl HeaderPatch {
    /// Create an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `name` with a single value.
    pub fn set<N: Into<String>, V: Into<Value>>(mut self, name: N, value: V) -> Self {
        self.entries
            .insert(name.into(), HeaderEntry::Value(value.into()));
        self
    }

    /// Append each element of `values` as its own header line.
    pub fn append<N: Into<String>>(mut self, name: N, values: Vec<String>) -> Self {
        self.entries.insert(name.into(), HeaderEntry::Values(values));
        self
    }

    /// Remove `name` from the folded result, even if an earlier layer set it.
    pub fn unset<N: Into<String>>(mut self, name: N) -> Self {
        self.entries.insert(name.into(), HeaderEntry::Unset);
        self
    }

    /// Whether this patch contains no edits.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Concatenate another patch onto this one; its edits win on conflict.
    pub fn extend(&mut self, other: &HeaderPatch) {
        for (name, entry) in &other.entries {
            self.entries.insert(name.clone(), entry.clone());
        }
    }

    /// Iterate the edits in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Apply this patch to `headers`.
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<(), SerializeError> {
        for (name, entry) in &self.entries {
            let header_name = parse_name(name)?;
            match entry {
                HeaderEntry::Unset => {
                    headers.remove(&header_name);
                }
                HeaderEntry::Value(Value::Null) => {
                    headers.remove(&header_name);
                }
                HeaderEntry::Value(value) => {
                    let rendered = render_value(name, value)?;
                    headers.insert(header_name, parse_value(name, &rendered)?);
                }
                HeaderEntry::Values(values) => {
                    for value in values {
                        headers.append(header_name.clone(), parse_value(name, value)?);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Fold the given patches, in order, into a fresh header map.
pub fn merge_headers(layers: &[&HeaderPatch]) -> Result<HeaderMap, SerializeError> {
    let mut headers = HeaderMap::new();
    for patch in layers {
        patch.apply(&mut headers)?;
    }
    Ok(headers)
}

fn render_value(name: &str, value: &Value) -> Result<String, SerializeError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(_) | Value::Number(_) => Ok(value.to_string()),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string(value).map_err(|_| SerializeError::InvalidHeader {
                name: name.to_string(),
            })
        }
        Value::Null => Ok(String::new()),
    }
}

fn parse_name(name: &str) -> Result<HeaderName, SerializeError> {
    HeaderName::try_from(name).map_err(|_| SerializeError::InvalidHeader {
        name: name.to_string(),
    })
}

fn parse_value(name: &str, value: &str) -> Result<HeaderValue, SerializeError> {
    HeaderValue::try_from(value).map_err(|_| SerializeError::InvalidHeader {
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_later_layer_overrides_earlier() {
        let base = HeaderPatch::new().set("x-api-version", "1");
        let call = HeaderPatch::new().set("x-api-version", "2");
        let headers = merge_headers(&[&base, &call]).unwrap();
        assert_eq!(headers.get("x-api-version").unwrap(), "2");
    }

    #[test]
    fn test_unset_deletes_inherited_header() {
        let base = HeaderPatch::new().set("authorization", "Bearer abc");
        let call = HeaderPatch::new().unset("authorization");
        let headers = merge_headers(&[&base, &call]).unwrap();
        assert!(headers.get("authorization").is_none());
    }

    #[test]
    fn test_null_value_deletes_like_unset() {
        let base = HeaderPatch::new().set("x-trace", "on");
        let call = HeaderPatch::new().set("x-trace", Value::Null);
        let headers = merge_headers(&[&base, &call]).unwrap();
        assert!(headers.get("x-trace").is_none());
    }

    #[test]
    fn test_values_append_individually() {
        let patch =
            HeaderPatch::new().append("accept", vec!["text/html".into(), "application/json".into()]);
        let headers = merge_headers(&[&patch]).unwrap();
        let values: Vec<_> = headers.get_all("accept").iter().collect();
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_object_value_rendered_as_json() {
        let patch = HeaderPatch::new().set("x-meta", json!({"a": 1}));
        let headers = merge_headers(&[&patch]).unwrap();
        assert_eq!(headers.get("x-meta").unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn test_number_value_rendered_as_string() {
        let patch = HeaderPatch::new().set("x-retry", 3);
        let headers = merge_headers(&[&patch]).unwrap();
        assert_eq!(headers.get("x-retry").unwrap(), "3");
    }

    #[test]
    fn test_invalid_name_rejected() {
        let patch = HeaderPatch::new().set("bad header", "v");
        assert!(merge_headers(&[&patch]).is_err());
    }
}
