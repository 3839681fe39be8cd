//! Query string serialization.
//!
//! Turns an ordered map of named values into the `&`-joined query string.
//! Arrays default to `form` style with explode, objects to `deepObject`
//! with explode; both are overridable globally and per-parameter. The
//! output never carries a leading `?` — the URL builder prepends one only
//! when the string is non-empty.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::error::SerializeError;
use crate::param::{ArrayParam, ObjectParam, serialize_array, serialize_object, serialize_primitive};
use crate::style::{ArrayStyle, ObjectStyle};

/// Style and explode flag for one value shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct StyleOptions<S> {
    pub style: S,
    pub explode: bool,
}

/// Per-parameter override of the query style defaults.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamOverride {
    pub allow_reserved: Option<bool>,
    pub array: Option<StyleOptions<ArrayStyle>>,
    pub object: Option<StyleOptions<ObjectStyle>>,
}

/// Declarative query serialization policy.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryStyle {
    /// Skip percent-encoding of reserved characters.
    pub allow_reserved: bool,
    /// Style applied to array values. Default: form, explode.
    pub array: StyleOptions<ArrayStyle>,
    /// Style applied to object values. Default: deepObject, explode.
    pub object: StyleOptions<ObjectStyle>,
    /// Per-parameter overrides keyed by parameter name.
    #[serde(skip)]
    pub parameters: IndexMap<String, ParamOverride>,
}

impl Default for QueryStyle {
    fn default() -> Self {
        Self {
            allow_reserved: false,
            array: StyleOptions {
                style: ArrayStyle::Form,
                explode: true,
            },
            object: StyleOptions {
                style: ObjectStyle::DeepObject,
                explode: true,
            },
            parameters: IndexMap::new(),
        }
    }
}

impl QueryStyle {
    /// Serialize the given parameter map to a query string.
    ///
    /// Entries are visited in insertion order. Null values, empty arrays and
    /// empty objects contribute nothing.
    pub fn serialize(&self, params: &IndexMap<String, Value>) -> Result<String, SerializeError> {
        let mut search: Vec<String> = Vec::new();
        for (name, value) in params {
            if value.is_null() {
                continue;
            }

            let overrides = self.parameters.get(name.as_str());
            let allow_reserved = overrides
                .and_then(|o| o.allow_reserved)
                .unwrap_or(self.allow_reserved);

            let serialized = match value {
                Value::Array(items) => {
                    let opts = overrides.and_then(|o| o.array).unwrap_or(self.array);
                    serialize_array(&ArrayParam {
                        allow_reserved,
                        explode: opts.explode,
                        name,
                        style: opts.style,
                        value: items,
                    })?
                }
                Value::Object(map) => {
                    let opts = overrides.and_then(|o| o.object).unwrap_or(self.object);
                    serialize_object(&ObjectParam {
                        allow_reserved,
                        explode: opts.explode,
                        name,
                        style: opts.style,
                        value: map,
                    })?
                }
                _ => serialize_primitive(name, value, allow_reserved)?,
            };

            if !serialized.is_empty() {
                search.push(serialized);
            }
        }
        Ok(search.join("&"))
    }
}

/// Custom query serialization callback.
pub type QuerySerializerFn =
    Arc<dyn Fn(&IndexMap<String, Value>) -> Result<String, SerializeError> + Send + Sync>;

/// Query serializer: either the declarative [`QueryStyle`] policy or a
/// user-supplied callback.
#[derive(Clone)]
pub enum QuerySerializer {
    Style(QueryStyle),
    Custom(QuerySerializerFn),
}

impl QuerySerializer {
    /// Serialize a parameter map to a `?`-free query string.
    pub fn serialize(&self, params: &IndexMap<String, Value>) -> Result<String, SerializeError> {
        match self {
            QuerySerializer::Style(style) => style.serialize(params),
            QuerySerializer::Custom(f) => f(params),
        }
    }
}

impl Default for QuerySerializer {
    fn default() -> Self {
        QuerySerializer::Style(QueryStyle::default())
    }
}

impl From<QueryStyle> for QuerySerializer {
    fn from(style: QueryStyle) -> Self {
        QuerySerializer::Style(style)
    }
}

impl fmt::Debug for QuerySerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuerySerializer::Style(style) => f.debug_tuple("Style").field(style).finish(),
            QuerySerializer::Custom(_) => f.debug_tuple("Custom").finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(entries: &[(&str, Value)]) -> IndexMap<String, Value> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_scalar_params_in_insertion_order() {
        let q = params(&[("b", json!(2)), ("a", json!(1))]);
        assert_eq!(QueryStyle::default().serialize(&q).unwrap(), "b=2&a=1");
    }

    #[test]
    fn test_null_values_skipped() {
        let q = params(&[("a", Value::Null), ("b", json!("x"))]);
        assert_eq!(QueryStyle::default().serialize(&q).unwrap(), "b=x");
    }

    #[test]
    fn test_array_default_form_explode() {
        let q = params(&[("foo", json!(["abc", "def"]))]);
        assert_eq!(
            QueryStyle::default().serialize(&q).unwrap(),
            "foo=abc&foo=def"
        );
    }

    #[test]
    fn test_empty_arrays_and_objects_contribute_nothing() {
        let q = params(&[("foo", json!([])), ("bar", json!({}))]);
        assert_eq!(QueryStyle::default().serialize(&q).unwrap(), "");
    }

    #[test]
    fn test_object_default_deep_object() {
        let q = params(&[("filter", json!({"role": "admin", "age": 30}))]);
        assert_eq!(
            QueryStyle::default().serialize(&q).unwrap(),
            "filter[role]=admin&filter[age]=30"
        );
    }

    #[test]
    fn test_global_array_style_override() {
        let style = QueryStyle {
            array: StyleOptions {
                style: ArrayStyle::PipeDelimited,
                explode: false,
            },
            ..QueryStyle::default()
        };
        let q = params(&[("id", json!([1, 2, 3]))]);
        assert_eq!(style.serialize(&q).unwrap(), "id=1|2|3");
    }

    #[test]
    fn test_per_parameter_override() {
        let mut style = QueryStyle::default();
        style.parameters.insert(
            "csv".to_string(),
            ParamOverride {
                array: Some(StyleOptions {
                    style: ArrayStyle::Form,
                    explode: false,
                }),
                ..ParamOverride::default()
            },
        );
        let q = params(&[("csv", json!(["a", "b"])), ("multi", json!(["c", "d"]))]);
        assert_eq!(style.serialize(&q).unwrap(), "csv=a,b&multi=c&multi=d");
    }

    #[test]
    fn test_allow_reserved() {
        let style = QueryStyle {
            allow_reserved: true,
            ..QueryStyle::default()
        };
        let q = params(&[("path", json!("a/b"))]);
        assert_eq!(style.serialize(&q).unwrap(), "path=a/b");

        let q = params(&[("path", json!("a/b"))]);
        assert_eq!(
            QueryStyle::default().serialize(&q).unwrap(),
            "path=a%2Fb"
        );
    }

    #[test]
    fn test_custom_serializer() {
        let custom = QuerySerializer::Custom(Arc::new(|params| {
            Ok(params.keys().cloned().collect::<Vec<_>>().join(";"))
        }));
        let q = params(&[("a", json!(1)), ("b", json!(2))]);
        assert_eq!(custom.serialize(&q).unwrap(), "a;b");
    }

    #[test]
    fn test_nested_array_value_errors() {
        let q = params(&[("bad", json!([[1, 2]]))]);
        assert!(QueryStyle::default().serialize(&q).is_err());
    }
}
