//! Primitive, array and object parameter serializers.
//!
//! These functions implement the per-value encoding rules shared by path and
//! query serialization. Values arrive as [`serde_json::Value`]; date-typed
//! values are expected to reach this layer already rendered as ISO-8601
//! strings (the natural output of serde-serializing a datetime type).

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;

use crate::error::SerializeError;
use crate::style::{ArrayStyle, ObjectStyle};

/// Characters escaped when percent-encoding a parameter component.
///
/// Everything except unreserved characters and the marks left intact by URI
/// component encoding (`- _ . ! ~ * ' ( )`).
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a component unless reserved characters are allowed through.
pub fn encode_component(value: &str, allow_reserved: bool) -> String {
    if allow_reserved {
        value.to_string()
    } else {
        utf8_percent_encode(value, COMPONENT).to_string()
    }
}

/// Render a scalar JSON value as its parameter string form.
///
/// Returns `None` for arrays and objects, which the primitive serializer
/// rejects as too deeply nested.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Serialize a scalar parameter as `name=value`.
///
/// Null values produce an empty string (the caller skips them). Array or
/// object values are an error: the default serializers do not recurse past
/// one level of nesting.
pub fn serialize_primitive(
    name: &str,
    value: &Value,
    allow_reserved: bool,
) -> Result<String, SerializeError> {
    if value.is_null() {
        return Ok(String::new());
    }
    let scalar = scalar_to_string(value).ok_or_else(|| SerializeError::unsupported_depth(name))?;
    Ok(format!("{}={}", name, encode_component(&scalar, allow_reserved)))
}

/// Arguments for [`serialize_array`].
#[derive(Debug)]
pub struct ArrayParam<'a> {
    pub allow_reserved: bool,
    pub explode: bool,
    pub name: &'a str,
    pub style: ArrayStyle,
    pub value: &'a [Value],
}

/// Serialize an array-valued parameter per its style and explode flag.
///
/// Non-explode joins the encoded elements with the style's join separator
/// and wraps the result per style. Explode re-emits each element
/// individually: bare values for `simple`/`label`, `name=value` pairs
/// otherwise, with a leading separator for `label`/`matrix`.
pub fn serialize_array(param: &ArrayParam<'_>) -> Result<String, SerializeError> {
    let ArrayParam {
        allow_reserved,
        explode,
        name,
        style,
        value,
    } = *param;

    if !explode {
        let mut encoded = Vec::with_capacity(value.len());
        for v in value {
            let scalar =
                scalar_to_string(v).ok_or_else(|| SerializeError::unsupported_depth(name))?;
            encoded.push(encode_component(&scalar, allow_reserved));
        }
        let joined = encoded.join(style.join_separator());
        return Ok(match style {
            ArrayStyle::Label => format!(".{}", joined),
            ArrayStyle::Matrix => format!(";{}={}", name, joined),
            ArrayStyle::Simple => joined,
            _ => format!("{}={}", name, joined),
        });
    }

    let separator = style.explode_separator();
    let mut parts = Vec::with_capacity(value.len());
    for v in value {
        match style {
            ArrayStyle::Label | ArrayStyle::Simple => {
                let scalar =
                    scalar_to_string(v).ok_or_else(|| SerializeError::unsupported_depth(name))?;
                parts.push(encode_component(&scalar, allow_reserved));
            }
            _ => parts.push(serialize_primitive(name, v, allow_reserved)?),
        }
    }
    let joined = parts.join(separator);
    Ok(match style {
        ArrayStyle::Label | ArrayStyle::Matrix => format!("{}{}", separator, joined),
        _ => joined,
    })
}

/// Arguments for [`serialize_object`].
#[derive(Debug)]
pub struct ObjectParam<'a> {
    pub allow_reserved: bool,
    pub explode: bool,
    pub name: &'a str,
    pub style: ObjectStyle,
    pub value: &'a serde_json::Map<String, Value>,
}

/// Serialize an object-valued parameter per its style and explode flag.
///
/// Non-explode (non-deepObject) flattens the object into an alternating
/// `key,value` list. Explode emits one `key=value` pair per property, or
/// `name[key]=value` for deepObject.
pub fn serialize_object(param: &ObjectParam<'_>) -> Result<String, SerializeError> {
    let ObjectParam {
        allow_reserved,
        explode,
        name,
        style,
        value,
    } = *param;

    if style != ObjectStyle::DeepObject && !explode {
        let mut values = Vec::with_capacity(value.len() * 2);
        for (key, v) in value {
            let scalar =
                scalar_to_string(v).ok_or_else(|| SerializeError::unsupported_depth(name))?;
            values.push(key.clone());
            values.push(encode_component(&scalar, allow_reserved));
        }
        let joined = values.join(",");
        return Ok(match style {
            ObjectStyle::Form => format!("{}={}", name, joined),
            ObjectStyle::Label => format!(".{}", joined),
            ObjectStyle::Matrix => format!(";{}={}", name, joined),
            _ => joined,
        });
    }

    let separator = style.explode_separator();
    let mut parts = Vec::with_capacity(value.len());
    for (key, v) in value {
        let pair_name = if style == ObjectStyle::DeepObject {
            format!("{}[{}]", name, key)
        } else {
            key.clone()
        };
        parts.push(serialize_primitive(&pair_name, v, allow_reserved)?);
    }
    let joined = parts.join(separator);
    Ok(match style {
        ObjectStyle::Label | ObjectStyle::Matrix => format!("{}{}", separator, joined),
        _ => joined,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> serde_json::Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_serialize_primitive() {
        assert_eq!(
            serialize_primitive("foo", &json!("bar"), false).unwrap(),
            "foo=bar"
        );
        assert_eq!(serialize_primitive("n", &json!(42), false).unwrap(), "n=42");
        assert_eq!(serialize_primitive("b", &json!(true), false).unwrap(), "b=true");
        assert_eq!(serialize_primitive("x", &Value::Null, false).unwrap(), "");
    }

    #[test]
    fn test_serialize_primitive_encodes_reserved() {
        assert_eq!(
            serialize_primitive("q", &json!("a b/c"), false).unwrap(),
            "q=a%20b%2Fc"
        );
        assert_eq!(
            serialize_primitive("q", &json!("a b/c"), true).unwrap(),
            "q=a b/c"
        );
    }

    #[test]
    fn test_serialize_primitive_rejects_nested() {
        let err = serialize_primitive("deep", &json!({"a": 1}), false).unwrap_err();
        assert_eq!(err, SerializeError::unsupported_depth("deep"));
        assert!(serialize_primitive("deep", &json!([1]), false).is_err());
    }

    #[test]
    fn test_array_form_no_explode() {
        let param = ArrayParam {
            allow_reserved: false,
            explode: false,
            name: "id",
            style: ArrayStyle::Form,
            value: &[json!(3), json!(4), json!(5)],
        };
        assert_eq!(serialize_array(&param).unwrap(), "id=3,4,5");
    }

    #[test]
    fn test_array_form_explode() {
        let param = ArrayParam {
            allow_reserved: false,
            explode: true,
            name: "id",
            style: ArrayStyle::Form,
            value: &[json!("abc"), json!("def")],
        };
        assert_eq!(serialize_array(&param).unwrap(), "id=abc&id=def");
    }

    #[test]
    fn test_array_pipe_and_space_delimited() {
        let values = [json!(1), json!(2)];
        let pipes = ArrayParam {
            allow_reserved: false,
            explode: false,
            name: "id",
            style: ArrayStyle::PipeDelimited,
            value: &values,
        };
        assert_eq!(serialize_array(&pipes).unwrap(), "id=1|2");

        let spaces = ArrayParam {
            allow_reserved: false,
            explode: false,
            name: "id",
            style: ArrayStyle::SpaceDelimited,
            value: &values,
        };
        assert_eq!(serialize_array(&spaces).unwrap(), "id=1%202");
    }

    #[test]
    fn test_array_simple_and_label() {
        let values = [json!("a"), json!("b")];
        let simple = ArrayParam {
            allow_reserved: false,
            explode: false,
            name: "id",
            style: ArrayStyle::Simple,
            value: &values,
        };
        assert_eq!(serialize_array(&simple).unwrap(), "a,b");

        let label = ArrayParam {
            allow_reserved: false,
            explode: true,
            name: "id",
            style: ArrayStyle::Label,
            value: &values,
        };
        assert_eq!(serialize_array(&label).unwrap(), ".a.b");
    }

    #[test]
    fn test_array_matrix_explode() {
        let values = [json!("a"), json!("b")];
        let matrix = ArrayParam {
            allow_reserved: false,
            explode: true,
            name: "id",
            style: ArrayStyle::Matrix,
            value: &values,
        };
        assert_eq!(serialize_array(&matrix).unwrap(), ";id=a;id=b");
    }

    #[test]
    fn test_object_form_no_explode_flattens() {
        let map = object(json!({"role": "admin", "firstName": "Alex"}));
        let param = ObjectParam {
            allow_reserved: false,
            explode: false,
            name: "id",
            style: ObjectStyle::Form,
            value: &map,
        };
        assert_eq!(serialize_object(&param).unwrap(), "id=role,admin,firstName,Alex");
    }

    #[test]
    fn test_object_form_explode() {
        let map = object(json!({"role": "admin", "firstName": "Alex"}));
        let param = ObjectParam {
            allow_reserved: false,
            explode: true,
            name: "id",
            style: ObjectStyle::Form,
            value: &map,
        };
        assert_eq!(serialize_object(&param).unwrap(), "role=admin&firstName=Alex");
    }

    #[test]
    fn test_object_deep_object() {
        let map = object(json!({"role": "admin"}));
        let param = ObjectParam {
            allow_reserved: false,
            explode: true,
            name: "id",
            style: ObjectStyle::DeepObject,
            value: &map,
        };
        assert_eq!(serialize_object(&param).unwrap(), "id[role]=admin");
    }

    #[test]
    fn test_object_matrix_explode() {
        let map = object(json!({"role": "admin"}));
        let param = ObjectParam {
            allow_reserved: false,
            explode: true,
            name: "id",
            style: ObjectStyle::Matrix,
            value: &map,
        };
        assert_eq!(serialize_object(&param).unwrap(), ";role=admin");
    }

    #[test]
    fn test_object_rejects_nested_values() {
        let map = object(json!({"inner": {"x": 1}}));
        let param = ObjectParam {
            allow_reserved: false,
            explode: true,
            name: "id",
            style: ObjectStyle::DeepObject,
            value: &map,
        };
        assert!(serialize_object(&param).is_err());
    }
}
