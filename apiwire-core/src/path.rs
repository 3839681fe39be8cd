//! Path template substitution and URL building.
//!
//! Path templates contain placeholders delimited by `{` `}`. A placeholder
//! name may carry a `.` prefix (label style) or `;` prefix (matrix style)
//! and a `*` suffix (explode); the default style is simple.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::SerializeError;
use crate::param::{
    ArrayParam, ObjectParam, encode_component, serialize_array, serialize_object,
    serialize_primitive,
};
use crate::query::QuerySerializer;
use crate::style::{ArrayStyle, ObjectStyle};

/// One `{...}` placeholder found in a template.
struct Placeholder<'a> {
    /// The full match including braces, e.g. `{;id*}`.
    token: &'a str,
    /// Parameter name with style prefix and explode suffix stripped.
    name: &'a str,
    style: ArrayStyle,
    explode: bool,
}

/// Scan a template for placeholders. Nested or unbalanced braces inside a
/// placeholder are not treated as matches, mirroring the `{[^{}]+}` rule.
fn placeholders(template: &str) -> Vec<Placeholder<'_>> {
    let mut found = Vec::new();
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'{' {
            i += 1;
            continue;
        }
        let start = i;
        let mut end = None;
        for (j, &b) in bytes.iter().enumerate().skip(i + 1) {
            match b {
                b'{' => break,
                b'}' => {
                    if j > i + 1 {
                        end = Some(j);
                    }
                    break;
                }
                _ => {}
            }
        }
        let Some(close) = end else {
            i += 1;
            continue;
        };

        let token = &template[start..=close];
        let mut name = &template[start + 1..close];
        let mut style = ArrayStyle::Simple;
        let mut explode = false;

        if let Some(stripped) = name.strip_suffix('*') {
            explode = true;
            name = stripped;
        }
        if let Some(stripped) = name.strip_prefix('.') {
            name = stripped;
            style = ArrayStyle::Label;
        } else if let Some(stripped) = name.strip_prefix(';') {
            name = stripped;
            style = ArrayStyle::Matrix;
        }

        found.push(Placeholder {
            token,
            name,
            style,
            explode,
        });
        i = close + 1;
    }
    found
}

/// Substitute path parameters into a template.
///
/// A placeholder whose value is missing or null is left verbatim in the
/// output, except for matrix-styled placeholders, which are dropped (a
/// missing matrix parameter is treated as optional).
pub fn serialize_path(
    template: &str,
    params: &IndexMap<String, Value>,
) -> Result<String, SerializeError> {
    let mut url = template.to_string();
    for ph in placeholders(template) {
        let value = params.get(ph.name);
        let replacement = match value {
            None | Some(Value::Null) => {
                if ph.style == ArrayStyle::Matrix {
                    String::new()
                } else {
                    continue;
                }
            }
            Some(Value::Array(items)) => serialize_array(&ArrayParam {
                allow_reserved: false,
                explode: ph.explode,
                name: ph.name,
                style: ph.style,
                value: items,
            })?,
            Some(Value::Object(map)) => serialize_object(&ObjectParam {
                allow_reserved: false,
                explode: ph.explode,
                name: ph.name,
                style: object_style(ph.style),
                value: map,
            })?,
            Some(scalar) => match ph.style {
                ArrayStyle::Matrix => {
                    format!(";{}", serialize_primitive(ph.name, scalar, false)?)
                }
                ArrayStyle::Label => {
                    let rendered = crate::param::scalar_to_string(scalar)
                        .ok_or_else(|| SerializeError::unsupported_depth(ph.name))?;
                    encode_component(&format!(".{}", rendered), false)
                }
                _ => {
                    let rendered = crate::param::scalar_to_string(scalar)
                        .ok_or_else(|| SerializeError::unsupported_depth(ph.name))?;
                    encode_component(&rendered, false)
                }
            },
        };
        url = url.replacen(ph.token, &replacement, 1);
    }
    Ok(url)
}

fn object_style(style: ArrayStyle) -> ObjectStyle {
    match style {
        ArrayStyle::Label => ObjectStyle::Label,
        ArrayStyle::Matrix => ObjectStyle::Matrix,
        _ => ObjectStyle::Simple,
    }
}

/// Build the final request URL from its parts.
///
/// Guarantees a single `/` between the base URL and the path (an empty
/// template becomes `/`), substitutes path parameters, and appends the
/// query string with a `?` only when it is non-empty.
pub fn build_url(
    base_url: &str,
    template: &str,
    path_params: Option<&IndexMap<String, Value>>,
    query_params: Option<&IndexMap<String, Value>>,
    query_serializer: &QuerySerializer,
) -> Result<String, SerializeError> {
    let path_url = if template.starts_with('/') {
        template.to_string()
    } else {
        format!("/{}", template)
    };
    let mut url = format!("{}{}", base_url, path_url);

    if let Some(params) = path_params {
        url = serialize_path(&url, params)?;
    }

    if let Some(params) = query_params {
        let mut search = query_serializer.serialize(params)?;
        if let Some(stripped) = search.strip_prefix('?') {
            search = stripped.to_string();
        }
        if !search.is_empty() {
            url.push('?');
            url.push_str(&search);
        }
    }

    Ok(url)
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
    fn test_no_params_returns_base_plus_path() {
        let url = build_url(
            "http://localhost:3000",
            "/foo",
            None,
            None,
            &QuerySerializer::default(),
        )
        .unwrap();
        assert_eq!(url, "http://localhost:3000/foo");
    }

    #[test]
    fn test_empty_template_becomes_slash() {
        let url = build_url("", "", None, None, &QuerySerializer::default()).unwrap();
        assert_eq!(url, "/");
    }

    #[test]
    fn test_missing_leading_slash_added() {
        let url = build_url(
            "http://localhost",
            "foo",
            None,
            None,
            &QuerySerializer::default(),
        )
        .unwrap();
        assert_eq!(url, "http://localhost/foo");
    }

    #[test]
    fn test_simple_path_substitution() {
        let p = params(&[("fooId", json!(1))]);
        let url = build_url(
            "",
            "/foo/{fooId}",
            Some(&p),
            None,
            &QuerySerializer::default(),
        )
        .unwrap();
        assert_eq!(url, "/foo/1");
    }

    #[test]
    fn test_path_and_query() {
        let p = params(&[("fooId", json!(1))]);
        let q = params(&[("bar", json!("baz"))]);
        let url = build_url(
            "",
            "/foo/{fooId}",
            Some(&p),
            Some(&q),
            &QuerySerializer::default(),
        )
        .unwrap();
        assert_eq!(url, "/foo/1?bar=baz");
    }

    #[test]
    fn test_empty_query_arrays_leave_url_unchanged() {
        let q = params(&[("foo", json!([])), ("bar", json!([]))]);
        let url = build_url(
            "http://localhost",
            "/items",
            None,
            Some(&q),
            &QuerySerializer::default(),
        )
        .unwrap();
        assert_eq!(url, "http://localhost/items");
    }

    #[test]
    fn test_unresolved_placeholder_left_verbatim() {
        let p = params(&[]);
        let url = build_url(
            "",
            "/foo/{fooId}",
            Some(&p),
            None,
            &QuerySerializer::default(),
        )
        .unwrap();
        assert_eq!(url, "/foo/{fooId}");
    }

    #[test]
    fn test_unresolved_matrix_placeholder_dropped() {
        let p = params(&[]);
        let url = build_url(
            "",
            "/foo{;fooId}",
            Some(&p),
            None,
            &QuerySerializer::default(),
        )
        .unwrap();
        assert_eq!(url, "/foo");
    }

    #[test]
    fn test_label_style_scalar() {
        let p = params(&[("v", json!("1.2"))]);
        assert_eq!(serialize_path("/pkg{.v}", &p).unwrap(), "/pkg.1.2");
    }

    #[test]
    fn test_matrix_style_scalar() {
        let p = params(&[("id", json!(5))]);
        assert_eq!(serialize_path("/m{;id}", &p).unwrap(), "/m;id=5");
    }

    #[test]
    fn test_path_array_simple() {
        let p = params(&[("ids", json!([3, 4, 5]))]);
        assert_eq!(serialize_path("/list/{ids}", &p).unwrap(), "/list/3,4,5");
    }

    #[test]
    fn test_path_array_simple_explode() {
        let p = params(&[("ids", json!([3, 4, 5]))]);
        assert_eq!(serialize_path("/users/{ids*}", &p).unwrap(), "/users/3,4,5");
    }

    #[test]
    fn test_path_object_simple_explode() {
        let p = params(&[("point", json!({"x": 1, "y": 2}))]);
        assert_eq!(serialize_path("/at/{point*}", &p).unwrap(), "/at/x=1,y=2");
    }

    #[test]
    fn test_path_array_matrix_explode() {
        let p = params(&[("ids", json!([3, 4]))]);
        assert_eq!(
            serialize_path("/list{;ids*}", &p).unwrap(),
            "/list;ids=3;ids=4"
        );
    }

    #[test]
    fn test_path_object_simple() {
        let p = params(&[("point", json!({"x": 1, "y": 2}))]);
        assert_eq!(serialize_path("/at/{point}", &p).unwrap(), "/at/x,1,y,2");
    }

    #[test]
    fn test_scalar_percent_encoded() {
        let p = params(&[("name", json!("a b"))]);
        assert_eq!(serialize_path("/u/{name}", &p).unwrap(), "/u/a%20b");
    }

    #[test]
    fn test_query_string_question_mark_stripped() {
        let custom = QuerySerializer::Custom(std::sync::Arc::new(|_| Ok("?a=1".to_string())));
        let q = params(&[("a", json!(1))]);
        let url = build_url("", "/x", None, Some(&q), &custom).unwrap();
        assert_eq!(url, "/x?a=1");
    }

    #[test]
    fn test_duplicate_placeholder_first_occurrence_replaced() {
        let p = params(&[("id", json!(1))]);
        assert_eq!(serialize_path("/{id}/{id}", &p).unwrap(), "/1/1");
    }
}
