//! OpenAPI parameter serialization styles.
//!
//! A style describes how an array- or object-valued parameter is flattened
//! into a URL. The separator tables here match the OpenAPI specification's
//! style definitions exactly, including the literal `%20` separator for
//! space-delimited arrays.

use serde::{Deserialize, Serialize};

/// Serialization style for array-valued parameters.
///
/// `Simple`, `Label` and `Matrix` only occur in path parameters; the
/// remaining styles belong to the query string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArrayStyle {
    #[default]
    Form,
    SpaceDelimited,
    PipeDelimited,
    Simple,
    Label,
    Matrix,
}

impl ArrayStyle {
    /// Separator between individually-encoded elements when explode is set.
    pub fn explode_separator(&self) -> &'static str {
        match self {
            ArrayStyle::Label => ".",
            ArrayStyle::Matrix => ";",
            ArrayStyle::Simple => ",",
            _ => "&",
        }
    }

    /// Separator used to join elements into a single value when explode is
    /// not set.
    pub fn join_separator(&self) -> &'static str {
        match self {
            ArrayStyle::Form => ",",
            ArrayStyle::PipeDelimited => "|",
            ArrayStyle::SpaceDelimited => "%20",
            _ => ",",
        }
    }
}

/// Serialization style for object-valued parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectStyle {
    Form,
    #[default]
    DeepObject,
    Simple,
    Label,
    Matrix,
}

impl ObjectStyle {
    /// Separator between `key=value` pairs when explode is set.
    pub fn explode_separator(&self) -> &'static str {
        match self {
            ObjectStyle::Label => ".",
            ObjectStyle::Matrix => ";",
            ObjectStyle::Simple => ",",
            _ => "&",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_style_separators() {
        assert_eq!(ArrayStyle::Form.explode_separator(), "&");
        assert_eq!(ArrayStyle::Label.explode_separator(), ".");
        assert_eq!(ArrayStyle::Matrix.explode_separator(), ";");
        assert_eq!(ArrayStyle::Simple.explode_separator(), ",");

        assert_eq!(ArrayStyle::Form.join_separator(), ",");
        assert_eq!(ArrayStyle::PipeDelimited.join_separator(), "|");
        assert_eq!(ArrayStyle::SpaceDelimited.join_separator(), "%20");
        assert_eq!(ArrayStyle::Simple.join_separator(), ",");
    }

    #[test]
    fn test_object_style_separators() {
        assert_eq!(ObjectStyle::DeepObject.explode_separator(), "&");
        assert_eq!(ObjectStyle::Label.explode_separator(), ".");
        assert_eq!(ObjectStyle::Matrix.explode_separator(), ";");
        assert_eq!(ObjectStyle::Simple.explode_separator(), ",");
    }

    #[test]
    fn test_style_deserialize_camel_case() {
        let style: ArrayStyle = serde_json::from_str("\"pipeDelimited\"").unwrap();
        assert_eq!(style, ArrayStyle::PipeDelimited);
        let style: ObjectStyle = serde_json::from_str("\"deepObject\"").unwrap();
        assert_eq!(style, ObjectStyle::DeepObject);
    }
}
