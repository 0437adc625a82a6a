//! JSON document model input.

use crate::error::{Error, Result};
use crate::model::{Document, Section};
use serde_json::Value;

/// Parse a JSON document.
///
/// Accepted shapes are an object with `sections` and/or `metadata`, or a bare
/// array of sections.
pub(super) fn parse(source: &str) -> Result<Document> {
    let value: Value =
        serde_json::from_str(source).map_err(|e| Error::MalformedInput(format!("invalid JSON: {}", e)))?;

    let is_document = value
        .as_object()
        .is_some_and(|map| map.contains_key("sections") || map.contains_key("metadata"));
    if is_document {
        return Ok(serde_json::from_value(value)?);
    }

    match value {
        Value::Array(items) => Ok(Document::with_sections(
            items.into_iter().map(Section::from_value).collect(),
        )),
        other => Err(Error::MalformedInput(format!(
            "unrecognized JSON document shape ({})",
            shape_name(&other)
        ))),
    }
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object without sections",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_document_object() {
        let doc = parse(
            r#"{"metadata":{"title":"T","tags":["a","b"]},
                "sections":[{"type":"title","content":"T"},{"type":"section","content":"H","level":"2"}]}"#,
        )
        .unwrap();
        assert_eq!(doc.metadata.title().as_deref(), Some("T"));
        assert_eq!(doc.sections[1], Section::heading("H", 2));
    }

    #[test]
    fn test_bare_array() {
        let doc = parse(r#"[{"type":"paragraph","content":"x"},{"type":"mystery"}]"#).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.sections[1].kind(), "mystery");
    }

    #[test]
    fn test_unrecognized_shapes() {
        for source in ["\"text\"", "3", "{\"title\":\"x\"}", "null"] {
            assert_eq!(parse(source).unwrap_err().kind(), ErrorKind::MalformedInput, "{}", source);
        }
    }

    #[test]
    fn test_sections_of_wrong_type() {
        let err = parse(r#"{"sections":"nope"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }
}
