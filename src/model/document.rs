//! Document-level types.

use super::Section;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// A format-agnostic document: metadata plus sections in reading order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document metadata (title, author, etc.)
    #[serde(default)]
    pub metadata: Metadata,

    /// Content sections in reading order
    #[serde(default, deserialize_with = "super::section::deserialize_sections")]
    pub sections: Vec<Section>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document from sections with empty metadata.
    pub fn with_sections(sections: Vec<Section>) -> Self {
        Self {
            metadata: Metadata::default(),
            sections,
        }
    }

    /// Set the metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Append a section.
    pub fn add_section(&mut self, section: Section) {
        self.sections.push(section);
    }

    /// Number of sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Check if the document has any sections.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Title from metadata, falling back to the first `title` section.
    pub fn title(&self) -> Option<String> {
        self.metadata.title().or_else(|| {
            self.sections.iter().find_map(|s| match s {
                Section::Title { content } => Some(crate::render::inline::plain_text(content)),
                _ => None,
            })
        })
    }

    /// Get plain text content of the entire document.
    pub fn plain_text(&self) -> String {
        self.sections
            .iter()
            .map(Section::plain_text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A single metadata value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    /// Explicit null
    Null,
    /// Boolean flag
    Bool(bool),
    /// Integer number
    Integer(i64),
    /// Floating point number
    Float(f64),
    /// Free text
    Text(String),
    /// Array of values
    List(Vec<MetaValue>),
}

impl MetaValue {
    /// Render the value as display text (lists are comma-joined).
    pub fn to_text(&self) -> String {
        match self {
            MetaValue::Null => String::new(),
            MetaValue::Bool(b) => b.to_string(),
            MetaValue::Integer(i) => i.to_string(),
            MetaValue::Float(f) => f.to_string(),
            MetaValue::Text(s) => s.clone(),
            MetaValue::List(items) => items
                .iter()
                .map(MetaValue::to_text)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Flatten into a list of strings.
    pub fn to_list(&self) -> Vec<String> {
        match self {
            MetaValue::Null => Vec::new(),
            MetaValue::List(items) => items
                .iter()
                .map(MetaValue::to_text)
                .filter(|s| !s.is_empty())
                .collect(),
            MetaValue::Text(s) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            other => vec![other.to_text()],
        }
    }
}

impl From<serde_json::Value> for MetaValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => MetaValue::Null,
            Value::Bool(b) => MetaValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => MetaValue::Integer(i),
                None => MetaValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => MetaValue::Text(s),
            Value::Array(items) => MetaValue::List(items.into_iter().map(Into::into).collect()),
            // Nested objects have no typed accessor; keep them as compact JSON.
            obj @ Value::Object(_) => MetaValue::Text(obj.to_string()),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Text(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::Text(s)
    }
}

impl From<Vec<String>> for MetaValue {
    fn from(items: Vec<String>) -> Self {
        MetaValue::List(items.into_iter().map(MetaValue::Text).collect())
    }
}

/// Open-ended document metadata.
///
/// Keys are kept sorted so that every serialization of the same metadata is
/// byte-identical. All accessors return `None`/empty on absent keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata(BTreeMap<String, MetaValue>);

impl Metadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Raw value lookup.
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.0.get(key)
    }

    /// Value as non-empty display text.
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.0
            .get(key)
            .map(MetaValue::to_text)
            .filter(|s| !s.trim().is_empty())
    }

    /// Document title
    pub fn title(&self) -> Option<String> {
        self.get_text("title")
    }

    /// Document author
    pub fn author(&self) -> Option<String> {
        self.get_text("author")
    }

    /// Document subject / description
    pub fn subject(&self) -> Option<String> {
        self.get_text("subject")
            .or_else(|| self.get_text("description"))
    }

    /// Keywords from an array or a comma-separated string.
    pub fn keywords(&self) -> Vec<String> {
        self.0
            .get("keywords")
            .map(MetaValue::to_list)
            .unwrap_or_default()
    }

    /// Document date as written in the source.
    pub fn date(&self) -> Option<String> {
        self.get_text("date")
            .or_else(|| self.get_text("created"))
    }

    /// Document date parsed as a calendar date (RFC 3339 or `YYYY-MM-DD`).
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        let raw = self.date()?;
        let raw = raw.trim();
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.date_naive())
            .ok()
            .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
    }

    /// Document language, defaulting to `en`.
    pub fn language(&self) -> String {
        self.get_text("lang")
            .or_else(|| self.get_text("language"))
            .unwrap_or_else(|| "en".to_string())
    }

    /// Check if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetaValue)> {
        self.0.iter()
    }

    /// Convert metadata to YAML frontmatter format.
    pub fn to_yaml_frontmatter(&self) -> String {
        let mut lines = vec!["---".to_string()];

        for (key, value) in &self.0 {
            match value {
                MetaValue::Null => lines.push(format!("{}: null", yaml_key(key))),
                MetaValue::List(items) => {
                    let items: Vec<String> = items
                        .iter()
                        .map(|item| format!("\"{}\"", escape_yaml(&item.to_text())))
                        .collect();
                    lines.push(format!("{}: [{}]", yaml_key(key), items.join(", ")));
                }
                MetaValue::Text(s) => {
                    lines.push(format!("{}: \"{}\"", yaml_key(key), escape_yaml(s)));
                }
                scalar => lines.push(format!("{}: {}", yaml_key(key), scalar.to_text())),
            }
        }

        lines.push("---".to_string());
        lines.push(String::new());

        lines.join("\n")
    }
}

impl FromIterator<(String, MetaValue)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (String, MetaValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Metadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
        Ok(raw
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, MetaValue::from(v)))
            .collect())
    }
}

/// Quote a key when it is not a plain YAML identifier.
fn yaml_key(key: &str) -> String {
    let plain = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if plain {
        key.to_string()
    } else {
        format!("\"{}\"", escape_yaml(key))
    }
}

/// Escape special characters for YAML strings.
fn escape_yaml(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_new() {
        let doc = Document::new();
        assert!(doc.is_empty());
        assert_eq!(doc.len(), 0);
        assert!(doc.metadata.is_empty());
    }

    #[test]
    fn test_metadata_accessors_default_gracefully() {
        let meta = Metadata::new();
        assert_eq!(meta.title(), None);
        assert_eq!(meta.author(), None);
        assert!(meta.keywords().is_empty());
        assert_eq!(meta.language(), "en");
    }

    #[test]
    fn test_metadata_keywords_from_array_and_string() {
        let meta = Metadata::new().with("keywords", vec!["a".to_string(), "b".to_string()]);
        assert_eq!(meta.keywords(), vec!["a", "b"]);

        let meta = Metadata::new().with("keywords", "rust, export ,docs");
        assert_eq!(meta.keywords(), vec!["rust", "export", "docs"]);
    }

    #[test]
    fn test_metadata_from_json_values() {
        let meta: Metadata = serde_json::from_str(
            r#"{"title": "T", "version": 3, "draft": true, "tags": ["x", 1], "extra": {"a": 1}}"#,
        )
        .unwrap();
        assert_eq!(meta.title().as_deref(), Some("T"));
        assert_eq!(meta.get("version"), Some(&MetaValue::Integer(3)));
        assert_eq!(meta.get("draft"), Some(&MetaValue::Bool(true)));
        assert_eq!(meta.get_text("tags").as_deref(), Some("x, 1"));
        assert_eq!(meta.get_text("extra").as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_metadata_null_is_empty() {
        let meta: Metadata = serde_json::from_str("null").unwrap();
        assert!(meta.is_empty());
    }

    #[test]
    fn test_metadata_parsed_date() {
        let meta = Metadata::new().with("date", "2024-03-01");
        assert_eq!(
            meta.parsed_date(),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );

        let meta = Metadata::new().with("created", "2024-03-01T10:00:00Z");
        assert_eq!(
            meta.parsed_date(),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );

        let meta = Metadata::new().with("date", "last tuesday");
        assert_eq!(meta.parsed_date(), None);
    }

    #[test]
    fn test_metadata_frontmatter() {
        let meta = Metadata::new()
            .with("title", "Test \"Document\"")
            .with("author", "John Doe")
            .with("keywords", vec!["a".to_string(), "b".to_string()]);

        let yaml = meta.to_yaml_frontmatter();
        assert!(yaml.starts_with("---\n"));
        assert!(yaml.contains("title: \"Test \\\"Document\\\"\""));
        assert!(yaml.contains("author: \"John Doe\""));
        assert!(yaml.contains("keywords: [\"a\", \"b\"]"));
        assert!(yaml.ends_with("---\n"));
    }

    #[test]
    fn test_document_title_falls_back_to_section() {
        let doc = Document::with_sections(vec![Section::Title {
            content: "**Hello**".to_string(),
        }]);
        assert_eq!(doc.title().as_deref(), Some("Hello"));
    }
}
