//! Section types.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// One typed content unit of a document.
///
/// The JSON tag is `type`. Sections that carry an unrecognized tag, or whose
/// fields do not fit their declared tag, are kept as [`Section::Unknown`] so
/// that loading never fails on a single bad section; renderers turn them into
/// visible placeholders. Serializing an unknown section writes its original
/// object back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self", tag = "type", rename_all = "lowercase")]
pub enum Section {
    /// Document title
    Title {
        /// Title text (inline markup allowed)
        #[serde(deserialize_with = "de_text")]
        content: String,
    },

    /// Heading
    #[serde(rename = "section")]
    Heading {
        /// Heading text (inline markup allowed)
        #[serde(deserialize_with = "de_text")]
        content: String,
        /// Heading level as given by the source; clamp with [`clamp_level`]
        #[serde(default = "default_level", deserialize_with = "de_level")]
        level: i64,
    },

    /// Body paragraph
    Paragraph {
        /// Paragraph text (inline markup allowed)
        #[serde(deserialize_with = "de_text")]
        content: String,
    },

    /// Verbatim code block
    #[serde(rename = "codeblock")]
    CodeBlock {
        /// Code, never inline-formatted
        #[serde(deserialize_with = "de_text")]
        content: String,
        /// Language hint
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },

    /// Bulleted or numbered list
    List {
        /// List items (inline markup allowed)
        #[serde(default, deserialize_with = "de_strings")]
        items: Vec<String>,
        /// Numbered when true
        #[serde(default)]
        ordered: bool,
    },

    /// Table
    Table {
        /// Header and body cells; absent data renders nothing
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<TableData>,
        /// Table caption
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },

    /// Image reference
    Image {
        /// Image source path or URL
        #[serde(deserialize_with = "de_text")]
        src: String,
        /// Alternative text
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
        /// Caption shown under the image
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },

    /// Block quote
    Quote {
        /// Quoted text (inline markup allowed)
        #[serde(deserialize_with = "de_text")]
        content: String,
    },

    /// Explicit page break
    #[serde(rename = "pagebreak")]
    PageBreak {},

    /// Verbatim math expression
    Math {
        /// Expression source (e.g. TeX)
        #[serde(deserialize_with = "de_text")]
        content: String,
    },

    /// A section no renderer understands.
    #[serde(skip)]
    Unknown {
        /// The `type` tag as found in the source (empty if missing)
        kind: String,
        /// The original section object
        raw: Value,
    },
}

impl Serialize for Section {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Section::Unknown { raw, .. } => raw.serialize(serializer),
            known => Section::serialize(known, serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Section {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Section::deserialize(deserializer)
    }
}

impl Section {
    /// Create a paragraph section.
    pub fn paragraph(content: impl Into<String>) -> Self {
        Section::Paragraph {
            content: content.into(),
        }
    }

    /// Create a heading section.
    pub fn heading(content: impl Into<String>, level: i64) -> Self {
        Section::Heading {
            content: content.into(),
            level,
        }
    }

    /// Create a title section.
    pub fn title(content: impl Into<String>) -> Self {
        Section::Title {
            content: content.into(),
        }
    }

    /// Create a list section.
    pub fn list<I, S>(items: I, ordered: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Section::List {
            items: items.into_iter().map(Into::into).collect(),
            ordered,
        }
    }

    /// Create a table section.
    pub fn table(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Section::Table {
            data: Some(TableData::new(headers, rows)),
            caption: None,
        }
    }

    /// Build a section from an arbitrary JSON value, never failing.
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value::<Section>(value.clone()) {
            Ok(section) => section,
            Err(err) => {
                let kind = value
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                log::debug!("Keeping section '{}' as unknown: {}", kind, err);
                Section::Unknown { kind, raw: value }
            }
        }
    }

    /// The `type` tag of this section.
    pub fn kind(&self) -> &str {
        match self {
            Section::Title { .. } => "title",
            Section::Heading { .. } => "section",
            Section::Paragraph { .. } => "paragraph",
            Section::CodeBlock { .. } => "codeblock",
            Section::List { .. } => "list",
            Section::Table { .. } => "table",
            Section::Image { .. } => "image",
            Section::Quote { .. } => "quote",
            Section::PageBreak {} => "pagebreak",
            Section::Math { .. } => "math",
            Section::Unknown { kind, .. } => kind,
        }
    }

    /// Textual content with inline markup stripped.
    pub fn plain_text(&self) -> String {
        use crate::render::inline::plain_text;
        match self {
            Section::Title { content }
            | Section::Heading { content, .. }
            | Section::Paragraph { content }
            | Section::Quote { content } => plain_text(content),
            Section::CodeBlock { content, .. } | Section::Math { content } => content.clone(),
            Section::List { items, .. } => items
                .iter()
                .map(|i| plain_text(i))
                .collect::<Vec<_>>()
                .join("\n"),
            Section::Table { data, caption } => {
                let mut lines = Vec::new();
                if let Some(caption) = caption {
                    lines.push(plain_text(caption));
                }
                if let Some(data) = data {
                    if let Some(headers) = &data.headers {
                        lines.push(headers.join(" | "));
                    }
                    for row in data.rows.iter().flatten() {
                        lines.push(row.join(" | "));
                    }
                }
                lines.join("\n")
            }
            Section::Image { alt, caption, .. } => caption
                .as_deref()
                .or(alt.as_deref())
                .map(plain_text)
                .unwrap_or_default(),
            Section::PageBreak {} | Section::Unknown { .. } => String::new(),
        }
    }
}

/// Table cells.
///
/// Rows may be ragged: a row shorter than the header renders its missing
/// cells empty, a longer row keeps its extra cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    /// Header cells
    #[serde(default, deserialize_with = "de_opt_strings")]
    pub headers: Option<Vec<String>>,

    /// Body rows
    #[serde(default, deserialize_with = "de_opt_rows")]
    pub rows: Option<Vec<Vec<String>>>,
}

impl TableData {
    /// Create table data with header and rows.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            headers: Some(headers),
            rows: Some(rows),
        }
    }

    /// Header and rows, only when both are present.
    pub fn parts(&self) -> Option<(&[String], &[Vec<String>])> {
        match (&self.headers, &self.rows) {
            (Some(headers), Some(rows)) => Some((headers.as_slice(), rows.as_slice())),
            _ => None,
        }
    }

    /// Widest of the header and every row.
    pub fn column_count(&self) -> usize {
        let header = self.headers.as_ref().map_or(0, Vec::len);
        self.rows
            .iter()
            .flatten()
            .map(Vec::len)
            .fold(header, usize::max)
    }

    /// Cell text, empty when the row is short.
    pub fn cell(row: &[String], col: usize) -> &str {
        row.get(col).map(String::as_str).unwrap_or("")
    }
}

/// Clamp a heading level into `1..=6`.
pub fn clamp_level(level: i64) -> u8 {
    // Cannot truncate: the value is within 1..=6 after clamping.
    level.clamp(1, 6) as u8
}

fn default_level() -> i64 {
    1
}

/// Deserialize a section list leniently, one section at a time.
pub(crate) fn deserialize_sections<'de, D>(deserializer: D) -> Result<Vec<Section>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(Section::from_value)
        .collect())
}

/// Any scalar as text; null becomes empty.
fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn de_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    scalar_to_string(value).ok_or_else(|| serde::de::Error::custom("expected a scalar value"))
}

fn de_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(de_opt_strings(deserializer)?.unwrap_or_default())
}

fn de_opt_strings<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(value.map(|items| items.into_iter().map(cell_text).collect()))
}

fn de_opt_rows<'de, D>(deserializer: D) -> Result<Option<Vec<Vec<String>>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(value.map(|rows| {
        rows.into_iter()
            .map(|row| match row {
                Value::Array(cells) => cells.into_iter().map(cell_text).collect(),
                // A scalar row is a single-cell row.
                other => vec![cell_text(other)],
            })
            .collect()
    }))
}

fn cell_text(value: Value) -> String {
    match value {
        nested @ (Value::Array(_) | Value::Object(_)) => nested.to_string(),
        scalar => scalar_to_string(scalar).unwrap_or_default(),
    }
}

fn de_level<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(default_level()),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| serde::de::Error::custom("heading level out of range")),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid heading level '{}'", s))),
        _ => Err(serde::de::Error::custom("invalid heading level")),
    }
}
