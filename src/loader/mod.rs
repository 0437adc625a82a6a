//! Building a [`Document`] from input files.
//!
//! The source kind is chosen by file extension. A source that cannot be read
//! as its kind falls back to a single code block holding the raw text
//! verbatim, unless the loader runs in [`ErrorMode::Strict`].

mod csv;
mod json;
mod markdown;
mod text;

use crate::error::{Error, Result};
use crate::model::{Document, Section};
use std::path::Path;

/// Input syntax of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// JSON document model
    Json,
    /// Markdown with optional YAML front matter
    Markdown,
    /// Comma-separated values, loaded as one table
    Csv,
    /// Plain text, blank-line separated paragraphs
    Text,
}

impl SourceKind {
    /// Pick a source kind from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "json" => SourceKind::Json,
            "md" | "markdown" => SourceKind::Markdown,
            "csv" => SourceKind::Csv,
            _ => SourceKind::Text,
        }
    }

    /// Pick a source kind from a path's extension.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(SourceKind::Text)
    }

    /// Short name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Json => "json",
            SourceKind::Markdown => "markdown",
            SourceKind::Csv => "csv",
            SourceKind::Text => "text",
        }
    }
}

/// How the loader treats unparseable sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail with [`Error::MalformedInput`]
    Strict,
    /// Keep the raw text as a single verbatim block
    #[default]
    Lenient,
}

/// Options for loading documents.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Error handling mode
    pub error_mode: ErrorMode,

    /// Source kind override; by default it follows the file extension
    pub kind: Option<SourceKind>,
}

impl LoadOptions {
    /// Create new load options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Fail on unparseable input instead of falling back to text.
    pub fn strict(mut self) -> Self {
        self.error_mode = ErrorMode::Strict;
        self
    }

    /// Force a source kind regardless of extension.
    pub fn with_kind(mut self, kind: SourceKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Load a document from a string, falling back to text on parse failure.
///
/// # Example
///
/// ```
/// use docport::loader::{load_str, SourceKind};
///
/// let doc = load_str(r#"{"sections":[{"type":"paragraph","content":"Hi"}]}"#, SourceKind::Json).unwrap();
/// assert_eq!(doc.len(), 1);
///
/// // Not a document shape: kept verbatim as one block
/// let doc = load_str("42", SourceKind::Json).unwrap();
/// assert_eq!(doc.plain_text(), "42");
/// ```
pub fn load_str(source: &str, kind: SourceKind) -> Result<Document> {
    load_str_with_options(source, kind, &LoadOptions::default())
}

/// Load a document from a string with custom options.
pub fn load_str_with_options(source: &str, kind: SourceKind, options: &LoadOptions) -> Result<Document> {
    if source.trim().is_empty() {
        return Ok(Document::new());
    }

    let parsed = match kind {
        SourceKind::Json => json::parse(source),
        SourceKind::Markdown => markdown::parse(source),
        SourceKind::Csv => csv::parse(source),
        SourceKind::Text => Ok(text::parse(source)),
    };

    match parsed {
        Ok(doc) => Ok(doc),
        Err(err) if options.error_mode == ErrorMode::Strict => Err(err),
        Err(err) => {
            log::warn!(
                "Input is not valid {} ({}); keeping it as plain text",
                kind.as_str(),
                err
            );
            // Opaque text: no inline markup is read out of it.
            Ok(Document::with_sections(vec![Section::CodeBlock {
                content: source.trim().to_string(),
                language: None,
            }]))
        }
    }
}

/// Load a document from raw bytes.
///
/// Bytes that are not UTF-8 cannot be kept as text, so they fail in every
/// error mode.
pub fn load_bytes(data: &[u8], kind: SourceKind, options: &LoadOptions) -> Result<Document> {
    let source = std::str::from_utf8(data).map_err(|e| {
        Error::MalformedInput(format!("input is not valid UTF-8 (at byte {})", e.valid_up_to()))
    })?;
    // Tolerate a leading byte-order mark.
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    load_str_with_options(source, kind, options)
}

/// Load a document from a file.
pub fn load_file(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Document> {
    let path = path.as_ref();
    let kind = options.kind.unwrap_or_else(|| SourceKind::from_path(path));
    log::debug!("Loading {} as {}", path.display(), kind.as_str());

    let data = std::fs::read(path)?;
    let mut doc = load_bytes(&data, kind, options)?;

    if kind == SourceKind::Csv {
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned());
        for section in &mut doc.sections {
            if let Section::Table { caption, .. } = section {
                if caption.is_none() {
                    caption.clone_from(&stem);
                }
            }
        }
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_source_kind_from_path() {
        assert_eq!(SourceKind::from_path("a/b.json"), SourceKind::Json);
        assert_eq!(SourceKind::from_path("README.MD"), SourceKind::Markdown);
        assert_eq!(SourceKind::from_path("data.csv"), SourceKind::Csv);
        assert_eq!(SourceKind::from_path("notes"), SourceKind::Text);
        assert_eq!(SourceKind::from_path("x.rst"), SourceKind::Text);
    }


    #[test]
    fn test_strict_mode_fails() {
        let options = LoadOptions::new().strict();
        let err = load_str_with_options("{not json", SourceKind::Json, &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn test_error_mode_lenient_falls_back() {
        let options = LoadOptions::new()
            .strict()
            .with_error_mode(ErrorMode::Lenient);
        let doc = load_str_with_options("{not json", SourceKind::Json, &options).unwrap();
        assert_eq!(doc.plain_text(), "{not json");
    }

    #[test]
    fn test_lenient_fallback_keeps_delimiters() {
        let doc = load_str("{not *json* **", SourceKind::Json).unwrap();
        assert_eq!(
            doc.sections,
            vec![Section::CodeBlock {
                content: "{not *json* **".into(),
                language: None,
            }]
        );
    }

    #[test]
    fn test_non_utf8_always_fails() {
        let err = load_bytes(&[0x66, 0xff, 0xfe], SourceKind::Text, &LoadOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn test_empty_source() {
        assert!(load_str("  \n", SourceKind::Json).unwrap().is_empty());
    }

    #[test]
    fn test_bom_is_skipped() {
        let doc = load_bytes("\u{feff}hello".as_bytes(), SourceKind::Text, &LoadOptions::default())
            .unwrap();
        assert_eq!(doc.plain_text(), "hello");
    }
}
