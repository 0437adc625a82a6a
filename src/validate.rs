//! Document checks run before export.
//!
//! Rendering never fails on the issues reported here; the validator tells the
//! caller what will be clamped, padded, or replaced by a placeholder.

use crate::model::{clamp_level, Document, Section};
use crate::render::inline;
use serde::Serialize;
use std::sync::Arc;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// One finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Name of the rule that produced it
    pub rule: String,
    pub severity: Severity,
    /// Section index, absent for document-level findings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(rule: &str, severity: Severity, section: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            severity,
            section,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.section {
            Some(index) => write!(f, "{} [{}] section {}: {}", self.severity, self.rule, index, self.message),
            None => write!(f, "{} [{}]: {}", self.severity, self.rule, self.message),
        }
    }
}

/// A document check.
pub trait ValidationRule: Send + Sync {
    /// Rule name, reported on every diagnostic.
    fn name(&self) -> &str;

    /// Inspect the document. Must be deterministic.
    fn check(&self, doc: &Document) -> Vec<Diagnostic>;
}

/// Unbalanced `**`, `*` or `` ` `` in inline text.
pub struct DelimiterBalance;

impl ValidationRule for DelimiterBalance {
    fn name(&self) -> &str {
        "delimiter-balance"
    }

    fn check(&self, doc: &Document) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for (index, section) in doc.sections.iter().enumerate() {
            let texts: Vec<&str> = match section {
                Section::Title { content }
                | Section::Heading { content, .. }
                | Section::Paragraph { content }
                | Section::Quote { content } => vec![content.as_str()],
                Section::List { items, .. } => items.iter().map(String::as_str).collect(),
                _ => continue,
            };
            for warning in texts.into_iter().flat_map(inline::check_delimiters) {
                out.push(Diagnostic::new(
                    self.name(),
                    Severity::Warning,
                    Some(index),
                    format!("{}; it will be rendered literally", warning),
                ));
            }
        }
        out
    }
}

/// Heading levels outside 1..=6, and skipped levels.
pub struct HeadingRange;

impl ValidationRule for HeadingRange {
    fn name(&self) -> &str {
        "heading-range"
    }

    fn check(&self, doc: &Document) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        let mut previous: Option<u8> = None;
        for (index, section) in doc.sections.iter().enumerate() {
            let Section::Heading { level, .. } = section else {
                continue;
            };
            let clamped = clamp_level(*level);
            if i64::from(clamped) != *level {
                out.push(Diagnostic::new(
                    self.name(),
                    Severity::Warning,
                    Some(index),
                    format!("heading level {} will be clamped to {}", level, clamped),
                ));
            }
            if let Some(prev) = previous {
                if clamped > prev + 1 {
                    out.push(Diagnostic::new(
                        self.name(),
                        Severity::Info,
                        Some(index),
                        format!("heading level jumps from {} to {}", prev, clamped),
                    ));
                }
            }
            previous = Some(clamped);
        }
        out
    }
}

/// Table rows whose width differs from the header.
pub struct RaggedTables;

impl ValidationRule for RaggedTables {
    fn name(&self) -> &str {
        "ragged-table"
    }

    fn check(&self, doc: &Document) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for (index, section) in doc.sections.iter().enumerate() {
            let Section::Table { data: Some(data), .. } = section else {
                continue;
            };
            let Some((headers, rows)) = data.parts() else {
                continue;
            };
            let width = data.column_count();
            let ragged = rows.iter().filter(|row| row.len() != width).count();
            if ragged > 0 {
                out.push(Diagnostic::new(
                    self.name(),
                    Severity::Warning,
                    Some(index),
                    format!(
                        "{} of {} rows differ from the table width of {} columns ({} headers)",
                        ragged,
                        rows.len(),
                        width,
                        headers.len()
                    ),
                ));
            }
        }
        out
    }
}

/// Images without alternative text or source.
pub struct ImageAltText;

impl ValidationRule for ImageAltText {
    fn name(&self) -> &str {
        "image-alt"
    }

    fn check(&self, doc: &Document) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for (index, section) in doc.sections.iter().enumerate() {
            let Section::Image { src, alt, .. } = section else {
                continue;
            };
            if src.trim().is_empty() {
                out.push(Diagnostic::new(
                    self.name(),
                    Severity::Error,
                    Some(index),
                    "image has no source",
                ));
            }
            if alt.as_deref().map_or(true, |a| a.trim().is_empty()) {
                out.push(Diagnostic::new(
                    self.name(),
                    Severity::Warning,
                    Some(index),
                    format!("image '{}' has no alt text", src),
                ));
            }
        }
        out
    }
}

/// Empty documents and sections no renderer understands.
pub struct DocumentShape;

impl ValidationRule for DocumentShape {
    fn name(&self) -> &str {
        "document-shape"
    }

    fn check(&self, doc: &Document) -> Vec<Diagnostic> {
        if doc.is_empty() {
            return vec![Diagnostic::new(
                self.name(),
                Severity::Warning,
                None,
                "document has no sections",
            )];
        }
        doc.sections
            .iter()
            .enumerate()
            .filter_map(|(index, section)| match section {
                Section::Unknown { kind, .. } => Some(Diagnostic::new(
                    self.name(),
                    Severity::Error,
                    Some(index),
                    format!("unsupported section '{}' will be replaced by a placeholder", kind),
                )),
                _ => None,
            })
            .collect()
    }
}

/// Findings of a validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    /// No error-level diagnostics.
    pub fn is_valid(&self) -> bool {
        !self.has(Severity::Error)
    }

    pub fn has(&self, severity: Severity) -> bool {
        self.diagnostics.iter().any(|d| d.severity == severity)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Runs a set of rules in registration order.
#[derive(Clone, Default)]
pub struct Validator {
    rules: Vec<Arc<dyn ValidationRule>>,
}

impl Validator {
    /// Validator without rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validator with the built-in rules.
    pub fn with_defaults() -> Self {
        Self::new()
            .add_rule(Arc::new(DocumentShape))
            .add_rule(Arc::new(DelimiterBalance))
            .add_rule(Arc::new(HeadingRange))
            .add_rule(Arc::new(RaggedTables))
            .add_rule(Arc::new(ImageAltText))
    }

    /// Add a rule.
    pub fn add_rule(mut self, rule: Arc<dyn ValidationRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Names of the registered rules.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run every rule.
    pub fn validate(&self, doc: &Document) -> ValidationReport {
        let mut diagnostics: Vec<Diagnostic> = self.rules.iter().flat_map(|r| r.check(doc)).collect();
        // Stable: rule order is kept within a section.
        diagnostics.sort_by_key(|d| d.section.map_or(0, |i| i + 1));
        ValidationReport { diagnostics }
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("rules", &self.rule_names())
            .finish()
    }
}
