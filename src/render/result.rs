//! Rendering result with artifact, section warnings and statistics.

use super::instruction::InstructionDocument;
use crate::error::{Error, ErrorKind};
use crate::model::Section;
use serde::Serialize;

/// What a renderer produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum RenderedArtifact {
    /// Complete serialized output (HTML, Markdown, JSON)
    Text(String),
    /// Instruction list for a binary encoder (DOCX, PDF)
    Instructions(InstructionDocument),
}

impl RenderedArtifact {
    /// Serialized text, if this is a text artifact.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RenderedArtifact::Text(s) => Some(s),
            RenderedArtifact::Instructions(_) => None,
        }
    }

    /// Instruction list, if this is an instruction artifact.
    pub fn as_instructions(&self) -> Option<&InstructionDocument> {
        match self {
            RenderedArtifact::Instructions(doc) => Some(doc),
            RenderedArtifact::Text(_) => None,
        }
    }
}

/// A section that could not be rendered and was replaced by a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionWarning {
    /// Index of the section in the document
    pub index: usize,
    /// Section type tag
    pub kind: String,
    /// Error category
    pub error_kind: ErrorKind,
    /// Human-readable reason
    pub message: String,
}

impl SectionWarning {
    /// Record a section failure and log it.
    pub(crate) fn record(index: usize, section: &Section, err: &Error) -> Self {
        log::warn!(
            "Section {} ('{}') replaced by placeholder: {}",
            index,
            section.kind(),
            err
        );
        Self {
            index,
            kind: section.kind().to_string(),
            error_kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for SectionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "section {} ({}): {}", self.index, self.kind, self.message)
    }
}

/// Result of rendering a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderOutput {
    /// The rendered artifact
    pub artifact: RenderedArtifact,

    /// Sections replaced by placeholders
    pub warnings: Vec<SectionWarning>,

    /// Rendering statistics
    pub stats: RenderStats,
}

impl RenderOutput {
    /// Create a new render output.
    pub fn new(artifact: RenderedArtifact, warnings: Vec<SectionWarning>, stats: RenderStats) -> Self {
        Self {
            artifact,
            warnings,
            stats,
        }
    }

    /// Serialized text, if this is a text artifact.
    pub fn text(&self) -> Option<&str> {
        self.artifact.as_text()
    }
}

/// Statistics collected while rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderStats {
    /// Number of sections visited
    pub section_count: u32,

    /// Number of headings (including the title)
    pub heading_count: u32,

    /// Number of paragraphs and quotes
    pub paragraph_count: u32,

    /// Number of list items
    pub list_item_count: u32,

    /// Number of tables rendered
    pub table_count: u32,

    /// Number of images
    pub image_count: u32,

    /// Number of code and math blocks
    pub code_block_count: u32,

    /// Number of sections replaced by placeholders
    pub placeholder_count: u32,

    /// Approximate word count of the document text
    pub word_count: u32,
}

impl RenderStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one section by type.
    pub fn add_section(&mut self, section: &Section) {
        self.section_count += 1;
        match section {
            Section::Title { .. } | Section::Heading { .. } => self.heading_count += 1,
            Section::Paragraph { .. } | Section::Quote { .. } => self.paragraph_count += 1,
            Section::List { items, .. } => self.list_item_count += items.len() as u32,
            Section::Table { .. } => self.table_count += 1,
            Section::Image { .. } => self.image_count += 1,
            Section::CodeBlock { .. } | Section::Math { .. } => self.code_block_count += 1,
            Section::PageBreak {} | Section::Unknown { .. } => {}
        }
        self.word_count += section.plain_text().split_whitespace().count() as u32;
    }

    /// Count one placeholder.
    pub fn add_placeholder(&mut self) {
        self.placeholder_count += 1;
    }
}
