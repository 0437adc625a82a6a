//! Layout instructions handed to binary encoders.
//!
//! The flow and paginated renderers do no pixel layout of their own. They
//! translate sections into an ordered list of [`Instruction`]s that a
//! [`BinaryEncoder`](super::encoder::BinaryEncoder) turns into bytes.

use super::inline::TextRun;
use super::options::{FitBox, Margins};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which layout model the instructions target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutTarget {
    /// Reflowable word-processor document
    Flow,
    /// Fixed pages
    Paginated,
}

/// Physical page description for paginated output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSetup {
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Margins in points
    pub margins: Margins,
}

impl PageSetup {
    /// Printable width inside the margins.
    pub fn content_width(&self) -> f32 {
        (self.width - self.margins.left - self.margins.right).max(0.0)
    }

    /// Printable height inside the margins.
    pub fn content_height(&self) -> f32 {
        (self.height - self.margins.top - self.margins.bottom).max(0.0)
    }
}

/// Paragraph role, mapped by the encoder to a named style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParagraphStyle {
    /// Normal body text
    Body,
    /// Document title
    Title,
    /// Block quote
    Quote,
    /// Figure or table caption
    Caption,
}

/// One layout step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    /// Heading at a clamped level
    Heading {
        /// Level 1..=6
        level: u8,
        /// Styled text
        runs: Vec<TextRun>,
        /// The runs serialized for the target, see [`Instruction::markup`]
        #[serde(default, skip_serializing_if = "String::is_empty")]
        markup: String,
        /// Font size in points (paginated only)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        font_size: Option<f32>,
    },
    /// Paragraph of styled text
    Paragraph {
        /// Paragraph role
        style: ParagraphStyle,
        /// Styled text
        runs: Vec<TextRun>,
        /// The runs serialized for the target
        #[serde(default, skip_serializing_if = "String::is_empty")]
        markup: String,
    },
    /// List item
    ListItem {
        /// Numbered when true
        ordered: bool,
        /// 1-based position within its list
        number: usize,
        /// Styled text
        runs: Vec<TextRun>,
        /// The runs serialized for the target
        #[serde(default, skip_serializing_if = "String::is_empty")]
        markup: String,
    },
    /// Verbatim code
    CodeBlock {
        /// Language hint
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        /// Code text
        text: String,
    },
    /// Table with header row
    Table {
        /// Header cells
        headers: Vec<Vec<TextRun>>,
        /// Body rows, padded to the column count
        rows: Vec<Vec<Vec<TextRun>>>,
        /// Column widths in points (paginated only)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column_widths: Option<Vec<f32>>,
    },
    /// Image scaled into a fit box
    Image {
        /// Image path or URL
        src: String,
        /// Alternative text
        alt: String,
        /// Bounding box
        fit: FitBox,
    },
    /// Verbatim math
    Math {
        /// Expression source
        text: String,
    },
    /// Vertical space (paginated only)
    Spacer {
        /// Height in points
        height: f32,
    },
    /// Forced page break
    PageBreak,
    /// Non-rendering note, used for placeholders
    Comment {
        /// Note text
        text: String,
    },
}

impl Instruction {
    /// Text runs already serialized for the encoder: WordprocessingML
    /// `<w:r>` elements for flow output, escaped string-literal text for
    /// paginated output. Empty for instructions without runs.
    pub fn markup(&self) -> &str {
        match self {
            Instruction::Heading { markup, .. }
            | Instruction::Paragraph { markup, .. }
            | Instruction::ListItem { markup, .. } => markup,
            _ => "",
        }
    }

    /// Concatenated visible text of this instruction.
    pub fn text(&self) -> String {
        fn join(runs: &[TextRun]) -> String {
            runs.iter().map(|r| r.text.as_str()).collect()
        }
        match self {
            Instruction::Heading { runs, .. }
            | Instruction::Paragraph { runs, .. }
            | Instruction::ListItem { runs, .. } => join(runs),
            Instruction::CodeBlock { text, .. } | Instruction::Math { text } => text.clone(),
            Instruction::Table { headers, rows, .. } => {
                let mut lines = vec![headers.iter().map(|c| join(c)).collect::<Vec<_>>().join(" | ")];
                for row in rows {
                    lines.push(row.iter().map(|c| join(c)).collect::<Vec<_>>().join(" | "));
                }
                lines.join("\n")
            }
            Instruction::Image { alt, .. } => alt.clone(),
            Instruction::Spacer { .. } | Instruction::PageBreak | Instruction::Comment { .. } => {
                String::new()
            }
        }
    }
}

/// An ordered instruction list plus document-level properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionDocument {
    /// Layout model
    pub target: LayoutTarget,
    /// Page description (paginated only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<PageSetup>,
    /// Document properties (title, author, subject, keywords, generator)
    pub properties: BTreeMap<String, String>,
    /// Layout steps in reading order
    pub instructions: Vec<Instruction>,
}

impl InstructionDocument {
    /// Create an empty instruction document.
    pub fn new(target: LayoutTarget) -> Self {
        Self {
            target,
            page: None,
            properties: BTreeMap::new(),
            instructions: Vec::new(),
        }
    }

    /// Append an instruction.
    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Check if there are no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}
