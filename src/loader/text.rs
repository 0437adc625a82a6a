//! Plain text input.

use crate::model::{Document, Section};

/// Blank-line separated blocks become paragraphs.
pub(super) fn parse(source: &str) -> Document {
    let mut sections = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in source.lines() {
        if line.trim().is_empty() {
            if !block.is_empty() {
                sections.push(Section::paragraph(block.join("\n")));
                block.clear();
            }
        } else {
            block.push(line.trim_end());
        }
    }
    if !block.is_empty() {
        sections.push(Section::paragraph(block.join("\n")));
    }

    Document::with_sections(sections)
}
