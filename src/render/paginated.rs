//! Paginated layout (PDF) rendering.
//!
//! Same instruction vocabulary as the flow renderer, plus a page setup,
//! explicit heading sizes, column widths and vertical spacing between blocks.

use crate::error::Result;
use crate::format::ExportFormat;
use crate::model::{Document, Section};

use super::flow::{document_properties, Layout};
use super::instruction::{Instruction, InstructionDocument, LayoutTarget, PageSetup};
use super::{RenderOptions, RenderOutput, RenderedArtifact, Renderer};

/// Space after a block, in points.
fn block_spacing(section: &Section) -> Option<f32> {
    match section {
        Section::Title { .. } => Some(18.0),
        Section::Heading { .. } => Some(8.0),
        Section::PageBreak {} => None,
        _ => Some(12.0),
    }
}

/// Paginated renderer.
pub struct PaginatedRenderer {
    options: RenderOptions,
}

impl PaginatedRenderer {
    /// Create a new paginated renderer.
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    fn page_setup(&self) -> PageSetup {
        let (width, height) = self.options.page_size.dimensions();
        PageSetup {
            width,
            height,
            margins: self.options.margins,
        }
    }
}

impl Renderer for PaginatedRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pdf
    }

    fn render(&self, doc: &Document) -> Result<RenderOutput> {
        let page = self.page_setup();
        let layout = Layout {
            page: Some(page),
            image_fit: self.options.image_fit,
            markup: self.format().format_target(),
        };

        let mut target = InstructionDocument::new(LayoutTarget::Paginated);
        target.page = Some(page);
        document_properties(&mut target, doc, &self.options);

        let (warnings, stats) = layout.render_into(&mut target, doc, |target, section| {
            if let Some(height) = block_spacing(section) {
                target.push(Instruction::Spacer { height });
            }
        });
        // No trailing space at the end of the document.
        if matches!(target.instructions.last(), Some(Instruction::Spacer { .. })) {
            target.instructions.pop();
        }

        Ok(RenderOutput::new(
            RenderedArtifact::Instructions(target),
            warnings,
            stats,
        ))
    }
}
