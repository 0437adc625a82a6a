//! Rendering module for converting documents to the supported output formats.
//!
//! Text formats (HTML, Markdown, JSON) render straight to a string. DOCX and
//! PDF render to an [`InstructionDocument`] that a
//! [`BinaryEncoder`](encoder::BinaryEncoder) turns into bytes.

pub mod encoder;
mod flow;
mod html;
pub mod inline;
pub mod instruction;
mod json;
mod markdown;
mod options;
mod paginated;
mod result;

pub use encoder::{BinaryEncoder, EncoderRegistry, InstructionDumpEncoder};
pub use flow::FlowRenderer;
pub use html::{to_html, HtmlRenderer};
pub use inline::FormatTarget;
pub use instruction::{Instruction, InstructionDocument, LayoutTarget};
pub use json::{to_json, JsonFormat, JsonRenderer};
pub use markdown::{to_markdown, MarkdownRenderer};
pub use options::{FitBox, Margins, PageSize, RenderOptions};
pub use paginated::PaginatedRenderer;
pub use result::{RenderOutput, RenderStats, RenderedArtifact, SectionWarning};

use crate::error::Result;
use crate::format::ExportFormat;
use crate::model::Document;

/// Renders a whole document into one output format.
///
/// A section that cannot be rendered never fails the document: it is
/// replaced by a placeholder and reported in [`RenderOutput::warnings`].
pub trait Renderer: Send + Sync {
    /// Format this renderer produces.
    fn format(&self) -> ExportFormat;

    /// Render the document.
    fn render(&self, doc: &Document) -> Result<RenderOutput>;
}

/// Create the renderer for a format.
pub fn renderer_for(format: ExportFormat, options: &RenderOptions) -> Box<dyn Renderer> {
    let options = options.clone();
    match format {
        ExportFormat::Html => Box::new(HtmlRenderer::new(options)),
        ExportFormat::Markdown => Box::new(MarkdownRenderer::new(options)),
        ExportFormat::Docx => Box::new(FlowRenderer::new(options)),
        ExportFormat::Pdf => Box::new(PaginatedRenderer::new(options)),
        ExportFormat::Json => Box::new(JsonRenderer::new(options.json_format)),
    }
}

/// Render a document into one format.
pub fn render(doc: &Document, format: ExportFormat, options: &RenderOptions) -> Result<RenderOutput> {
    renderer_for(format, options).render(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Section;

    #[test]
    fn test_renderer_for_every_format() {
        let options = RenderOptions::default();
        for format in ExportFormat::ALL {
            assert_eq!(renderer_for(format, &options).format(), format);
        }
    }

    #[test]
    fn test_artifact_kind_matches_format() {
        let doc = Document::with_sections(vec![Section::paragraph("x")]);
        let options = RenderOptions::default();
        for format in ExportFormat::ALL {
            let output = render(&doc, format, &options).unwrap();
            assert_eq!(output.text().is_none(), format.is_binary(), "{}", format);
        }
    }
}
