//! JSON rendering of the document model.

use crate::error::{Error, Result};
use crate::format::ExportFormat;
use crate::model::Document;

use super::{RenderOutput, RenderStats, RenderedArtifact, Renderer};

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Convert a document to JSON.
pub fn to_json(doc: &Document, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(doc),
        JsonFormat::Compact => serde_json::to_string(doc),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

/// Renders the document model itself; the output loads back unchanged.
pub struct JsonRenderer {
    format: JsonFormat,
}

impl JsonRenderer {
    /// Create a new JSON renderer.
    pub fn new(format: JsonFormat) -> Self {
        Self { format }
    }
}

impl Renderer for JsonRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn render(&self, doc: &Document) -> Result<RenderOutput> {
        let mut stats = RenderStats::new();
        doc.sections.iter().for_each(|s| stats.add_section(s));

        let mut json = to_json(doc, self.format)?;
        json.push('\n');
        Ok(RenderOutput::new(RenderedArtifact::Text(json), Vec::new(), stats))
    }
}
