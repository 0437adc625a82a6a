//! Flow layout (DOCX) rendering.
//!
//! Sections become an ordered [`Instruction`] list. The paginated renderer
//! reuses [`Layout::translate`] with a page attached.

use crate::error::{Error, Result};
use crate::format::ExportFormat;
use crate::model::{clamp_level, Document, Section, TableData};

use super::inline::{self, FormatTarget, TextRun};
use super::instruction::{Instruction, InstructionDocument, LayoutTarget, PageSetup, ParagraphStyle};
use super::options::FitBox;
use super::{RenderOptions, RenderOutput, RenderStats, RenderedArtifact, Renderer, SectionWarning};

/// Layout parameters shared by the instruction renderers.
pub(super) struct Layout {
    pub(super) page: Option<PageSetup>,
    pub(super) image_fit: FitBox,
    /// Grammar the run markup is written in
    pub(super) markup: Option<FormatTarget>,
}

impl Layout {
    fn markup(&self, content: &str) -> String {
        self.markup
            .map(|target| inline::format(content, target))
            .unwrap_or_default()
    }

    fn paragraph(&self, style: ParagraphStyle, content: &str) -> Instruction {
        Instruction::Paragraph {
            style,
            runs: inline::runs(content),
            markup: self.markup(content),
        }
    }

    /// Translate one section into instructions.
    pub(super) fn translate(&self, section: &Section) -> Result<Vec<Instruction>> {
        let mut out = Vec::new();
        match section {
            Section::Title { content } => out.push(self.paragraph(ParagraphStyle::Title, content)),
            Section::Heading { content, level } => {
                let level = clamp_level(*level);
                out.push(Instruction::Heading {
                    level,
                    runs: inline::runs(content),
                    markup: self.markup(content),
                    font_size: self.page.map(|_| heading_font_size(level)),
                });
            }
            Section::Paragraph { content } => out.push(self.paragraph(ParagraphStyle::Body, content)),
            Section::Quote { content } => out.push(self.paragraph(ParagraphStyle::Quote, content)),
            Section::CodeBlock { content, language } => out.push(Instruction::CodeBlock {
                language: language.clone(),
                text: content.clone(),
            }),
            Section::Math { content } => out.push(Instruction::Math {
                text: content.clone(),
            }),
            Section::List { items, ordered } => {
                out.extend(items.iter().enumerate().map(|(i, item)| Instruction::ListItem {
                    ordered: *ordered,
                    number: i + 1,
                    runs: inline::runs(item),
                    markup: self.markup(item),
                }));
            }
            Section::Table { data, caption } => {
                if let Some(table) = data.as_ref().and_then(|d| self.table(d)) {
                    out.push(table);
                    if let Some(caption) = caption {
                        out.push(self.paragraph(ParagraphStyle::Caption, caption));
                    }
                }
            }
            Section::Image { src, alt, caption } => {
                let src = src.trim();
                if src.is_empty() {
                    return Err(Error::unsupported_section("image", "missing image source"));
                }
                out.push(Instruction::Image {
                    src: src.to_string(),
                    alt: alt.as_deref().map(inline::plain_text).unwrap_or_default(),
                    fit: self.image_fit(),
                });
                if let Some(caption) = caption {
                    out.push(self.paragraph(ParagraphStyle::Caption, caption));
                }
            }
            Section::PageBreak {} => out.push(Instruction::PageBreak),
            Section::Unknown { kind, .. } => {
                return Err(Error::unsupported_section(kind.as_str(), "unknown or malformed section"));
            }
        }
        Ok(out)
    }

    fn table(&self, data: &TableData) -> Option<Instruction> {
        let (headers, rows) = data.parts()?;
        let columns = data.column_count();
        if columns == 0 {
            return None;
        }
        let row_runs = |row: &[String]| -> Vec<Vec<TextRun>> {
            (0..columns)
                .map(|c| inline::runs(TableData::cell(row, c)))
                .collect()
        };
        let column_widths = self
            .page
            .map(|page| vec![page.content_width() / columns as f32; columns]);

        Some(Instruction::Table {
            headers: row_runs(headers),
            rows: rows.iter().map(|r| row_runs(r)).collect(),
            column_widths,
        })
    }

    /// Images never exceed the printable area of the page.
    fn image_fit(&self) -> FitBox {
        match self.page {
            Some(page) => FitBox::new(
                self.image_fit.max_width.min(page.content_width()),
                self.image_fit.max_height.min(page.content_height()),
            ),
            None => self.image_fit,
        }
    }

    /// Run the per-section loop, isolating failures into placeholders.
    pub(super) fn render_into(
        &self,
        target: &mut InstructionDocument,
        doc: &Document,
        mut after_block: impl FnMut(&mut InstructionDocument, &Section),
    ) -> (Vec<SectionWarning>, RenderStats) {
        let mut warnings = Vec::new();
        let mut stats = RenderStats::new();

        for (index, section) in doc.sections.iter().enumerate() {
            stats.add_section(section);
            match self.translate(section) {
                Ok(instructions) if instructions.is_empty() => {}
                Ok(instructions) => {
                    target.instructions.extend(instructions);
                    after_block(target, section);
                }
                Err(err) => {
                    warnings.push(SectionWarning::record(index, section, &err));
                    stats.add_placeholder();
                    target.push(Instruction::Comment {
                        text: format!("unsupported section: {}", section.kind()),
                    });
                }
            }
        }
        (warnings, stats)
    }
}

/// Font size in points for a heading level.
pub(super) fn heading_font_size(level: u8) -> f32 {
    match level {
        1 => 24.0,
        2 => 20.0,
        3 => 16.0,
        4 => 14.0,
        5 => 12.0,
        _ => 11.0,
    }
}

/// Copy the metadata the encoder writes into document properties.
pub(super) fn document_properties(target: &mut InstructionDocument, doc: &Document, options: &RenderOptions) {
    let meta = &doc.metadata;
    let props = &mut target.properties;
    if let Some(title) = doc.title() {
        props.insert("title".into(), title);
    }
    if let Some(author) = meta.author() {
        props.insert("author".into(), author);
    }
    if let Some(subject) = meta.subject() {
        props.insert("subject".into(), subject);
    }
    let keywords = meta.keywords();
    if !keywords.is_empty() {
        props.insert("keywords".into(), keywords.join(", "));
    }
    if let Some(date) = meta.date() {
        props.insert("date".into(), date);
    }
    props.insert("language".into(), meta.language());
    props.insert("generator".into(), options.generator.clone());
}

/// Flow (word-processor) renderer.
pub struct FlowRenderer {
    options: RenderOptions,
}

impl FlowRenderer {
    /// Create a new flow renderer.
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }
}

impl Renderer for FlowRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Docx
    }

    fn render(&self, doc: &Document) -> Result<RenderOutput> {
        let layout = Layout {
            page: None,
            image_fit: self.options.image_fit,
            markup: self.format().format_target(),
        };
        let mut target = InstructionDocument::new(LayoutTarget::Flow);
        document_properties(&mut target, doc, &self.options);
        let (warnings, stats) = layout.render_into(&mut target, doc, |_, _| {});

        Ok(RenderOutput::new(
            RenderedArtifact::Instructions(target),
            warnings,
            stats,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metadata;

    fn render(doc: &Document) -> RenderOutput {
        FlowRenderer::new(RenderOptions::default()).render(doc).unwrap()
    }

    #[test]
    fn test_flow_instructions_in_order() {
        let doc = Document::with_sections(vec![
            Section::title("Report"),
            Section::heading("Intro", 9),
            Section::paragraph("Some **bold** text"),
            Section::list(["a", "b"], true),
        ]);
        let output = render(&doc);
        let instructions = &output.artifact.as_instructions().unwrap().instructions;

        assert_eq!(instructions.len(), 5);
        assert!(matches!(
            instructions[0],
            Instruction::Paragraph {
                style: ParagraphStyle::Title,
                ..
            }
        ));
        assert!(matches!(
            instructions[1],
            Instruction::Heading {
                level: 6,
                font_size: None,
                ..
            }
        ));
        match &instructions[2] {
            Instruction::Paragraph { runs, .. } => {
                assert_eq!(runs.len(), 3);
                assert!(runs[1].bold);
                assert_eq!(runs[1].text, "bold");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(instructions[4], Instruction::ListItem { number: 2, .. }));
    }

    #[test]
    fn test_flow_properties() {
        let doc = Document::new().with_metadata(
            Metadata::new()
                .with("title", "T")
                .with("author", "A")
                .with("keywords", vec!["x".to_string(), "y".to_string()]),
        );
        let output = render(&doc);
        let props = &output.artifact.as_instructions().unwrap().properties;
        assert_eq!(props["title"], "T");
        assert_eq!(props["author"], "A");
        assert_eq!(props["keywords"], "x, y");
        assert_eq!(props["language"], "en");
    }

    #[test]
    fn test_flow_table_padded_without_widths() {
        let doc = Document::with_sections(vec![Section::table(
            vec!["a".into(), "b".into()],
            vec![vec!["1".into()]],
        )]);
        let output = render(&doc);
        match &output.artifact.as_instructions().unwrap().instructions[0] {
            Instruction::Table {
                rows,
                column_widths,
                ..
            } => {
                assert_eq!(rows[0].len(), 2);
                assert!(rows[0][1].is_empty());
                assert!(column_widths.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_flow_placeholder_comment() {
        let doc = Document::with_sections(vec![Section::Unknown {
            kind: "chart".into(),
            raw: serde_json::Value::Null,
        }]);
        let output = render(&doc);
        assert_eq!(
            output.artifact.as_instructions().unwrap().instructions,
            vec![Instruction::Comment {
                text: "unsupported section: chart".into()
            }]
        );
        assert_eq!(output.warnings[0].kind, "chart");
    }

    #[test]
    fn test_flow_markup_is_wordprocessing_runs() {
        let doc = Document::with_sections(vec![
            Section::paragraph("Some **bold** <text>"),
            Section::list(["*it*"], false),
        ]);
        let output = render(&doc);
        let instructions = &output.artifact.as_instructions().unwrap().instructions;

        let markup = instructions[0].markup();
        assert!(markup.starts_with("<w:r><w:t xml:space=\"preserve\">Some </w:t></w:r>"));
        assert!(markup.contains("<w:rPr><w:b/></w:rPr><w:t xml:space=\"preserve\">bold</w:t>"));
        assert!(markup.contains("&lt;text&gt;"));
        assert!(instructions[1].markup().contains("<w:i/>"));
    }

    #[test]
    fn test_heading_font_sizes_decrease() {
        let sizes: Vec<f32> = (1..=6).map(heading_font_size).collect();
        assert!(sizes.windows(2).all(|w| w[0] > w[1]));
    }
}
