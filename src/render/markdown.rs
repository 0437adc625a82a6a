//! Markdown rendering.

use crate::error::{Error, Result};
use crate::format::ExportFormat;
use crate::model::{clamp_level, Document, Section, TableData};

use super::inline::{self, escape, FormatTarget};
use super::{RenderOptions, RenderOutput, RenderStats, RenderedArtifact, Renderer, SectionWarning};

const TARGET: FormatTarget = FormatTarget::Markdown;

/// Convert a document to Markdown.
pub fn to_markdown(doc: &Document, options: &RenderOptions) -> Result<String> {
    let output = MarkdownRenderer::new(options.clone()).render(doc)?;
    match output.artifact {
        RenderedArtifact::Text(markdown) => Ok(markdown),
        RenderedArtifact::Instructions(_) => Err(Error::Render("unexpected artifact".into())),
    }
}

/// Markdown renderer.
pub struct MarkdownRenderer {
    options: RenderOptions,
}

impl MarkdownRenderer {
    /// Create a new Markdown renderer.
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    fn render_section(&self, output: &mut String, section: &Section) -> Result<()> {
        match section {
            Section::Title { content } => {
                output.push_str("# ");
                output.push_str(&inline_line(content));
            }
            Section::Heading { content, level } => {
                output.push_str(&"#".repeat(clamp_level(*level) as usize));
                output.push(' ');
                output.push_str(&inline_line(content));
            }
            Section::Paragraph { content } => {
                let formatted = inline::format(content, TARGET);
                // A blank line would end the paragraph early.
                let lines: Vec<String> = formatted
                    .lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(guard_line_start)
                    .collect();
                output.push_str(&lines.join("\n"));
            }
            Section::Quote { content } => {
                let quoted = inline::format(content, TARGET);
                let lines: Vec<String> = quoted
                    .lines()
                    .map(|line| {
                        if line.trim().is_empty() {
                            ">".to_string()
                        } else {
                            format!("> {}", guard_line_start(line))
                        }
                    })
                    .collect();
                output.push_str(&lines.join("\n"));
            }
            Section::CodeBlock { content, language } => {
                let fence = code_fence(content);
                output.push_str(&fence);
                if let Some(lang) = language {
                    output.push_str(lang.trim());
                }
                output.push('\n');
                output.push_str(content);
                if !content.ends_with('\n') {
                    output.push('\n');
                }
                output.push_str(&fence);
            }
            Section::Math { content } => {
                output.push_str("$$\n");
                output.push_str(content.trim_end());
                output.push_str("\n$$");
            }
            Section::List { items, ordered } => {
                let lines: Vec<String> = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let text = inline_line(item);
                        if *ordered {
                            format!("{}. {}", i + 1, text)
                        } else {
                            format!("{} {}", self.options.list_marker, text)
                        }
                    })
                    .collect();
                output.push_str(&lines.join("\n"));
            }
            Section::Table { data, caption } => {
                if let Some(data) = data {
                    self.render_table(output, data, caption.as_deref());
                }
            }
            Section::Image { src, alt, caption } => {
                let src = src.trim();
                if src.is_empty() {
                    return Err(Error::unsupported_section("image", "missing image source"));
                }
                output.push_str(&format!(
                    "![{}]({})",
                    escape(alt.as_deref().unwrap_or(""), TARGET),
                    link_destination(src)
                ));
                if let Some(caption) = caption {
                    output.push_str(&format!("\n_{}_", single_line(&inline::format(caption, TARGET))));
                }
            }
            Section::PageBreak {} => output.push_str("<!-- pagebreak -->"),
            Section::Unknown { kind, .. } => {
                return Err(Error::unsupported_section(kind.as_str(), "unknown or malformed section"));
            }
        }
        Ok(())
    }

    fn render_table(&self, output: &mut String, data: &TableData, caption: Option<&str>) {
        let Some((headers, rows)) = data.parts() else {
            return;
        };
        let columns = data.column_count();
        if columns == 0 {
            return;
        }

        let cell = |row: &[String], col: usize| {
            single_line(&inline::format_table_cell(TableData::cell(row, col)))
        };
        let mut lines = Vec::with_capacity(rows.len() + 3);

        let header: Vec<String> = (0..columns).map(|c| cell(headers, c)).collect();
        lines.push(format!("| {} |", header.join(" | ")));
        lines.push(format!("|{}", " --- |".repeat(columns)));
        for row in rows {
            let cells: Vec<String> = (0..columns).map(|c| cell(row, c)).collect();
            lines.push(format!("| {} |", cells.join(" | ")));
        }
        if let Some(caption) = caption {
            lines.push(String::new());
            lines.push(format!("_{}_", single_line(&inline::format(caption, TARGET))));
        }

        output.push_str(&lines.join("\n"));
    }
}

impl Renderer for MarkdownRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Markdown
    }

    fn render(&self, doc: &Document) -> Result<RenderOutput> {
        let mut blocks = Vec::with_capacity(doc.sections.len());
        let mut warnings = Vec::new();
        let mut stats = RenderStats::new();

        for (index, section) in doc.sections.iter().enumerate() {
            stats.add_section(section);
            let mut block = String::new();
            match self.render_section(&mut block, section) {
                Ok(()) if block.is_empty() => {}
                Ok(()) => blocks.push(block),
                Err(err) => {
                    warnings.push(SectionWarning::record(index, section, &err));
                    stats.add_placeholder();
                    blocks.push(format!(
                        "<!-- unsupported section: {} -->",
                        section.kind().replace("--", "")
                    ));
                }
            }
        }

        let mut output = String::new();
        if self.options.include_frontmatter && !doc.metadata.is_empty() {
            output.push_str(&doc.metadata.to_yaml_frontmatter());
            if !blocks.is_empty() {
                output.push('\n');
            }
        }
        output.push_str(&blocks.join("\n\n"));
        if !blocks.is_empty() {
            output.push('\n');
        }

        Ok(RenderOutput::new(RenderedArtifact::Text(output), warnings, stats))
    }
}

/// A fence longer than any backtick run inside the code.
fn code_fence(code: &str) -> String {
    let mut longest = 0;
    let mut current = 0;
    for c in code.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

/// Inline text that has to stay on a single line: headings and list items.
fn inline_line(text: &str) -> String {
    guard_line_start(&single_line(&inline::format(text, TARGET)))
}

/// Escape what would open a new block at the start of a line, so free text
/// cannot turn into a heading, quote, list, thematic break or fence.
fn guard_line_start(line: &str) -> String {
    let line = line.trim_start();
    let bytes = line.as_bytes();
    match bytes.first() {
        Some(b'#' | b'>' | b'-' | b'+' | b'=' | b'~') => format!("\\{}", line),
        Some(b'0'..=b'9') => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            if matches!(bytes.get(digits), Some(b'.' | b')')) {
                format!("{}\\{}", &line[..digits], &line[digits..])
            } else {
                line.to_string()
            }
        }
        _ => line.to_string(),
    }
}

/// Headings, list items and table cells must stay on one line.
fn single_line(text: &str) -> String {
    if text.contains(['\n', '\r']) {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        text.to_string()
    }
}

fn link_destination(src: &str) -> String {
    if src.contains([' ', '(', ')', '<', '>']) {
        format!("<{}>", src.replace('<', "%3C").replace('>', "%3E"))
    } else {
        src.to_string()
    }
}
