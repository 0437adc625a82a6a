//! Markdown input via `pulldown-cmark`.
//!
//! Block structure maps onto sections; emphasis, strong emphasis and code
//! spans are re-emitted in the restricted inline markup every renderer
//! understands. Links keep their text only.

use crate::error::Result;
use crate::model::{Document, Metadata, Section};
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

const PAGEBREAK_COMMENT: &str = "<!-- pagebreak -->";

/// Parse Markdown with optional YAML front matter.
pub(super) fn parse(source: &str) -> Result<Document> {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_MATH
        | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS;

    let mut builder = Builder::default();
    for event in Parser::new_ext(source, options) {
        builder.event(event);
    }
    builder.finish()
}

#[derive(Default)]
struct TableState {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    row: Vec<String>,
}

struct ImageState {
    src: String,
    title: String,
    alt: String,
}

#[derive(Default)]
struct Builder {
    sections: Vec<Section>,
    /// Inline text of the block being built
    text: String,
    front_matter: Option<String>,
    in_front_matter: bool,
    heading: Option<i64>,
    code: Option<(Option<String>, String)>,
    /// (ordered, items) of the outermost open list
    list: Option<(bool, Vec<String>)>,
    list_depth: usize,
    quote_depth: usize,
    quote_parts: Vec<String>,
    table: Option<TableState>,
    image: Option<ImageState>,
    /// An image that so far is the only content of its paragraph
    pending_image: Option<Section>,
}

impl Builder {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.push_text(&text),
            Event::Code(code) => {
                if code.contains('`') {
                    self.push_text(&code);
                } else {
                    self.push_text(&format!("`{}`", code));
                }
            }
            Event::InlineMath(math) => self.push_text(&math),
            Event::DisplayMath(math) => self.display_math(&math),
            Event::Html(html) | Event::InlineHtml(html) => {
                if html.trim().eq_ignore_ascii_case(PAGEBREAK_COMMENT) {
                    self.page_break();
                }
            }
            Event::SoftBreak => self.push_text(" "),
            Event::HardBreak => self.push_text("\n"),
            Event::Rule => self.page_break(),
            Event::TaskListMarker(checked) => self.push_text(if checked { "[x] " } else { "[ ] " }),
            Event::FootnoteReference(_) => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::MetadataBlock(_) => self.in_front_matter = true,
            Tag::Heading { level, .. } => self.heading = Some(heading_level(level)),
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .filter(|l| !l.is_empty())
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((language, String::new()));
            }
            Tag::List(start) => {
                if self.list_depth == 0 {
                    self.list = Some((start.is_some(), Vec::new()));
                } else {
                    // Nested lists are flattened into the outer one.
                    self.flush_item();
                }
                self.list_depth += 1;
            }
            Tag::Item => self.flush_item(),
            Tag::BlockQuote(_) => self.quote_depth += 1,
            Tag::Table(_) => self.table = Some(TableState::default()),
            Tag::Image {
                dest_url, title, ..
            } => {
                self.image = Some(ImageState {
                    src: dest_url.to_string(),
                    title: title.to_string(),
                    alt: String::new(),
                });
            }
            Tag::Emphasis => self.push_text("*"),
            Tag::Strong => self.push_text("**"),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::MetadataBlock(_) => self.in_front_matter = false,
            TagEnd::Paragraph => self.end_paragraph(),
            TagEnd::Heading(_) => {
                let level = self.heading.take().unwrap_or(1);
                let content = std::mem::take(&mut self.text).trim().to_string();
                if content.is_empty() {
                    return;
                }
                if self.in_container() {
                    self.text = content;
                    self.end_paragraph();
                } else if level == 1 && self.sections.is_empty() {
                    self.sections.push(Section::title(content));
                } else {
                    self.sections.push(Section::heading(content, level));
                }
            }
            TagEnd::CodeBlock => {
                let Some((language, mut content)) = self.code.take() else {
                    return;
                };
                if content.ends_with('\n') {
                    content.pop();
                }
                if self.in_container() {
                    self.text.push_str(&content);
                    self.end_paragraph();
                } else {
                    self.sections.push(Section::CodeBlock { content, language });
                }
            }
            TagEnd::Item => self.flush_item(),
            TagEnd::List(_) => {
                self.list_depth = self.list_depth.saturating_sub(1);
                if self.list_depth == 0 {
                    self.flush_item();
                    if let Some((ordered, items)) = self.list.take() {
                        if !items.is_empty() {
                            self.sections.push(Section::list(items, ordered));
                        }
                    }
                }
            }
            TagEnd::BlockQuote(_) => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
                if self.quote_depth == 0 && self.list_depth == 0 {
                    let content = std::mem::take(&mut self.quote_parts).join("\n");
                    if !content.is_empty() {
                        self.sections.push(Section::Quote { content });
                    }
                }
            }
            TagEnd::TableCell => {
                let cell = std::mem::take(&mut self.text).trim().to_string();
                if let Some(table) = &mut self.table {
                    table.row.push(cell);
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = &mut self.table {
                    table.headers = std::mem::take(&mut table.row);
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = &mut self.table {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.sections.push(Section::table(table.headers, table.rows));
                }
            }
            TagEnd::Image => self.end_image(),
            TagEnd::Emphasis => self.push_text("*"),
            TagEnd::Strong => self.push_text("**"),
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        if self.in_front_matter {
            self.front_matter.get_or_insert_with(String::new).push_str(text);
            return;
        }
        if let Some((_, code)) = &mut self.code {
            code.push_str(text);
            return;
        }
        if let Some(image) = &mut self.image {
            image.alt.push_str(text);
            return;
        }
        if !text.trim().is_empty() {
            // Text next to an image: the image is inline after all.
            if let Some(Section::Image { alt, .. }) = self.pending_image.take() {
                self.text.push_str(alt.as_deref().unwrap_or(""));
            }
        }
        self.text.push_str(text);
    }

    fn end_image(&mut self) {
        let Some(image) = self.image.take() else {
            return;
        };
        let standalone = self.text.trim().is_empty()
            && self.heading.is_none()
            && self.table.is_none()
            && !self.in_container();
        if standalone {
            self.pending_image = Some(Section::Image {
                src: image.src,
                alt: Some(image.alt).filter(|a| !a.is_empty()),
                caption: Some(image.title).filter(|t| !t.is_empty()),
            });
        } else {
            self.text.push_str(&image.alt);
        }
    }

    fn end_paragraph(&mut self) {
        if let Some(image) = self.pending_image.take() {
            if self.text.trim().is_empty() {
                self.text.clear();
                self.sections.push(image);
                return;
            }
        }
        if self.list_depth > 0 {
            // Loose list items: keep paragraphs inside the item.
            self.text.push('\n');
            return;
        }
        let content = std::mem::take(&mut self.text).trim().to_string();
        if content.is_empty() {
            return;
        }
        if self.quote_depth > 0 {
            self.quote_parts.push(content);
        } else {
            self.sections.push(Section::paragraph(content));
        }
    }

    fn flush_item(&mut self) {
        let item = std::mem::take(&mut self.text).trim().to_string();
        if item.is_empty() {
            return;
        }
        if let Some((_, items)) = &mut self.list {
            items.push(item);
        }
    }

    fn display_math(&mut self, math: &str) {
        if self.in_container() {
            self.push_text(math);
            return;
        }
        let before = std::mem::take(&mut self.text).trim().to_string();
        if !before.is_empty() {
            self.sections.push(Section::paragraph(before));
        }
        self.sections.push(Section::Math {
            content: math.trim().to_string(),
        });
    }

    fn page_break(&mut self) {
        if !self.in_container() {
            self.sections.push(Section::PageBreak {});
        }
    }

    fn in_container(&self) -> bool {
        self.list_depth > 0 || self.quote_depth > 0
    }

    fn finish(self) -> Result<Document> {
        let metadata = match self.front_matter.as_deref().map(str::trim) {
            Some(yaml) if !yaml.is_empty() => serde_yaml::from_str::<Metadata>(yaml)?,
            _ => Metadata::default(),
        };
        Ok(Document::with_sections(self.sections).with_metadata(metadata))
    }
}

fn heading_level(level: HeadingLevel) -> i64 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
