//! HTML rendering.
//!
//! The whole document is wrapped in one HTML5 envelope. Metadata goes into
//! `<head>`, and the body carries one landmark per region: a skip-link
//! `<nav>`, the `<main>` content, and a `<footer>`.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::format::ExportFormat;
use crate::model::{clamp_level, Document, Section, TableData};

use super::inline::{self, escape, FormatTarget};
use super::{RenderOptions, RenderOutput, RenderStats, RenderedArtifact, Renderer, SectionWarning};

const TARGET: FormatTarget = FormatTarget::Html;

const DEFAULT_STYLESHEET: &str = "\
body{font-family:system-ui,sans-serif;line-height:1.5;max-width:48rem;margin:0 auto;padding:1rem}
.skip-link{position:absolute;left:-999px}
.skip-link:focus{left:1rem}
table{border-collapse:collapse}
th,td{border:1px solid #ccc;padding:.25rem .5rem}
pre{overflow-x:auto;background:#f6f8fa;padding:.75rem}
blockquote{border-left:4px solid #ccc;margin-left:0;padding-left:1rem}
figure{margin:1rem 0}
.page-break{break-after:page}
footer{border-top:1px solid #ccc;margin-top:2rem;font-size:.875rem}";

/// Convert a document to HTML.
pub fn to_html(doc: &Document, options: &RenderOptions) -> Result<String> {
    let output = HtmlRenderer::new(options.clone()).render(doc)?;
    match output.artifact {
        RenderedArtifact::Text(html) => Ok(html),
        RenderedArtifact::Instructions(_) => Err(Error::Render("unexpected artifact".into())),
    }
}

/// HTML renderer.
pub struct HtmlRenderer {
    options: RenderOptions,
}

impl HtmlRenderer {
    /// Create a new HTML renderer.
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    fn render_head(&self, output: &mut String, doc: &Document) {
        let meta = &doc.metadata;
        output.push_str("<head>\n<meta charset=\"utf-8\">\n");
        output.push_str(
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
        );
        let title = doc.title().unwrap_or_default();
        output.push_str(&format!("<title>{}</title>\n", escape(&title, TARGET)));

        let keywords = meta.keywords().join(", ");
        let fields = [
            ("author", meta.author()),
            ("description", meta.subject()),
            ("keywords", Some(keywords).filter(|k| !k.is_empty())),
            ("date", meta.date()),
            ("generator", Some(self.options.generator.clone())),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                output.push_str(&format!(
                    "<meta name=\"{}\" content=\"{}\">\n",
                    name,
                    escape(&value, TARGET)
                ));
            }
        }

        if self.options.include_stylesheet {
            output.push_str("<style>\n");
            output.push_str(DEFAULT_STYLESHEET);
            output.push_str("\n</style>\n");
        }
        output.push_str("</head>\n");
    }

    fn render_footer(&self, output: &mut String, doc: &Document) {
        let meta = &doc.metadata;
        output.push_str("<footer>\n");
        if let Some(author) = meta.author() {
            output.push_str(&format!(
                "<p class=\"author\">{}</p>\n",
                escape(&author, TARGET)
            ));
        }
        if let Some(raw) = meta.date() {
            match meta.parsed_date() {
                Some(date) => output.push_str(&format!(
                    "<p><time datetime=\"{}\">{}</time></p>\n",
                    date.format("%Y-%m-%d"),
                    escape(&raw, TARGET)
                )),
                None => output.push_str(&format!("<p>{}</p>\n", escape(&raw, TARGET))),
            }
        }
        output.push_str(&format!(
            "<p class=\"generator\">Generated by {}</p>\n",
            escape(&self.options.generator, TARGET)
        ));
        output.push_str("</footer>\n");
    }

    fn render_section(&self, output: &mut String, section: &Section) -> Result<()> {
        match section {
            Section::Title { content } => {
                output.push_str(&format!("<h1>{}</h1>\n", inline::format(content, TARGET)));
            }
            Section::Heading { content, level } => {
                let level = clamp_level(*level);
                output.push_str(&format!(
                    "<h{level}>{}</h{level}>\n",
                    inline::format(content, TARGET)
                ));
            }
            Section::Paragraph { content } => {
                output.push_str(&format!("<p>{}</p>\n", inline::format(content, TARGET)));
            }
            Section::Quote { content } => {
                output.push_str(&format!(
                    "<blockquote>\n<p>{}</p>\n</blockquote>\n",
                    inline::format(content, TARGET)
                ));
            }
            Section::CodeBlock { content, language } => {
                let class = language
                    .as_deref()
                    .map(sanitize_language)
                    .filter(|l| !l.is_empty())
                    .map(|l| format!(" class=\"language-{}\"", l))
                    .unwrap_or_default();
                output.push_str(&format!(
                    "<pre><code{}>{}</code></pre>\n",
                    class,
                    escape(content, TARGET)
                ));
            }
            Section::Math { content } => {
                output.push_str(&format!(
                    "<div class=\"math\" role=\"math\">\\[{}\\]</div>\n",
                    escape(content, TARGET)
                ));
            }
            Section::List { items, ordered } => {
                if items.is_empty() {
                    return Ok(());
                }
                let tag = if *ordered { "ol" } else { "ul" };
                output.push_str(&format!("<{}>\n", tag));
                for item in items {
                    output.push_str(&format!("<li>{}</li>\n", inline::format(item, TARGET)));
                }
                output.push_str(&format!("</{}>\n", tag));
            }
            Section::Table { data, caption } => {
                if let Some(data) = data {
                    self.render_table(output, data, caption.as_deref());
                }
            }
            Section::Image { src, alt, caption } => {
                let src = checked_image_src(src)?;
                output.push_str("<figure>\n");
                output.push_str(&format!(
                    "<img src=\"{}\" alt=\"{}\">\n",
                    escape(src, TARGET),
                    escape(alt.as_deref().unwrap_or(""), TARGET)
                ));
                if let Some(caption) = caption {
                    output.push_str(&format!(
                        "<figcaption>{}</figcaption>\n",
                        inline::format(caption, TARGET)
                    ));
                }
                output.push_str("</figure>\n");
            }
            Section::PageBreak {} => {
                output.push_str("<div class=\"page-break\" aria-hidden=\"true\"></div>\n");
            }
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

        output.push_str("<table>\n");
        if let Some(caption) = caption {
            output.push_str(&format!(
                "<caption>{}</caption>\n",
                inline::format(caption, TARGET)
            ));
        }

        output.push_str("<thead>\n<tr>");
        for col in 0..columns {
            output.push_str(&format!(
                "<th scope=\"col\">{}</th>",
                inline::format(TableData::cell(headers, col), TARGET)
            ));
        }
        output.push_str("</tr>\n</thead>\n");

        output.push_str("<tbody>\n");
        for row in rows {
            output.push_str("<tr>");
            for col in 0..columns {
                output.push_str(&format!(
                    "<td>{}</td>",
                    inline::format(TableData::cell(row, col), TARGET)
                ));
            }
            output.push_str("</tr>\n");
        }
        output.push_str("</tbody>\n</table>\n");
    }
}

impl Renderer for HtmlRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Html
    }

    fn render(&self, doc: &Document) -> Result<RenderOutput> {
        let mut output = String::new();
        let mut warnings = Vec::new();
        let mut stats = RenderStats::new();

        output.push_str("<!DOCTYPE html>\n");
        output.push_str(&format!(
            "<html lang=\"{}\">\n",
            escape(&doc.metadata.language(), TARGET)
        ));
        self.render_head(&mut output, doc);

        output.push_str("<body>\n");
        output.push_str("<nav aria-label=\"Skip links\">\n");
        output.push_str("<a class=\"skip-link\" href=\"#main-content\">Skip to main content</a>\n");
        output.push_str("</nav>\n");
        output.push_str("<main id=\"main-content\">\n");

        for (index, section) in doc.sections.iter().enumerate() {
            stats.add_section(section);
            let mut block = String::new();
            match self.render_section(&mut block, section) {
                Ok(()) => output.push_str(&block),
                Err(err) => {
                    warnings.push(SectionWarning::record(index, section, &err));
                    stats.add_placeholder();
                    output.push_str(&format!(
                        "<!-- unsupported section: {} -->\n",
                        comment_safe(section.kind())
                    ));
                }
            }
        }

        output.push_str("</main>\n");
        self.render_footer(&mut output, doc);
        output.push_str("</body>\n</html>\n");

        Ok(RenderOutput::new(RenderedArtifact::Text(output), warnings, stats))
    }
}

/// Reject image sources with an executable or unknown URL scheme.
fn checked_image_src(src: &str) -> Result<&str> {
    static SCHEME: OnceLock<Regex> = OnceLock::new();
    let src = src.trim();
    if src.is_empty() {
        return Err(Error::unsupported_section("image", "missing image source"));
    }
    let scheme = SCHEME.get_or_init(|| {
        Regex::new(r"^([a-zA-Z][a-zA-Z0-9+.\-]*):").expect("scheme pattern is valid")
    });
    if let Some(caps) = scheme.captures(src) {
        let name = caps[1].to_ascii_lowercase();
        let allowed = matches!(name.as_str(), "http" | "https" | "file")
            || (name == "data" && src[5..].trim_start().starts_with("image/"));
        // Single letters are Windows drive prefixes, not schemes.
        if !allowed && name.len() > 1 {
            return Err(Error::unsupported_section(
                "image",
                format!("unsafe image source scheme '{}'", name),
            ));
        }
    }
    Ok(src)
}

/// Language hints end up in a class attribute.
fn sanitize_language(lang: &str) -> String {
    lang.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '#' | '.'))
        .collect()
}

/// Text that cannot close an HTML comment.
fn comment_safe(s: &str) -> String {
    s.replace("--", "").replace('>', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metadata;

    fn render(doc: &Document) -> String {
        to_html(doc, &RenderOptions::default()).unwrap()
    }

    #[test]
    fn test_envelope_and_landmarks() {
        let doc = Document::with_sections(vec![Section::paragraph("Hello")])
            .with_metadata(Metadata::new().with("title", "Doc").with("author", "Ann"));
        let html = render(&doc);

        assert!(html.starts_with("<!DOCTYPE html>\n<html lang=\"en\">"));
        assert!(html.contains("<title>Doc</title>"));
        assert!(html.contains("<meta name=\"author\" content=\"Ann\">"));
        assert_eq!(html.matches("<nav").count(), 1);
        assert_eq!(html.matches("<main").count(), 1);
        assert_eq!(html.matches("<footer>").count(), 1);
        assert!(html.contains("<p>Hello</p>"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_stylesheet_toggle() {
        let doc = Document::with_sections(vec![Section::paragraph("x")]);
        assert!(render(&doc).contains("<style>"));

        let bare = to_html(&doc, &RenderOptions::new().with_stylesheet(false)).unwrap();
        assert!(!bare.contains("<style>"));
    }

    #[test]
    fn test_missing_metadata_degrades() {
        let html = render(&Document::new());
        assert!(html.contains("<title></title>"));
        assert!(!html.contains("name=\"author\""));
    }

    #[test]
    fn test_heading_levels_clamped() {
        let doc = Document::with_sections(vec![
            Section::heading("low", -3),
            Section::heading("high", 42),
        ]);
        let html = render(&doc);
        assert!(html.contains("<h1>low</h1>"));
        assert!(html.contains("<h6>high</h6>"));
    }

    #[test]
    fn test_ragged_table() {
        let doc = Document::with_sections(vec![Section::table(
            vec!["a".into(), "b".into(), "c".into()],
            vec![vec!["1".into()], vec!["1".into(), "2".into(), "3".into()]],
        )]);
        let html = render(&doc);
        assert!(html.contains("<tr><td>1</td><td></td><td></td></tr>"));
        assert!(html.contains("<tr><td>1</td><td>2</td><td>3</td></tr>"));
    }

    #[test]
    fn test_table_without_rows_renders_nothing() {
        let doc = Document::with_sections(vec![Section::Table {
            data: Some(TableData {
                headers: Some(vec!["a".into()]),
                rows: None,
            }),
            caption: Some("cap".into()),
        }]);
        let output = HtmlRenderer::new(RenderOptions::default()).render(&doc).unwrap();
        assert!(!output.text().unwrap().contains("<table>"));
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_code_and_math_bypass_inline_formatting() {
        let doc = Document::with_sections(vec![
            Section::CodeBlock {
                content: "a **b** <c>".into(),
                language: Some("rust\" onload=\"x".into()),
            },
            Section::Math {
                content: "a*b*c".into(),
            },
        ]);
        let html = render(&doc);
        assert!(html.contains(
            "<pre><code class=\"language-rustonloadx\">a **b** &lt;c&gt;</code></pre>"
        ));
        assert!(html.contains("\\[a*b*c\\]"));
    }

    #[test]
    fn test_unknown_section_placeholder() {
        let doc = Document::with_sections(vec![
            Section::paragraph("before"),
            Section::Unknown {
                kind: "x-->y".into(),
                raw: serde_json::Value::Null,
            },
            Section::paragraph("after"),
        ]);
        let output = HtmlRenderer::new(RenderOptions::default()).render(&doc).unwrap();
        let html = output.text().unwrap();
        assert!(html.contains("<!-- unsupported section: xy -->"));
        assert!(html.find("before").unwrap() < html.find("after").unwrap());
        assert_eq!(output.warnings.len(), 1);
        assert_eq!(output.warnings[0].index, 1);
    }

    #[test]
    fn test_unsafe_image_is_placeholder() {
        let doc = Document::with_sections(vec![Section::Image {
            src: "javascript:alert(1)".into(),
            alt: None,
            caption: None,
        }]);
        let output = HtmlRenderer::new(RenderOptions::default()).render(&doc).unwrap();
        assert!(!output.text().unwrap().contains("javascript:"));
        assert_eq!(output.stats.placeholder_count, 1);
    }

    #[test]
    fn test_image_sources() {
        assert!(checked_image_src("images/a.png").is_ok());
        assert!(checked_image_src("https://example.com/a.png").is_ok());
        assert!(checked_image_src("C:/pics/a.png").is_ok());
        assert!(checked_image_src("data:image/png;base64,AAAA").is_ok());
        assert!(checked_image_src("data:text/html,<script>").is_err());
        assert!(checked_image_src("   ").is_err());
    }

    #[test]
    fn test_image_with_caption() {
        let doc = Document::with_sections(vec![Section::Image {
            src: "a.png".into(),
            alt: Some("An \"a\"".into()),
            caption: Some("Figure *one*".into()),
        }]);
        let html = render(&doc);
        assert!(html.contains("<img src=\"a.png\" alt=\"An &quot;a&quot;\">"));
        assert!(html.contains("<figcaption>Figure <em>one</em></figcaption>"));
    }
}
