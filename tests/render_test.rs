//! Integration tests for the format renderers.

use docport::render::{self, Instruction, RenderedArtifact};
use docport::{Document, ExportFormat, Metadata, RenderOptions, Section};

fn scenario() -> Document {
    Document::with_sections(vec![Section::title("T"), Section::list(["a", "b"], false)])
}

fn render_text(doc: &Document, format: ExportFormat) -> String {
    render::render(doc, format, &RenderOptions::default())
        .unwrap()
        .text()
        .unwrap()
        .to_string()
}

fn instructions(doc: &Document, format: ExportFormat) -> Vec<Instruction> {
    match render::render(doc, format, &RenderOptions::default())
        .unwrap()
        .artifact
    {
        RenderedArtifact::Instructions(list) => list.instructions,
        RenderedArtifact::Text(_) => panic!("expected instructions for {}", format),
    }
}

#[test]
fn test_markdown_scenario() {
    assert_eq!(render_text(&scenario(), ExportFormat::Markdown), "# T\n\n- a\n- b\n");

    let titled = scenario().with_metadata(Metadata::new().with("title", "T"));
    let md = render_text(&titled, ExportFormat::Markdown);
    assert!(md.starts_with("---\ntitle: \"T\"\n---\n"));
    assert!(md.ends_with("# T\n\n- a\n- b\n"));
    assert_eq!(render_text(&titled, ExportFormat::Html).matches("<h1>T</h1>").count(), 1);
}

#[test]
fn test_html_scenario() {
    let html = render_text(&scenario(), ExportFormat::Html);
    assert_eq!(html.matches("<h1>").count(), 1);
    assert!(html.contains("<h1>T</h1>"));
    assert_eq!(html.matches("<li>").count(), 2);
    assert!(html.find("<li>a</li>").unwrap() < html.find("<li>b</li>").unwrap());
}

#[test]
fn test_order_preserved_in_every_format() {
    let words = ["alpha", "bravo", "charlie", "delta", "echo"];
    let doc = Document::with_sections(words.iter().map(|w| Section::paragraph(*w)).collect());

    for format in [ExportFormat::Html, ExportFormat::Markdown, ExportFormat::Json] {
        let text = render_text(&doc, format);
        let positions: Vec<usize> = words.iter().map(|w| text.find(w).unwrap()).collect();
        assert!(positions.windows(2).all(|p| p[0] < p[1]), "{}", format);
    }

    for format in [ExportFormat::Docx, ExportFormat::Pdf] {
        let texts: Vec<String> = instructions(&doc, format)
            .iter()
            .map(Instruction::text)
            .filter(|t| !t.is_empty())
            .collect();
        assert_eq!(texts, words, "{}", format);
    }
}

#[test]
fn test_heading_clamp_everywhere() {
    let doc = Document::with_sections(vec![Section::heading("deep", 9), Section::heading("shallow", 0)]);

    let md = render_text(&doc, ExportFormat::Markdown);
    assert!(md.contains("###### deep"));
    assert!(!md.contains("#######"));
    assert!(md.contains("# shallow"));

    let html = render_text(&doc, ExportFormat::Html);
    assert!(html.contains("<h6>deep</h6>"));
    assert!(html.contains("<h1>shallow</h1>"));

    let levels: Vec<u8> = instructions(&doc, ExportFormat::Docx)
        .into_iter()
        .filter_map(|i| match i {
            Instruction::Heading { level, .. } => Some(level),
            _ => None,
        })
        .collect();
    assert_eq!(levels, vec![6, 1]);
}

#[test]
fn test_ragged_table_never_fails() {
    let doc = Document::with_sections(vec![Section::table(
        vec!["a".into(), "b".into()],
        vec![vec![], vec!["1".into(), "2".into(), "3".into()]],
    )]);

    for format in ExportFormat::ALL {
        let output = render::render(&doc, format, &RenderOptions::default()).unwrap();
        assert!(output.warnings.is_empty(), "{}", format);
    }
}

#[test]
fn test_unknown_section_tolerated() {
    let doc = docport::load_str(
        r#"{"sections":[
            {"type":"paragraph","content":"before"},
            {"type":"hologram","content":"?"},
            {"type":"paragraph","content":"after"}
        ]}"#,
        docport::SourceKind::Json,
    )
    .unwrap();
    assert_eq!(doc.len(), 3);

    for format in [ExportFormat::Html, ExportFormat::Markdown, ExportFormat::Docx, ExportFormat::Pdf] {
        let output = render::render(&doc, format, &RenderOptions::default()).unwrap();
        assert_eq!(output.warnings.len(), 1, "{}", format);
        assert_eq!(output.warnings[0].index, 1);
        assert_eq!(output.stats.placeholder_count, 1);
    }

    let ops = instructions(&doc, ExportFormat::Docx);
    assert!(ops
        .iter()
        .any(|i| matches!(i, Instruction::Comment { text } if text.contains("hologram"))));
}

#[test]
fn test_inline_markup_per_target() {
    let doc = Document::with_sections(vec![Section::paragraph("a **b** *c* `d`")]);

    let html = render_text(&doc, ExportFormat::Html);
    assert!(html.contains("<p>a <strong>b</strong> <em>c</em> <code>d</code></p>"));

    let md = render_text(&doc, ExportFormat::Markdown);
    assert_eq!(md, "a **b** *c* `d`\n");

    let ops = instructions(&doc, ExportFormat::Docx);
    let Instruction::Paragraph { runs, .. } = &ops[0] else {
        panic!("expected a paragraph");
    };
    assert!(runs.iter().any(|r| r.bold && r.text == "b"));
    assert!(runs.iter().any(|r| r.italic && r.text == "c"));
    assert!(runs.iter().any(|r| r.code && r.text == "d"));
}

#[test]
fn test_frontmatter_toggle() {
    let doc = scenario().with_metadata(Metadata::new().with("title", "T").with("author", "Ann"));

    let md = render_text(&doc, ExportFormat::Markdown);
    assert!(md.starts_with("---\n"));
    assert!(md.contains("author: \"Ann\""));

    let options = RenderOptions::default().with_frontmatter(false);
    let md = render::to_markdown(&doc, &options).unwrap();
    assert!(md.starts_with("# T"));
}

#[test]
fn test_json_dump_reloads() {
    let doc = scenario().with_metadata(Metadata::new().with("title", "T"));
    let json = render_text(&doc, ExportFormat::Json);
    let reloaded = docport::load_str(&json, docport::SourceKind::Json).unwrap();
    assert_eq!(reloaded, doc);

    let doc = docport::load_str(
        r#"{"sections":[{"type":"carousel","slides":[1,2]},{"type":"paragraph","content":"x"}]}"#,
        docport::SourceKind::Json,
    )
    .unwrap();
    let json = render_text(&doc, ExportFormat::Json);
    assert!(json.contains("\"carousel\""));
    assert!(!json.contains("\"unknown\""));
    let reloaded = docport::load_str(&json, docport::SourceKind::Json).unwrap();
    assert_eq!(reloaded, doc);
}

#[test]
fn test_renderers_do_not_mutate() {
    let doc = scenario();
    let before = doc.clone();
    for format in ExportFormat::ALL {
        render::render(&doc, format, &RenderOptions::default()).unwrap();
    }
    assert_eq!(doc, before);
}

#[test]
fn test_fallback_text_renders_verbatim() {
    let doc = docport::load_str("{broken *json* `x", docport::SourceKind::Json).unwrap();

    let html = render_text(&doc, ExportFormat::Html);
    assert!(html.contains("{broken *json* `x"));
    assert!(!html.contains("<em>"));

    let markdown = render_text(&doc, ExportFormat::Markdown);
    assert_eq!(markdown, "```\n{broken *json* `x\n```\n");
}
