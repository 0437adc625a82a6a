//! Integration tests for loading documents from files.

use docport::{load_file, ErrorKind, LoadOptions, Section, SourceKind};
use std::fs;

#[test]
fn test_markdown_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("guide.md");
    fs::write(
        &path,
        "---\ntitle: Guide\nauthor: Ann\nkeywords: [a, b]\n---\n\n# Guide\n\nIntro with **bold**.\n\n## Setup\n\n1. one\n2. two\n\n```sh\nmake\n```\n\n> quoted\n",
    )
    .unwrap();

    let doc = load_file(&path, &LoadOptions::default()).unwrap();
    assert_eq!(doc.metadata.title().as_deref(), Some("Guide"));
    assert_eq!(doc.metadata.author().as_deref(), Some("Ann"));
    assert_eq!(doc.metadata.keywords(), vec!["a".to_string(), "b".to_string()]);

    let kinds: Vec<&str> = doc.sections.iter().map(Section::kind).collect();
    assert_eq!(
        kinds,
        vec!["title", "section", "paragraph", "section", "list", "codeblock", "quote"]
    );
    assert_eq!(doc.sections[2], Section::paragraph("Intro with **bold**."));
    assert_eq!(doc.sections[4], Section::list(["one", "two"], true));
}

#[test]
fn test_csv_file_caption_from_stem() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prices.csv");
    fs::write(&path, "item,price\napple,1\n").unwrap();

    let doc = load_file(&path, &LoadOptions::default()).unwrap();
    match &doc.sections[0] {
        Section::Table { data: Some(data), caption } => {
            assert_eq!(caption.as_deref(), Some("prices"));
            assert_eq!(data.headers, Some(vec!["item".to_string(), "price".to_string()]));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_unrecognized_json_falls_back_to_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("odd.json");
    fs::write(&path, "{\"hello\": \"world\"}").unwrap();

    let doc = load_file(&path, &LoadOptions::default()).unwrap();
    assert_eq!(
        doc.sections,
        vec![Section::CodeBlock {
            content: "{\"hello\": \"world\"}".into(),
            language: None,
        }]
    );

    let err = load_file(&path, &LoadOptions::new().strict()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
}

#[test]
fn test_non_utf8_always_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("binary.txt");
    fs::write(&path, [0x66, 0x6f, 0xff, 0xfe]).unwrap();

    for options in [LoadOptions::default(), LoadOptions::new().strict()] {
        let err = load_file(&path, &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }
}

#[test]
fn test_kind_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    fs::write(&path, "# Heading\n").unwrap();

    let plain = load_file(&path, &LoadOptions::default()).unwrap();
    assert_eq!(plain.sections, vec![Section::paragraph("# Heading")]);

    let md = load_file(&path, &LoadOptions::new().with_kind(SourceKind::Markdown)).unwrap();
    assert_eq!(md.sections, vec![Section::title("Heading")]);
}

#[test]
fn test_missing_file_is_io() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_file(dir.path().join("nope.md"), &LoadOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}
