//! Inline markup: `**bold**`, `*italic*` and `` `code` ``.
//!
//! Free text is first parsed into a small tree of [`Inline`] nodes, then each
//! text fragment is escaped for the target grammar and wrapped in the target's
//! markup. Escaping happens per fragment, before any wrapper is emitted, so the
//! wrappers themselves are never escaped.
//!
//! # Precedence
//!
//! The scan runs left to right and the first match wins. At any position the
//! delimiters are tried in a fixed order: `**` (bold), then `*` (italic), then
//! `` ` `` (code). Bold and italic contents are parsed again for nested
//! constructs; code contents are literal. A delimiter without a closing
//! partner, or with nothing between the two, is plain text.
//!
//! ```
//! use docport::render::inline::{format, FormatTarget};
//!
//! assert_eq!(
//!     format("a **b** <c>", FormatTarget::Html),
//!     "a <strong>b</strong> &lt;c&gt;"
//! );
//! ```

use serde::{Deserialize, Serialize};

/// Target grammar for inline formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatTarget {
    /// HTML elements
    Html,
    /// Markdown delimiters
    Markdown,
    /// WordprocessingML runs
    Docx,
    /// PDF string literal text
    Pdf,
}

/// Parsed inline node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    /// Plain text
    Text(String),
    /// Strong emphasis
    Bold(Vec<Inline>),
    /// Emphasis
    Italic(Vec<Inline>),
    /// Inline code, never parsed further
    Code(String),
}

/// A run of text with flat styling, used by the instruction builders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    /// The text content
    pub text: String,
    /// Bold text
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    /// Italic text
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    /// Monospace code
    #[serde(default, skip_serializing_if = "is_false")]
    pub code: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl TextRun {
    /// Create a plain run.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    fn same_style(&self, other: &TextRun) -> bool {
        self.bold == other.bold && self.italic == other.italic && self.code == other.code
    }
}

/// Unbalanced delimiter found by [`check_delimiters`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelimiterWarning {
    /// The delimiter (`**`, `*` or `` ` ``)
    pub delimiter: &'static str,
    /// How many times it occurs
    pub count: usize,
}

impl std::fmt::Display for DelimiterWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "odd number of '{}' delimiters ({})",
            self.delimiter, self.count
        )
    }
}

/// Parse inline markup into a node tree.
pub fn parse(text: &str) -> Vec<Inline> {
    let mut nodes = Vec::new();
    let mut plain = String::new();
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];
        if let Some((node, consumed)) = match_span(rest) {
            if !plain.is_empty() {
                nodes.push(Inline::Text(std::mem::take(&mut plain)));
            }
            nodes.push(node);
            i += consumed;
            continue;
        }
        let ch_len = rest.chars().next().map_or(1, char::len_utf8);
        plain.push_str(&rest[..ch_len]);
        i += ch_len;
    }

    if !plain.is_empty() {
        nodes.push(Inline::Text(plain));
    }
    nodes
}

/// Try to match a span starting at the beginning of `rest`.
fn match_span(rest: &str) -> Option<(Inline, usize)> {
    if let Some(inner) = rest.strip_prefix("**") {
        if let Some(end) = find_bold_close(inner) {
            return Some((Inline::Bold(parse(&inner[..end])), end + 4));
        }
    }
    if let Some(inner) = rest.strip_prefix('*') {
        if let Some(end) = find_italic_close(inner) {
            return Some((Inline::Italic(parse(&inner[..end])), end + 2));
        }
    }
    if let Some(inner) = rest.strip_prefix('`') {
        if let Some(end) = inner.find('`').filter(|&end| end > 0) {
            return Some((Inline::Code(inner[..end].to_string()), end + 2));
        }
    }
    None
}

/// Closing `**`: the last two stars of a star run, after non-empty content.
fn find_bold_close(inner: &str) -> Option<usize> {
    let bytes = inner.as_bytes();
    let mut j = 0;
    while j + 1 < bytes.len() {
        if bytes[j] == b'*' && bytes[j + 1] == b'*' && bytes.get(j + 2) != Some(&b'*') {
            return (j > 0).then_some(j);
        }
        j += 1;
    }
    None
}

/// Closing `*`: a lone star (star runs belong to nested bold spans).
fn find_italic_close(inner: &str) -> Option<usize> {
    let bytes = inner.as_bytes();
    let mut j = 0;
    while j < bytes.len() {
        if bytes[j] == b'*' {
            let run = bytes[j..].iter().take_while(|&&b| b == b'*').count();
            if run == 1 {
                return (j > 0).then_some(j);
            }
            j += run;
            continue;
        }
        j += 1;
    }
    None
}

/// Format inline markup for a target grammar.
pub fn format(text: &str, target: FormatTarget) -> String {
    let nodes = parse(text);
    match target {
        FormatTarget::Html | FormatTarget::Markdown => {
            let mut out = String::with_capacity(text.len() + 16);
            write_nodes(&mut out, &nodes, target, false);
            out
        }
        FormatTarget::Docx => flatten(&nodes).iter().map(docx_run).collect(),
        FormatTarget::Pdf => flatten(&nodes)
            .iter()
            .map(|run| escape(&run.text, FormatTarget::Pdf))
            .collect(),
    }
}

/// Format inline markup for a Markdown table cell.
///
/// Same as [`format`] with [`FormatTarget::Markdown`], except that pipes
/// inside code spans are escaped as well; GFM splits cells before it looks
/// at code spans.
pub fn format_table_cell(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    write_nodes(&mut out, &parse(text), FormatTarget::Markdown, true);
    out
}

fn write_nodes(out: &mut String, nodes: &[Inline], target: FormatTarget, in_cell: bool) {
    for node in nodes {
        match (node, target) {
            (Inline::Text(t), _) => out.push_str(&escape(t, target)),
            (Inline::Bold(inner), FormatTarget::Html) => {
                out.push_str("<strong>");
                write_nodes(out, inner, target, in_cell);
                out.push_str("</strong>");
            }
            (Inline::Italic(inner), FormatTarget::Html) => {
                out.push_str("<em>");
                write_nodes(out, inner, target, in_cell);
                out.push_str("</em>");
            }
            (Inline::Code(code), FormatTarget::Html) => {
                out.push_str("<code>");
                out.push_str(&escape(code, target));
                out.push_str("</code>");
            }
            (Inline::Bold(inner), _) => {
                out.push_str("**");
                write_nodes(out, inner, target, in_cell);
                out.push_str("**");
            }
            (Inline::Italic(inner), _) => {
                out.push('*');
                write_nodes(out, inner, target, in_cell);
                out.push('*');
            }
            // Code spans are literal in Markdown; the content has no backtick.
            (Inline::Code(code), _) => {
                out.push('`');
                if in_cell {
                    out.push_str(&code.replace('|', "\\|"));
                } else {
                    out.push_str(code);
                }
                out.push('`');
            }
        }
    }
}

fn docx_run(run: &TextRun) -> String {
    let mut props = String::new();
    if run.bold {
        props.push_str("<w:b/>");
    }
    if run.italic {
        props.push_str("<w:i/>");
    }
    if run.code {
        props.push_str("<w:rFonts w:ascii=\"Consolas\" w:hAnsi=\"Consolas\"/>");
    }
    let props = if props.is_empty() {
        props
    } else {
        format!("<w:rPr>{}</w:rPr>", props)
    };
    format!(
        "<w:r>{}<w:t xml:space=\"preserve\">{}</w:t></w:r>",
        props,
        escape(&run.text, FormatTarget::Docx)
    )
}

/// Escape characters that are significant in the target grammar.
pub fn escape(text: &str, target: FormatTarget) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match (target, c) {
            (FormatTarget::Html | FormatTarget::Docx, '&') => result.push_str("&amp;"),
            (FormatTarget::Html | FormatTarget::Docx, '<') => result.push_str("&lt;"),
            (FormatTarget::Html | FormatTarget::Docx, '>') => result.push_str("&gt;"),
            (FormatTarget::Html | FormatTarget::Docx, '"') => result.push_str("&quot;"),
            (FormatTarget::Html, '\'') => result.push_str("&#39;"),
            (FormatTarget::Docx, '\'') => result.push_str("&apos;"),
            (FormatTarget::Markdown, '\\' | '`' | '*' | '_' | '[' | ']' | '|' | '<') => {
                result.push('\\');
                result.push(c);
            }
            (FormatTarget::Pdf, '\\' | '(' | ')') => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    result
}

/// Flatten inline markup into styled runs; adjacent runs of equal style merge.
pub fn runs(text: &str) -> Vec<TextRun> {
    flatten(&parse(text))
}

fn flatten(nodes: &[Inline]) -> Vec<TextRun> {
    let mut out: Vec<TextRun> = Vec::new();
    collect_runs(nodes, TextRun::default(), &mut out);
    out
}

fn collect_runs(nodes: &[Inline], style: TextRun, out: &mut Vec<TextRun>) {
    for node in nodes {
        match node {
            Inline::Text(t) => push_run(out, TextRun { text: t.clone(), ..style.clone() }),
            Inline::Code(c) => push_run(
                out,
                TextRun {
                    text: c.clone(),
                    code: true,
                    ..style.clone()
                },
            ),
            Inline::Bold(inner) => collect_runs(
                inner,
                TextRun {
                    bold: true,
                    ..style.clone()
                },
                out,
            ),
            Inline::Italic(inner) => collect_runs(
                inner,
                TextRun {
                    italic: true,
                    ..style.clone()
                },
                out,
            ),
        }
    }
}

fn push_run(out: &mut Vec<TextRun>, run: TextRun) {
    if run.text.is_empty() {
        return;
    }
    match out.last_mut() {
        Some(last) if last.same_style(&run) => last.text.push_str(&run.text),
        _ => out.push(run),
    }
}

/// Text with all recognized inline delimiters removed.
pub fn plain_text(text: &str) -> String {
    runs(text).into_iter().map(|r| r.text).collect()
}

/// Report odd delimiter counts. Diagnostic only; formatting never fails.
pub fn check_delimiters(text: &str) -> Vec<DelimiterWarning> {
    let bytes = text.as_bytes();
    let (mut doubles, mut singles, mut ticks) = (0usize, 0usize, 0usize);
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'*' => {
                let run = bytes[i..].iter().take_while(|&&b| b == b'*').count();
                doubles += run / 2;
                singles += run % 2;
                i += run;
            }
            b'`' => {
                ticks += 1;
                i += 1;
            }
            _ => i += 1,
        }
    }

    [("**", doubles), ("*", singles), ("`", ticks)]
        .into_iter()
        .filter(|(_, count)| count % 2 == 1)
        .map(|(delimiter, count)| DelimiterWarning { delimiter, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Remove tags and decode the five entities emitted by `escape`.
    fn strip_html(s: &str) -> String {
        let mut out = String::new();
        let mut in_tag = false;
        for c in s.chars() {
            match c {
                '<' => in_tag = true,
                '>' => in_tag = false,
                _ if !in_tag => out.push(c),
                _ => {}
            }
        }
        out.replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&amp;", "&")
    }

    #[test]
    fn test_parse_basic_constructs() {
        assert_eq!(
            parse("a **b** *c* `d`"),
            vec![
                Inline::Text("a ".into()),
                Inline::Bold(vec![Inline::Text("b".into())]),
                Inline::Text(" ".into()),
                Inline::Italic(vec![Inline::Text("c".into())]),
                Inline::Text(" ".into()),
                Inline::Code("d".into()),
            ]
        );
    }

    #[test]
    fn test_parse_nested_outer_to_inner() {
        assert_eq!(
            parse("**bold *it***"),
            vec![Inline::Bold(vec![
                Inline::Text("bold ".into()),
                Inline::Italic(vec![Inline::Text("it".into())]),
            ])]
        );
        assert_eq!(
            parse("*a **b** c*"),
            vec![Inline::Italic(vec![
                Inline::Text("a ".into()),
                Inline::Bold(vec![Inline::Text("b".into())]),
                Inline::Text(" c".into()),
            ])]
        );
    }

    #[test]
    fn test_code_content_is_literal() {
        assert_eq!(parse("`**x**`"), vec![Inline::Code("**x**".into())]);
        assert_eq!(
            format("`<b>`", FormatTarget::Html),
            "<code>&lt;b&gt;</code>"
        );
    }

    #[test]
    fn test_unbalanced_delimiters_are_literal() {
        assert_eq!(format("2 * 3", FormatTarget::Html), "2 * 3");
        assert_eq!(format("**open", FormatTarget::Html), "**open");
        assert_eq!(format("a ` b", FormatTarget::Html), "a ` b");
        assert_eq!(format("****", FormatTarget::Html), "****");
        assert_eq!(
            format("**a** and *b", FormatTarget::Html),
            "<strong>a</strong> and *b"
        );
    }

    #[test]
    fn test_escape_before_wrap_html() {
        assert_eq!(
            format("<script>**x & y**</script>", FormatTarget::Html),
            "&lt;script&gt;<strong>x &amp; y</strong>&lt;/script&gt;"
        );
    }

    #[test]
    fn test_markdown_target() {
        assert_eq!(format("a **b** c", FormatTarget::Markdown), "a **b** c");
        assert_eq!(format("snake_case [x]", FormatTarget::Markdown), "snake\\_case \\[x\\]");
        assert_eq!(format("5 * 3", FormatTarget::Markdown), "5 \\* 3");
        assert_eq!(
            format("<script>alert(1)</script>", FormatTarget::Markdown),
            "\\<script>alert(1)\\</script>"
        );
    }

    #[test]
    fn test_table_cell_escapes_pipes_in_code() {
        assert_eq!(format_table_cell("`a|b` c|d"), "`a\\|b` c\\|d");
        assert_eq!(format("`a|b`", FormatTarget::Markdown), "`a|b`");
    }

    #[test]
    fn test_docx_target() {
        let xml = format("x **<b>**", FormatTarget::Docx);
        assert_eq!(
            xml,
            "<w:r><w:t xml:space=\"preserve\">x </w:t></w:r>\
             <w:r><w:rPr><w:b/></w:rPr><w:t xml:space=\"preserve\">&lt;b&gt;</w:t></w:r>"
        );
    }

    #[test]
    fn test_pdf_target() {
        assert_eq!(format("f(x) = **y\\z**", FormatTarget::Pdf), "f\\(x\\) = y\\\\z");
    }

    #[test]
    fn test_runs_merge_and_flags() {
        let r = runs("a**b**`c`");
        assert_eq!(r.len(), 3);
        assert_eq!(r[0], TextRun::plain("a"));
        assert!(r[1].bold && !r[1].italic);
        assert!(r[2].code);

        let r = runs("***x***");
        assert_eq!(r.len(), 1);
        assert!(r[0].text == "x" && r[0].bold && r[0].italic);
    }

    #[test]
    fn test_html_round_trip() {
        let inputs = [
            "plain",
            "**bold** then *italic* then `code`",
            "*a **b** c*",
            "x < y && **z > w**",
            "unicode **ünïcødé** *日本*",
            "it's \"quoted\"",
        ];
        for input in inputs {
            let html = format(input, FormatTarget::Html);
            assert_eq!(strip_html(&html), plain_text(input), "input: {input}");
        }
    }

    #[test]
    fn test_markdown_round_trip_is_identity() {
        for input in ["**bold** and *it*", "`code` here", "no markup at all"] {
            assert_eq!(format(input, FormatTarget::Markdown), input);
        }
    }

    #[test]
    fn test_check_delimiters() {
        assert!(check_delimiters("**a** *b* `c`").is_empty());
        let warnings = check_delimiters("**a *b `c");
        let delims: Vec<_> = warnings.iter().map(|w| w.delimiter).collect();
        assert_eq!(delims, vec!["**", "*", "`"]);
        assert_eq!(warnings[0].to_string(), "odd number of '**' delimiters (1)");
    }
}
