//! Output format identifiers and the format allow-list.

use crate::error::{Error, Result};
use crate::render::inline::FormatTarget;
use serde::{Deserialize, Serialize};

/// A supported output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Structured markup (HTML5)
    Html,
    /// Lightweight markup (Markdown)
    Markdown,
    /// Flow document (DOCX) via a binary encoder
    Docx,
    /// Paginated document (PDF) via a binary encoder
    Pdf,
    /// Document model as JSON
    Json,
}

impl ExportFormat {
    /// Every format on the allow-list.
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::Html,
        ExportFormat::Markdown,
        ExportFormat::Docx,
        ExportFormat::Pdf,
        ExportFormat::Json,
    ];

    /// Parse a format id.
    ///
    /// The id must exactly match an allow-listed name; there is no case
    /// folding, trimming, or aliasing.
    ///
    /// # Example
    ///
    /// ```
    /// use docport::ExportFormat;
    ///
    /// assert_eq!(ExportFormat::parse("html").unwrap(), ExportFormat::Html);
    /// assert!(ExportFormat::parse("HTML").is_err());
    /// assert!(ExportFormat::parse("evil").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| Error::UnsupportedFormat(sanitize_for_message(s)))
    }

    /// Format id as accepted by [`ExportFormat::parse`].
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Markdown => "markdown",
            ExportFormat::Docx => "docx",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Json => "json",
        }
    }

    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Markdown => "md",
            ExportFormat::Docx => "docx",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Json => "json",
        }
    }

    /// MIME type of the output.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Html => "text/html",
            ExportFormat::Markdown => "text/markdown",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Json => "application/json",
        }
    }

    /// Inline formatting rules used by this format's renderer.
    pub fn format_target(&self) -> Option<FormatTarget> {
        match self {
            ExportFormat::Html => Some(FormatTarget::Html),
            ExportFormat::Markdown => Some(FormatTarget::Markdown),
            ExportFormat::Docx => Some(FormatTarget::Docx),
            ExportFormat::Pdf => Some(FormatTarget::Pdf),
            ExportFormat::Json => None,
        }
    }

    /// Whether the renderer output needs a binary encoder.
    pub fn is_binary(&self) -> bool {
        matches!(self, ExportFormat::Docx | ExportFormat::Pdf)
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Keep rejected input printable and short in error messages.
fn sanitize_for_message(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| if c.is_control() { '?' } else { c })
        .take(32)
        .collect();
    if s.chars().count() > 32 {
        format!("{}...", cleaned)
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact_match_only() {
        for format in ExportFormat::ALL {
            assert_eq!(ExportFormat::parse(format.as_str()).unwrap(), format);
        }
        assert!(ExportFormat::parse("Html").is_err());
        assert!(ExportFormat::parse(" html").is_err());
        assert!(ExportFormat::parse("md").is_err());
        assert!(ExportFormat::parse("").is_err());
    }

    #[test]
    fn test_parse_rejects_injection() {
        let err = ExportFormat::parse("html;rm -rf /").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));

        let err = ExportFormat::parse("pdf\n\u{1b}[31m").unwrap_err();
        assert_eq!(err.to_string(), "Unsupported format: pdf??[31m");
    }

    #[test]
    fn test_extensions() {
        assert_eq!(ExportFormat::Markdown.extension(), "md");
        assert_eq!(ExportFormat::Html.extension(), "html");
        assert!(ExportFormat::Pdf.is_binary());
        assert!(!ExportFormat::Json.is_binary());
    }

    #[test]
    fn test_format_target() {
        assert_eq!(ExportFormat::Docx.format_target(), Some(FormatTarget::Docx));
        assert_eq!(ExportFormat::Json.format_target(), None);
    }
}
