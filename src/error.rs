//! Error types for docport library.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for docport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while loading, rendering, or writing documents.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input could not be parsed as any recognized document shape.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A section could not be rendered by the current renderer.
    #[error("Unsupported section '{kind}': {reason}")]
    UnsupportedSection {
        /// Section type tag
        kind: String,
        /// Why it could not be rendered
        reason: String,
    },

    /// The input path resolves outside the allowed root.
    #[error("Path traversal rejected: {} escapes {}", .path.display(), .root.display())]
    PathTraversal {
        /// Requested path
        path: PathBuf,
        /// Allowed root directory
        root: PathBuf,
    },

    /// The requested output format is not on the allow-list.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Error raised by a renderer or a downstream binary encoder.
    #[error("Rendering error: {0}")]
    Render(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid glob pattern.
    #[error("Invalid pattern: {0}")]
    Pattern(String),

    /// A caller passed arguments that violate the API contract.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The batch was cancelled before this operation started.
    #[error("Cancelled before start")]
    Cancelled,

    /// The caller-supplied deadline passed before this operation started.
    #[error("Deadline exceeded before start")]
    DeadlineExceeded,
}

impl Error {
    /// Machine-readable category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::MalformedInput(_) | Error::Json(_) => ErrorKind::MalformedInput,
            Error::UnsupportedSection { .. } => ErrorKind::UnsupportedSection,
            Error::PathTraversal { .. } => ErrorKind::PathTraversal,
            Error::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Error::Render(_) => ErrorKind::Render,
            Error::Pattern(_) => ErrorKind::Pattern,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::DeadlineExceeded => ErrorKind::DeadlineExceeded,
        }
    }

    pub(crate) fn unsupported_section(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::UnsupportedSection {
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}

impl From<glob::PatternError> for Error {
    fn from(err: glob::PatternError) -> Self {
        Error::Pattern(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::MalformedInput(format!("front matter: {}", err))
    }
}

/// Error category recorded on each export result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input could not be parsed
    MalformedInput,
    /// Section-level rendering failure
    UnsupportedSection,
    /// Input escaped the allowed root
    PathTraversal,
    /// Format not on the allow-list
    UnsupportedFormat,
    /// Read or write failure
    Io,
    /// Renderer or encoder failure
    Render,
    /// Skipped because the batch was cancelled
    Cancelled,
    /// Skipped because the deadline passed
    DeadlineExceeded,
    /// API contract violation
    InvalidArgument,
    /// Invalid glob pattern
    Pattern,
}

impl ErrorKind {
    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedInput => "malformed_input",
            ErrorKind::UnsupportedSection => "unsupported_section",
            ErrorKind::PathTraversal => "path_traversal",
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::Io => "io",
            ErrorKind::Render => "render",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::DeadlineExceeded => "deadline_exceeded",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Pattern => "pattern",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnsupportedFormat("evil".to_string());
        assert_eq!(err.to_string(), "Unsupported format: evil");

        let err = Error::PathTraversal {
            path: PathBuf::from("../etc/passwd"),
            root: PathBuf::from("/data"),
        };
        assert_eq!(
            err.to_string(),
            "Path traversal rejected: ../etc/passwd escapes /data"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_error_kind_names() {
        assert_eq!(ErrorKind::UnsupportedFormat.as_str(), "unsupported_format");
        assert_eq!(
            serde_json::to_string(&ErrorKind::PathTraversal).unwrap(),
            "\"path_traversal\""
        );
        assert_eq!(Error::Cancelled.kind(), ErrorKind::Cancelled);
    }
}
