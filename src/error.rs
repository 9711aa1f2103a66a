//! Error types for report conversion.
//!
//! [`ReportError`] covers everything that stops a run. Image problems are never
//! fatal; they are described by [`ImageWarning`] and collected into the render
//! statistics instead.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Failures that abort the conversion.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A required command line argument was not supplied.
    #[error("Missing required argument: --{0}")]
    MissingArgument(&'static str),

    /// The Markdown report could not be read.
    #[error("Failed to read report {}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An explicit font path was given but nothing exists there.
    #[error("Font file not found: {}", path.display())]
    FontNotFound { path: PathBuf },

    /// The font file exists but could not be parsed.
    #[error("Failed to load font {}: {reason}", path.display())]
    FontLoad { path: PathBuf, reason: String },

    /// The layout configuration file is unreadable or invalid.
    #[error("Invalid layout configuration {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    /// The PDF could not be written to its destination.
    #[error("Failed to write PDF to {}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Non-fatal problems with an image reference.
///
/// The renderer draws a placeholder line for each of these and carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageWarning {
    #[error("image `{reference}` not found")]
    NotFound { reference: String },

    #[error("image {} could not be read: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("image {} could not be decoded: {reason}", path.display())]
    Undecodable { path: PathBuf, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_display_errors() {
        let err = ReportError::FontNotFound {
            path: PathBuf::from("/fonts/missing.ttf"),
        };
        assert_eq!(err.to_string(), "Font file not found: /fonts/missing.ttf");

        let err = ReportError::MissingArgument("report");
        assert_eq!(err.to_string(), "Missing required argument: --report");
    }

    #[test]
    fn output_errors_keep_their_source() {
        use std::error::Error as _;

        let err = ReportError::OutputWrite {
            path: PathBuf::from("out/report.pdf"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.source().is_some());
    }

    #[test]
    fn can_display_image_warnings() {
        let warning = ImageWarning::NotFound {
            reference: "01.jpg".to_string(),
        };
        assert_eq!(warning.to_string(), "image `01.jpg` not found");
    }
}
