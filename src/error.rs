//! Errors surfaced across the preview/thumbnail boundary.
//!
//! Diagram syntax errors are deliberately absent: they are caught inside the
//! generated page and shown inline, never returned to the host.

use std::path::PathBuf;

use thiserror::Error;

/// Failure categories a preview or thumbnail request can report.
#[derive(Debug, Error)]
pub enum PreviewError {
    /// The document could not be produced (e.g. encoding the reply failed).
    #[error("failed to generate output: {0}")]
    OutputFailed(String),

    /// The file extension is not one this provider handles.
    #[error("unsupported file type: {extension:?}")]
    UnsupportedFileType { extension: String },

    /// The file is missing or not valid UTF-8 text.
    #[error("could not read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PreviewError {
    /// Stable numeric code, matching the codes the native extensions used.
    pub const fn code(&self) -> i32 {
        match self {
            Self::OutputFailed(_) => 1,
            Self::UnsupportedFileType { .. } => 2,
            Self::Unreadable { .. } => 3,
        }
    }
}
