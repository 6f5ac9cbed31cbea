//! Mermaid source extraction.
//!
//! Raw `.mmd`/`.mermaid` files are diagram source as-is. Markdown files are
//! scanned for fenced ```` ```mermaid ```` blocks.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::PreviewError;

/// Diagram shown when a Markdown document has no mermaid fence.
pub const NO_BLOCKS_PLACEHOLDER: &str = "flowchart TD\n    A[No mermaid blocks found]";

/// Separator used when several blocks are shown together.
pub const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

// Opener: the language tag, optional whitespace, then a newline. The body is
// matched lazily up to the next fence, so no newline is needed before it.
static MERMAID_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```mermaid\s*\n([\s\S]*?)```").expect("mermaid fence pattern")
});

/// How a file's contents become diagram source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// `.mmd` / `.mermaid`: the whole file is the diagram.
    Raw,
    /// `.md` / `.markdown`: the diagram lives in a fenced block.
    Markdown,
}

impl SourceKind {
    /// Classify a path by its (case-insensitive) extension.
    ///
    /// # Errors
    /// Returns [`PreviewError::UnsupportedFileType`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self, PreviewError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "mmd" | "mermaid" => Ok(Self::Raw),
            "md" | "markdown" => Ok(Self::Markdown),
            _ => Err(PreviewError::UnsupportedFileType { extension: ext }),
        }
    }

    /// Turn file contents into diagram source.
    pub fn diagram_source(self, content: &str) -> String {
        match self {
            Self::Raw => content.to_string(),
            Self::Markdown => extract_mermaid(content),
        }
    }
}

/// Return the trimmed body of the first mermaid block, or the placeholder.
///
/// Later blocks are ignored.
pub fn extract_mermaid(markdown: &str) -> String {
    MERMAID_FENCE
        .captures(markdown)
        .and_then(|caps| caps.get(1))
        .map_or_else(
            || NO_BLOCKS_PLACEHOLDER.to_string(),
            |body| body.as_str().trim().to_string(),
        )
}

/// Every mermaid block in document order, each trimmed.
pub fn extract_all(markdown: &str) -> Vec<String> {
    MERMAID_FENCE
        .captures_iter(markdown)
        .filter_map(|caps| caps.get(1))
        .map(|body| body.as_str().trim().to_string())
        .collect()
}

/// All blocks joined with [`BLOCK_SEPARATOR`], or the whole document when
/// there are none.
pub fn join_blocks(markdown: &str) -> String {
    let blocks = extract_all(markdown);
    if blocks.is_empty() {
        markdown.to_string()
    } else {
        blocks.join(BLOCK_SEPARATOR)
    }
}

/// Read `path` and produce the diagram source for it.
///
/// # Errors
/// Unsupported extensions are rejected before the file is touched; read and
/// decode failures become [`PreviewError::Unreadable`].
pub fn load_diagram_source(path: &Path) -> Result<String, PreviewError> {
    let kind = SourceKind::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|source| PreviewError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), ?kind, bytes = content.len(), "loaded diagram file");
    Ok(kind.diagram_source(&content))
}
