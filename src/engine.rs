//! The diagram rendering capability embedded in generated pages.
//!
//! Layout and drawing are done by a bundled script library running inside
//! the page. The generator only needs two things from it: the library code to
//! inline, and an adapter script that defines `diagramEngine` with this
//! contract:
//!
//! * `available()` is false when the library failed to load;
//! * `configure(theme, useMaxWidth)` applies the theme before a render;
//! * `render(id, code)` resolves to svg markup or rejects with a syntax error.
//!
//! The page templates talk only to `diagramEngine`, never to the library.

/// Stub inlined when the library file is missing from the install.
pub const MISSING_LIBRARY_STUB: &str = "console.error('mermaid.min.js not found');";

/// A library that turns diagram source into svg inside the page.
pub trait DiagramEngine: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Library code, inlined into the document head.
    fn library_script(&self) -> &str;

    /// Script defining the `diagramEngine` adapter object.
    fn adapter_script(&self) -> &str;
}

/// The bundled mermaid.js library.
#[derive(Debug, Clone)]
pub struct MermaidJs {
    library: String,
}

impl MermaidJs {
    const ADAPTER: &'static str = include_str!("html/templates/mermaid_adapter.js");

    pub fn new(library: impl Into<String>) -> Self {
        Self {
            library: library.into(),
        }
    }

    /// Engine whose library is the "not found" stub. Pages built with it
    /// show an inline error instead of a diagram.
    pub fn missing() -> Self {
        Self::new(MISSING_LIBRARY_STUB)
    }

    /// Whether the real library (rather than the stub) is loaded.
    pub fn is_loaded(&self) -> bool {
        self.library != MISSING_LIBRARY_STUB
    }
}

impl DiagramEngine for MermaidJs {
    fn name(&self) -> &str {
        "mermaid"
    }

    fn library_script(&self) -> &str {
        &self.library
    }

    fn adapter_script(&self) -> &str {
        Self::ADAPTER
    }
}
