// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. settings::SettingsStore)
    clippy::module_name_repetitions
)]

//! # mermaidview
//!
//! Interactive previews of Mermaid diagrams as self-contained HTML.
//!
//! mermaidview turns `.mmd` / `.mermaid` files, and the first ```` ```mermaid ````
//! block of markdown files, into pages that:
//! - inline the diagram library and toolbar icons (no network, no base URL)
//! - follow the stored theme, dark mode, sizing and background settings
//! - offer pan/zoom, a transient toolbar and a fit-to-window first render
//!
//! It also draws placeholder thumbnails and owns the settings domain shared
//! by the viewer and its preview extensions.
//!
//! ## Modules
//!
//! - [`markdown`]: Diagram extraction from markdown
//! - [`options`]: Render options and theme resolution
//! - [`html`]: Page generation, templates and escaping
//! - [`surface`]: Live editor and static preview hosts
//! - [`quicklook`]: File preview and thumbnail providers
//! - [`settings`]: Shared settings store, shortcuts and apply
//! - [`thumbnail`]: Placeholder thumbnail drawing
//! - [`watcher`]: File watching

pub mod assets;
pub mod config;
pub mod engine;
pub mod error;
pub mod html;
pub mod markdown;
pub mod options;
pub mod quicklook;
pub mod settings;
pub mod surface;
pub mod thumbnail;
pub mod view;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::html::MermaidRenderer;
    pub use crate::options::RenderOptions;
    pub use crate::settings::SettingsStore;
}
