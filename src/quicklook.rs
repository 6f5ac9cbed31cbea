//! File preview and thumbnail providers.
//!
//! Each request is independent: settings are read from the store when the
//! request arrives, never cached, so a change saved by the viewer shows up
//! on the next preview.

use std::path::Path;

use crate::error::PreviewError;
use crate::html::MermaidRenderer;
use crate::markdown::{SourceKind, load_diagram_source};
use crate::options::{RenderOptions, ThumbnailStyle};
use crate::settings::SettingsStore;
use crate::thumbnail::{self, DrawCommand, ThumbnailError};

/// Size the preview window asks for.
pub const PREVIEW_WIDTH: u32 = 800;
pub const PREVIEW_HEIGHT: u32 = 600;

/// Extensions that get a thumbnail. Markdown files keep the system's.
pub const THUMBNAIL_EXTENSIONS: &[&str] = &["mmd", "mermaid"];

/// A finished preview document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewReply {
    pub html: String,
    /// The file's name, shown as the window title.
    pub title: String,
    pub width: u32,
    pub height: u32,
}

/// Interactive preview of `path` under `options`.
///
/// # Errors
/// [`PreviewError::UnsupportedFileType`] and [`PreviewError::Unreadable`]
/// from loading; [`PreviewError::OutputFailed`] if the page cannot be built.
pub fn provide_preview(
    path: &Path,
    renderer: &MermaidRenderer,
    options: &RenderOptions,
    system_is_dark: bool,
) -> Result<PreviewReply, PreviewError> {
    let code = load_diagram_source(path)?;
    let title = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut options = options.clone();
    if options.show_debug && options.debug_label.is_empty() {
        options.debug_label = format!(
            "{title} | {PREVIEW_WIDTH}x{PREVIEW_HEIGHT} | theme={} sizing={} dark={}",
            options.theme, options.sizing, options.dark_mode
        );
    }

    let html = renderer
        .generate_html(&code, &options, system_is_dark)
        .map_err(|err| PreviewError::OutputFailed(err.to_string()))?;
    tracing::info!(path = %path.display(), bytes = html.len(), "preview generated");
    Ok(PreviewReply {
        html,
        title,
        width: PREVIEW_WIDTH,
        height: PREVIEW_HEIGHT,
    })
}

/// A thumbnail as drawing commands.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    pub commands: Vec<DrawCommand>,
}

impl Thumbnail {
    pub fn to_svg(&self) -> String {
        thumbnail::to_svg(f64::from(self.width), f64::from(self.height), &self.commands)
    }

    /// # Errors
    /// See [`thumbnail::rasterize_png`].
    pub fn to_png(&self) -> Result<Vec<u8>, ThumbnailError> {
        thumbnail::rasterize_png(&self.to_svg(), self.width, self.height)
    }
}

/// Placeholder thumbnail for `path`, or `None` when thumbnails are turned
/// off in settings.
///
/// The file must be readable even though its contents do not affect the
/// drawing, so unreadable files report the same error as the preview.
///
/// # Errors
/// [`PreviewError::UnsupportedFileType`] for anything but `.mmd`/`.mermaid`,
/// [`PreviewError::Unreadable`] when the file cannot be read.
pub fn provide_thumbnail(
    path: &Path,
    width: u32,
    height: u32,
    store: &SettingsStore,
) -> Result<Option<Thumbnail>, PreviewError> {
    let kind = SourceKind::from_path(path)?;
    if kind != SourceKind::Raw {
        return Err(PreviewError::UnsupportedFileType {
            extension: path
                .extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default(),
        });
    }
    std::fs::read_to_string(path).map_err(|source| PreviewError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    if !store.thumbnail_enabled() {
        tracing::debug!(path = %path.display(), "thumbnails disabled");
        return Ok(None);
    }
    let style = store.thumbnail_style();
    Ok(Some(Thumbnail {
        width,
        height,
        commands: thumbnail::draw(f64::from(width), f64::from(height), style),
    }))
}

/// Both providers bound to one renderer and settings domain.
pub struct PreviewService {
    renderer: MermaidRenderer,
    store: SettingsStore,
}

impl PreviewService {
    pub fn new(renderer: MermaidRenderer, store: SettingsStore) -> Self {
        Self { renderer, store }
    }

    pub fn renderer(&self) -> &MermaidRenderer {
        &self.renderer
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    /// # Errors
    /// See [`provide_preview`].
    pub fn preview(&self, path: &Path, system_is_dark: bool) -> Result<PreviewReply, PreviewError> {
        provide_preview(path, &self.renderer, &self.store.snapshot(), system_is_dark)
    }

    /// # Errors
    /// See [`provide_thumbnail`].
    pub fn thumbnail(&self, path: &Path, width: u32, height: u32) -> Result<Option<Thumbnail>, PreviewError> {
        provide_thumbnail(path, width, height, &self.store)
    }

    /// The configured thumbnail style, for callers drawing their own.
    pub fn thumbnail_style(&self) -> ThumbnailStyle {
        self.store.thumbnail_style()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::IconSet;
    use crate::engine::MermaidJs;
    use crate::options::{Sizing, Theme};
    use tempfile::tempdir;

    fn service() -> PreviewService {
        let renderer = MermaidRenderer::with_engine(Box::new(MermaidJs::new("/* lib */")), IconSet::default());
        PreviewService::new(renderer, SettingsStore::in_memory())
    }

    #[test]
    fn test_preview_of_markdown_uses_first_block() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# Notes\n```mermaid\ngraph LR\n  A-->B\n```\n").unwrap();

        let reply = service().preview(&path, false).unwrap();
        assert_eq!(reply.title, "notes.md");
        assert_eq!((reply.width, reply.height), (800, 600));
        assert!(reply.html.contains("<pre class=\"mermaid\">graph LR\n  A--&gt;B</pre>"));
    }

    #[test]
    fn test_preview_reads_settings_per_request() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.mmd");
        std::fs::write(&path, "graph TD").unwrap();
        let service = service();

        let before = service.preview(&path, false).unwrap();
        assert!(before.html.contains("const selectedTheme = 'default';"));

        service.store().set_theme(Theme::Forest).unwrap();
        service.store().set_sizing(Sizing::Original).unwrap();
        let after = service.preview(&path, false).unwrap();
        assert!(after.html.contains("const selectedTheme = 'forest';"));
        assert!(!after.html.contains("max-width: 100%; max-height: 100%;"));
    }

    #[test]
    fn test_preview_debug_label() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.mermaid");
        std::fs::write(&path, "graph TD").unwrap();
        let service = service();
        service.store().set_show_debug(true).unwrap();

        let reply = service.preview(&path, false).unwrap();
        assert!(reply.html.contains("<div id=\"debug\">a.mermaid | 800x600 | theme=default sizing=fit dark=system</div>"));
    }

    #[test]
    fn test_preview_error_codes() {
        let dir = tempdir().unwrap();
        let txt = dir.path().join("a.txt");
        std::fs::write(&txt, "x").unwrap();
        assert_eq!(service().preview(&txt, false).unwrap_err().code(), 2);
        assert_eq!(
            service().preview(&dir.path().join("missing.mmd"), false).unwrap_err().code(),
            3
        );
        let binary = dir.path().join("bad.mmd");
        std::fs::write(&binary, [0xff, 0xfe, 0x00]).unwrap();
        assert_eq!(service().preview(&binary, false).unwrap_err().code(), 3);
    }

    #[test]
    fn test_thumbnail_only_for_raw_sources() {
        let dir = tempdir().unwrap();
        let md = dir.path().join("a.md");
        std::fs::write(&md, "```mermaid\ngraph TD\n```").unwrap();
        assert_eq!(service().thumbnail(&md, 64, 64).unwrap_err().code(), 2);

        let mmd = dir.path().join("a.mmd");
        std::fs::write(&mmd, "graph TD").unwrap();
        let thumb = service().thumbnail(&mmd, 64, 64).unwrap().unwrap();
        assert_eq!(thumb.commands, thumbnail::draw_placeholder(64.0, 64.0));
    }

    #[test]
    fn test_thumbnail_respects_settings() {
        let dir = tempdir().unwrap();
        let mmd = dir.path().join("a.mmd");
        std::fs::write(&mmd, "graph TD").unwrap();
        let service = service();

        service.store().set_thumbnail_style(ThumbnailStyle::Icon).unwrap();
        let thumb = service.thumbnail(&mmd, 64, 64).unwrap().unwrap();
        assert_eq!(thumb.commands.len(), 4);

        service.store().set_thumbnail_enabled(false).unwrap();
        assert!(service.thumbnail(&mmd, 64, 64).unwrap().is_none());
    }

    #[test]
    fn test_thumbnail_unreadable() {
        let dir = tempdir().unwrap();
        let err = service()
            .thumbnail(&dir.path().join("gone.mmd"), 64, 64)
            .unwrap_err();
        assert_eq!(err.code(), 3);
    }
}
