//! Hosts that show generated pages.
//!
//! A surface never talks to a web view directly. It returns
//! [`SurfaceCommand`]s (load this document, evaluate this script) and the
//! embedding view carries them out, reporting back when a load finishes.

use std::sync::Arc;

use crate::html::{MermaidRenderer, RenderState, TemplateError, render_state_command};
use crate::options::{DarkModeSetting, RenderOptions};

/// Diagram shown by the settings panel preview.
pub const SAMPLE_DIAGRAM: &str = "flowchart TD
    A[Start] --> B{Decision}
    B -->|Yes| C[Action 1]
    B -->|No| D[Action 2]
    C --> E[End]
    D --> E";

/// Work for the embedding view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCommand {
    /// Replace the page with this document (no base URL).
    Load(String),
    /// Run this script in the current page.
    Evaluate(String),
}

/// The editor's diagram pane.
///
/// The page is loaded once; afterwards every change is pushed as an
/// `updateDiagram(...)` call. Changes arriving before the page has finished
/// loading overwrite each other, and only the latest one is replayed when
/// the load completes.
///
/// Sizing, background, mouse mode and the toolbar come from the page
/// options (defaults unless [`LiveSurface::with_options`] is used). Theme,
/// dark mode and zoom always come from the pending state.
pub struct LiveSurface {
    renderer: Arc<MermaidRenderer>,
    options: RenderOptions,
    pending: RenderState,
    page_loaded: bool,
}

impl LiveSurface {
    pub fn new(renderer: Arc<MermaidRenderer>, initial: RenderState) -> Self {
        Self {
            renderer,
            options: RenderOptions::default(),
            pending: initial,
            page_loaded: false,
        }
    }

    /// Use `options` for everything the pending state does not carry.
    #[must_use]
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Build the page for the current state.
    ///
    /// # Errors
    /// Template failures from the generator.
    pub fn load(&mut self) -> Result<SurfaceCommand, TemplateError> {
        self.page_loaded = false;
        let options = RenderOptions {
            theme: self.pending.theme,
            dark_mode: if self.pending.dark_mode {
                DarkModeSetting::Dark
            } else {
                DarkModeSetting::Light
            },
            ..self.options.clone()
        };
        let html = self.renderer.generate_editor_html(
            &self.pending.code,
            &options,
            self.pending.dark_mode,
            self.pending.zoom,
        )?;
        tracing::debug!(bytes = html.len(), "loading editor page");
        Ok(SurfaceCommand::Load(html))
    }

    /// Record a new state; returns the update script if the page can take it.
    pub fn update(&mut self, state: RenderState) -> Option<SurfaceCommand> {
        self.pending = state;
        if self.page_loaded {
            Some(SurfaceCommand::Evaluate(render_state_command(&self.pending)))
        } else {
            tracing::trace!("page still loading, keeping latest state");
            None
        }
    }

    /// The view finished loading; replay the latest state.
    pub fn on_page_loaded(&mut self) -> SurfaceCommand {
        self.page_loaded = true;
        SurfaceCommand::Evaluate(render_state_command(&self.pending))
    }

    pub fn is_page_loaded(&self) -> bool {
        self.page_loaded
    }

    pub fn pending(&self) -> &RenderState {
        &self.pending
    }
}

/// A fixed diagram rendered as a static card, reloaded whenever the options
/// that shape it change.
pub struct StaticPreview {
    renderer: Arc<MermaidRenderer>,
    code: String,
    shown: Option<(RenderOptions, bool)>,
}

impl StaticPreview {
    pub fn new(renderer: Arc<MermaidRenderer>, code: impl Into<String>) -> Self {
        Self {
            renderer,
            code: code.into(),
            shown: None,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Document for `options` and the current appearance.
    ///
    /// # Errors
    /// Template failures from the generator.
    pub fn render(&self, options: &RenderOptions, system_is_dark: bool) -> Result<String, TemplateError> {
        self.renderer
            .generate_preview_html(&self.code, options, system_is_dark)
    }

    /// A load command if anything visible changed since the last one.
    ///
    /// # Errors
    /// Template failures from the generator.
    pub fn update(
        &mut self,
        options: &RenderOptions,
        system_is_dark: bool,
    ) -> Result<Option<SurfaceCommand>, TemplateError> {
        let key = (options.clone(), system_is_dark);
        if self.shown.as_ref() == Some(&key) {
            return Ok(None);
        }
        let html = self.render(options, system_is_dark)?;
        self.shown = Some(key);
        Ok(Some(SurfaceCommand::Load(html)))
    }
}

/// The settings panel's preview of [`SAMPLE_DIAGRAM`].
pub fn settings_preview(renderer: Arc<MermaidRenderer>) -> StaticPreview {
    StaticPreview::new(renderer, SAMPLE_DIAGRAM)
}
