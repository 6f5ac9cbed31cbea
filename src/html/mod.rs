//! Self-contained HTML documents for a diagram source.
//!
//! Three documents are generated:
//!
//! * the interactive page shown by the file preview ([`MermaidRenderer::generate_html`]);
//! * the static card used by the settings preview ([`MermaidRenderer::generate_preview_html`]);
//! * the live editor page that the host re-renders through
//!   [`render_state_command`] ([`MermaidRenderer::generate_editor_html`]).
//!
//! Every page inlines the diagram library and the toolbar icons, so it can
//! be loaded from a string with no base URL.

pub mod escape;
pub mod page;
pub mod template;

use crate::assets::{AssetBundle, Icon, IconSet};
use crate::engine::DiagramEngine;
use crate::options::{BackgroundMode, MouseMode, RenderOptions, Theme};
use crate::view;

pub use escape::Escape;
pub use page::{DEFAULT_TITLE, Page};
pub use template::{Slot, Template, TemplateError};

const INTERACTIVE_CSS: Template =
    Template::new("interactive.css", include_str!("templates/interactive.css"));
const TOOLBAR_CSS: Template = Template::new("toolbar.css", include_str!("templates/toolbar.css"));
const DEBUG_CSS: Template = Template::new("debug.css", include_str!("templates/debug.css"));
const PREVIEW_CSS: Template = Template::new("preview.css", include_str!("templates/preview.css"));
const EDITOR_CSS: Template = Template::new("editor.css", include_str!("templates/editor.css"));

const INTERACTIVE_BODY: Template = Template::new(
    "interactive_body.html",
    include_str!("templates/interactive_body.html"),
);
const TOOLBAR_HTML: Template =
    Template::new("toolbar.html", include_str!("templates/toolbar.html"));
const DEBUG_HTML: Template = Template::new("debug.html", include_str!("templates/debug.html"));
const PREVIEW_BODY: Template =
    Template::new("preview_body.html", include_str!("templates/preview_body.html"));
const EDITOR_BODY: Template =
    Template::new("editor_body.html", include_str!("templates/editor_body.html"));

const STATE_JS: Template = Template::new("state.js", include_str!("templates/state.js"));
const INTERACTION_JS: Template =
    Template::new("interaction.js", include_str!("templates/interaction.js"));
const STATIC_RENDER_JS: Template =
    Template::new("static_render.js", include_str!("templates/static_render.js"));
const PREVIEW_JS: Template = Template::new("preview.js", include_str!("templates/preview.js"));
const EDITOR_JS: Template = Template::new("editor.js", include_str!("templates/editor.js"));

/// Everything the editor page needs to re-render in place.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    pub code: String,
    pub theme: Theme,
    pub dark_mode: bool,
    pub zoom: f64,
}

impl RenderState {
    /// State for `code` under `options`, with the theme already resolved.
    pub fn new(code: impl Into<String>, options: &RenderOptions, system_is_dark: bool, zoom: f64) -> Self {
        let style = options.resolve(system_is_dark);
        Self {
            code: code.into(),
            theme: style.effective_theme,
            dark_mode: style.effective_dark,
            zoom,
        }
    }
}

/// Script a host evaluates in the editor page to re-render without reloading.
pub fn render_state_command(state: &RenderState) -> String {
    format!(
        "updateDiagram(`{}`, '{}', {}, {});",
        escape::escape_template_literal(&state.code),
        escape::escape_js_string(state.theme.as_str()),
        state.dark_mode,
        js_number(view::clamp_zoom(state.zoom)),
    )
}

// Script literal for a number; NaN and infinities have no literal form.
fn js_number(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        "1".to_string()
    }
}

fn body_class(options: &RenderOptions, effective_dark: bool) -> &'static str {
    match options.background_mode {
        BackgroundMode::Opaque => "opaque",
        BackgroundMode::Transparent if effective_dark => "dark",
        BackgroundMode::Transparent => "light",
    }
}

/// Page generator bound to one diagram engine and icon set.
pub struct MermaidRenderer {
    engine: Box<dyn DiagramEngine>,
    icons: IconSet,
}

impl MermaidRenderer {
    pub fn new(assets: &AssetBundle) -> Self {
        Self::with_engine(Box::new(assets.engine()), assets.icons.clone())
    }

    pub fn with_engine(engine: Box<dyn DiagramEngine>, icons: IconSet) -> Self {
        Self { engine, icons }
    }

    pub fn engine(&self) -> &dyn DiagramEngine {
        self.engine.as_ref()
    }

    /// The interactive preview page.
    ///
    /// The source is embedded as escaped text in `<pre class="mermaid">`,
    /// so the browser hands the script back exactly the original string.
    /// Syntax errors are caught in the page and shown in `#error`.
    ///
    /// # Errors
    /// Only if a template and its slot list disagree.
    pub fn generate_html(
        &self,
        code: &str,
        options: &RenderOptions,
        system_is_dark: bool,
    ) -> Result<String, TemplateError> {
        let style = options.resolve(system_is_dark);
        tracing::debug!(
            theme = %style.effective_theme,
            dark = style.effective_dark,
            sizing = %options.sizing,
            toolbar = options.show_toolbar,
            "generating interactive page"
        );

        let mut page = Page::new(self.engine.as_ref())
            .body_class(body_class(options, style.effective_dark))
            .style(INTERACTIVE_CSS.render(&[
                Slot::raw("background_color", options.background_color.as_str()),
                Slot::raw("sizing_css", style.sizing_css),
            ])?);
        if options.show_toolbar {
            page = page.style(TOOLBAR_CSS.render(&[])?);
        }
        if options.show_debug {
            page = page.style(DEBUG_CSS.render(&[])?);
        }

        page = page.markup(INTERACTIVE_BODY.render(&[Slot::text("code", code)])?);
        if options.show_toolbar {
            page = page.markup(self.toolbar(options)?);
        }
        if options.show_debug {
            page = page.markup(DEBUG_HTML.render(&[Slot::text("label", options.debug_label.as_str())])?);
        }

        page = page.script(state_script(options, options.dark_mode_js(), 1.0, ".mermaid")?);
        if options.show_toolbar {
            page = page.script(interaction_script()?);
        }
        page.script(STATIC_RENDER_JS.render(&[
            Slot::raw("fit_margin", js_number(view::FIT_MARGIN)),
            Slot::js_string("theme", style.effective_theme.as_str()),
        ])?)
        .render()
    }

    /// The static card used by the settings panel preview.
    ///
    /// # Errors
    /// Only if a template and its slot list disagree.
    pub fn generate_preview_html(
        &self,
        code: &str,
        options: &RenderOptions,
        system_is_dark: bool,
    ) -> Result<String, TemplateError> {
        let style = options.resolve(system_is_dark);
        let (page_background, card_background, shadow_alpha) = if style.effective_dark {
            ("#1e1e1e", "#2d2d2d", "0.4")
        } else {
            ("#f5f5f5", "white", "0.1")
        };
        tracing::debug!(theme = %style.effective_theme, "generating preview card");

        Page::new(self.engine.as_ref())
            .title("Mermaid Preview")
            .body_class(if style.effective_dark { "dark" } else { "light" })
            .style(PREVIEW_CSS.render(&[
                Slot::raw("page_background", page_background),
                Slot::raw("card_background", card_background),
                Slot::raw("shadow_alpha", shadow_alpha),
                Slot::raw("sizing_css", style.sizing_css),
            ])?)
            .markup(PREVIEW_BODY.render(&[])?)
            .script(PREVIEW_JS.render(&[
                Slot::js_string("theme", style.effective_theme.as_str()),
                Slot::template_literal("code", code),
            ])?)
            .render()
    }

    /// The live editor page. Its first render goes through the same
    /// `updateDiagram` entry point later [`render_state_command`]s call.
    ///
    /// # Errors
    /// Only if a template and its slot list disagree.
    pub fn generate_editor_html(
        &self,
        code: &str,
        options: &RenderOptions,
        system_is_dark: bool,
        zoom: f64,
    ) -> Result<String, TemplateError> {
        let state = RenderState::new(code, options, system_is_dark, zoom);
        let style = options.resolve(system_is_dark);
        let zoom = js_number(view::clamp_zoom(state.zoom));

        let mut page = Page::new(self.engine.as_ref())
            .title("Mermaid Editor")
            .body_class(body_class(options, state.dark_mode))
            .style(EDITOR_CSS.render(&[
                Slot::raw("background_color", options.background_color.as_str()),
                Slot::raw("sizing_css", style.sizing_css),
            ])?);
        if options.show_toolbar {
            page = page.style(TOOLBAR_CSS.render(&[])?);
        }
        page = page.markup(EDITOR_BODY.render(&[])?);
        if options.show_toolbar {
            page = page.markup(self.toolbar(options)?);
        }

        page = page.script(state_script(options, bool_js(state.dark_mode), state.zoom, "#diagram")?);
        if options.show_toolbar {
            page = page.script(interaction_script()?);
        }
        page.script(EDITOR_JS.render(&[
            Slot::template_literal("code", state.code.as_str()),
            Slot::js_string("theme", state.theme.as_str()),
            Slot::raw("dark", bool_js(state.dark_mode)),
            Slot::raw("zoom", zoom),
        ])?)
        .render()
    }

    fn toolbar(&self, options: &RenderOptions) -> Result<String, TemplateError> {
        TOOLBAR_HTML.render(&[
            Slot::attribute("icon_hand", self.icons.uri(Icon::Hand)),
            Slot::attribute("icon_arrow", self.icons.uri(Icon::Arrow)),
            Slot::attribute("icon_zoom_out", self.icons.uri(Icon::ZoomOut)),
            Slot::attribute("icon_zoom_in", self.icons.uri(Icon::ZoomIn)),
            Slot::attribute("icon_zoom_reset", self.icons.uri(Icon::ZoomReset)),
            Slot::attribute("icon_checker", self.icons.uri(Icon::Checker)),
            Slot::attribute("background_color", options.background_color.as_str()),
        ])
    }
}

fn state_script(
    options: &RenderOptions,
    dark_js: &str,
    zoom: f64,
    transform_target: &'static str,
) -> Result<String, TemplateError> {
    STATE_JS.render(&[
        Slot::raw("dark_js", dark_js),
        Slot::raw("opaque", bool_js(options.background_mode == BackgroundMode::Opaque)),
        Slot::js_string("background_color", options.background_color.as_str()),
        Slot::raw("pan_mode", bool_js(options.mouse_mode == MouseMode::Pan)),
        Slot::raw("min_zoom", js_number(view::MIN_ZOOM)),
        Slot::raw("max_zoom", js_number(view::MAX_ZOOM)),
        Slot::raw("zoom", js_number(view::clamp_zoom(zoom))),
        Slot::js_string("transform_target", transform_target),
    ])
}

fn interaction_script() -> Result<String, TemplateError> {
    INTERACTION_JS.render(&[
        Slot::raw("wheel_zoom_in", js_number(view::WHEEL_ZOOM_IN)),
        Slot::raw("wheel_zoom_out", js_number(view::WHEEL_ZOOM_OUT)),
        Slot::raw("button_zoom_in", js_number(view::BUTTON_ZOOM_IN)),
        Slot::raw("button_zoom_out", js_number(view::BUTTON_ZOOM_OUT)),
        Slot::raw("toolbar_hide_ms", view::TOOLBAR_HIDE_MS.to_string()),
    ])
}

const fn bool_js(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MermaidJs;
    use crate::options::{DarkModeSetting, HexColor, Sizing};

    fn renderer() -> MermaidRenderer {
        let icons = IconSet::default().with(Icon::Hand, "data:image/png;base64,AAAA");
        MermaidRenderer::with_engine(Box::new(MermaidJs::new("/* mermaid */")), icons)
    }

    fn light() -> RenderOptions {
        RenderOptions {
            dark_mode: DarkModeSetting::Light,
            ..RenderOptions::default()
        }
    }

    #[test]
    fn test_flowchart_fit_light_page() {
        let html = renderer()
            .generate_html("flowchart TD\n    A-->B", &light(), true)
            .unwrap();

        assert!(html.contains("<pre class=\"mermaid\">flowchart TD\n    A--&gt;B</pre>"));
        assert!(html.contains("const selectedTheme = 'default';"));
        assert!(html.contains("max-width: 100%; max-height: 100%;"));
        assert!(html.contains("if (svg) fitToViewport(svg);"));
        assert!(html.contains("<body class=\"light\">"));
        assert!(html.contains("let isDark = false;"));
    }

    #[test]
    fn test_page_is_self_contained() {
        let html = renderer().generate_html("graph LR\n A", &light(), false).unwrap();
        assert!(html.contains("/* mermaid */"));
        assert!(html.contains("src=\"data:image/png;base64,AAAA\""));
        assert!(!html.contains("src=\"http"));
        assert!(!html.contains("<script src"));
        assert!(!html.contains("<link"));
    }

    #[test]
    fn test_toolbar_absent_when_disabled() {
        let options = RenderOptions {
            show_toolbar: false,
            ..light()
        };
        let html = renderer().generate_html("graph TD", &options, false).unwrap();
        assert!(!html.contains("id=\"toolbar\""));
        assert!(!html.contains("addEventListener('wheel'"));
        assert!(html.contains("diagramEngine.render('diagram-svg'"));
    }

    #[test]
    fn test_toolbar_and_zoom_constants_present() {
        let html = renderer().generate_html("graph TD", &light(), false).unwrap();
        assert!(html.contains("id=\"zoom-level\""));
        assert!(html.contains("const WHEEL_ZOOM_IN = 1.1;"));
        assert!(html.contains("const WHEEL_ZOOM_OUT = 0.9;"));
        assert!(html.contains("const BUTTON_ZOOM_IN = 1.25;"));
        assert!(html.contains("const BUTTON_ZOOM_OUT = 0.8;"));
        assert!(html.contains("const MIN_ZOOM = 0.1;"));
        assert!(html.contains("const MAX_ZOOM = 10;"));
        assert!(html.contains("const TOOLBAR_HIDE_MS = 1500;"));
    }

    #[test]
    fn test_initial_fit_runs_for_every_sizing() {
        for sizing in [Sizing::ExpandVertical, Sizing::ExpandHorizontal, Sizing::Original] {
            let options = RenderOptions { sizing, ..light() };
            let html = renderer().generate_html("graph TD", &options, false).unwrap();
            assert!(html.contains("if (svg) fitToViewport(svg);"), "{sizing}");
            assert!(html.contains(sizing.css()), "{sizing}");
        }
    }

    #[test]
    fn test_system_dark_mode_asks_browser() {
        let html = renderer()
            .generate_html("graph TD", &RenderOptions::default(), true)
            .unwrap();
        assert!(html.contains("let isDark = window.matchMedia('(prefers-color-scheme: dark)').matches;"));
        assert!(html.contains("const selectedTheme = 'dark';"));
    }

    #[test]
    fn test_opaque_background() {
        let options = RenderOptions {
            background_mode: BackgroundMode::Opaque,
            background_color: "#ABCDEF".parse::<HexColor>().unwrap(),
            ..light()
        };
        let html = renderer().generate_html("graph TD", &options, false).unwrap();
        assert!(html.contains("<body class=\"opaque\">"));
        assert!(html.contains("let isOpaque = true;"));
        assert!(html.contains("body.opaque { background: #abcdef; }"));
        assert!(html.contains("value=\"#abcdef\""));
    }

    #[test]
    fn test_debug_overlay_escapes_label() {
        let options = RenderOptions {
            show_debug: true,
            debug_label: "size <800x600>".to_string(),
            ..light()
        };
        let html = renderer().generate_html("graph TD", &options, false).unwrap();
        assert!(html.contains("<div id=\"debug\">size &lt;800x600&gt;</div>"));
    }

    #[test]
    fn test_source_cannot_break_out_of_page() {
        let hostile = "graph TD\n A[\"</pre><script>alert(1)</script>\"]";
        let html = renderer().generate_html(hostile, &light(), false).unwrap();
        assert!(html.contains("&lt;/pre&gt;&lt;script&gt;alert(1)&lt;/script&gt;"));

        let preview = renderer().generate_preview_html(hostile, &light(), false).unwrap();
        assert!(preview.contains("<script>alert(1)<\\/script>"));
        assert_eq!(preview.matches("</script>").count(), 3);
    }

    #[test]
    fn test_mixed_case_close_tag_stays_inside_script() {
        let hostile = "graph TD\n A[\"</Script><img src=x onerror=alert(1)><!--\"]";
        let closes = |html: &str| html.to_ascii_lowercase().matches("</script").count();

        let preview = renderer().generate_preview_html(hostile, &light(), false).unwrap();
        assert_eq!(closes(&preview), 3);
        assert!(preview.contains("<\\/Script><img src=x onerror=alert(1)><\\!--"));

        let editor = renderer().generate_editor_html(hostile, &light(), false, 1.0).unwrap();
        assert_eq!(closes(&editor), 3);
    }

    #[test]
    fn test_preview_uses_template_literal_and_colours() {
        let html = renderer()
            .generate_preview_html("graph TD\n A[`$x`]", &RenderOptions::default(), true)
            .unwrap();
        assert!(html.contains("`graph TD\\n A[\\`\\$x\\`]`"));
        assert!(html.contains("diagramEngine.configure('dark', true)"));
        assert!(html.contains("background: #1e1e1e;"));
        assert!(html.contains("background: #2d2d2d;"));
        assert!(html.contains("rgba(0, 0, 0, 0.4)"));

        let light_html = renderer()
            .generate_preview_html("graph TD", &RenderOptions::default(), false)
            .unwrap();
        assert!(light_html.contains("background: white;"));
        assert!(light_html.contains("rgba(0, 0, 0, 0.1)"));
    }

    #[test]
    fn test_editor_initial_render_uses_update_entry_point() {
        let options = RenderOptions {
            theme: Theme::Forest,
            ..light()
        };
        let html = renderer()
            .generate_editor_html("graph TD\n A", &options, false, 1.5)
            .unwrap();
        assert!(html.contains("async function updateDiagram(code, theme, darkMode, zoom)"));
        assert!(html.contains("updateDiagram(`graph TD\\n A`, 'forest', false, 1.5);"));
    }

    #[test]
    fn test_render_state_command() {
        let state = RenderState::new("a`b\r\nc", &RenderOptions::default(), true, 42.0);
        assert_eq!(state.theme, Theme::Dark);
        assert_eq!(
            render_state_command(&state),
            "updateDiagram(`a\\`b\\nc`, 'dark', true, 10);"
        );
    }

    #[test]
    fn test_render_state_command_rejects_nan_zoom() {
        let state = RenderState {
            code: String::new(),
            theme: Theme::Base,
            dark_mode: false,
            zoom: f64::NAN,
        };
        assert_eq!(render_state_command(&state), "updateDiagram(``, 'base', false, 1);");
    }
}
