//! Document assembly from style, markup, and script units.

use super::escape::Escape;
use super::template::{Slot, Template, TemplateError};
use crate::engine::DiagramEngine;

const PAGE: Template = Template::new("page", include_str!("templates/page.html"));

/// Title used when the caller has nothing better.
pub const DEFAULT_TITLE: &str = "Mermaid Diagram";

/// A self-contained document under construction.
///
/// Units are rendered templates; the page only concatenates them into the
/// right element. The library and every script unit are inlined, so the
/// finished document has no external references.
pub struct Page<'a> {
    title: String,
    body_class: String,
    engine: &'a dyn DiagramEngine,
    styles: Vec<String>,
    body: Vec<String>,
    scripts: Vec<String>,
}

impl<'a> Page<'a> {
    pub fn new(engine: &'a dyn DiagramEngine) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            body_class: String::new(),
            engine,
            styles: Vec::new(),
            body: Vec::new(),
            scripts: Vec::new(),
        }
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn body_class(mut self, class: impl Into<String>) -> Self {
        self.body_class = class.into();
        self
    }

    #[must_use]
    pub fn style(mut self, css: String) -> Self {
        self.styles.push(css);
        self
    }

    #[must_use]
    pub fn markup(mut self, html: String) -> Self {
        self.body.push(html);
        self
    }

    #[must_use]
    pub fn script(mut self, js: String) -> Self {
        self.scripts.push(js);
        self
    }

    /// Render the finished document.
    ///
    /// # Errors
    /// Propagates template slot mismatches.
    pub fn render(&self) -> Result<String, TemplateError> {
        tracing::trace!(
            engine = self.engine.name(),
            styles = self.styles.len(),
            markup = self.body.len(),
            scripts = self.scripts.len(),
            "assembling page"
        );
        PAGE.render(&[
            Slot::text("title", self.title.as_str()),
            Slot::raw("styles", self.styles.join("\n")),
            Slot::new("library", self.engine.library_script(), Escape::Script),
            Slot::new("engine", self.engine.adapter_script(), Escape::Script),
            Slot::attribute("body_class", self.body_class.as_str()),
            Slot::raw("body", self.body.join("\n")),
            Slot::new("script", self.scripts.join("\n"), Escape::Script),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MermaidJs;

    #[test]
    fn test_page_places_units_in_order() {
        let engine = MermaidJs::new("/* LIB */");
        let html = Page::new(&engine)
            .title("a <b>")
            .body_class("dark")
            .style("body { color: red; }".to_string())
            .markup("<div id=\"one\"></div>".to_string())
            .script("first();".to_string())
            .script("second();".to_string())
            .render()
            .unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>a &lt;b&gt;</title>"));
        assert!(html.contains("<body class=\"dark\">"));
        let lib = html.find("/* LIB */").unwrap();
        let adapter = html.find("const diagramEngine").unwrap();
        let first = html.find("first();").unwrap();
        let second = html.find("second();").unwrap();
        assert!(lib < adapter && adapter < first && first < second);
    }

    #[test]
    fn test_script_units_cannot_end_script_element() {
        let engine = MermaidJs::new("x");
        let html = Page::new(&engine)
            .script("const s = `</script><b>`;".to_string())
            .render()
            .unwrap();
        assert!(html.contains("const s = `<\\/script><b>`;"));
        assert_eq!(html.matches("</script>").count(), 3);
    }
}
