//! Static text templates with named, escape-declaring substitution points.
//!
//! A template is plain text containing `{{name}}` slots. Every value passed
//! to [`Template::render`] says which [`Escape`] regime it needs, so the
//! escaping decision sits next to the value instead of inside a format string.

use std::collections::HashSet;

use thiserror::Error;

use super::escape::Escape;

/// A value bound to a slot.
#[derive(Debug, Clone)]
pub struct Slot<'a> {
    name: &'static str,
    value: std::borrow::Cow<'a, str>,
    escape: Escape,
}

impl<'a> Slot<'a> {
    pub fn new(name: &'static str, value: impl Into<std::borrow::Cow<'a, str>>, escape: Escape) -> Self {
        Self {
            name,
            value: value.into(),
            escape,
        }
    }

    /// Markup, CSS, or script generated by this crate.
    pub fn raw(name: &'static str, value: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        Self::new(name, value, Escape::Raw)
    }

    pub fn text(name: &'static str, value: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        Self::new(name, value, Escape::Text)
    }

    pub fn attribute(name: &'static str, value: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        Self::new(name, value, Escape::Attribute)
    }

    pub fn template_literal(
        name: &'static str,
        value: impl Into<std::borrow::Cow<'a, str>>,
    ) -> Self {
        Self::new(name, value, Escape::TemplateLiteral)
    }

    pub fn js_string(name: &'static str, value: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        Self::new(name, value, Escape::JsString)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template {template}: no value for slot {{{{{slot}}}}}")]
    MissingSlot {
        template: &'static str,
        slot: String,
    },
    #[error("template {template}: value given for unknown slot {slot:?}")]
    UnknownSlot {
        template: &'static str,
        slot: &'static str,
    },
}

/// A named static template.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    name: &'static str,
    source: &'static str,
}

impl Template {
    pub const fn new(name: &'static str, source: &'static str) -> Self {
        Self { name, source }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Substitute every slot.
    ///
    /// # Errors
    /// Fails if the template uses a slot with no value, or a value is given
    /// for a slot the template does not contain.
    pub fn render(&self, slots: &[Slot<'_>]) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len() + 256);
        let mut used: HashSet<&str> = HashSet::new();
        let mut rest = self.source;

        while let Some(start) = rest.find("{{") {
            let after_open = &rest[start + 2..];
            let Some(end) = after_open.find("}}") else {
                break;
            };
            let name = &after_open[..end];
            if !is_slot_name(name) {
                out.push_str(&rest[..start + 2]);
                rest = after_open;
                continue;
            }
            out.push_str(&rest[..start]);
            let slot = slots
                .iter()
                .find(|slot| slot.name == name)
                .ok_or_else(|| TemplateError::MissingSlot {
                    template: self.name,
                    slot: name.to_string(),
                })?;
            out.push_str(&slot.escape.apply(&slot.value));
            used.insert(slot.name);
            rest = &after_open[end + 2..];
        }
        out.push_str(rest);

        if let Some(unused) = slots.iter().find(|slot| !used.contains(slot.name)) {
            return Err(TemplateError::UnknownSlot {
                template: self.name,
                slot: unused.name,
            });
        }
        Ok(out)
    }
}

fn is_slot_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
