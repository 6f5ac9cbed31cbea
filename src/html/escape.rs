//! Escaping for the contexts diagram text is embedded in.

/// How a substituted value must be escaped for the place it lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    /// Trusted markup, script, or CSS produced by this crate.
    Raw,
    /// Inside an element's text content.
    Text,
    /// Inside a double-quoted attribute value.
    Attribute,
    /// Inside a JavaScript template literal (backticks).
    TemplateLiteral,
    /// Inside a single-quoted JavaScript string.
    JsString,
    /// A whole script inlined into a `<script>` element.
    Script,
}

impl Escape {
    pub fn apply(self, value: &str) -> String {
        match self {
            Self::Raw => value.to_string(),
            Self::Text => escape_text(value),
            Self::Attribute => escape_attribute(value),
            Self::TemplateLiteral => escape_template_literal(value),
            Self::JsString => escape_js_string(value),
            Self::Script => escape_inline_script(value),
        }
    }
}

/// Escape `&`, `<` and `>` for a text node.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Text escaping plus `"` for attribute values.
pub fn escape_attribute(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

/// Escape for a template literal. Carriage returns are dropped, which
/// normalizes CRLF sources to LF.
pub fn escape_template_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            '$' => out.push_str("\\$"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(ch),
        }
    }
    out
}

/// Escape for a single-quoted string literal.
pub fn escape_js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '<' => out.push_str("\\x3c"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(ch),
        }
    }
    out
}

/// Keep an inlined script from closing its own `<script>` element early.
///
/// Tag names match in any case, so `</Script` is rewritten as well. `<!--`
/// is broken up too, since it switches the parser into the escaped script
/// state. Both can only occur inside strings, regexes, or comments, where
/// `<\/` and `<\!` mean the same thing.
pub fn escape_inline_script(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(at) = rest.find('<') {
        out.push_str(&rest[..at]);
        let tail = &rest[at..];
        if starts_with_ignore_case(&tail[1..], "/script") {
            out.push_str("<\\/");
            rest = &tail[2..];
        } else if tail.starts_with("<!--") {
            out.push_str("<\\!--");
            rest = &tail[4..];
        } else {
            out.push('<');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // What an HTML parser does to escaped text content.
    fn unescape_text(s: &str) -> String {
        s.replace("&lt;", "<").replace("&gt;", ">").replace("&amp;", "&")
    }

    // What a JS engine does to the body of a template literal.
    fn unescape_template_literal(s: &str) -> String {
        let mut out = String::new();
        let mut chars = s.chars();
        while let Some(ch) = chars.next() {
            if ch == '\\' {
                match chars.next() {
                    Some('n') => out.push('\n'),
                    Some(other) => out.push(other),
                    None => out.push('\\'),
                }
            } else {
                out.push(ch);
            }
        }
        out
    }

    #[test]
    fn test_escape_text_specials() {
        assert_eq!(escape_text("A-->B & <C>"), "A--&gt;B &amp; &lt;C&gt;");
    }

    #[test]
    fn test_escape_text_ampersand_first() {
        assert_eq!(escape_text("&lt;"), "&amp;lt;");
    }

    #[test]
    fn test_template_literal_specials() {
        assert_eq!(
            escape_template_literal("a\\b`c${d}\r\ne"),
            "a\\\\b\\`c\\${d}\\ne"
        );
    }

    #[test]
    fn test_attribute_escapes_quotes() {
        assert_eq!(escape_attribute("say \"hi\" <b>"), "say &quot;hi&quot; &lt;b&gt;");
    }

    #[test]
    fn test_js_string_cannot_close_script() {
        let escaped = escape_js_string("it's </script>");
        assert_eq!(escaped, "it\\'s \\x3c/script>");
    }

    #[test]
    fn test_inline_script_cannot_close_element() {
        let lib = "var s = \"</script>\";";
        assert_eq!(escape_inline_script(lib), "var s = \"<\\/script>\";");
    }

    #[test]
    fn test_inline_script_close_tag_any_case() {
        assert_eq!(
            escape_inline_script("a </Script> b </sCrIpT c </SCRIPT"),
            "a <\\/Script> b <\\/sCrIpT c <\\/SCRIPT"
        );
    }

    #[test]
    fn test_inline_script_breaks_comment_open() {
        assert_eq!(escape_inline_script("x = '<!-- y';"), "x = '<\\!-- y';");
        assert_eq!(escape_inline_script("a < b && c <= d"), "a < b && c <= d");
        assert_eq!(escape_inline_script("</scrip"), "</scrip");
    }

    proptest! {
        #[test]
        fn prop_inline_script_never_closes_element(s in "[<>/!\\-a-zA-Z ]{0,64}") {
            let escaped = escape_inline_script(&s).to_ascii_lowercase();
            prop_assert!(!escaped.contains("</script"));
            prop_assert!(!escaped.contains("<!--"));
        }

        #[test]
        fn prop_text_round_trips(s in "[a-zA-Z0-9 &<>;\\-\\n]{0,64}") {
            prop_assert_eq!(unescape_text(&escape_text(&s)), s);
        }

        #[test]
        fn prop_template_literal_round_trips_without_cr(s in "[a-zA-Z0-9 \\\\`$\\n{}]{0,64}") {
            prop_assert_eq!(unescape_template_literal(&escape_template_literal(&s)), s);
        }

        #[test]
        fn prop_template_literal_strips_cr(s in "[a-z\\r\\n`$]{0,64}") {
            let escaped = escape_template_literal(&s);
            prop_assert!(!escaped.contains('\r'));
            prop_assert_eq!(unescape_template_literal(&escaped), s.replace('\r', ""));
        }

        #[test]
        fn prop_template_literal_has_no_bare_specials(s in "[a-z\\\\`$\\n]{0,64}") {
            let escaped = escape_template_literal(&s);
            prop_assert!(!escaped.contains('\n'));
            let mut chars = escaped.chars();
            while let Some(ch) = chars.next() {
                if ch == '\\' {
                    prop_assert!(chars.next().is_some());
                } else {
                    prop_assert!(ch != '`' && ch != '$');
                }
            }
        }
    }
}
