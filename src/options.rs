//! Render options and the theme / dark-mode / sizing resolution rules.
//!
//! [`RenderOptions`] is a snapshot: it is built once per render call (usually
//! from the settings store) and never mutated by the generator. Everything
//! derived from it, such as the effective theme, is computed by
//! [`RenderOptions::resolve`] and never stored.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a stored or typed option value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} value: {value:?}")]
pub struct ParseOptionError {
    kind: &'static str,
    value: String,
}

impl ParseOptionError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// Enums whose wire names are the strings stored under the `ql.*` keys.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
        )]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $wire)]
                #[value(name = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The name used in the settings store and on the command line.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseOptionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    _ => Err(ParseOptionError::new($kind, s)),
                }
            }
        }
    };
}

wire_enum! {
    /// Mermaid theme name.
    Theme, "theme" {
        #[default]
        Default => "default",
        Forest => "forest",
        Dark => "dark",
        Neutral => "neutral",
        Base => "base",
    }
}

wire_enum! {
    /// Dark-mode policy. A policy, not a resolved flag.
    DarkModeSetting, "dark mode" {
        #[default]
        System => "system",
        Light => "light",
        Dark => "dark",
    }
}

wire_enum! {
    /// How the rendered svg is sized inside the page.
    Sizing, "sizing" {
        #[default]
        Fit => "fit",
        ExpandVertical => "expandVertical",
        ExpandHorizontal => "expandHorizontal",
        Original => "original",
    }
}

wire_enum! {
    /// Page background behind the diagram.
    BackgroundMode, "background mode" {
        #[default]
        Transparent => "transparent",
        Opaque => "opaque",
    }
}

wire_enum! {
    /// What a left-button drag does.
    MouseMode, "mouse mode" {
        #[default]
        Pan => "pan",
        Select => "select",
    }
}

wire_enum! {
    /// What the file thumbnail shows.
    ThumbnailStyle, "thumbnail style" {
        /// Document glyph with a small flowchart on it.
        #[default]
        Diagram => "diagram",
        /// Bare document glyph.
        Icon => "icon",
    }
}

impl Theme {
    /// Human readable label for pickers.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::Forest => "Forest",
            Self::Dark => "Dark",
            Self::Neutral => "Neutral",
            Self::Base => "Base",
        }
    }
}

impl Sizing {
    /// CSS declarations applied to both the diagram card and its svg.
    pub const fn css(self) -> &'static str {
        match self {
            Self::Fit => "max-width: 100%; max-height: 100%;",
            Self::ExpandVertical => "height: 100%; width: auto;",
            Self::ExpandHorizontal => "width: 100%; height: auto;",
            Self::Original => "",
        }
    }
}

/// A validated `#rgb` / `#rrggbb` colour.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    /// Default opaque background.
    pub const DEFAULT: &'static str = "#f5f5f5";

    /// The colour with its leading `#`, lowercased.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for HexColor {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl FromStr for HexColor {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('#')
            .ok_or_else(|| ParseOptionError::new("color", s))?;
        if !matches!(digits.len(), 3 | 6) || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseOptionError::new("color", s));
        }
        Ok(Self(format!("#{}", digits.to_ascii_lowercase())))
    }
}

impl TryFrom<String> for HexColor {
    type Error = ParseOptionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HexColor> for String {
    fn from(value: HexColor) -> Self {
        value.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every user-tunable rendering parameter for one render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub theme: Theme,
    pub dark_mode: DarkModeSetting,
    pub sizing: Sizing,
    pub show_toolbar: bool,
    pub show_debug: bool,
    pub background_mode: BackgroundMode,
    pub background_color: HexColor,
    pub mouse_mode: MouseMode,
    /// Diagnostic text shown in the debug overlay.
    pub debug_label: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            theme: Theme::Default,
            dark_mode: DarkModeSetting::System,
            sizing: Sizing::Fit,
            show_toolbar: true,
            show_debug: false,
            background_mode: BackgroundMode::Transparent,
            background_color: HexColor::default(),
            mouse_mode: MouseMode::Pan,
            debug_label: String::new(),
        }
    }
}

/// Values derived from [`RenderOptions`] and the current system appearance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStyle {
    pub effective_dark: bool,
    pub effective_theme: Theme,
    pub sizing_css: &'static str,
    pub background_css: String,
}

impl RenderOptions {
    /// Apply the dark-mode policy to the system appearance.
    pub const fn is_dark_mode(&self, system_is_dark: bool) -> bool {
        match self.dark_mode {
            DarkModeSetting::Light => false,
            DarkModeSetting::Dark => true,
            DarkModeSetting::System => system_is_dark,
        }
    }

    /// The theme mermaid actually uses: `default` turns into `dark` in dark
    /// mode, any explicit theme is kept.
    pub const fn effective_theme(&self, system_is_dark: bool) -> Theme {
        if matches!(self.theme, Theme::Default) && self.is_dark_mode(system_is_dark) {
            Theme::Dark
        } else {
            self.theme
        }
    }

    /// CSS declarations for the page background.
    pub fn background_css(&self) -> String {
        match self.background_mode {
            BackgroundMode::Transparent => String::new(),
            BackgroundMode::Opaque => format!("background: {};", self.background_color),
        }
    }

    /// Script expression that evaluates to the page's dark flag. In system
    /// mode the page asks the browser at display time.
    pub const fn dark_mode_js(&self) -> &'static str {
        match self.dark_mode {
            DarkModeSetting::Light => "false",
            DarkModeSetting::Dark => "true",
            DarkModeSetting::System => "window.matchMedia('(prefers-color-scheme: dark)').matches",
        }
    }

    pub fn resolve(&self, system_is_dark: bool) -> ResolvedStyle {
        ResolvedStyle {
            effective_dark: self.is_dark_mode(system_is_dark),
            effective_theme: self.effective_theme(system_is_dark),
            sizing_css: self.sizing.css(),
            background_css: self.background_css(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with(theme: Theme, dark_mode: DarkModeSetting) -> RenderOptions {
        RenderOptions {
            theme,
            dark_mode,
            ..RenderOptions::default()
        }
    }

    #[test]
    fn test_default_theme_forced_dark_becomes_dark() {
        let opts = with(Theme::Default, DarkModeSetting::Dark);
        assert_eq!(opts.effective_theme(false), Theme::Dark);
    }

    #[test]
    fn test_default_theme_follows_dark_system() {
        let opts = with(Theme::Default, DarkModeSetting::System);
        assert_eq!(opts.effective_theme(true), Theme::Dark);
        assert_eq!(opts.effective_theme(false), Theme::Default);
    }

    #[test]
    fn test_explicit_theme_never_overridden() {
        let opts = with(Theme::Forest, DarkModeSetting::Dark);
        assert_eq!(opts.effective_theme(false), Theme::Forest);
        assert_eq!(opts.effective_theme(true), Theme::Forest);
    }

    #[test]
    fn test_light_setting_ignores_dark_system() {
        let opts = with(Theme::Default, DarkModeSetting::Light);
        let resolved = opts.resolve(true);
        assert!(!resolved.effective_dark);
        assert_eq!(resolved.effective_theme, Theme::Default);
    }

    #[test]
    fn test_sizing_table() {
        assert_eq!(Sizing::Fit.css(), "max-width: 100%; max-height: 100%;");
        assert_eq!(Sizing::ExpandVertical.css(), "height: 100%; width: auto;");
        assert_eq!(Sizing::ExpandHorizontal.css(), "width: 100%; height: auto;");
        assert_eq!(Sizing::Original.css(), "");
    }

    #[test]
    fn test_background_css_only_when_opaque() {
        let mut opts = RenderOptions::default();
        assert_eq!(opts.background_css(), "");
        opts.background_mode = BackgroundMode::Opaque;
        opts.background_color = "#ABCDEF".parse().unwrap();
        assert_eq!(opts.background_css(), "background: #abcdef;");
    }

    #[test]
    fn test_wire_names_round_trip() {
        for sizing in Sizing::ALL {
            assert_eq!(sizing.as_str().parse::<Sizing>().unwrap(), *sizing);
        }
        assert_eq!("expandHorizontal".parse::<Sizing>(), Ok(Sizing::ExpandHorizontal));
        assert!("huge".parse::<Sizing>().is_err());
        assert_eq!(
            serde_json::to_string(&Sizing::ExpandVertical).unwrap(),
            "\"expandVertical\""
        );
    }

    #[test]
    fn test_hex_color_validation() {
        assert_eq!("#FFF".parse::<HexColor>().unwrap().as_str(), "#fff");
        assert!("f5f5f5".parse::<HexColor>().is_err());
        assert!("#12345".parse::<HexColor>().is_err());
        assert!("#f5f5f5'; alert(1)".parse::<HexColor>().is_err());
    }

    #[test]
    fn test_dark_mode_js_expressions() {
        assert_eq!(with(Theme::Base, DarkModeSetting::Light).dark_mode_js(), "false");
        assert_eq!(with(Theme::Base, DarkModeSetting::Dark).dark_mode_js(), "true");
        assert!(
            with(Theme::Base, DarkModeSetting::System)
                .dark_mode_js()
                .contains("prefers-color-scheme: dark")
        );
    }
}
