use std::path::PathBuf;

use crate::options::{BackgroundMode, DarkModeSetting, HexColor, MouseMode, RenderOptions, Sizing, Theme};

/// Environment variable that points every process at one settings file.
pub const SETTINGS_ENV: &str = "MERMAIDVIEW_SETTINGS";

/// App group shared by the viewer and its preview extensions on macOS.
pub const APP_GROUP: &str = "group.com.mermaid.viewer";

const SETTINGS_FILE: &str = "settings.json";

/// Location of the shared settings domain.
pub fn settings_path() -> PathBuf {
    if let Some(path) = std::env::var_os(SETTINGS_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("mermaidview").join(SETTINGS_FILE);
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Group Containers")
                .join(APP_GROUP)
                .join(SETTINGS_FILE);
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|p| !p.is_empty()) {
            return PathBuf::from(xdg).join("mermaidview").join(SETTINGS_FILE);
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("mermaidview")
                .join(SETTINGS_FILE);
        }
    }

    PathBuf::from(".mermaidview.json")
}

/// Render options given on the command line, layered over the stored
/// snapshot. `None` keeps the stored value.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenderOverrides {
    pub theme: Option<Theme>,
    pub dark_mode: Option<DarkModeSetting>,
    pub sizing: Option<Sizing>,
    pub background_mode: Option<BackgroundMode>,
    pub background_color: Option<HexColor>,
    pub mouse_mode: Option<MouseMode>,
    pub hide_toolbar: bool,
    pub show_debug: bool,
}

impl RenderOverrides {
    /// Merge two layers; `other` wins for valued options, flags accumulate.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            theme: other.theme.or(self.theme),
            dark_mode: other.dark_mode.or(self.dark_mode),
            sizing: other.sizing.or(self.sizing),
            background_mode: other.background_mode.or(self.background_mode),
            background_color: other
                .background_color
                .clone()
                .or_else(|| self.background_color.clone()),
            mouse_mode: other.mouse_mode.or(self.mouse_mode),
            hide_toolbar: self.hide_toolbar || other.hide_toolbar,
            show_debug: self.show_debug || other.show_debug,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Write the overrides into `options`.
    ///
    /// Picking a colour implies an opaque background unless a background
    /// mode was also given, as the toolbar colour picker does.
    pub fn apply(&self, options: &mut RenderOptions) {
        if let Some(theme) = self.theme {
            options.theme = theme;
        }
        if let Some(mode) = self.dark_mode {
            options.dark_mode = mode;
        }
        if let Some(sizing) = self.sizing {
            options.sizing = sizing;
        }
        if let Some(color) = &self.background_color {
            options.background_color = color.clone();
            options.background_mode = BackgroundMode::Opaque;
        }
        if let Some(mode) = self.background_mode {
            options.background_mode = mode;
        }
        if let Some(mode) = self.mouse_mode {
            options.mouse_mode = mode;
        }
        if self.hide_toolbar {
            options.show_toolbar = false;
        }
        if self.show_debug {
            options.show_debug = true;
        }
    }

    /// `options` with the overrides applied.
    pub fn applied_to(&self, mut options: RenderOptions) -> RenderOptions {
        self.apply(&mut options);
        options
    }
}
