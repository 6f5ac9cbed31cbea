//! The settings domain shared by the viewer, preview, and thumbnail processes.
//!
//! Settings are a flat map from key to a primitive JSON value. Keys starting
//! with `ql.` are read by the preview process; the rest belong to the viewer.
//! No process caches anything: every getter goes back to the backend, which
//! is what lets a change made in one process show up in the next preview
//! another process renders.

pub mod apply;
pub mod shortcuts;
pub mod store;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

use crate::options::{
    BackgroundMode, DarkModeSetting, HexColor, MouseMode, ParseOptionError, Sizing, Theme,
    ThumbnailStyle,
};

pub use apply::{ApplyHandle, ApplyTracker, apply_to_quicklook};
pub use shortcuts::{Modifiers, ShortcutAction, ShortcutManager, StoredShortcut};
pub use store::{FileStore, KeyValueStore, MemoryStore, SettingsStore};

/// Prefix of the keys shared with the preview process.
pub const SHARED_PREFIX: &str = "ql.";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file {} is not a JSON object: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown setting {0:?}")]
    UnknownKey(String),

    #[error("invalid value for {key}: {source}")]
    InvalidValue {
        key: SettingKey,
        #[source]
        source: ParseOptionError,
    },

    #[error("invalid JSON for {key}: {source}")]
    InvalidJson {
        key: SettingKey,
        #[source]
        source: serde_json::Error,
    },

    #[error("settings backend lock poisoned")]
    Poisoned,
}

/// Every key the domain knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingKey {
    Theme,
    Sizing,
    DarkMode,
    BackgroundMode,
    BackgroundColor,
    ShowDebug,
    MouseMode,
    ThumbnailEnabled,
    ThumbnailStyle,
    KeyboardShortcuts,
    DefaultTheme,
    AutoRefresh,
}

impl SettingKey {
    pub const ALL: [Self; 12] = [
        Self::Theme,
        Self::Sizing,
        Self::DarkMode,
        Self::BackgroundMode,
        Self::BackgroundColor,
        Self::ShowDebug,
        Self::MouseMode,
        Self::ThumbnailEnabled,
        Self::ThumbnailStyle,
        Self::KeyboardShortcuts,
        Self::DefaultTheme,
        Self::AutoRefresh,
    ];

    /// Name under which the value is stored.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Theme => "ql.theme",
            Self::Sizing => "ql.sizing",
            Self::DarkMode => "ql.darkMode",
            Self::BackgroundMode => "ql.backgroundMode",
            Self::BackgroundColor => "ql.backgroundColor",
            Self::ShowDebug => "ql.showDebug",
            Self::MouseMode => "ql.mouseMode",
            Self::ThumbnailEnabled => "thumbnail.enabled",
            Self::ThumbnailStyle => "thumbnail.style",
            Self::KeyboardShortcuts => "keyboardShortcuts",
            Self::DefaultTheme => "defaultTheme",
            Self::AutoRefresh => "autoRefresh",
        }
    }

    /// Whether the preview process reads this key.
    pub fn is_shared(self) -> bool {
        self.name().starts_with(SHARED_PREFIX)
    }

    /// Value used when the key is absent.
    pub fn default_value(self) -> Value {
        match self {
            Self::Theme | Self::DefaultTheme => Value::from(Theme::default().as_str()),
            Self::Sizing => Value::from(Sizing::default().as_str()),
            Self::DarkMode => Value::from(DarkModeSetting::default().as_str()),
            Self::BackgroundMode => Value::from(BackgroundMode::default().as_str()),
            Self::BackgroundColor => Value::from(HexColor::DEFAULT),
            Self::ShowDebug => Value::Bool(false),
            Self::MouseMode => Value::from(MouseMode::default().as_str()),
            Self::ThumbnailEnabled | Self::AutoRefresh => Value::Bool(true),
            Self::ThumbnailStyle => Value::from(ThumbnailStyle::default().as_str()),
            Self::KeyboardShortcuts => shortcuts::default_mapping_json(),
        }
    }

    /// Parse user-typed text into the value stored for this key.
    ///
    /// # Errors
    /// Returns an error when the text is not a valid value for the key.
    pub fn parse_value(self, text: &str) -> Result<Value, SettingsError> {
        let invalid = |source| SettingsError::InvalidValue { key: self, source };
        let value = match self {
            Self::Theme | Self::DefaultTheme => {
                Value::from(text.parse::<Theme>().map_err(invalid)?.as_str())
            }
            Self::Sizing => Value::from(text.parse::<Sizing>().map_err(invalid)?.as_str()),
            Self::DarkMode => Value::from(text.parse::<DarkModeSetting>().map_err(invalid)?.as_str()),
            Self::BackgroundMode => {
                Value::from(text.parse::<BackgroundMode>().map_err(invalid)?.as_str())
            }
            Self::BackgroundColor => Value::from(String::from(text.parse::<HexColor>().map_err(invalid)?)),
            Self::MouseMode => Value::from(text.parse::<MouseMode>().map_err(invalid)?.as_str()),
            Self::ThumbnailStyle => {
                Value::from(text.parse::<ThumbnailStyle>().map_err(invalid)?.as_str())
            }
            Self::ShowDebug | Self::ThumbnailEnabled | Self::AutoRefresh => {
                Value::Bool(parse_bool(text).map_err(invalid)?)
            }
            Self::KeyboardShortcuts => serde_json::from_str(text)
                .map_err(|source| SettingsError::InvalidJson { key: self, source })?,
        };
        Ok(value)
    }
}

fn parse_bool(text: &str) -> Result<bool, ParseOptionError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ParseOptionError::new("boolean", text)),
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SettingKey {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.name() == s)
            .ok_or_else(|| SettingsError::UnknownKey(s.to_string()))
    }
}
