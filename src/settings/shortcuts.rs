//! Rebindable keyboard shortcuts of the viewer app.
//!
//! Bindings are stored under `keyboardShortcuts` as a JSON object from action
//! name to `{ "key": …, "modifiers": … }`. Modifier values are the raw
//! device-independent flag bits the native key events carry, so a stored
//! mapping means the same thing to every process reading it.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{SettingKey, SettingsError, SettingsStore};
use crate::options::ParseOptionError;

/// Hardware key code of the escape key.
pub const ESCAPE_KEY_CODE: u16 = 53;

/// Modifier flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Modifiers(u64);

impl Modifiers {
    pub const NONE: Self = Self(0);
    pub const SHIFT: Self = Self(1 << 17);
    pub const CONTROL: Self = Self(1 << 18);
    pub const OPTION: Self = Self(1 << 19);
    pub const COMMAND: Self = Self(1 << 20);

    const RELEVANT: u64 = Self::SHIFT.0 | Self::CONTROL.0 | Self::OPTION.0 | Self::COMMAND.0;

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Only the four modifiers a shortcut can use; device-dependent and
    /// lock bits are dropped.
    #[must_use]
    pub const fn relevant(self) -> Self {
        Self(self.0 & Self::RELEVANT)
    }

    /// A shortcut needs at least one of command, control, or option.
    pub const fn has_command_like(self) -> bool {
        self.0 & (Self::COMMAND.0 | Self::CONTROL.0 | Self::OPTION.0) != 0
    }

    /// Glyphs in menu order: control, option, shift, command.
    pub fn glyphs(self) -> String {
        [
            (Self::CONTROL, '⌃'),
            (Self::OPTION, '⌥'),
            (Self::SHIFT, '⇧'),
            (Self::COMMAND, '⌘'),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, glyph)| glyph)
        .collect()
    }
}

impl BitOr for Modifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Things a shortcut can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShortcutAction {
    NextTab,
    PreviousTab,
    ToggleEditor,
}

impl ShortcutAction {
    pub const ALL: [Self; 3] = [Self::NextTab, Self::PreviousTab, Self::ToggleEditor];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NextTab => "nextTab",
            Self::PreviousTab => "previousTab",
            Self::ToggleEditor => "toggleEditor",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Self::NextTab => "Show Next Tab",
            Self::PreviousTab => "Show Previous Tab",
            Self::ToggleEditor => "Toggle Editor",
        }
    }

    pub fn default_shortcut(self) -> StoredShortcut {
        match self {
            Self::NextTab => StoredShortcut::new("\t", Modifiers::CONTROL),
            Self::PreviousTab => StoredShortcut::new("\t", Modifiers::CONTROL | Modifiers::SHIFT),
            Self::ToggleEditor => StoredShortcut::new("1", Modifiers::COMMAND),
        }
    }
}

impl fmt::Display for ShortcutAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShortcutAction {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| ParseOptionError::new("shortcut action", s))
    }
}

/// A key plus modifier flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoredShortcut {
    pub key: String,
    pub modifiers: Modifiers,
}

// Key characters with a name of their own: (stored, glyph, typed names).
const NAMED_KEYS: &[(&str, &str, &[&str])] = &[
    ("\t", "⇥", &["tab"]),
    ("\r", "↩", &["return", "enter"]),
    (" ", "Space", &["space"]),
    ("\u{7f}", "⌫", &["delete", "backspace"]),
    ("\u{1b}", "⎋", &["escape", "esc"]),
    ("\u{f700}", "↑", &["up"]),
    ("\u{f701}", "↓", &["down"]),
    ("\u{f702}", "←", &["left"]),
    ("\u{f703}", "→", &["right"]),
];

impl StoredShortcut {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }

    /// Display name of the key alone.
    pub fn key_display(&self) -> String {
        if self.key == "\n" {
            return "↩".to_string();
        }
        NAMED_KEYS
            .iter()
            .find(|(stored, _, _)| *stored == self.key)
            .map_or_else(|| self.key.to_uppercase(), |(_, glyph, _)| (*glyph).to_string())
    }

    /// Menu-style label such as `⌃⇧⇥`.
    pub fn display_string(&self) -> String {
        format!("{}{}", self.modifiers.glyphs(), self.key_display())
    }
}

impl fmt::Display for StoredShortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_string())
    }
}

/// Parses `ctrl+shift+tab`, `cmd+1`, `opt+right` and similar.
impl FromStr for StoredShortcut {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseOptionError::new("shortcut", s);
        let (mods, key) = match s.strip_suffix("++") {
            Some(rest) => (rest, "+"),
            None => s.rsplit_once('+').unwrap_or(("", s)),
        };
        if key.is_empty() {
            return Err(invalid());
        }

        let mut modifiers = Modifiers::NONE;
        for part in mods.split('+').filter(|p| !p.is_empty()) {
            modifiers = modifiers
                | match part.to_ascii_lowercase().as_str() {
                    "cmd" | "command" | "⌘" => Modifiers::COMMAND,
                    "ctrl" | "control" | "⌃" => Modifiers::CONTROL,
                    "opt" | "option" | "alt" | "⌥" => Modifiers::OPTION,
                    "shift" | "⇧" => Modifiers::SHIFT,
                    _ => return Err(invalid()),
                };
        }

        let lower = key.to_lowercase();
        let key = NAMED_KEYS
            .iter()
            .find(|(_, _, names)| names.contains(&lower.as_str()))
            .map(|(stored, _, _)| (*stored).to_string());
        let key = match key {
            Some(named) => named,
            None if lower.chars().count() == 1 => lower,
            None => return Err(invalid()),
        };
        Ok(Self { key, modifiers })
    }
}

/// A key press delivered while recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key_code: u16,
    /// Characters ignoring modifiers.
    pub characters: String,
    pub modifiers: Modifiers,
}

/// What recording made of a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Escape: recording stops, binding unchanged.
    Cancelled,
    /// Not a usable shortcut; recording continues.
    Ignored,
    /// Stored as the new binding; recording stops.
    Recorded(StoredShortcut),
}

/// JSON for the default mapping, as it would be stored.
pub fn default_mapping_json() -> Value {
    let defaults: BTreeMap<&str, StoredShortcut> = ShortcutAction::ALL
        .into_iter()
        .map(|action| (action.as_str(), action.default_shortcut()))
        .collect();
    serde_json::to_value(defaults).unwrap_or(Value::Null)
}

/// Current bindings, persisted on every change.
#[derive(Debug)]
pub struct ShortcutManager {
    store: SettingsStore,
    shortcuts: BTreeMap<String, StoredShortcut>,
}

impl ShortcutManager {
    /// Load from the store. Missing or unreadable data means the defaults.
    pub fn load(store: SettingsStore) -> Self {
        let shortcuts = match store.raw(SettingKey::KeyboardShortcuts) {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|err| {
                tracing::warn!(%err, "ignoring malformed keyboard shortcuts");
                Self::defaults()
            }),
            Ok(None) => Self::defaults(),
            Err(err) => {
                tracing::warn!(%err, "could not read keyboard shortcuts");
                Self::defaults()
            }
        };
        Self { store, shortcuts }
    }

    fn defaults() -> BTreeMap<String, StoredShortcut> {
        ShortcutAction::ALL
            .into_iter()
            .map(|action| (action.as_str().to_string(), action.default_shortcut()))
            .collect()
    }

    pub fn shortcut(&self, action: ShortcutAction) -> StoredShortcut {
        self.shortcuts
            .get(action.as_str())
            .cloned()
            .unwrap_or_else(|| action.default_shortcut())
    }

    pub fn is_default(&self, action: ShortcutAction) -> bool {
        self.shortcut(action) == action.default_shortcut()
    }

    /// # Errors
    /// Store write failures.
    pub fn set(&mut self, action: ShortcutAction, shortcut: StoredShortcut) -> Result<(), SettingsError> {
        self.shortcuts.insert(action.as_str().to_string(), shortcut);
        self.save()
    }

    /// # Errors
    /// Store write failures.
    pub fn reset(&mut self, action: ShortcutAction) -> Result<(), SettingsError> {
        self.set(action, action.default_shortcut())
    }

    /// # Errors
    /// Store write failures.
    pub fn reset_all(&mut self) -> Result<(), SettingsError> {
        self.shortcuts = Self::defaults();
        self.save()
    }

    /// Feed one key press to a recorder for `action`.
    ///
    /// # Errors
    /// Store write failures when a binding is recorded.
    pub fn record(&mut self, action: ShortcutAction, event: &KeyEvent) -> Result<RecordOutcome, SettingsError> {
        if event.key_code == ESCAPE_KEY_CODE {
            return Ok(RecordOutcome::Cancelled);
        }
        let modifiers = event.modifiers.relevant();
        if !modifiers.has_command_like() || event.characters.is_empty() {
            return Ok(RecordOutcome::Ignored);
        }
        let shortcut = StoredShortcut::new(event.characters.clone(), modifiers);
        self.set(action, shortcut.clone())?;
        Ok(RecordOutcome::Recorded(shortcut))
    }

    fn save(&self) -> Result<(), SettingsError> {
        let value = serde_json::to_value(&self.shortcuts).map_err(|source| SettingsError::InvalidJson {
            key: SettingKey::KeyboardShortcuts,
            source,
        })?;
        self.store.set_value(SettingKey::KeyboardShortcuts, value)
    }
}
