//! Key/value backends and the typed settings facade.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::{SettingKey, SettingsError};
use crate::options::{
    BackgroundMode, DarkModeSetting, HexColor, MouseMode, RenderOptions, Sizing, Theme,
    ThumbnailStyle,
};

/// A flat string-keyed store of JSON values.
///
/// Implementations must not cache: a read reflects the latest write made
/// through any handle, in any process, that shares the same backing data.
pub trait KeyValueStore: Send + Sync {
    /// # Errors
    /// Backend read failures.
    fn get(&self, key: &str) -> Result<Option<Value>, SettingsError>;

    /// # Errors
    /// Backend read or write failures.
    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError>;

    /// # Errors
    /// Backend read or write failures.
    fn remove(&self, key: &str) -> Result<(), SettingsError>;

    /// # Errors
    /// Backend read failures.
    fn entries(&self) -> Result<BTreeMap<String, Value>, SettingsError>;
}

/// One JSON object file. Every access re-reads the file; every write is a
/// read-modify-write finished by an atomic rename, so concurrent writers
/// resolve to last-write-wins and readers never see a torn file.
///
/// There is no file lock. Last-write-wins is per file, not per key: two
/// processes writing different keys at the same moment can both read the
/// old map, and the later rename drops the other key's write.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>, SettingsError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(SettingsError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&text).map_err(|source| SettingsError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    // A corrupt file is replaced rather than blocking every future write.
    fn read_map_for_update(&self) -> Result<Map<String, Value>, SettingsError> {
        match self.read_map() {
            Err(SettingsError::Corrupt { path, source }) => {
                tracing::warn!(path = %path.display(), %source, "discarding corrupt settings file");
                Ok(Map::new())
            }
            other => other,
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file_name = self
            .path
            .file_name()
            .map_or_else(|| "settings".into(), |name| name.to_string_lossy());
        let tmp = self
            .path
            .with_file_name(format!(".{file_name}.{}.tmp", std::process::id()));
        let json = serde_json::to_string_pretty(map).map_err(|source| SettingsError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            io_err(source)
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, SettingsError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        let mut map = self.read_map_for_update()?;
        map.insert(key.to_string(), value);
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), SettingsError> {
        let mut map = self.read_map_for_update()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }

    fn entries(&self) -> Result<BTreeMap<String, Value>, SettingsError> {
        Ok(self.read_map()?.into_iter().collect())
    }
}

/// In-process store. Clones share the same map, which makes two clones
/// behave like two processes attached to one domain.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<BTreeMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, SettingsError> {
        let map = self.inner.lock().map_err(|_| SettingsError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        let mut map = self.inner.lock().map_err(|_| SettingsError::Poisoned)?;
        map.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SettingsError> {
        let mut map = self.inner.lock().map_err(|_| SettingsError::Poisoned)?;
        map.remove(key);
        Ok(())
    }

    fn entries(&self) -> Result<BTreeMap<String, Value>, SettingsError> {
        let map = self.inner.lock().map_err(|_| SettingsError::Poisoned)?;
        Ok(map.clone())
    }
}

/// One row of [`SettingsStore::list`].
#[derive(Debug, Clone, PartialEq)]
pub struct SettingEntry {
    pub key: SettingKey,
    pub value: Value,
    /// False when the value is the built-in default because nothing is stored.
    pub is_set: bool,
}

/// Typed access to the settings domain.
///
/// Getters never fail: an absent, unreadable, or malformed value yields the
/// key's default (malformed values are logged). Setters report backend
/// failures.
#[derive(Clone)]
pub struct SettingsStore {
    backend: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore").finish_non_exhaustive()
    }
}

impl SettingsStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// File-backed domain at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(FileStore::new(path))
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Stored value, if any.
    ///
    /// # Errors
    /// Backend read failures.
    pub fn raw(&self, key: SettingKey) -> Result<Option<Value>, SettingsError> {
        self.backend.get(key.name())
    }

    /// Stored value or the key's default.
    pub fn value(&self, key: SettingKey) -> Value {
        match self.raw(key) {
            Ok(Some(value)) => value,
            Ok(None) => key.default_value(),
            Err(err) => {
                tracing::warn!(%key, %err, "settings read failed, using default");
                key.default_value()
            }
        }
    }

    /// # Errors
    /// Backend write failures.
    pub fn set_value(&self, key: SettingKey, value: Value) -> Result<(), SettingsError> {
        tracing::debug!(%key, %value, "writing setting");
        self.backend.set(key.name(), value)
    }

    /// Validate user-typed text for `key` and store it.
    ///
    /// # Errors
    /// Invalid text or backend write failures.
    pub fn set_text(&self, key: SettingKey, text: &str) -> Result<(), SettingsError> {
        let value = key.parse_value(text)?;
        self.set_value(key, value)
    }

    /// Forget the stored value so the default applies again.
    ///
    /// # Errors
    /// Backend write failures.
    pub fn reset(&self, key: SettingKey) -> Result<(), SettingsError> {
        tracing::debug!(%key, "resetting setting");
        self.backend.remove(key.name())
    }

    /// # Errors
    /// Backend write failures.
    pub fn reset_all(&self) -> Result<(), SettingsError> {
        SettingKey::ALL.into_iter().try_for_each(|key| self.reset(key))
    }

    /// Every known key with its effective value.
    ///
    /// # Errors
    /// Backend read failures.
    pub fn list(&self) -> Result<Vec<SettingEntry>, SettingsError> {
        let stored = self.backend.entries()?;
        Ok(SettingKey::ALL
            .into_iter()
            .map(|key| match stored.get(key.name()) {
                Some(value) => SettingEntry {
                    key,
                    value: value.clone(),
                    is_set: true,
                },
                None => SettingEntry {
                    key,
                    value: key.default_value(),
                    is_set: false,
                },
            })
            .collect())
    }

    fn read_or<T: DeserializeOwned>(&self, key: SettingKey, default: T) -> T {
        let Some(value) = self.raw(key).unwrap_or_else(|err| {
            tracing::warn!(%key, %err, "settings read failed, using default");
            None
        }) else {
            return default;
        };
        serde_json::from_value(value.clone()).unwrap_or_else(|err| {
            tracing::warn!(%key, %value, %err, "ignoring malformed setting");
            default
        })
    }

    fn write<T: Serialize>(&self, key: SettingKey, value: &T) -> Result<(), SettingsError> {
        let value = serde_json::to_value(value)
            .map_err(|source| SettingsError::InvalidJson { key, source })?;
        self.set_value(key, value)
    }

    pub fn theme(&self) -> Theme {
        self.read_or(SettingKey::Theme, Theme::default())
    }

    /// # Errors
    /// Backend write failures.
    pub fn set_theme(&self, theme: Theme) -> Result<(), SettingsError> {
        self.write(SettingKey::Theme, &theme)
    }

    pub fn sizing(&self) -> Sizing {
        self.read_or(SettingKey::Sizing, Sizing::default())
    }

    /// # Errors
    /// Backend write failures.
    pub fn set_sizing(&self, sizing: Sizing) -> Result<(), SettingsError> {
        self.write(SettingKey::Sizing, &sizing)
    }

    pub fn dark_mode(&self) -> DarkModeSetting {
        self.read_or(SettingKey::DarkMode, DarkModeSetting::default())
    }

    /// # Errors
    /// Backend write failures.
    pub fn set_dark_mode(&self, mode: DarkModeSetting) -> Result<(), SettingsError> {
        self.write(SettingKey::DarkMode, &mode)
    }

    pub fn background_mode(&self) -> BackgroundMode {
        self.read_or(SettingKey::BackgroundMode, BackgroundMode::default())
    }

    /// # Errors
    /// Backend write failures.
    pub fn set_background_mode(&self, mode: BackgroundMode) -> Result<(), SettingsError> {
        self.write(SettingKey::BackgroundMode, &mode)
    }

    pub fn background_color(&self) -> HexColor {
        self.read_or(SettingKey::BackgroundColor, HexColor::default())
    }

    /// # Errors
    /// Backend write failures.
    pub fn set_background_color(&self, color: &HexColor) -> Result<(), SettingsError> {
        self.write(SettingKey::BackgroundColor, color)
    }

    pub fn show_debug(&self) -> bool {
        self.read_or(SettingKey::ShowDebug, false)
    }

    /// # Errors
    /// Backend write failures.
    pub fn set_show_debug(&self, show: bool) -> Result<(), SettingsError> {
        self.write(SettingKey::ShowDebug, &show)
    }

    pub fn mouse_mode(&self) -> MouseMode {
        self.read_or(SettingKey::MouseMode, MouseMode::default())
    }

    /// # Errors
    /// Backend write failures.
    pub fn set_mouse_mode(&self, mode: MouseMode) -> Result<(), SettingsError> {
        self.write(SettingKey::MouseMode, &mode)
    }

    pub fn thumbnail_enabled(&self) -> bool {
        self.read_or(SettingKey::ThumbnailEnabled, true)
    }

    /// # Errors
    /// Backend write failures.
    pub fn set_thumbnail_enabled(&self, enabled: bool) -> Result<(), SettingsError> {
        self.write(SettingKey::ThumbnailEnabled, &enabled)
    }

    pub fn thumbnail_style(&self) -> ThumbnailStyle {
        self.read_or(SettingKey::ThumbnailStyle, ThumbnailStyle::default())
    }

    /// # Errors
    /// Backend write failures.
    pub fn set_thumbnail_style(&self, style: ThumbnailStyle) -> Result<(), SettingsError> {
        self.write(SettingKey::ThumbnailStyle, &style)
    }

    /// Theme the viewer's editor starts with.
    pub fn default_theme(&self) -> Theme {
        self.read_or(SettingKey::DefaultTheme, Theme::default())
    }

    /// # Errors
    /// Backend write failures.
    pub fn set_default_theme(&self, theme: Theme) -> Result<(), SettingsError> {
        self.write(SettingKey::DefaultTheme, &theme)
    }

    /// Whether open files re-render when they change on disk.
    pub fn auto_refresh(&self) -> bool {
        self.read_or(SettingKey::AutoRefresh, true)
    }

    /// # Errors
    /// Backend write failures.
    pub fn set_auto_refresh(&self, enabled: bool) -> Result<(), SettingsError> {
        self.write(SettingKey::AutoRefresh, &enabled)
    }

    /// Render options from the shared keys, as the preview process sees them
    /// right now.
    pub fn snapshot(&self) -> RenderOptions {
        RenderOptions {
            theme: self.theme(),
            dark_mode: self.dark_mode(),
            sizing: self.sizing(),
            show_toolbar: true,
            show_debug: self.show_debug(),
            background_mode: self.background_mode(),
            background_color: self.background_color(),
            mouse_mode: self.mouse_mode(),
            debug_label: String::new(),
        }
    }
}
