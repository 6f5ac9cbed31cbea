//! Bundled assets: the rendering library and toolbar icons.
//!
//! Everything is read once when a renderer is created and inlined into every
//! page, icons as `data:` URIs, so generated documents never fetch anything.
//! Missing files degrade: the library becomes a stub that reports itself,
//! icons become empty sources.

use std::path::{Path, PathBuf};

use base64::Engine;

use crate::engine::{MISSING_LIBRARY_STUB, MermaidJs};

/// Library file name inside the assets directory.
pub const LIBRARY_FILE: &str = "mermaid.min.js";
/// Icon subdirectory inside the assets directory.
pub const ICON_DIR: &str = "icons";

/// Environment variable overriding the assets directory.
pub const ASSETS_ENV: &str = "MERMAIDVIEW_ASSETS";

/// Toolbar icons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Icon {
    Hand,
    Arrow,
    ZoomOut,
    ZoomIn,
    ZoomReset,
    Checker,
}

impl Icon {
    pub const ALL: [Self; 6] = [
        Self::Hand,
        Self::Arrow,
        Self::ZoomOut,
        Self::ZoomIn,
        Self::ZoomReset,
        Self::Checker,
    ];

    /// File stem under `icons/`.
    pub const fn file_stem(self) -> &'static str {
        match self {
            Self::Hand => "icon-hand",
            Self::Arrow => "icon-arrow",
            Self::ZoomOut => "icon-zoom-out",
            Self::ZoomIn => "icon-zoom-in",
            Self::ZoomReset => "icon-zoom-reset",
            Self::Checker => "icon-checker",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Icon data URIs, empty for icons that could not be loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IconSet {
    uris: [String; 6],
}

impl IconSet {
    /// Load every icon from `dir` (the `icons/` directory).
    pub fn load(dir: &Path) -> Self {
        let mut set = Self::default();
        for icon in Icon::ALL {
            let path = dir.join(format!("{}.png", icon.file_stem()));
            match std::fs::read(&path) {
                Ok(bytes) => set.uris[icon.index()] = png_data_uri(&bytes),
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "toolbar icon missing");
                }
            }
        }
        set
    }

    pub fn with(mut self, icon: Icon, uri: impl Into<String>) -> Self {
        self.uris[icon.index()] = uri.into();
        self
    }

    pub fn uri(&self, icon: Icon) -> &str {
        &self.uris[icon.index()]
    }
}

/// Encode PNG bytes as a `data:` URI.
pub fn png_data_uri(bytes: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Library script plus icons.
#[derive(Debug, Clone)]
pub struct AssetBundle {
    pub library: String,
    pub icons: IconSet,
}

impl Default for AssetBundle {
    fn default() -> Self {
        Self {
            library: MISSING_LIBRARY_STUB.to_string(),
            icons: IconSet::default(),
        }
    }
}

impl AssetBundle {
    /// Load assets from `dir`, degrading per file.
    pub fn load(dir: &Path) -> Self {
        let library_path = dir.join(LIBRARY_FILE);
        let library = std::fs::read_to_string(&library_path).unwrap_or_else(|err| {
            tracing::warn!(path = %library_path.display(), %err, "diagram library missing, using stub");
            MISSING_LIBRARY_STUB.to_string()
        });
        Self {
            library,
            icons: IconSet::load(&dir.join(ICON_DIR)),
        }
    }

    pub fn engine(&self) -> MermaidJs {
        MermaidJs::new(self.library.clone())
    }
}

/// Resolve the assets directory: explicit path, then [`ASSETS_ENV`], then
/// `assets/` next to the executable.
pub fn resolve_assets_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Some(env) = std::env::var_os(ASSETS_ENV) {
        return PathBuf::from(env);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("assets")))
        .unwrap_or_else(|| PathBuf::from("assets"))
}
