//! Debounced reloading of a diagram source file.
//!
//! Events come from the `notify` crate. The parent directory is watched
//! rather than the file, since editors commonly save by writing a temporary
//! file and renaming it over the original.
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::PreviewError;
use crate::markdown::load_diagram_source;

/// Quiet period before a burst of events counts as one change.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);
/// How often callers are expected to poll.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Raw change detection for one diagram file.
///
/// Knows nothing about file contents; [`SourceWatcher`] layers the reload
/// and the changed-text check on top.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    watch_root: PathBuf,
    target_path: PathBuf,
    target_name: Option<OsString>,
    debounce: Duration,
    pending_since: Option<Instant>,
}

impl FileWatcher {
    /// Start watching the diagram file at `path` through its parent directory.
    ///
    /// # Errors
    /// Returns an error if the file watcher cannot be created or the path cannot be watched.
    pub fn new(path: impl AsRef<Path>, debounce: Duration) -> notify::Result<Self> {
        // Event paths from the OS are canonical.
        let target_path = path
            .as_ref()
            .canonicalize()
            .unwrap_or_else(|_| path.as_ref().to_path_buf());
        let target_name = target_path.file_name().map(std::ffi::OsStr::to_os_string);
        let watch_root = watch_root_for(&target_path);

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(&watch_root, RecursiveMode::NonRecursive)?;
        tracing::debug!(
            target = %target_path.display(),
            root = %watch_root.display(),
            "watching diagram source"
        );

        Ok(Self {
            _watcher: watcher,
            rx,
            watch_root,
            target_path,
            target_name,
            debounce,
            pending_since: None,
        })
    }

    /// The canonical path of the file being watched.
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// True once events for the diagram file have been quiet for the
    /// debounce period. Each burst is reported once.
    pub fn take_change_ready(&mut self) -> bool {
        if self.drain_events() {
            self.pending_since = Some(Instant::now());
        }
        match self.pending_since {
            Some(since) if since.elapsed() >= self.debounce => {
                self.pending_since = None;
                true
            }
            _ => false,
        }
    }

    // Whether any queued event touched the diagram file.
    fn drain_events(&self) -> bool {
        let mut touched = false;
        for event in self.rx.try_iter() {
            match event {
                Ok(ev) if self.is_relevant(&ev) => touched = true,
                Ok(ev) => tracing::trace!(kind = ?ev.kind, paths = ?ev.paths, "unrelated event"),
                Err(err) => tracing::warn!(%err, "watch error"),
            }
        }
        touched
    }

    fn is_relevant(&self, event: &Event) -> bool {
        event.paths.iter().any(|path| {
            path == &self.watch_root
                || path == &self.target_path
                || self
                    .target_name
                    .as_ref()
                    .is_some_and(|name| path.file_name().is_some_and(|f| f == name))
        })
    }
}

fn watch_root_for(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// A watched diagram file and the source last loaded from it.
///
/// Directory-level events fire for unrelated files too, so a change is only
/// reported when the extracted diagram text actually differs.
pub struct SourceWatcher {
    watcher: FileWatcher,
    path: PathBuf,
    current: String,
}

impl SourceWatcher {
    /// Load `path` and start watching it.
    ///
    /// # Errors
    /// Load failures as [`PreviewError`]; watcher setup failures are
    /// reported as [`PreviewError::Unreadable`].
    pub fn new(path: impl Into<PathBuf>, debounce: Duration) -> Result<Self, PreviewError> {
        let path = path.into();
        let current = load_diagram_source(&path)?;
        let watcher = FileWatcher::new(&path, debounce).map_err(|err| PreviewError::Unreadable {
            path: path.clone(),
            source: std::io::Error::other(err),
        })?;
        Ok(Self {
            watcher,
            path,
            current,
        })
    }

    /// The diagram source as last loaded.
    pub fn source(&self) -> &str {
        &self.current
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The new source, if the file changed since the last call.
    ///
    /// A file that briefly disappears mid-save keeps the previous source.
    pub fn poll(&mut self) -> Option<&str> {
        if !self.watcher.take_change_ready() {
            return None;
        }
        match load_diagram_source(&self.path) {
            Ok(source) if source != self.current => {
                tracing::info!(path = %self.path.display(), "diagram source changed");
                self.current = source;
                Some(&self.current)
            }
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "reload failed, keeping previous source");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::EventKind;
    use tempfile::tempdir;

    fn wait_for<T>(mut poll: impl FnMut() -> Option<T>, every: Duration) -> Option<T> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Some(value) = poll() {
                return Some(value);
            }
            std::thread::sleep(every);
        }
        None
    }

    #[test]
    fn test_directory_level_event_is_relevant_for_watched_file() {
        let dir = tempdir().expect("tempdir");
        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let path = canonical_dir.join("chart.mmd");
        std::fs::write(&path, "graph TD").expect("write");
        let watcher = FileWatcher::new(&path, Duration::from_millis(10)).expect("watcher");

        // FSEvents reports the directory, not the file.
        let event = Event {
            kind: EventKind::Any,
            paths: vec![canonical_dir],
            attrs: notify::event::EventAttributes::new(),
        };

        assert!(watcher.is_relevant(&event));
    }

    #[test]
    fn test_sibling_file_event_is_not_relevant() {
        let dir = tempdir().expect("tempdir");
        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let path = canonical_dir.join("chart.mmd");
        std::fs::write(&path, "graph TD").expect("write");
        let watcher = FileWatcher::new(&path, Duration::from_millis(10)).expect("watcher");

        let event = Event {
            kind: EventKind::Any,
            paths: vec![canonical_dir.join("other.mmd")],
            attrs: notify::event::EventAttributes::new(),
        };
        assert!(!watcher.is_relevant(&event));
    }

    #[test]
    fn test_settled_change_is_reported_once() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("chart.mmd");
        std::fs::write(&path, "graph TD").expect("write");
        let mut watcher = FileWatcher::new(&path, Duration::from_millis(10)).expect("watcher");

        let settled = Instant::now().checked_sub(Duration::from_millis(50)).expect("instant");
        watcher.pending_since = Some(settled);
        assert!(watcher.take_change_ready());
        assert!(!watcher.take_change_ready());
    }

    #[test]
    fn test_watch_root_for_relative_file_is_dot() {
        let root = watch_root_for(Path::new("diagram.mmd"));
        assert_eq!(root, PathBuf::from("."));
    }

    #[test]
    fn test_real_modification_with_cli_timing() {
        let dir = tempdir().expect("tempdir");
        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let path = canonical_dir.join("flow.mermaid");
        std::fs::write(&path, "graph TD").expect("write");

        let mut watcher = FileWatcher::new(&path, DEFAULT_DEBOUNCE).expect("watcher");
        // Let the backend register the watch.
        std::thread::sleep(Duration::from_millis(500));
        std::fs::write(&path, "graph LR").expect("write");

        let detected = wait_for(|| watcher.take_change_ready().then_some(()), POLL_INTERVAL);
        assert!(detected.is_some(), "change not reported within 5 seconds");
    }

    #[test]
    fn test_source_watcher_reports_new_diagram_text() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# a\n```mermaid\ngraph TD\n```\n").expect("write");

        let mut watcher = SourceWatcher::new(&path, DEFAULT_DEBOUNCE).expect("watcher");
        assert_eq!(watcher.source(), "graph TD");
        std::thread::sleep(Duration::from_millis(500));

        std::fs::write(&path, "# b\n```mermaid\ngraph LR\n```\n").expect("write");
        let changed = wait_for(|| watcher.poll().map(str::to_string), Duration::from_millis(50));
        assert_eq!(changed.as_deref(), Some("graph LR"));
        assert_eq!(watcher.source(), "graph LR");
    }

    #[test]
    fn test_source_watcher_rejects_unsupported_files() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "x").expect("write");
        let err = SourceWatcher::new(&path, DEFAULT_DEBOUNCE).err().expect("error");
        assert_eq!(err.code(), 2);
    }
}
