//! Pushing changed settings to the system preview service.
//!
//! The preview process reads the store on every request, but the system
//! keeps rendered previews cached and keeps the preview UI process alive.
//! Applying resets the cache and kills the UI process so the next preview
//! is produced from fresh settings. Both steps are best effort.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

/// One external command run by an apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyStep {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ApplyStep {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    // Run to completion. Failures are logged and otherwise ignored.
    fn run(&self) -> bool {
        let result = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match result {
            Ok(status) if status.success() => true,
            Ok(status) => {
                tracing::debug!(program = %self.program.display(), %status, "apply step exited unsuccessfully");
                false
            }
            Err(err) => {
                tracing::debug!(program = %self.program.display(), %err, "apply step could not run");
                false
            }
        }
    }
}

/// The two steps the system preview service needs.
pub fn quicklook_steps() -> Vec<ApplyStep> {
    vec![
        ApplyStep::new("/usr/bin/qlmanage", ["-r"]),
        ApplyStep::new("/usr/bin/killall", ["-9", "QuickLookUIService"]),
    ]
}

/// What a finished apply did. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyReport {
    pub steps_run: usize,
    pub steps_failed: usize,
}

/// Completion signal of a background apply.
#[derive(Debug)]
pub struct ApplyHandle {
    rx: Receiver<ApplyReport>,
    report: Option<ApplyReport>,
}

impl ApplyHandle {
    /// Non-blocking completion check.
    pub fn is_done(&mut self) -> bool {
        self.poll().is_some()
    }

    /// The report, if the apply has finished.
    pub fn poll(&mut self) -> Option<ApplyReport> {
        if self.report.is_none() {
            match self.rx.try_recv() {
                Ok(report) => self.report = Some(report),
                // The worker only drops the sender after sending, or if it
                // panicked; either way nothing more will arrive.
                Err(TryRecvError::Disconnected) => self.report = Some(ApplyReport::default()),
                Err(TryRecvError::Empty) => {}
            }
        }
        self.report
    }

    /// Block until the apply has finished.
    pub fn wait(mut self) -> ApplyReport {
        if let Some(report) = self.report {
            return report;
        }
        self.rx.recv().unwrap_or_default()
    }
}

/// Run `steps` in order on a background thread.
pub fn apply_with(steps: Vec<ApplyStep>) -> ApplyHandle {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut report = ApplyReport::default();
        for step in &steps {
            report.steps_run += 1;
            if !step.run() {
                report.steps_failed += 1;
            }
        }
        tracing::debug!(?report, "settings apply finished");
        let _ = tx.send(report);
    });
    ApplyHandle { rx, report: None }
}

/// Reset the preview cache and restart the preview UI process.
pub fn apply_to_quicklook() -> ApplyHandle {
    apply_with(quicklook_steps())
}

/// Whether the settings the preview depends on have been pushed since they
/// last changed.
#[derive(Debug)]
pub struct ApplyTracker {
    applied: bool,
    pending: Option<ApplyHandle>,
}

impl Default for ApplyTracker {
    fn default() -> Self {
        Self {
            applied: true,
            pending: None,
        }
    }
}

impl ApplyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A preview-affecting setting (theme, dark mode, sizing) changed.
    pub fn mark_changed(&mut self) {
        self.applied = false;
    }

    /// Start an apply unless one is running or nothing changed.
    /// Returns whether an apply was started.
    pub fn start(&mut self, steps: Vec<ApplyStep>) -> bool {
        if self.applied || self.pending.is_some() {
            return false;
        }
        self.pending = Some(apply_with(steps));
        true
    }

    /// Collect a finished apply. Call periodically.
    pub fn poll(&mut self) {
        if self.pending.as_mut().is_some_and(ApplyHandle::is_done) {
            self.pending = None;
            self.applied = true;
        }
    }

    pub fn is_applying(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    /// Whether the apply action is currently offered.
    pub fn can_apply(&self) -> bool {
        !self.applied && self.pending.is_none()
    }
}
