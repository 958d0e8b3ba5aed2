//! Rebuilding on file changes.
//!
//! Every relevant change below the source root is logged and triggers a full
//! sweep. Changes arriving in quick succession are coalesced so that saving
//! several files at once results in a single sweep.

use std::path::Path;
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::time::{Duration, Instant};

use eyre::{Result, WrapErr};
use log::{debug, info, warn};
use notify::{Event, EventKind, RecursiveMode, Watcher};

use crate::build::build_workspace;
use crate::report;
use crate::{Options, WorkspaceConfig};

const DEBOUNCE_MS: u64 = 200;

/// Kind of change observed for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Added,
    Removed,
    Updated,
}

impl Change {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::Removed => "REMOVED",
            Self::Updated => "UPDATED",
        }
    }
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn is_dot_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.starts_with('.'))
}

/// Decides whether a watcher event should trigger a rebuild.
///
/// Access notifications and events about dot files only are ignored.
pub fn classify(event: &Event) -> Option<Change> {
    let change = match event.kind {
        EventKind::Create(_) => Change::Added,
        EventKind::Remove(_) => Change::Removed,
        EventKind::Modify(_) => Change::Updated,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => return None,
    };
    if event.paths.iter().all(|p| is_dot_file(p)) {
        return None;
    }
    Some(change)
}

/// Coalesces bursts of changes into a single rebuild.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: usize,
    last_event: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: 0,
            last_event: None,
        }
    }

    pub fn add(&mut self) {
        self.add_at(Instant::now())
    }

    pub fn add_at(&mut self, now: Instant) {
        self.pending += 1;
        self.last_event = Some(now);
    }

    pub fn ready(&self) -> bool {
        self.ready_at(Instant::now())
    }

    /// A rebuild is due once changes are pending and none arrived during the
    /// last window.
    pub fn ready_at(&self, now: Instant) -> bool {
        self.pending > 0
            && self
                .last_event
                .map_or(false, |t| now.saturating_duration_since(t) >= self.window)
    }

    /// Clears the pending changes, returning how many there were.
    pub fn take(&mut self) -> usize {
        self.last_event = None;
        std::mem::take(&mut self.pending)
    }

    /// How long to wait for the next event.
    pub fn timeout(&self) -> Duration {
        if self.pending == 0 {
            Duration::from_secs(60)
        } else {
            self.window
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEBOUNCE_MS))
    }
}

/// Watches the source root and rebuilds the workspace on every change.
///
/// Blocks until the watcher's event channel closes.
pub fn watch_workspace(options: &Options) -> Result<()> {
    let src_dir = options.src_dir();
    let (tx, rx) = channel();
    let mut watcher = notify::recommended_watcher(tx).wrap_err("failed to create file watcher")?;
    watcher
        .watch(src_dir, RecursiveMode::Recursive)
        .wrap_err_with(|| format!("failed to watch {}", src_dir.display()))?;
    report::describe(&format!("Watching {}", src_dir.display()));

    let mut debouncer = Debouncer::default();
    loop {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) => {
                if let Some(change) = classify(&event) {
                    for path in &event.paths {
                        report::watch_event(&path.display().to_string(), change.as_str());
                    }
                    debouncer.add();
                }
            }
            Ok(Err(e)) => warn!("Watch error: {}", e),
            Err(RecvTimeoutError::Timeout) if debouncer.ready() => {
                debug!("Rebuilding after {} change(s)", debouncer.take());
                rebuild(options);
            }
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
    Ok(())
}

fn rebuild(options: &Options) {
    report::describe("Building");
    let workspace = match WorkspaceConfig::load(options) {
        Ok(workspace) => workspace,
        Err(e) => {
            report::report_error(&e);
            return;
        }
    };
    match build_workspace(options, &workspace) {
        Ok(sweep) => info!("{}", sweep.summary()),
        Err(e) => report::report_error(&e),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};
    use std::path::PathBuf;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn classifies_changes() {
        assert_eq!(
            classify(&event(EventKind::Create(CreateKind::File), "src/a/config.js")),
            Some(Change::Added)
        );
        assert_eq!(
            classify(&event(EventKind::Remove(RemoveKind::Any), "src/a/img/x.png")),
            Some(Change::Removed)
        );
        assert_eq!(
            classify(&event(EventKind::Modify(ModifyKind::Any), "src/a/i18n/en.js")),
            Some(Change::Updated)
        );
    }

    #[test]
    fn ignores_access_and_dot_files() {
        assert_eq!(
            classify(&event(EventKind::Access(AccessKind::Any), "src/a/config.js")),
            None
        );
        assert_eq!(classify(&event(EventKind::Any, "src/a/config.js")), None);
        assert_eq!(
            classify(&event(EventKind::Modify(ModifyKind::Any), "src/a/.config.js.swp")),
            None
        );
    }

    #[test]
    fn debouncer_waits_for_quiet_window() {
        let window = Duration::from_millis(200);
        let start = Instant::now();
        let mut debouncer = Debouncer::new(window);
        assert!(!debouncer.ready_at(start));
        assert_eq!(debouncer.timeout(), Duration::from_secs(60));

        debouncer.add_at(start);
        debouncer.add_at(start + Duration::from_millis(150));
        assert!(!debouncer.ready_at(start + Duration::from_millis(300)));
        assert!(debouncer.ready_at(start + Duration::from_millis(350)));
        assert_eq!(debouncer.timeout(), window);

        assert_eq!(debouncer.take(), 2);
        assert!(!debouncer.ready_at(start + Duration::from_secs(10)));
    }
}
