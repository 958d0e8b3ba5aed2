//! Console reporting.
//!
//! All user-facing output goes through the functions in this module. Build
//! code does not print directly: it records [`LogRecord`]s into a
//! [`BuildLog`] which is flushed under the project's heading once the whole
//! project has settled, so one project's lines are never split apart.

use std::sync::{Mutex, MutexGuard};

use colored::Colorize;
use eyre::Report;
use log::{debug, error, info, warn};

static OUTPUT_LOCK: Mutex<()> = Mutex::new(());

const ARROW: &str = ">";

/// Prints the program banner.
pub fn banner(msg: &str) {
    info!("{}", format!(" {} ", msg).as_str().on_black().white().bold());
}

/// Holds the console until dropped. Lines printed through this module wait
/// for it, so a flushed project block is never split.
fn lock_output() -> MutexGuard<'static, ()> {
    // A poisoned lock only means another writer panicked mid-way.
    OUTPUT_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// Prints a section heading such as a project name.
pub fn describe(msg: &str) {
    let _guard = lock_output();
    print_heading(msg);
}

/// Prints `msg ... STATUS`, with the status colored by outcome.
pub fn line(msg: &str, ok: bool, status: &str) {
    let _guard = lock_output();
    print_line(msg, ok, status);
}

fn print_heading(msg: &str) {
    info!("{} {} ...", ARROW.bold(), msg.bold());
}

fn print_line(msg: &str, ok: bool, status: &str) {
    let status = status.to_uppercase();
    let status = if ok {
        status.as_str().bold().blue()
    } else {
        status.as_str().bold().red()
    };
    if ok {
        info!("{} {} {} {}", ARROW.bold(), msg, "...".bold(), status);
    } else {
        warn!("{} {} {} {}", ARROW.bold(), msg, "...".bold(), status);
    }
}

/// Prints an error together with its chain of causes.
pub fn report_error(err: &Report) {
    error!("{} {} {}", ARROW.bold(), "ERROR:".bold().red(), describe_chain(err));
}

/// Prints a file change seen by the watcher.
pub fn watch_event(path: &str, status: &str) {
    line(path, true, status);
}

/// Joins a report's causes into a single line, outermost first.
pub fn describe_chain(err: &Report) -> String {
    err.chain()
        .map(|cause| cause.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}

/// One deferred console line of a project build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    /// A page was rendered and written.
    PageWritten(String),
    /// A locale failed to render or its page could not be written.
    PageFailed { locale: String, error: String },
    /// The project's templates failed to compile.
    TemplatesFailed(String),
    /// A facet of the project failed to load.
    LoadFailed(String),
    /// Images were copied into the output directory.
    ImagesCopied(u64),
    /// The image copy failed; the build result is unaffected.
    ImagesSkipped(String),
}

impl LogRecord {
    fn emit(&self) {
        match self {
            Self::PageWritten(file) => print_line(file, true, "OK"),
            Self::PageFailed { locale, error: e } => {
                error!("{} {} {}: {}", ARROW.bold(), "ERROR:".bold().red(), locale, e)
            }
            Self::TemplatesFailed(e) | Self::LoadFailed(e) => {
                error!("{} {} {}", ARROW.bold(), "ERROR:".bold().red(), e)
            }
            Self::ImagesCopied(count) => debug!("Copied {} image(s)", count),
            Self::ImagesSkipped(e) => debug!("Skipped image copy: {}", e),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::PageFailed { .. } | Self::TemplatesFailed(_) | Self::LoadFailed(_)
        )
    }
}

/// Ordered console output of one project build, emitted all at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildLog {
    records: Vec<LogRecord>,
}

impl BuildLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: LogRecord) {
        self.records.push(record);
    }

    pub fn extend<I: IntoIterator<Item = LogRecord>>(&mut self, records: I) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Emits the heading followed by every record, in order.
    pub fn flush(&self, project: &str) {
        let _guard = lock_output();
        print_heading(project);
        for record in &self.records {
            record.emit();
        }
    }
}
