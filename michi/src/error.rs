use std::path::PathBuf;

use thiserror::Error;

/// The primary error type that can be produced by Michi.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no projects to build in {0}")]
    NoProjects(PathBuf),
    #[error("config module {0} could not be read: {1}")]
    ConfigNotFound(PathBuf, String),
    #[error("failed to evaluate module {0}: {1}")]
    ModuleEvaluation(PathBuf, String),
    #[error("module {0} produced an unexpected value: {1}")]
    ModuleExport(PathBuf, String),
    #[error("module {0} must export a factory function")]
    NotAFactory(PathBuf),
    #[error("directory not found: {0}")]
    DirectoryNotFound(PathBuf),
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("directory is empty: {0}")]
    EmptyDirectory(PathBuf),
    #[error("failed to load {0}: {1}")]
    LoadFromFile(PathBuf, String),
    #[error("failed to compile stylesheet {0} ({1} stylesheet(s) failed): {2}")]
    StyleCompile(PathBuf, usize, String),
    #[error("failed to compile template \"{0}\": {1}")]
    TemplateCompile(String, String),
    #[error("failed to render template \"{0}\": {1}")]
    TemplateRender(String, String),
    #[error("I/O error {0}: {1}")]
    Io(String, std::io::Error),
}

/// Coarse classification of [`Error`] variants, used to decide at which
/// scope a failure is recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    NotFound,
    Load,
    Render,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoProjects(_)
            | Self::ConfigNotFound(..)
            | Self::ModuleEvaluation(..)
            | Self::ModuleExport(..)
            | Self::NotAFactory(_) => ErrorKind::Config,
            Self::DirectoryNotFound(_) | Self::NotADirectory(_) => ErrorKind::NotFound,
            Self::EmptyDirectory(_) | Self::LoadFromFile(..) | Self::StyleCompile(..) => {
                ErrorKind::Load
            }
            Self::TemplateCompile(..) | Self::TemplateRender(..) => ErrorKind::Render,
            Self::Io(..) => ErrorKind::Io,
        }
    }

    /// Wraps an I/O error together with a description of what was being
    /// attempted.
    pub fn io<S: Into<String>>(what: S, e: std::io::Error) -> Self {
        Self::Io(what.into(), e)
    }
}

/// Returns the [`ErrorKind`] of a report if it wraps a Michi [`Error`].
pub fn kind_of(report: &eyre::Report) -> Option<ErrorKind> {
    report.downcast_ref::<Error>().map(Error::kind)
}
