//! Configuration-related functionality for Michi.

use std::path::{Path, PathBuf};

use eyre::Result;
use log::debug;
use serde_json::Value as JsonValue;

use crate::fs::load_factory_module;
use crate::Error;

/// Default name of the workspace root directory.
pub const DEFAULT_MAIN_DIR: &str = "michi";
/// Name of the workspace configuration module inside the workspace root.
pub const CONFIG_FILE_NAME: &str = "michi.config.js";

/// Process-wide paths and switches, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    main_dir: PathBuf,
    build_dir: PathBuf,
    src_dir: PathBuf,
    config_file: PathBuf,
    debug: bool,
}

impl Options {
    /// Constructor. All other paths default to locations inside `main_dir`.
    pub fn new<P: AsRef<Path>>(main_dir: P) -> Self {
        let main_dir = main_dir.as_ref().to_path_buf();
        Self {
            build_dir: main_dir.join("build"),
            src_dir: main_dir.join("src"),
            config_file: main_dir.join(CONFIG_FILE_NAME),
            main_dir,
            debug: false,
        }
    }

    pub fn with_build_dir<P: AsRef<Path>>(mut self, build_dir: P) -> Self {
        self.build_dir = build_dir.as_ref().to_path_buf();
        self
    }

    pub fn with_src_dir<P: AsRef<Path>>(mut self, src_dir: P) -> Self {
        self.src_dir = src_dir.as_ref().to_path_buf();
        self
    }

    pub fn with_config_file<P: AsRef<Path>>(mut self, config_file: P) -> Self {
        self.config_file = config_file.as_ref().to_path_buf();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn main_dir(&self) -> &Path {
        &self.main_dir
    }

    /// Root under which each project's output directory is created.
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Root holding one source directory per project.
    pub fn src_dir(&self) -> &Path {
        &self.src_dir
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn project_src_dir(&self, project: &str) -> PathBuf {
        self.src_dir.join(project)
    }

    pub fn project_build_dir(&self, project: &str) -> PathBuf {
        self.build_dir.join(project)
    }
}

impl Default for Options {
    /// Workspace rooted at `./michi`.
    fn default() -> Self {
        Self::new(Path::new(".").join(DEFAULT_MAIN_DIR))
    }
}

/// Loads a workspace or project configuration module.
///
/// A module file that cannot be read is reported as a configuration error
/// rather than a load error.
pub(crate) fn load_config_module(path: &Path) -> Result<JsonValue> {
    load_factory_module(path, &[]).map_err(|e| match e.downcast::<Error>() {
        Ok(Error::LoadFromFile(path, reason)) => Error::ConfigNotFound(path, reason).into(),
        Ok(other) => other.into(),
        Err(e) => e,
    })
}

/// The workspace configuration: which projects to build, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceConfig {
    projects: Vec<String>,
}

impl WorkspaceConfig {
    /// Constructor. Blank project names are dropped.
    pub fn new<I, S>(projects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            projects: projects
                .into_iter()
                .map(Into::into)
                .filter(|p| !p.trim().is_empty())
                .collect(),
        }
    }

    /// Load the workspace configuration module named by the options.
    ///
    /// Fails if the module cannot be loaded or if no projects remain after
    /// normalization.
    pub fn load(options: &Options) -> Result<Self> {
        let path = options.config_file();
        debug!("Attempting to load workspace config: {}", path.display());
        let exported = load_config_module(path)?;
        let config = Self::from_export(&exported);
        if config.projects.is_empty() {
            return Err(Error::NoProjects(path.to_path_buf()).into());
        }
        debug!("Loaded {} project(s) from {}", config.projects.len(), path.display());
        Ok(config)
    }

    /// Interpret the export of a workspace configuration module.
    ///
    /// `projects` may be a single string or an array; non-string and blank
    /// entries are dropped and any other shape yields no projects.
    pub fn from_export(exported: &JsonValue) -> Self {
        match exported.get("projects") {
            Some(JsonValue::String(s)) => Self::new([s.as_str()]),
            Some(JsonValue::Array(arr)) => Self::new(arr.iter().filter_map(JsonValue::as_str)),
            _ => Self::default(),
        }
    }

    pub fn projects(&self) -> &[String] {
        &self.projects
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}
