//! Michi builds localized static sites.
//!
//! A workspace holds any number of projects. Each project combines script
//! modules (configuration and translations), SCSS stylesheets and templates
//! into one HTML page per locale. Projects are built independently and in
//! parallel: a broken project never stops its siblings from building.
//!
//! This crate provides an API that allows for embedding Michi into another
//! application. For Michi's command line interface, see the `michi-cli`
//! crate.

mod build;
mod config;
mod error;
pub mod fs;
mod js;
mod project;
pub mod report;
mod scaffold;
mod style;
mod template;
mod watch;

use std::collections::BTreeMap;

pub use build::{
    build_workspace, page_file_name, Builder, ProjectReport, ProjectStatus, RenderContext,
    SweepReport,
};
pub use config::{Options, WorkspaceConfig, CONFIG_FILE_NAME, DEFAULT_MAIN_DIR};
pub use error::{kind_of, Error, ErrorKind};
pub use js::evaluate_module;
pub use project::{load_project, Project};
pub use scaffold::scaffold_workspace;
pub use style::{compile_project_styles, extract_classes, Sass, StyleCompiler};
pub use template::Templates;
pub use watch::{classify, watch_workspace, Change, Debouncer};

/// Ordered map used for every file name keyed collection. Iteration order is
/// the lexical order of the keys.
pub type Map<K, V> = BTreeMap<K, V>;
