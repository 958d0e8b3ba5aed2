//! Build orchestration.
//!
//! A sweep builds every configured project independently:
//!
//! ```text
//! build_workspace()
//!     │
//!     ├── build root exists? ──── no ──► abort sweep
//!     │
//!     └── for each project (in parallel)
//!             │
//!             ├── source dir exists? ── no ──► NOT FOUND, skip
//!             ├── load_project() ────── errors ──► log errors, skip
//!             └── build_project()
//!                     ├── wipe + recreate output dir
//!                     ├── compile templates
//!                     ├── render entry template once per locale (in parallel)
//!                     └── copy img/ (best effort)
//! ```
//!
//! Each project's console output is collected in a [`BuildLog`] and flushed
//! only after the project has settled.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use eyre::Result;
use log::debug;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::fs::{
    copy_directory_recursive, directory_exists, ensure_directory, remove_directory_recursive,
    strip_extension, write_text_file, SCRIPT_EXTENSION,
};
use crate::project::{load_project, Project, IMAGES_DIR};
use crate::report::{self, describe_chain, BuildLog, LogRecord};
use crate::style::{Sass, StyleCompiler};
use crate::template::{Templates, ENTRY_TEMPLATE};
use crate::{Error, Map, Options, WorkspaceConfig};

/// The data a template is rendered against: shared project data plus one
/// locale's translations. Built fresh for every locale.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RenderContext<'a> {
    pub config: &'a JsonValue,
    pub styles: &'a Map<String, String>,
    pub i18n: &'a JsonValue,
}

/// Outcome of one project within a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectStatus {
    /// The output directory was rebuilt. Individual locales may still have
    /// failed, see [`ProjectReport::failures`].
    Built,
    /// The project's source directory does not exist.
    NotFound,
    /// At least one of the project's inputs failed to load. The output
    /// directory was left untouched.
    LoadFailed,
    /// The output directory could not be recreated or the templates did not
    /// compile.
    BuildFailed,
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Built => write!(f, "built"),
            Self::NotFound => write!(f, "not found"),
            Self::LoadFailed => write!(f, "load failed"),
            Self::BuildFailed => write!(f, "build failed"),
        }
    }
}

/// Result of sweeping a single project.
#[derive(Debug, Clone)]
pub struct ProjectReport {
    pub name: String,
    pub status: ProjectStatus,
    /// Pages written, in locale file name order.
    pub pages: Vec<PathBuf>,
    pub log: BuildLog,
}

impl ProjectReport {
    fn new(name: &str, status: ProjectStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
            pages: Vec::new(),
            log: BuildLog::new(),
        }
    }

    /// Failures recorded while building the project.
    pub fn failures(&self) -> impl Iterator<Item = &LogRecord> {
        self.log.records().iter().filter(|r| r.is_failure())
    }
}

/// Result of a complete sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// One report per configured project, in configured order.
    pub projects: Vec<ProjectReport>,
    pub duration: Duration,
}

impl SweepReport {
    pub fn project(&self, name: &str) -> Option<&ProjectReport> {
        self.projects.iter().find(|p| p.name == name)
    }

    pub fn count(&self, status: ProjectStatus) -> usize {
        self.projects.iter().filter(|p| p.status == status).count()
    }

    pub fn page_count(&self) -> usize {
        self.projects.iter().map(|p| p.pages.len()).sum()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} of {} project(s) built, {} page(s) written in {:?}",
            self.count(ProjectStatus::Built),
            self.projects.len(),
            self.page_count(),
            self.duration
        )
    }
}

/// Name of the page generated for the given locale file.
///
/// `en.js` → `index_en.html`
pub fn page_file_name(locale_file: &str) -> String {
    format!(
        "index_{}.html",
        strip_extension(locale_file, SCRIPT_EXTENSION)
    )
}

/// Builds the projects of a workspace.
pub struct Builder<'a, C: StyleCompiler = Sass> {
    options: &'a Options,
    compiler: C,
}

impl<'a> Builder<'a, Sass> {
    /// Constructor using the default SCSS compiler.
    pub fn new(options: &'a Options) -> Self {
        Self::with_compiler(options, Sass)
    }
}

impl<'a, C: StyleCompiler> Builder<'a, C> {
    pub fn with_compiler(options: &'a Options, compiler: C) -> Self {
        Self { options, compiler }
    }

    /// Runs one sweep over every configured project.
    ///
    /// Fails only if the build root does not exist. Problems with individual
    /// projects are logged and reflected in the returned report.
    pub fn build_workspace(&self, workspace: &WorkspaceConfig) -> Result<SweepReport> {
        let start = Instant::now();
        let build_dir = self.options.build_dir();
        if let Err(e) = directory_exists(build_dir) {
            report::line(&build_dir.display().to_string(), false, "NOT FOUND");
            debug!("Build root unavailable: {}", describe_chain(&e));
            return Err(Error::DirectoryNotFound(build_dir.to_path_buf()).into());
        }

        report::describe("Loading projects");
        let projects = workspace
            .projects()
            .par_iter()
            .map(|name| self.sweep_project(name))
            .collect::<Vec<_>>();

        Ok(SweepReport {
            projects,
            duration: start.elapsed(),
        })
    }

    fn sweep_project(&self, name: &str) -> ProjectReport {
        let project_path = self.options.project_src_dir(name);
        if directory_exists(&project_path).is_err() {
            report::line(name, false, "NOT FOUND");
            return ProjectReport::new(name, ProjectStatus::NotFound);
        }
        report::line(name, true, "OK");

        let report = match load_project(&self.compiler, &project_path) {
            Ok(project) => self.build_project(name, &project),
            Err(errors) => {
                let mut report = ProjectReport::new(name, ProjectStatus::LoadFailed);
                report.log.extend(
                    errors
                        .iter()
                        .map(|e| LogRecord::LoadFailed(describe_chain(e))),
                );
                report
            }
        };
        report.log.flush(name);
        report
    }

    /// Rebuilds the output directory of a loaded project from scratch.
    ///
    /// Renders one page per locale and copies the project's images. Nothing
    /// is printed; the returned report carries the project's log.
    pub fn build_project(&self, name: &str, project: &Project) -> ProjectReport {
        debug!("build_project({})", name);
        let mut report = ProjectReport::new(name, ProjectStatus::Built);
        let out_dir = self.options.project_build_dir(name);

        if let Err(e) = remove_directory_recursive(&out_dir) {
            debug!("Could not clean {}: {}", out_dir.display(), describe_chain(&e));
        }
        if let Err(e) = ensure_directory(&out_dir) {
            report.status = ProjectStatus::BuildFailed;
            report.log.push(LogRecord::LoadFailed(describe_chain(&e)));
            return report;
        }

        let templates = match Templates::compile(&project.templates) {
            Ok(templates) => templates,
            Err(e) => {
                report.status = ProjectStatus::BuildFailed;
                report.log.push(LogRecord::TemplatesFailed(e.to_string()));
                return report;
            }
        };

        let rendered = project
            .locales
            .par_iter()
            .map(|(locale, i18n)| {
                let context = RenderContext {
                    config: &project.config,
                    styles: &project.styles,
                    i18n,
                };
                render_locale(&templates, &out_dir, locale, &context)
            })
            .collect::<Vec<_>>();
        for (record, page) in rendered {
            report.log.push(record);
            report.pages.extend(page);
        }

        let images = self.options.project_src_dir(name).join(IMAGES_DIR);
        if images.is_dir() {
            let record = match copy_directory_recursive(&images, out_dir.join(IMAGES_DIR)) {
                Ok(count) => LogRecord::ImagesCopied(count),
                Err(e) => LogRecord::ImagesSkipped(describe_chain(&e)),
            };
            report.log.push(record);
        }
        report
    }
}

fn render_locale(
    templates: &Templates,
    out_dir: &Path,
    locale: &str,
    context: &RenderContext,
) -> (LogRecord, Option<PathBuf>) {
    let failed = |error: String| LogRecord::PageFailed {
        locale: locale.to_string(),
        error,
    };
    let html = match templates.render(ENTRY_TEMPLATE, context) {
        Ok(html) => html,
        Err(e) => return (failed(e.to_string()), None),
    };
    let file_name = page_file_name(locale);
    let path = out_dir.join(&file_name);
    match write_text_file(&path, html) {
        Ok(()) => (LogRecord::PageWritten(file_name), Some(path)),
        Err(e) => (failed(describe_chain(&e)), None),
    }
}

/// Runs one sweep with the default SCSS compiler.
pub fn build_workspace(options: &Options, workspace: &WorkspaceConfig) -> Result<SweepReport> {
    Builder::new(options).build_workspace(workspace)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn project(templates: &[(&str, &str)], locales: &[(&str, JsonValue)]) -> Project {
        Project {
            config: json!({ "title": "Site" }),
            templates: templates
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            locales: locales
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            styles: Map::from([("button".to_string(), "color: red;".to_string())]),
        }
    }

    fn options(tmp: &TempDir) -> Options {
        let options = Options::new(tmp.path());
        fs::create_dir_all(options.build_dir()).unwrap();
        options
    }

    #[test]
    fn page_names_strip_script_extension() {
        assert_eq!(page_file_name("en.js"), "index_en.html");
        assert_eq!(page_file_name("pt-BR.js"), "index_pt-BR.html");
    }

    #[test]
    fn each_locale_sees_its_own_translations() {
        let tmp = TempDir::new().unwrap();
        let options = options(&tmp);
        let locales = (0..16)
            .map(|i| (format!("l{:02}.js", i), json!({ "n": i })))
            .collect::<Vec<_>>();
        let locales = locales
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect::<Vec<_>>();
        let project = project(
            &[("index.dust", "{{config.title}} {{i18n.n}} {{styles.button}}")],
            &locales,
        );

        let report = Builder::new(&options).build_project("site", &project);
        assert_eq!(report.status, ProjectStatus::Built);
        assert_eq!(report.pages.len(), 16);
        for i in 0..16 {
            let page = options
                .project_build_dir("site")
                .join(format!("index_l{:02}.html", i));
            assert_eq!(
                fs::read_to_string(page).unwrap(),
                format!("Site {} color: red;", i)
            );
        }
    }

    #[test]
    fn failing_locale_does_not_stop_siblings() {
        let tmp = TempDir::new().unwrap();
        let options = options(&tmp);
        fs::create_dir_all(options.project_src_dir("site").join("img")).unwrap();
        fs::write(options.project_src_dir("site").join("img/a.png"), "png").unwrap();
        let project = project(
            &[("index.dust", "{{i18n.greeting}}")],
            &[
                ("en.js", json!({ "greeting": "Hi" })),
                // Handlebars renders missing values and partials as empty
                // outside strict mode, so the failure is forced at the write
                // instead: this page lands in a directory that does not
                // exist.
                ("missing/fr.js", json!({ "greeting": "Salut" })),
            ],
        );

        let report = Builder::new(&options).build_project("site", &project);
        let out = options.project_build_dir("site");
        assert_eq!(report.status, ProjectStatus::Built);
        assert_eq!(report.pages, vec![out.join("index_en.html")]);
        assert_eq!(report.failures().count(), 1);
        assert!(matches!(
            report.failures().next(),
            Some(LogRecord::PageFailed { locale, .. }) if locale == "missing/fr.js"
        ));
        assert_eq!(fs::read_to_string(out.join("index_en.html")).unwrap(), "Hi");
        assert_eq!(fs::read_to_string(out.join("img/a.png")).unwrap(), "png");
    }

    #[test]
    fn missing_entry_template_fails_every_locale() {
        let tmp = TempDir::new().unwrap();
        let options = options(&tmp);
        let project = project(
            &[("page.dust", "x")],
            &[("en.js", json!({})), ("fr.js", json!({}))],
        );

        let report = Builder::new(&options).build_project("site", &project);
        assert_eq!(report.status, ProjectStatus::Built);
        assert!(report.pages.is_empty());
        assert_eq!(report.failures().count(), 2);
        assert!(options.project_build_dir("site").is_dir());
    }

    #[test]
    fn stale_output_is_removed() {
        let tmp = TempDir::new().unwrap();
        let options = options(&tmp);
        let out = options.project_build_dir("site");
        fs::create_dir_all(out.join("old")).unwrap();
        fs::write(out.join("index_gone.html"), "stale").unwrap();

        let project = project(&[("index.dust", "x")], &[("en.js", json!({}))]);
        Builder::new(&options).build_project("site", &project);

        assert!(!out.join("old").exists());
        assert!(!out.join("index_gone.html").exists());
        assert!(out.join("index_en.html").exists());
    }

    #[test]
    fn template_compile_failure_fails_the_build() {
        let tmp = TempDir::new().unwrap();
        let options = options(&tmp);
        let project = project(&[("index.dust", "{{#if x}}")], &[("en.js", json!({}))]);

        let report = Builder::new(&options).build_project("site", &project);
        assert_eq!(report.status, ProjectStatus::BuildFailed);
        assert!(report.pages.is_empty());
        assert!(matches!(
            report.log.records(),
            [LogRecord::TemplatesFailed(_)]
        ));
    }

    #[test]
    fn missing_build_root_aborts_the_sweep() {
        let tmp = TempDir::new().unwrap();
        let options = Options::new(tmp.path());
        let workspace = WorkspaceConfig::new(["site"]);

        let err = build_workspace(&options, &workspace).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::DirectoryNotFound(_))
        ));
    }

    #[test]
    fn missing_project_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let options = options(&tmp);
        let workspace = WorkspaceConfig::new(["ghost"]);

        let report = build_workspace(&options, &workspace).unwrap();
        assert_eq!(report.projects[0].status, ProjectStatus::NotFound);
        assert!(!options.project_build_dir("ghost").exists());
    }
}
