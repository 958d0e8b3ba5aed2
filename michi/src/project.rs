//! Loading of a single project's inputs.

use std::path::Path;

use eyre::{Report, Result, WrapErr};
use log::debug;
use serde_json::Value as JsonValue;

use crate::config::load_config_module;
use crate::fs::{load_directory_as_factory_modules, load_directory_as_text_files};
use crate::style::{compile_project_styles, StyleCompiler};
use crate::template::TEMPLATE_EXTENSION;
use crate::Map;

/// Project configuration module, relative to the project directory.
pub const CONFIG_MODULE: &str = "config.js";
pub const TEMPLATES_DIR: &str = "templates";
pub const LOCALES_DIR: &str = "i18n";
pub const STYLES_DIR: &str = "styles";
/// Optional asset directory copied verbatim into the output.
pub const IMAGES_DIR: &str = "img";

/// A project conceptually brings together everything needed to render its
/// pages: configuration, templates, translations and styles.
#[derive(Debug, Clone, Default)]
pub struct Project {
    // Whatever the project's config module exported.
    pub config: JsonValue,
    // Template file name -> template source.
    pub templates: Map<String, String>,
    // Locale file name -> translation object.
    pub locales: Map<String, JsonValue>,
    // Compiled CSS by derived key, plus flattened global classes.
    pub styles: Map<String, String>,
}

/// Loads the four inputs of the project rooted at `project_path`.
///
/// The loads run concurrently and every one of them runs to completion. If
/// any failed, all of their errors are returned together.
pub fn load_project<C: StyleCompiler>(
    compiler: &C,
    project_path: &Path,
) -> std::result::Result<Project, Vec<Report>> {
    debug!("load_project({})", project_path.display());

    let ((config, templates), (locales, styles)) = rayon::join(
        || {
            rayon::join(
                || load_project_config(project_path),
                || load_project_templates(project_path),
            )
        },
        || {
            rayon::join(
                || load_project_locales(project_path),
                || load_project_styles(compiler, project_path),
            )
        },
    );

    let mut errors = Vec::new();
    let mut project = Project::default();
    match config {
        Ok(v) => project.config = v,
        Err(e) => errors.push(e),
    }
    match templates {
        Ok(v) => project.templates = v,
        Err(e) => errors.push(e),
    }
    match locales {
        Ok(v) => project.locales = v,
        Err(e) => errors.push(e),
    }
    match styles {
        Ok(v) => project.styles = v,
        Err(e) => errors.push(e),
    }

    if errors.is_empty() {
        Ok(project)
    } else {
        Err(errors)
    }
}

fn load_project_config(project_path: &Path) -> Result<JsonValue> {
    load_config_module(&project_path.join(CONFIG_MODULE))
        .wrap_err("failed to load project config")
}

fn load_project_templates(project_path: &Path) -> Result<Map<String, String>> {
    load_directory_as_text_files(project_path.join(TEMPLATES_DIR), TEMPLATE_EXTENSION)
        .wrap_err("failed to load templates")
}

fn load_project_locales(project_path: &Path) -> Result<Map<String, JsonValue>> {
    load_directory_as_factory_modules(project_path.join(LOCALES_DIR))
        .wrap_err("failed to load locales")
}

fn load_project_styles<C: StyleCompiler>(
    compiler: &C,
    project_path: &Path,
) -> Result<Map<String, String>> {
    let styles_dir = project_path.join(STYLES_DIR);
    if !styles_dir.exists() {
        debug!("No styles directory at {}, skipping", styles_dir.display());
        return Ok(Map::new());
    }
    compile_project_styles(compiler, &styles_dir).wrap_err("failed to load styles")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::style::Sass;
    use crate::{kind_of, Error, ErrorKind};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn loads_all_facets() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "config.js", "module.exports = { title: 'Site' };");
        write(root, "templates/index.dust", "{{i18n.greeting}}");
        write(root, "i18n/en.js", "module.exports = () => ({ greeting: 'Hi' });");
        write(root, "styles/global.scss", ".button { color: red; }");

        let project = load_project(&Sass, root).unwrap();
        assert_eq!(project.config, json!({ "title": "Site" }));
        assert_eq!(project.templates["index.dust"], "{{i18n.greeting}}");
        assert_eq!(project.locales["en.js"], json!({ "greeting": "Hi" }));
        assert_eq!(project.styles["button"], "color: red;");
    }

    #[test]
    fn styles_directory_is_optional() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "config.js", "module.exports = {};");
        write(root, "templates/index.dust", "x");
        write(root, "i18n/en.js", "module.exports = {};");

        let project = load_project(&Sass, root).unwrap();
        assert!(project.styles.is_empty());

        fs::create_dir(root.join("styles")).unwrap();
        let errors = load_project(&Sass, root).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn collects_every_failure() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "config.js", "throw new Error('bad config');");
        write(root, "i18n/en.js", "module.exports = { greeting: 'Hi' };");
        write(root, "styles/global.scss", ".a { color: $nope; }");
        // No templates/ directory.

        let errors = load_project(&Sass, root).unwrap_err();
        assert_eq!(errors.len(), 3);
        let messages = errors.iter().map(|e| e.to_string()).collect::<Vec<_>>();
        assert!(messages.contains(&"failed to load project config".to_string()));
        assert!(messages.contains(&"failed to load templates".to_string()));
        assert!(messages.contains(&"failed to load styles".to_string()));
    }

    #[test]
    fn missing_config_is_a_config_error() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "templates/index.dust", "x");
        write(root, "i18n/en.js", "module.exports = {};");

        let errors = load_project(&Sass, root).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "failed to load project config");
        assert_eq!(kind_of(&errors[0]), Some(ErrorKind::Config));
        assert!(matches!(
            errors[0].downcast_ref::<Error>(),
            Some(Error::ConfigNotFound(..))
        ));
    }
}
