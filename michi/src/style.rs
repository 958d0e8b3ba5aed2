//! Stylesheet compilation.
//!
//! Every `.scss` file in a project's `styles/` directory is compiled to CSS
//! and stored under `<stem>_css`. The global stylesheet additionally
//! contributes one entry per top-level class rule so templates can inline
//! individual rule bodies.

use std::path::Path;
use std::sync::OnceLock;

use eyre::Result;
use log::debug;
use rayon::prelude::*;
use regex::Regex;

use crate::fs::{load_directory_as_text_files, strip_extension};
use crate::{Error, Map};

/// File extension of stylesheet sources.
pub const STYLE_EXTENSION: &str = ".scss";
/// The stylesheet whose classes are flattened into the style mapping.
pub const GLOBAL_STYLESHEET: &str = "global.scss";
/// Appended to a stylesheet's stem to form the key of its compiled CSS.
pub const CSS_KEY_SUFFIX: &str = "_css";

/// Compiles a single stylesheet source file into CSS text.
pub trait StyleCompiler: Sync {
    fn compile(&self, path: &Path) -> Result<String, String>;
}

/// SCSS compiler backed by [`grass`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Sass;

impl StyleCompiler for Sass {
    fn compile(&self, path: &Path) -> Result<String, String> {
        grass::from_path(path, &grass::Options::default()).map_err(|e| e.to_string())
    }
}

/// Compiles every stylesheet in `styles_dir`.
///
/// All stylesheets are compiled even if one fails; the first failure (in
/// file name order) is then reported for the whole directory.
pub fn compile_project_styles<C: StyleCompiler>(
    compiler: &C,
    styles_dir: &Path,
) -> Result<Map<String, String>> {
    debug!("compile_project_styles({})", styles_dir.display());
    let sources = load_directory_as_text_files(styles_dir, STYLE_EXTENSION)?;
    let compiled = sources
        .par_iter()
        .map(|(name, _)| (name.clone(), compiler.compile(&styles_dir.join(name))))
        .collect::<Vec<_>>();

    let failures = compiled.iter().filter(|(_, r)| r.is_err()).count();
    let mut styles = Map::new();
    let mut derived = Map::new();
    for (name, result) in compiled {
        match result {
            Ok(css) => {
                if name == GLOBAL_STYLESHEET {
                    styles.extend(extract_classes(&css));
                }
                derived.insert(css_key(&name), css);
            }
            Err(e) => {
                return Err(Error::StyleCompile(styles_dir.join(name), failures, e).into());
            }
        }
    }
    styles.extend(derived);
    Ok(styles)
}

/// Key under which the compiled CSS of the given stylesheet is stored.
pub fn css_key(name: &str) -> String {
    format!("{}{}", strip_extension(name, STYLE_EXTENSION), CSS_KEY_SUFFIX)
}

fn class_selector_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\.-?[_a-zA-Z]+[_a-zA-Z0-9-]*").unwrap())
}

/// Extracts class rules from compiled CSS as `selector → body`, the leading
/// `.` removed from the selector.
///
/// Best effort: only flat `selector { body }` blocks are considered, rules
/// nested inside at-rules are skipped.
pub fn extract_classes(css: &str) -> Map<String, String> {
    let flat = css.replace('"', "'").replace(['\n', '\r'], "");
    let mut classes = Map::new();
    for block in flat.split('}') {
        let (selector, body) = match block.split_once('{') {
            Some(parts) => parts,
            None => continue,
        };
        let selector = selector.trim();
        if body.contains('{') || !class_selector_re().is_match(selector) {
            continue;
        }
        let name = selector.trim_start_matches('.').trim();
        classes.insert(name.to_string(), body.trim().to_string());
    }
    classes
}
