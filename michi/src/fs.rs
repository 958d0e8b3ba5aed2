//! File system-related utilities.
//!
//! Thin wrappers over [`std::fs`] that report failures as Michi [`Error`]s,
//! plus the directory loaders used by the project loader.

use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use eyre::Result;
use log::debug;
use rayon::prelude::*;
use serde_json::Value as JsonValue;
use walkdir::WalkDir;

use crate::js::evaluate_module;
use crate::{Error, Map};

/// File extension of script modules.
pub const SCRIPT_EXTENSION: &str = ".js";

/// Returns whether the given path is a directory. Fails if the path does not
/// exist.
pub fn path_is_directory<P: AsRef<Path>>(path: P) -> Result<bool> {
    let path = path.as_ref();
    debug!("path_is_directory({})", path.display());
    let meta = fs::metadata(path).map_err(|e| not_found_or_io(path, e))?;
    Ok(meta.is_dir())
}

/// Succeeds only if the path exists and is a directory.
pub fn directory_exists<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if path_is_directory(path)? {
        Ok(())
    } else {
        Err(Error::NotADirectory(path.to_path_buf()).into())
    }
}

/// Creates the directory if it does not exist yet. The parent must exist.
pub fn ensure_directory<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if path.is_dir() {
        return Ok(());
    }
    debug!("ensure_directory({})", path.display());
    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == IoErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) => Err(Error::io(format!("creating directory {}", path.display()), e).into()),
    }
}

/// Removes a directory and everything below it.
///
/// Files are removed before the directories containing them. A path that
/// does not exist is treated as already removed.
pub fn remove_directory_recursive<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    debug!("remove_directory_recursive({})", path.display());
    if !path.exists() {
        return Ok(());
    }
    directory_exists(path)?;
    for entry in WalkDir::new(path).contents_first(true) {
        let entry = entry.map_err(|e| walk_error(path, e))?;
        let entry_path = entry.path();
        let result = if entry.file_type().is_dir() {
            fs::remove_dir(entry_path)
        } else {
            fs::remove_file(entry_path)
        };
        result.map_err(|e| Error::io(format!("removing {}", entry_path.display()), e))?;
    }
    Ok(())
}

/// Copies `source` into `target`, recursing into subdirectories.
///
/// `target` is created if needed. Returns the number of files copied.
pub fn copy_directory_recursive<P1, P2>(source: P1, target: P2) -> Result<u64>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
{
    let source = source.as_ref();
    let target = target.as_ref();
    debug!(
        "copy_directory_recursive({}, {})",
        source.display(),
        target.display()
    );
    directory_exists(source)?;
    ensure_directory(target)?;

    let mut copied = 0_u64;
    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(|e| walk_error(source, e))?;
        let rel = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let dest = target.join(rel);
        if entry.file_type().is_dir() {
            ensure_directory(&dest)?;
        } else {
            fs::copy(entry.path(), &dest).map_err(|e| {
                Error::io(
                    format!("copying {} to {}", entry.path().display(), dest.display()),
                    e,
                )
            })?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Reads the whole file as UTF-8 text.
pub fn read_text_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    debug!("read_text_file({})", path.display());
    fs::read_to_string(path)
        .map_err(|e| Error::io(format!("reading {}", path.display()), e).into())
}

/// Writes `content` to the file, replacing it if it exists. The parent
/// directory must exist.
pub fn write_text_file<P, C>(path: P, content: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    let path = path.as_ref();
    debug!("write_text_file({})", path.display());
    fs::write(path, content)
        .map_err(|e| Error::io(format!("writing {}", path.display()), e).into())
}

/// Loads a script module and returns its export.
///
/// See [`crate::js::evaluate_module`] for how `args` are applied.
pub fn load_factory_module<P: AsRef<Path>>(path: P, args: &[JsonValue]) -> Result<JsonValue> {
    let path = path.as_ref();
    debug!("load_factory_module({}, {:?})", path.display(), args);
    let source = fs::read_to_string(path)
        .map_err(|e| Error::LoadFromFile(path.to_path_buf(), e.to_string()))?;
    evaluate_module(path, &source, args)
}

/// Loads every script module directly inside `dir`, keyed by file name.
///
/// Fails if the directory is missing or has no entries at all, or if any
/// module fails to load.
pub fn load_directory_as_factory_modules<P: AsRef<Path>>(dir: P) -> Result<Map<String, JsonValue>> {
    let dir = dir.as_ref();
    debug!("load_directory_as_factory_modules({})", dir.display());
    list_files_with_extension(dir, SCRIPT_EXTENSION)?
        .into_par_iter()
        .map(|(name, path)| Ok((name, load_factory_module(&path, &[])?)))
        .collect()
}

/// Reads every file directly inside `dir` whose name ends with `extension`,
/// keyed by file name.
///
/// Fails if the directory is missing or has no entries at all.
pub fn load_directory_as_text_files<P: AsRef<Path>>(
    dir: P,
    extension: &str,
) -> Result<Map<String, String>> {
    let dir = dir.as_ref();
    debug!("load_directory_as_text_files({}, {})", dir.display(), extension);
    list_files_with_extension(dir, extension)?
        .into_par_iter()
        .map(|(name, path)| Ok((name, read_text_file(&path)?)))
        .collect()
}

/// Returns whether `name` ends with `extension` and has something in front
/// of it.
pub fn has_extension(name: &str, extension: &str) -> bool {
    name.len() > extension.len() && name.ends_with(extension)
}

/// Strips `extension` from the end of `name`, if present.
pub fn strip_extension<'a>(name: &'a str, extension: &str) -> &'a str {
    name.strip_suffix(extension).unwrap_or(name)
}

fn list_files_with_extension(dir: &Path, extension: &str) -> Result<Vec<(String, PathBuf)>> {
    directory_exists(dir)?;
    let entries = fs::read_dir(dir)
        .map_err(|e| Error::io(format!("listing {}", dir.display()), e))?
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| Error::io(format!("listing {}", dir.display()), e))?;
    if entries.is_empty() {
        return Err(Error::EmptyDirectory(dir.to_path_buf()).into());
    }
    let mut files = Vec::new();
    for entry in entries {
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => continue,
        };
        if has_extension(&name, extension) && entry.path().is_file() {
            files.push((name, entry.path()));
        }
    }
    files.sort();
    Ok(files)
}

fn not_found_or_io(path: &Path, e: std::io::Error) -> eyre::Report {
    if e.kind() == IoErrorKind::NotFound {
        Error::DirectoryNotFound(path.to_path_buf()).into()
    } else {
        Error::io(format!("reading metadata of {}", path.display()), e).into()
    }
}

fn walk_error(root: &Path, e: walkdir::Error) -> eyre::Report {
    let what = format!("walking {}", root.display());
    match e.into_io_error() {
        Some(io) => Error::io(what, io).into(),
        None => Error::LoadFromFile(root.to_path_buf(), "file system loop".into()).into(),
    }
}
