//! Workspace scaffolding.
//!
//! Creates a workspace holding a single `untitled` project that builds out
//! of the box.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};

use eyre::Result;
use log::debug;

use crate::report;
use crate::Error;

enum Entry {
    Dir(&'static str, &'static [Entry]),
    File(&'static str, &'static str),
}

const WORKSPACE_CONFIG: &str = "module.exports = {
    projects: ['untitled']
};
";

const PROJECT_CONFIG: &str = "module.exports = {
    title: 'Untitled'
};
";

const LOCALE: &str = "module.exports = () => ({
    lang: 'en-US',
    greeting: 'Hello, world!'
});
";

const INDEX_TEMPLATE: &str = "<!DOCTYPE html>
<html lang=\"{{i18n.lang}}\">
<head>
    <meta charset=\"utf-8\">
    <title>{{config.title}}</title>
    <style>{{{styles.head_css}}}</style>
</head>
<body>
    <h1>{{i18n.greeting}}</h1>
</body>
</html>
";

const TREE: &[Entry] = &[Entry::Dir(
    "michi",
    &[
        Entry::File("michi.config.js", WORKSPACE_CONFIG),
        Entry::Dir("build", &[]),
        Entry::Dir(
            "src",
            &[Entry::Dir(
                "untitled",
                &[
                    Entry::Dir(
                        "styles",
                        &[
                            Entry::File("global.scss", ""),
                            Entry::File("head.scss", ""),
                        ],
                    ),
                    Entry::Dir("templates", &[Entry::File("index.dust", INDEX_TEMPLATE)]),
                    Entry::Dir("i18n", &[Entry::File("us.js", LOCALE)]),
                    Entry::Dir("img", &[]),
                    Entry::File("config.js", PROJECT_CONFIG),
                ],
            )],
        ),
    ],
)];

/// Creates the starter workspace below `root`.
///
/// Entries that already exist are reported and left untouched, including
/// everything below an existing directory. Returns every entry visited along
/// with whether it was created.
pub fn scaffold_workspace<P: AsRef<Path>>(root: P) -> Result<Vec<(PathBuf, bool)>> {
    let root = root.as_ref();
    debug!("scaffold_workspace({})", root.display());
    report::describe("Setting up workspace");
    let mut visited = Vec::new();
    create_tree(root, TREE, &mut visited)?;
    Ok(visited)
}

fn create_tree(
    parent: &Path,
    entries: &[Entry],
    visited: &mut Vec<(PathBuf, bool)>,
) -> Result<()> {
    for entry in entries {
        match entry {
            Entry::Dir(name, children) => {
                let path = parent.join(name);
                let created = create(&path, fs::create_dir(&path))?;
                visited.push((path.clone(), created));
                if created {
                    create_tree(&path, children, visited)?;
                }
            }
            Entry::File(name, content) => {
                let path = parent.join(name);
                let result = OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&path)
                    .and_then(|mut f| f.write_all(content.as_bytes()));
                let created = create(&path, result)?;
                visited.push((path, created));
            }
        }
    }
    Ok(())
}

fn create(path: &Path, result: std::io::Result<()>) -> Result<bool> {
    let display = path.display().to_string();
    match result {
        Ok(()) => {
            report::line(&display, true, "OK");
            Ok(true)
        }
        Err(e) if e.kind() == IoErrorKind::AlreadyExists => {
            report::line(&display, false, "EXISTS");
            Ok(false)
        }
        Err(e) => Err(Error::io(format!("creating {}", display), e).into()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_starter_workspace() {
        let tmp = TempDir::new().unwrap();
        let visited = scaffold_workspace(tmp.path()).unwrap();
        assert!(visited.iter().all(|(_, created)| *created));

        let project = tmp.path().join("michi/src/untitled");
        assert!(tmp.path().join("michi/build").is_dir());
        assert!(project.join("img").is_dir());
        assert_eq!(fs::read_to_string(project.join("styles/head.scss")).unwrap(), "");
        assert!(fs::read_to_string(tmp.path().join("michi/michi.config.js"))
            .unwrap()
            .contains("untitled"));
        assert!(project.join("templates/index.dust").is_file());
        assert!(project.join("i18n/us.js").is_file());
        assert!(project.join("config.js").is_file());
    }

    #[test]
    fn existing_entries_are_left_alone() {
        let tmp = TempDir::new().unwrap();
        let main_dir = tmp.path().join("michi");
        fs::create_dir(&main_dir).unwrap();
        fs::write(main_dir.join("notes.txt"), "mine").unwrap();

        let visited = scaffold_workspace(tmp.path()).unwrap();
        assert_eq!(visited, vec![(main_dir.clone(), false)]);
        assert_eq!(fs::read_to_string(main_dir.join("notes.txt")).unwrap(), "mine");
        assert!(!main_dir.join("src").exists());
    }
}
