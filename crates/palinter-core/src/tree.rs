//! Read-only directory snapshot consumed by the walker.
//!
//! Children are kept in lexicographic order so that traversal and reports
//! are stable across runs on an unchanged tree. Nodes do not point back at
//! their parents; the walker passes the parent down while it descends.

use crate::config::model::GlobPattern;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Display path of the project root.
pub const ROOT: &str = ".";

/// Where a file's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Read from this absolute path when needed.
    Disk(PathBuf),
    /// Held in memory (self-test projects and unit tests).
    Inline(Vec<u8>),
}

/// A file in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    /// File name with extensions.
    pub name: String,
    /// Root-relative display path, e.g. `./src/index.ts`.
    pub path: String,
    /// Content origin.
    pub source: Source,
}

impl FileNode {
    /// Reads the raw bytes of the file.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error for unreadable disk files.
    pub fn read(&self) -> std::io::Result<Vec<u8>> {
        match &self.source {
            Source::Disk(path) => std::fs::read(path),
            Source::Inline(bytes) => Ok(bytes.clone()),
        }
    }
}

/// A folder in the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderNode {
    /// Folder name (`.` for the root).
    pub name: String,
    /// Root-relative display path, e.g. `./src/stores`.
    pub path: String,
    /// Subfolders, sorted by name.
    pub folders: Vec<FolderNode>,
    /// Files, sorted by name.
    pub files: Vec<FileNode>,
}

impl FolderNode {
    /// Creates an empty root folder.
    #[must_use]
    pub fn root() -> Self {
        Self {
            name: ROOT.to_string(),
            path: ROOT.to_string(),
            ..Self::default()
        }
    }

    /// Names of the files directly in this folder, sorted.
    pub fn file_names(&self) -> impl Iterator<Item = &str> + Clone {
        self.files.iter().map(|f| f.name.as_str())
    }

    /// Looks up a direct subfolder.
    #[must_use]
    pub fn folder(&self, name: &str) -> Option<&FolderNode> {
        self.folders.iter().find(|f| f.name == name)
    }

    /// Counts `(files, folders)` in this subtree, this folder included.
    #[must_use]
    pub fn count(&self) -> (usize, usize) {
        self.folders
            .iter()
            .map(FolderNode::count)
            .fold((self.files.len(), 1), |(fi, fo), (a, b)| (fi + a, fo + b))
    }
}

/// Joins a display path and a child name.
#[must_use]
pub fn child_path(parent: &str, name: &str) -> String {
    format!("{parent}/{name}")
}

/// Options for [`snapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotOptions<'a> {
    /// Honour `.gitignore` and related ignore files.
    pub respect_gitignore: bool,
    /// Root-relative globs of paths to leave out.
    pub ignore: &'a [GlobPattern],
}

/// Builds a snapshot of the directory tree under `root`.
///
/// The `.git` folder is always left out.
///
/// # Errors
///
/// Returns error if `root` is not a readable directory or a directory
/// entry cannot be read.
pub fn snapshot(root: &Path, options: &SnapshotOptions<'_>) -> Result<FolderNode, ignore::Error> {
    let mut builder = ignore::WalkBuilder::new(root);
    builder
        .hidden(false)
        .git_ignore(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .git_global(options.respect_gitignore)
        .parents(options.respect_gitignore)
        .require_git(false);

    let filter_root = root.to_path_buf();
    let globs = options.ignore.to_vec();
    builder.filter_entry(move |entry| {
        if entry.depth() == 0 {
            return true;
        }
        let Ok(relative) = entry.path().strip_prefix(&filter_root) else {
            return true;
        };
        let is_git_dir = entry.file_type().is_some_and(|t| t.is_dir())
            && entry.file_name() == ".git";
        !is_git_dir && !globs.iter().any(|g| g.matches(relative))
    });

    let mut tree = PendingFolder::default();
    for entry in builder.build() {
        let entry = entry?;
        if entry.depth() == 0 {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
        trace!("snapshot entry: {}", relative.display());
        tree.insert(&segments, is_dir, Source::Disk(entry.path().to_path_buf()));
    }

    let node = tree.finish(ROOT.to_string(), ROOT.to_string());
    let (files, folders) = node.count();
    debug!("Snapshot of {}: {files} file(s), {folders} folder(s)", root.display());
    Ok(node)
}

/// Builds a snapshot from an in-memory structure description.
///
/// Keys starting with `/` are folders whose values are nested structures;
/// any other key is a file whose value is its content. Keys may contain
/// several segments (`/src/stores`, `src/index.ts`).
///
/// # Errors
///
/// Returns the offending key if a folder value is not a mapping or a file
/// value is not a string.
pub fn from_structure(structure: &serde_json::Value) -> Result<FolderNode, String> {
    let mut tree = PendingFolder::default();
    fill(&mut tree, &[], structure)?;
    Ok(tree.finish(ROOT.to_string(), ROOT.to_string()))
}

fn fill(
    tree: &mut PendingFolder,
    prefix: &[String],
    structure: &serde_json::Value,
) -> Result<(), String> {
    let entries = match structure {
        serde_json::Value::Object(entries) => entries,
        serde_json::Value::Null => return Ok(()),
        _ => return Err(format!("`/{}` must be a mapping", prefix.join("/"))),
    };
    for (key, value) in entries {
        let mut segments = prefix.to_vec();
        segments.extend(
            key.split('/')
                .filter(|s| !s.is_empty() && *s != ".")
                .map(str::to_string),
        );
        if segments.len() == prefix.len() {
            return Err(format!("empty path `{key}`"));
        }
        if key.starts_with('/') {
            tree.insert(&segments, true, Source::Inline(Vec::new()));
            fill(tree, &segments, value)?;
        } else {
            let content = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => String::new(),
                _ => return Err(format!("file `{key}` must have text content")),
            };
            tree.insert(&segments, false, Source::Inline(content.into_bytes()));
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
struct PendingFolder {
    folders: BTreeMap<String, PendingFolder>,
    files: BTreeMap<String, Source>,
}

impl PendingFolder {
    fn insert(&mut self, segments: &[String], is_dir: bool, source: Source) {
        let Some((last, parents)) = segments.split_last() else {
            return;
        };
        let mut folder = self;
        for segment in parents {
            folder = folder.folders.entry(segment.clone()).or_default();
        }
        if is_dir {
            folder.folders.entry(last.clone()).or_default();
        } else {
            folder.files.insert(last.clone(), source);
        }
    }

    fn finish(self, name: String, path: String) -> FolderNode {
        let files = self
            .files
            .into_iter()
            .map(|(name, source)| FileNode {
                path: child_path(&path, &name),
                name,
                source,
            })
            .collect();
        let folders = self
            .folders
            .into_iter()
            .map(|(name, folder)| {
                let child = child_path(&path, &name);
                folder.finish(name, child)
            })
            .collect();
        FolderNode {
            name,
            path,
            folders,
            files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[test]
    fn structure_builds_sorted_tree() {
        let root = from_structure(&json!({
            "/src": {
                "b.ts": "",
                "a.ts": "export {}",
                "/stores": { "userStore.ts": "" }
            },
            "README.md": null
        }))
        .unwrap();

        assert_eq!(root.files.len(), 1);
        assert_eq!(root.files[0].path, "./README.md");
        let src = root.folder("src").unwrap();
        assert_eq!(src.file_names().collect::<Vec<_>>(), vec!["a.ts", "b.ts"]);
        assert_eq!(src.files[0].read().unwrap(), b"export {}");
        assert_eq!(
            src.folder("stores").unwrap().files[0].path,
            "./src/stores/userStore.ts"
        );
        assert_eq!(root.count(), (4, 3));
    }

    #[test]
    fn structure_accepts_multi_segment_keys() {
        let root = from_structure(&json!({ "/src/icons": { "a.svg": "" } })).unwrap();
        let icons = root.folder("src").and_then(|s| s.folder("icons")).unwrap();
        assert_eq!(icons.path, "./src/icons");
    }

    #[test]
    fn structure_rejects_non_text_file() {
        let err = from_structure(&json!({ "a.ts": 1 })).unwrap_err();
        assert!(err.contains("a.ts"));
    }

    #[test]
    fn snapshot_reads_disk_and_applies_ignore() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/generated")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("src/index.ts"), "x").unwrap();
        fs::write(dir.path().join("src/generated/api.ts"), "x").unwrap();
        fs::write(dir.path().join(".git/HEAD"), "x").unwrap();
        fs::write(dir.path().join(".env"), "x").unwrap();

        let ignore = vec![GlobPattern::new("src/generated").unwrap()];
        let root = snapshot(
            dir.path(),
            &SnapshotOptions {
                respect_gitignore: true,
                ignore: &ignore,
            },
        )
        .unwrap();

        assert!(root.folder(".git").is_none());
        assert_eq!(root.files[0].name, ".env");
        let src = root.folder("src").unwrap();
        assert!(src.folder("generated").is_none());
        assert_eq!(src.files[0].path, "./src/index.ts");
        assert_eq!(src.files[0].read().unwrap(), b"x");
    }

    #[test]
    fn snapshot_respects_gitignore_toggle() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "dist/\n").unwrap();
        fs::create_dir_all(dir.path().join("dist")).unwrap();
        fs::write(dir.path().join("dist/out.js"), "x").unwrap();

        let with = snapshot(
            dir.path(),
            &SnapshotOptions {
                respect_gitignore: true,
                ignore: &[],
            },
        )
        .unwrap();
        assert!(with.folder("dist").is_none());

        let without = snapshot(
            dir.path(),
            &SnapshotOptions {
                respect_gitignore: false,
                ignore: &[],
            },
        )
        .unwrap();
        assert!(without.folder("dist").is_some());
    }
}
