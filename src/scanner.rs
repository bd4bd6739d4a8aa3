//! Project file enumeration.
//!
//! The walk is lazy and restartable: every call to [`ProjectScanner::files`]
//! re-walks the tree, so long-running monitors pick up created and deleted
//! files without invalidation logic. Order is deterministic (entries sorted
//! per directory), which keeps whole-run output stable across repeat scans.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use globset::GlobSet;
use serde::{Deserialize, Serialize};
use walkdir::{DirEntry, WalkDir};

use crate::config::WatchConfig;

/// Files longer than this show up in the structure overview.
const LARGE_FILE_LINES: usize = 500;

/// Walks a project root, yielding the files worth analyzing.
pub struct ProjectScanner {
    root: PathBuf,
    excluded_dirs: HashSet<String>,
    extensions: HashSet<String>,
    exclude_globs: GlobSet,
}

impl ProjectScanner {
    pub fn new(root: impl Into<PathBuf>, config: &WatchConfig) -> anyhow::Result<Self> {
        Ok(Self {
            root: root.into(),
            excluded_dirs: config.excluded_dirs.iter().cloned().collect(),
            extensions: config.normalized_extensions().into_iter().collect(),
            exclude_globs: config.exclude_globs()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazy walk over the project, pruned and filtered. Each call starts
    /// over from the root.
    pub fn files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| self.keep_entry(entry))
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| self.selected(path))
    }

    /// Files whose mtime is strictly after `since`. Files whose metadata
    /// cannot be read are excluded rather than failing the walk.
    pub fn files_modified_since(
        &self,
        since: SystemTime,
    ) -> impl Iterator<Item = PathBuf> + '_ {
        self.files().filter(move |path| {
            fs::metadata(path)
                .and_then(|meta| meta.modified())
                .map(|mtime| mtime > since)
                .unwrap_or(false)
        })
    }

    /// Keep the root itself; prune excluded directories wherever they
    /// appear below it.
    fn keep_entry(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }
        if !entry.file_type().is_dir() {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        !self.excluded_dirs.contains(name.as_ref())
    }

    fn selected(&self, path: &Path) -> bool {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if !self.extensions.contains(&extension) {
            return false;
        }
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        !self.exclude_globs.is_match(relative)
    }

    /// Walk once more and summarize the tree: counts, oversized files,
    /// package directories without an `__init__.py`.
    pub fn structure(&self) -> StructureOverview {
        let mut overview = StructureOverview::default();
        let mut package_dirs: HashSet<PathBuf> = HashSet::new();

        for path in self.files() {
            overview.total_files += 1;
            if let Ok(content) = fs::read_to_string(&path) {
                let lines = content.lines().count();
                overview.total_lines += lines;
                if lines > LARGE_FILE_LINES {
                    overview.large_files.push(LargeFile {
                        path: self.relative_display(&path),
                        lines,
                    });
                }
            }
            if let Some(parent) = path.parent() {
                if parent != self.root {
                    package_dirs.insert(parent.to_path_buf());
                }
            }
        }

        let mut missing: Vec<String> = package_dirs
            .into_iter()
            .filter(|dir| !dir.join("__init__.py").is_file())
            .map(|dir| self.relative_display(&dir))
            .collect();
        missing.sort();
        overview.missing_init_dirs = missing;
        overview
    }

    fn relative_display(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

/// Shape of the analyzed tree, reported alongside findings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureOverview {
    pub total_files: usize,
    pub total_lines: usize,
    pub large_files: Vec<LargeFile>,
    pub missing_init_dirs: Vec<String>,
}

/// A file over the size threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LargeFile {
    pub path: String,
    pub lines: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn scanner(dir: &TempDir) -> ProjectScanner {
        ProjectScanner::new(dir.path(), &WatchConfig::default()).unwrap()
    }

    fn touch(dir: &TempDir, rel: &str, content: &str) {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn yields_only_allowed_extensions() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "app.py", "x = 1\n");
        touch(&dir, "notes.txt", "hello\n");
        touch(&dir, "lib.pyc", "\x00");
        let files: Vec<PathBuf> = scanner(&dir).files().collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("app.py"));
    }

    #[test]
    fn prunes_excluded_directories() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "app.py", "x = 1\n");
        touch(&dir, "__pycache__/app.py", "x = 1\n");
        touch(&dir, "venv/lib/site.py", "x = 1\n");
        touch(&dir, "pkg/util.py", "x = 1\n");
        let files: Vec<PathBuf> = scanner(&dir).files().collect();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| !f.to_string_lossy().contains("__pycache__")));
        assert!(files.iter().all(|f| !f.to_string_lossy().contains("venv")));
    }

    #[test]
    fn exclude_patterns_filter_individual_paths() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "app/models.py", "x = 1\n");
        touch(&dir, "app/migrations/0001_initial.py", "x = 1\n");
        let mut config = WatchConfig::default();
        config.exclude_patterns = vec!["**/migrations/**".to_string()];
        let scanner = ProjectScanner::new(dir.path(), &config).unwrap();
        let files: Vec<PathBuf> = scanner.files().collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("models.py"));
    }

    #[test]
    fn order_is_deterministic_and_walk_is_restartable() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "c.py", "x = 1\n");
        touch(&dir, "a.py", "x = 1\n");
        touch(&dir, "b/inner.py", "x = 1\n");
        let scanner = scanner(&dir);
        let first: Vec<PathBuf> = scanner.files().collect();
        let second: Vec<PathBuf> = scanner.files().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert!(first[0].ends_with("a.py"));
    }

    #[test]
    fn modified_since_filters_by_mtime() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "app.py", "x = 1\n");
        let scanner = scanner(&dir);

        let long_ago = SystemTime::now() - Duration::from_secs(3600);
        let recent: Vec<PathBuf> = scanner.files_modified_since(long_ago).collect();
        assert_eq!(recent.len(), 1);

        let future = SystemTime::now() + Duration::from_secs(3600);
        let none: Vec<PathBuf> = scanner.files_modified_since(future).collect();
        assert!(none.is_empty());
    }

    #[test]
    fn structure_counts_files_and_lines() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "app.py", "a = 1\nb = 2\nc = 3\n");
        touch(&dir, "pkg/__init__.py", "");
        touch(&dir, "pkg/util.py", "x = 1\n");
        let overview = scanner(&dir).structure();
        assert_eq!(overview.total_files, 3);
        assert_eq!(overview.total_lines, 4);
        assert!(overview.large_files.is_empty());
        assert!(overview.missing_init_dirs.is_empty());
    }

    #[test]
    fn structure_flags_large_files_and_missing_inits() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "big/huge.py", &"x = 1\n".repeat(501));
        let overview = scanner(&dir).structure();
        assert_eq!(overview.large_files.len(), 1);
        assert_eq!(overview.large_files[0].lines, 501);
        assert_eq!(overview.missing_init_dirs, vec!["big".to_string()]);
    }
}
