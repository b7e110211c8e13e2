//! Directory traversal yielding candidate files.
//!
//! Excluded subtrees and the quarantine directory are pruned before walkdir
//! descends into them. Entries inside a directory are visited in file name
//! order, so repeated walks over an unchanged tree visit files in the same
//! sequence and the same copy wins as the original each time.

use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::{DirEntry, WalkDir};

use crate::audit::LOG_TEMP_PREFIX;
use crate::error::ScanError;
use crate::exclusion::{ExclusionSet, is_excluded};

/// Prunes everything the scanner must not treat as content.
#[derive(Debug, Clone)]
pub struct ScanFilter {
    exclusions: ExclusionSet,
    quarantine_dir: PathBuf,
    log_path: PathBuf,
}

impl ScanFilter {
    pub fn new(exclusions: ExclusionSet, quarantine_dir: PathBuf, log_path: PathBuf) -> Self {
        Self {
            exclusions,
            quarantine_dir,
            log_path,
        }
    }

    pub fn rejects(&self, path: &Path) -> bool {
        is_excluded(path, &self.exclusions, &self.quarantine_dir)
            || path == self.log_path
            || self.is_staged_log(path)
    }

    // Leftover from a log write that never reached the rename
    fn is_staged_log(&self, path: &Path) -> bool {
        path.parent() == self.log_path.parent()
            && path
                .file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with(LOG_TEMP_PREFIX))
    }
}

/// Walks `root` lazily, one candidate at a time.
pub struct Walker<'a> {
    root: PathBuf,
    filter: &'a ScanFilter,
}

impl<'a> Walker<'a> {
    pub fn new(root: &Path, filter: &'a ScanFilter) -> Self {
        Self {
            root: root.to_path_buf(),
            filter,
        }
    }

    /// Regular files that survive the filter, in traversal order.
    ///
    /// Unreadable directories come through as `ScanError::Read` items and
    /// the walk carries on with their siblings. Symbolic links are neither
    /// followed nor yielded.
    pub fn candidates(self) -> impl Iterator<Item = Result<PathBuf, ScanError>> + 'a {
        let filter = self.filter;
        let root = self.root;

        WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                let keep = !filter.rejects(entry.path());
                if !keep {
                    debug!("Pruned '{}'", entry.path().display());
                }
                keep
            })
            .filter_map(move |entry| match entry {
                Ok(entry) if is_regular_file(&entry) => Some(Ok(entry.into_path())),
                Ok(_) => None,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                    debug!("Unreadable entry '{}': {}", path.display(), e);
                    let source = match e.into_io_error() {
                        Some(io_error) => io_error,
                        None => io::Error::other("filesystem loop detected"),
                    };
                    Some(Err(ScanError::Read { path, source }))
                }
            })
    }
}

fn is_regular_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tree() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        for (rel, content) in [
            ("a/1.txt", "one"),
            ("b/2.txt", "two"),
            ("skip/3.txt", "three"),
            ("skip2/4.txt", "four"),
            ("duplicates/5.txt", "five"),
            ("duplicates_log.txt", "old log"),
        ] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        (dir, root)
    }

    fn filter(root: &Path, exclude: &[PathBuf]) -> ScanFilter {
        ScanFilter::new(
            ExclusionSet::resolve(exclude).unwrap(),
            root.join("duplicates"),
            root.join("duplicates_log.txt"),
        )
    }

    fn relative(root: &Path, paths: Vec<PathBuf>) -> Vec<String> {
        paths
            .into_iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_prunes_exclusions_quarantine_and_log() {
        let (_dir, root) = tree();
        let filter = filter(&root, &[root.join("skip")]);

        let found: Vec<PathBuf> = Walker::new(&root, &filter)
            .candidates()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(relative(&root, found), vec!["a/1.txt", "b/2.txt", "skip2/4.txt"]);
    }

    #[test]
    fn test_leftover_log_temp_files_are_pruned() {
        let (_dir, root) = tree();
        fs::write(root.join(".duplicates_logA1b2C3"), "half-written log").unwrap();
        fs::write(root.join("a/.duplicates_log_kept.txt"), "not next to the log").unwrap();
        let filter = filter(&root, &[root.join("skip"), root.join("skip2")]);

        let found: Vec<PathBuf> = Walker::new(&root, &filter).candidates().map(Result::unwrap).collect();
        assert_eq!(
            relative(&root, found),
            vec!["a/.duplicates_log_kept.txt", "a/1.txt", "b/2.txt"]
        );
    }

    #[test]
    fn test_order_is_stable() {
        let (_dir, root) = tree();
        let filter = filter(&root, &[]);

        let first: Vec<_> = Walker::new(&root, &filter).candidates().map(Result::unwrap).collect();
        let second: Vec<_> = Walker::new(&root, &filter).candidates().map(Result::unwrap).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_excluded_root_yields_nothing() {
        let (_dir, root) = tree();
        let filter = filter(&root, &[root.clone()]);

        assert_eq!(Walker::new(&root, &filter).candidates().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_candidates() {
        let (_dir, root) = tree();
        std::os::unix::fs::symlink(root.join("a/1.txt"), root.join("a/link.txt")).unwrap();
        std::os::unix::fs::symlink(root.join("b"), root.join("c")).unwrap();
        let filter = filter(&root, &[]);

        let found: Vec<PathBuf> = Walker::new(&root, &filter).candidates().map(Result::unwrap).collect();
        assert_eq!(
            relative(&root, found),
            vec!["a/1.txt", "b/2.txt", "skip/3.txt", "skip2/4.txt"]
        );
    }
}
