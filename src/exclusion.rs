use std::path::{Component, Path, PathBuf};

use log::debug;

use crate::error::{Result, ScanError};

/// Absolute, normalized directory paths whose subtrees are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    roots: Vec<PathBuf>,
}

impl ExclusionSet {
    /// Resolves caller-supplied paths once, before traversal.
    ///
    /// Paths that exist are canonicalized so they compare equal to the
    /// canonical scan root's descendants. Paths that do not exist are made
    /// absolute against the current directory and normalized lexically.
    pub fn resolve<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut roots = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let resolved = match path.canonicalize() {
                Ok(canonical) => canonical,
                Err(_) => {
                    let absolute =
                        std::path::absolute(path).map_err(|source| ScanError::InvalidExclusion {
                            path: path.to_path_buf(),
                            source,
                        })?;
                    normalize(&absolute)
                }
            };
            debug!("Excluding '{}' (from '{}')", resolved.display(), path.display());
            roots.push(resolved);
        }
        Ok(Self { roots })
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.roots.iter().map(PathBuf::as_path)
    }

    /// True if `path` equals or descends from any member.
    pub fn covers(&self, path: &Path) -> bool {
        self.roots.iter().any(|root| path.starts_with(root))
    }
}

/// Whether `path` lies inside an excluded subtree or the quarantine directory.
///
/// Matching is per path component, so `/data/foo2` is not covered by an
/// exclusion of `/data/foo`. Both sides must already be absolute and
/// normalized.
pub fn is_excluded(path: &Path, exclusions: &ExclusionSet, quarantine_dir: &Path) -> bool {
    path.starts_with(quarantine_dir) || exclusions.covers(path)
}

/// Removes `.` components and folds `..` into its parent without touching
/// the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
