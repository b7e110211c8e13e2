use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

use log::debug;

use crate::fingerprint::ContentIdentity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// First file seen with this content.
    Original,
    /// Same content as the stored original.
    Duplicate { original: PathBuf },
}

/// First-seen registry for one scan.
///
/// Each identity maps to the first path observed with it, and that entry is
/// never replaced. Classification takes `&mut self`, so the check and the
/// insert happen under one exclusive borrow; a caller sharing a registry
/// between threads has to wrap it in a `Mutex` and hold the guard for the
/// whole `classify` call.
#[derive(Debug, Default)]
pub struct Registry {
    seen: HashMap<ContentIdentity, PathBuf>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&mut self, path: &Path, identity: ContentIdentity) -> Classification {
        match self.seen.entry(identity) {
            Entry::Vacant(slot) => {
                slot.insert(path.to_path_buf());
                Classification::Original
            }
            Entry::Occupied(slot) => {
                debug!(
                    "'{}' duplicates '{}' ({})",
                    path.display(),
                    slot.get().display(),
                    identity
                );
                Classification::Duplicate {
                    original: slot.get().clone(),
                }
            }
        }
    }

    pub fn original_of(&self, identity: &ContentIdentity) -> Option<&Path> {
        self.seen.get(identity).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_wins() {
        let mut registry = Registry::new();
        let hello = ContentIdentity::of_bytes(b"hello");

        assert_eq!(registry.classify(Path::new("/r/a/1.txt"), hello), Classification::Original);
        assert_eq!(
            registry.classify(Path::new("/r/b/2.txt"), hello),
            Classification::Duplicate {
                original: PathBuf::from("/r/a/1.txt")
            }
        );
        assert_eq!(
            registry.classify(Path::new("/r/c/3.txt"), hello),
            Classification::Duplicate {
                original: PathBuf::from("/r/a/1.txt")
            }
        );
        assert_eq!(registry.original_of(&hello), Some(Path::new("/r/a/1.txt")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_content_all_original() {
        let mut registry = Registry::new();

        for (name, content) in [("a", &b"hello"[..]), ("b", &b"world"[..]), ("c", &b""[..])] {
            let identity = ContentIdentity::of_bytes(content);
            assert_eq!(registry.classify(Path::new(name), identity), Classification::Original);
        }
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_same_digest_different_size_is_distinct() {
        let mut registry = Registry::new();
        let identity = ContentIdentity::of_bytes(b"abc");
        let resized = ContentIdentity {
            size: identity.size + 1,
            ..identity
        };

        registry.classify(Path::new("a"), identity);
        assert_eq!(registry.classify(Path::new("b"), resized), Classification::Original);
    }
}
