use std::path::PathBuf;

use crate::signal::AbortHandle;

/// Options for one scan.
///
/// ```
/// use dupe_quarantine::ScanOptions;
///
/// let options = ScanOptions::new()
///     .exclude(["/data/photos/keep"])
///     .dry_run(true)
///     .threads(4);
/// assert!(options.dry_run);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Directories whose subtrees are skipped. Relative entries are resolved
    /// against the current directory when the scan starts.
    pub exclude: Vec<PathBuf>,
    pub dry_run: bool,
    /// Fingerprinting workers. 0 uses every available core, 1 hashes on the
    /// calling thread.
    pub threads: usize,
    pub progress: bool,
    pub abort: Option<AbortHandle>,
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.exclude.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn abort_handle(mut self, handle: AbortHandle) -> Self {
        self.abort = Some(handle);
        self
    }

    /// Worker count after resolving 0 to the machine's parallelism.
    pub fn effective_threads(&self) -> usize {
        match self.threads {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
    }

    pub(crate) fn abort_requested(&self) -> bool {
        self.abort.as_ref().is_some_and(AbortHandle::is_abort_requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ScanOptions::default();
        assert!(options.exclude.is_empty());
        assert!(!options.dry_run);
        assert!(!options.progress);
        assert!(options.effective_threads() >= 1);
        assert!(!options.abort_requested());
    }

    #[test]
    fn test_abort_passthrough() {
        let handle = AbortHandle::new();
        let options = ScanOptions::new().abort_handle(handle.clone()).threads(2);
        assert_eq!(options.effective_threads(), 2);

        handle.request_abort();
        assert!(options.abort_requested());
    }
}
