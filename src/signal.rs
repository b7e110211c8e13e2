use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use log::warn;

/// Checked by the scanner between files. An aborted scan still writes the
/// audit log for the files processed so far.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_abort_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clears a previous request so the handle can drive another scan.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// Trips this handle on Ctrl+C.
    ///
    /// `ctrlc` allows one handler per process, so a second call fails.
    pub fn install_ctrlc(&self) -> Result<()> {
        let flag = Arc::clone(&self.flag);
        ctrlc::set_handler(move || {
            warn!("Interrupted, finishing the current file...");
            flag.store(true, Ordering::SeqCst);
        })
        .context("Failed to install Ctrl+C handler")
    }
}
