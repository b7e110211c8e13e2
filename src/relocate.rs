use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::audit::TransactionRecord;
use crate::error::{Result, ScanError};

/// Name of the quarantine directory created under the scanned root.
pub const QUARANTINE_DIR_NAME: &str = "duplicates";

/// Picks destination names and moves duplicates into one quarantine directory.
///
/// A relocator owns name selection for its directory, so a single instance
/// must handle every move into that directory during a scan. Names handed out
/// during the scan are remembered, which keeps dry runs choosing the same
/// names a live run would.
#[derive(Debug)]
pub struct Relocator {
    quarantine_dir: PathBuf,
    dry_run: bool,
    claimed: HashSet<OsString>,
    dir_ready: bool,
}

impl Relocator {
    pub fn new(quarantine_dir: PathBuf, dry_run: bool) -> Self {
        Self {
            quarantine_dir,
            dry_run,
            claimed: HashSet::new(),
            dir_ready: false,
        }
    }

    /// First free name for `duplicate` in the quarantine directory.
    ///
    /// Tries the plain file name, then `1_<name>`, `2_<name>` and so on,
    /// skipping names that exist on disk or were already handed out.
    pub fn destination_for(&self, duplicate: &Path) -> PathBuf {
        let base = duplicate
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| OsString::from("unnamed"));

        let mut candidate = self.quarantine_dir.join(&base);
        let mut counter = 1u64;
        while self.is_taken(&candidate) {
            let mut name = OsString::from(format!("{counter}_"));
            name.push(&base);
            candidate = self.quarantine_dir.join(name);
            counter += 1;
        }
        candidate
    }

    fn is_taken(&self, candidate: &Path) -> bool {
        let claimed = candidate
            .file_name()
            .is_some_and(|name| self.claimed.contains(&claim_key(name)));
        claimed || fs::symlink_metadata(candidate).is_ok()
    }

    fn claim(&mut self, destination: &Path) {
        if let Some(name) = destination.file_name() {
            self.claimed.insert(claim_key(name));
        }
    }

    /// Moves `duplicate` into quarantine, or only reports where it would go.
    pub fn relocate(&mut self, duplicate: &Path, original: &Path) -> Result<TransactionRecord> {
        let destination = self.destination_for(duplicate);

        if self.dry_run {
            debug!(
                "Dry run: '{}' would be moved to '{}'",
                duplicate.display(),
                destination.display()
            );
            self.claim(&destination);
            return Ok(TransactionRecord::DryRun {
                duplicate: duplicate.to_path_buf(),
                destination,
            });
        }

        let write_error = |source| ScanError::Write {
            path: duplicate.to_path_buf(),
            destination: destination.clone(),
            source,
        };

        if !self.dir_ready {
            fs::create_dir_all(&self.quarantine_dir).map_err(write_error)?;
            self.dir_ready = true;
        }
        move_file(duplicate, &destination).map_err(write_error)?;

        info!(
            "Moved '{}' to '{}' (original '{}')",
            duplicate.display(),
            destination.display(),
            original.display()
        );
        self.claim(&destination);
        Ok(TransactionRecord::Moved {
            duplicate: duplicate.to_path_buf(),
            original: original.to_path_buf(),
            destination,
        })
    }
}

/// Key under which a handed-out name is remembered.
///
/// Default filesystems on Windows and macOS ignore case, so `X.txt` and
/// `x.txt` collide there. Lowercasing approximates their folding rules.
/// Case-insensitive mounts on other platforms are not detected.
#[cfg(any(windows, target_os = "macos"))]
fn claim_key(name: &OsStr) -> OsString {
    OsString::from(name.to_string_lossy().to_lowercase())
}

#[cfg(not(any(windows, target_os = "macos")))]
fn claim_key(name: &OsStr) -> OsString {
    name.to_os_string()
}

/// Renames `src` to `dest`, copying across filesystem boundaries.
pub fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(err) if is_cross_device_error(&err) => {
            debug!("'{}' is on another device, copying", src.display());
            copy_then_remove(src, dest)
        }
        Err(err) => Err(err),
    }
}

fn copy_then_remove(src: &Path, dest: &Path) -> io::Result<()> {
    if let Err(err) = fs::copy(src, dest).and_then(|_| fs::File::open(dest)?.sync_all()) {
        let _ = fs::remove_file(dest);
        return Err(err);
    }
    fs::remove_file(src)
}

fn is_cross_device_error(err: &io::Error) -> bool {
    // EXDEV on unix, ERROR_NOT_SAME_DEVICE on windows
    err.kind() == io::ErrorKind::CrossesDevices
}
