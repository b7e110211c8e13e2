//! Finds files with identical content under a root directory and moves every
//! copy after the first into `<root>/duplicates`, recording each step in
//! `<root>/duplicates_log.txt`.
//!
//! ```no_run
//! use std::path::Path;
//!
//! let report = dupe_quarantine::scan(Path::new("/data/photos"), &[], true)?;
//! for record in &report.records {
//!     println!("{record}");
//! }
//! # Ok::<(), dupe_quarantine::ScanError>(())
//! ```

pub mod audit;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod exclusion;
pub mod fingerprint;
pub mod logging;
pub mod relocate;
pub mod scanner;
pub mod signal;
pub mod utils;
pub mod walker;

pub use audit::{AuditLog, LOG_FILE_NAME, LOG_TEMP_PREFIX, TransactionRecord};
pub use config::ScanOptions;
pub use duplicates::{Classification, Registry};
pub use error::{Result, ScanError};
pub use exclusion::{ExclusionSet, is_excluded};
pub use fingerprint::{CHUNK_SIZE, ContentIdentity, fingerprint_file};
pub use relocate::{QUARANTINE_DIR_NAME, Relocator};
pub use scanner::{FileOutcome, ScanReport, ScanStats, scan, scan_with_options};
pub use signal::AbortHandle;
