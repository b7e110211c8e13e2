use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;
use tempfile::Builder;

use crate::error::{Result, ScanError};

/// File name of the audit log, written directly under the scanned root.
pub const LOG_FILE_NAME: &str = "duplicates_log.txt";

/// Prefix of the temporary file the log is staged in before the rename.
pub const LOG_TEMP_PREFIX: &str = ".duplicates_log";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionRecord {
    DryRun {
        duplicate: PathBuf,
        destination: PathBuf,
    },
    Moved {
        duplicate: PathBuf,
        original: PathBuf,
        destination: PathBuf,
    },
    Error { path: PathBuf, message: String },
}

impl TransactionRecord {
    pub fn error(err: &ScanError) -> Self {
        Self::Error {
            path: err.path().to_path_buf(),
            message: err.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl fmt::Display for TransactionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DryRun {
                duplicate,
                destination,
            } => write!(
                f,
                "Dry-run: Duplicate found - {} (would be moved to {})",
                duplicate.display(),
                destination.display()
            ),
            Self::Moved {
                duplicate,
                original,
                destination,
            } => write!(
                f,
                "Moved duplicate:\n  {}\n→ Original: {}\n→ Moved to: {}",
                duplicate.display(),
                original.display(),
                destination.display()
            ),
            Self::Error { path, message } => {
                write!(f, "Error processing {}: {}", path.display(), message)
            }
        }
    }
}

/// Records accumulated in discovery order for one scan.
#[derive(Debug, Default, Clone)]
pub struct AuditLog {
    records: Vec<TransactionRecord>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: TransactionRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<TransactionRecord> {
        self.records
    }

    /// Blank-line separated records, newline terminated.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, record) in self.records.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&record.to_string());
            out.push('\n');
        }
        out
    }

    /// Replaces `log_path` with the rendered log.
    ///
    /// The text goes to a `LOG_TEMP_PREFIX` file next to `log_path` which is
    /// then renamed into place, so readers see either the previous log or the
    /// complete new one. A temp file left by a crash is skipped by later
    /// scans.
    pub fn persist(&self, log_path: &Path) -> Result<()> {
        let log_error = |source| ScanError::LogWrite {
            path: log_path.to_path_buf(),
            source,
        };
        let dir = log_path.parent().unwrap_or_else(|| Path::new("."));

        let mut tmp = Builder::new()
            .prefix(LOG_TEMP_PREFIX)
            .tempfile_in(dir)
            .map_err(log_error)?;
        tmp.write_all(self.render().as_bytes()).map_err(log_error)?;
        tmp.as_file().sync_all().map_err(log_error)?;
        tmp.persist(log_path).map_err(|e| log_error(e.error))?;

        info!("Wrote {} records to {}", self.records.len(), log_path.display());
        Ok(())
    }
}
