//! Error types for duplicate scanning and relocation.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors produced while scanning a tree.
///
/// `Read` and `Write` are per-file: the scanner turns them into
/// [`TransactionRecord::Error`](crate::audit::TransactionRecord::Error) entries
/// and keeps going. `LogWrite` is reported on the finished
/// [`ScanReport`](crate::scanner::ScanReport). The remaining variants abort a
/// scan, and all of them are raised before traversal starts.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid root directory '{}': {source}", path.display())]
    InvalidRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot resolve excluded path '{}': {source}", path.display())]
    InvalidExclusion {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("A scan of '{}' is already in progress", .0.display())]
    ScanInProgress(PathBuf),

    #[error("Failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to move '{}' to '{}': {source}", path.display(), destination.display())]
    Write {
        path: PathBuf,
        destination: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write log file '{}': {source}", path.display())]
    LogWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    pub fn path(&self) -> &Path {
        match self {
            Self::InvalidRoot { path, .. }
            | Self::InvalidExclusion { path, .. }
            | Self::Read { path, .. }
            | Self::Write { path, .. }
            | Self::LogWrite { path, .. } => path,
            Self::ScanInProgress(path) => path,
        }
    }
}

pub type Result<T, E = ScanError> = std::result::Result<T, E>;
