//! Per-file failures. A `FileError` fails one file, never the whole run.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("'{}' does not exist", path.display())]
    Missing { path: PathBuf },
    #[error("'{}' is not a {expected} file", path.display())]
    NotSource { path: PathBuf, expected: String },
    #[error("cannot walk '{}': {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("cannot read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    /// The file or root the failure belongs to.
    pub fn path(&self) -> &Path {
        match self {
            FileError::Missing { path }
            | FileError::NotSource { path, .. }
            | FileError::Walk { path, .. }
            | FileError::Read { path, .. }
            | FileError::Write { path, .. } => path,
        }
    }
}
