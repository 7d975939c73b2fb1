//! Crash-safe file replacement.
//!
//! New content is written to a temporary file next to the target, flushed
//! and synced, and only then renamed over the original. Dropping a
//! [`StagedWrite`] without committing removes the temporary file and leaves
//! the original untouched.

use crate::error::FileError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug)]
pub struct StagedWrite {
    target: PathBuf,
    temp: NamedTempFile,
}

impl StagedWrite {
    /// Write `contents` to a temporary sibling of `target`.
    pub fn stage(target: &Path, contents: &str) -> Result<Self, FileError> {
        let write_err = |source| FileError::Write { path: target.to_path_buf(), source };
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir).map_err(write_err)?;
        temp.write_all(contents.as_bytes()).map_err(write_err)?;
        temp.flush().map_err(write_err)?;
        temp.as_file().sync_all().map_err(write_err)?;
        if let Ok(meta) = fs::metadata(target) {
            fs::set_permissions(temp.path(), meta.permissions()).map_err(write_err)?;
        }
        Ok(Self { target: target.to_path_buf(), temp })
    }

    /// Path of the temporary file holding the staged content.
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Atomically replace the target with the staged content.
    pub fn commit(self) -> Result<(), FileError> {
        let target = self.target;
        self.temp
            .persist(&target)
            .map_err(|e| FileError::Write { path: target.clone(), source: e.error })?;
        Ok(())
    }
}

/// Stage and commit in one step.
pub fn write_atomic(target: &Path, contents: &str) -> Result<(), FileError> {
    StagedWrite::stage(target, contents)?.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn commit_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.go");
        fs::write(&path, "old").unwrap();
        write_atomic(&path, "new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn abandoned_stage_keeps_original() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.go");
        fs::write(&path, "original").unwrap();

        let staged = StagedWrite::stage(&path, "half-done").unwrap();
        let temp = staged.temp_path().to_path_buf();
        assert!(temp.exists());
        assert_eq!(temp.parent(), Some(dir.path()));
        drop(staged);

        assert!(!temp.exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), "original");
    }

    #[cfg(unix)]
    #[test]
    fn keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.go");
        fs::write(&path, "x").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();
        write_atomic(&path, "y").unwrap();
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o640);
    }
}
