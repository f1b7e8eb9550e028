//! Installation exclusivity.
//!
//! The sync loop assumes it is the only writer of an installation's cursor
//! slot and content store. `InstallationLock` enforces that with an advisory
//! exclusive lock on a `LOCK` file in the installation's state directory.

use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Name of the lock file inside a state directory.
const LOCK_FILE: &str = "LOCK";

/// Holds the exclusive lock on one installation for as long as it lives.
///
/// The lock is released when the value is dropped, on every exit path.
#[derive(Debug)]
pub struct InstallationLock {
    path: PathBuf,
    _lock_file: File,
}

impl InstallationLock {
    /// Acquires the lock for the installation whose state lives in `state_dir`.
    ///
    /// Creates the directory if needed. Never blocks.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another holder exists, or an I/O
    /// error.
    pub fn acquire(state_dir: &Path) -> StorageResult<Self> {
        fs::create_dir_all(state_dir)?;

        let path = state_dir.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked(path));
        }

        tracing::debug!(path = %path.display(), "installation lock acquired");

        Ok(Self {
            path,
            _lock_file: lock_file,
        })
    }

    /// Returns the path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_holder_is_refused() {
        let dir = tempdir().unwrap();

        let first = InstallationLock::acquire(dir.path()).unwrap();
        let second = InstallationLock::acquire(dir.path());
        assert!(matches!(second, Err(StorageError::Locked(_))));

        drop(first);
        assert!(InstallationLock::acquire(dir.path()).is_ok());
    }

    #[test]
    fn independent_installations_do_not_contend() {
        let dir = tempdir().unwrap();

        let _a = InstallationLock::acquire(&dir.path().join("editorial")).unwrap();
        let b = InstallationLock::acquire(&dir.path().join("recommendations")).unwrap();
        assert!(b.path().ends_with("LOCK"));
    }
}
