//! Crash-safe file replacement.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Replaces the contents of `path` so that a crash leaves either the old or
/// the new contents, never a mix.
///
/// Uses the write-then-rename pattern:
/// 1. Write to `<path>.tmp`
/// 2. Sync the temporary file
/// 3. Rename it over `path`
/// 4. Fsync the parent directory so the rename itself is durable
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let temp_path = temp_path_for(path);

    let mut file = File::create(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, path)?;

    if let Some(parent) = path.parent() {
        sync_directory(parent)?;
    }

    Ok(())
}

/// Removes `path` if it exists and makes the removal durable.
///
/// Returns `true` if a file was removed.
pub(crate) fn remove_durable(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            if let Some(parent) = path.parent() {
                sync_directory(parent)?;
            }
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

pub(crate) fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Fsyncs a directory so entry creation, rename and removal survive a crash.
///
/// Windows NTFS journals metadata and does not support opening a directory
/// for fsync, so this is a no-op there.
#[cfg(unix)]
fn sync_directory(dir: &Path) -> io::Result<()> {
    // An empty parent means the current directory.
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_directory(_dir: &Path) -> io::Result<()> {
    Ok(())
}
