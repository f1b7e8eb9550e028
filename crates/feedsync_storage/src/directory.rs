//! Directory-backed content store for persistent storage.

use crate::atomic::{remove_durable, write_atomic};
use crate::content::{validate_subject_id, ContentStore, Record};
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File extension of record files.
const RECORD_EXT: &str = "rec";
/// First token of every record header.
const RECORD_MAGIC: &str = "feedsync-record/1";

/// A content store that keeps one file per subject.
///
/// Each record lives in `<dir>/<subject_id>.rec`: a single header line
/// `feedsync-record/1 <last_action>` followed by the raw document bytes.
/// Data survives process restarts.
///
/// # Durability
///
/// Every upsert is written with write-temp, fsync, rename, fsync-dir, so a
/// crash leaves either the previous record or the new one. Removal fsyncs
/// the directory after unlinking.
///
/// # Thread Safety
///
/// Mutations are serialized by an internal lock; reads go straight to the
/// filesystem.
///
/// # Example
///
/// ```no_run
/// use feedsync_storage::{ContentStore, DirectoryContentStore};
/// use std::path::Path;
///
/// let store = DirectoryContentStore::open(Path::new("articles")).unwrap();
/// store.upsert("A", b"<article articleId=\"A\"/>", 1).unwrap();
/// ```
#[derive(Debug)]
pub struct DirectoryContentStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl DirectoryContentStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, is not a
    /// directory, or is read-only.
    pub fn open(dir: &Path) -> StorageResult<Self> {
        fs::create_dir_all(dir)?;

        let metadata = fs::metadata(dir)?;
        if !metadata.is_dir() {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a directory: {}", dir.display()),
            )));
        }
        if metadata.permissions().readonly() {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("cannot write into store directory {}", dir.display()),
            )));
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the root directory of the store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Returns the file a subject's record lives in.
    #[must_use]
    pub fn record_path(&self, subject_id: &str) -> PathBuf {
        self.dir.join(format!("{subject_id}.{RECORD_EXT}"))
    }

    fn encode(document: &[u8], action_id: u64) -> Vec<u8> {
        let header = format!("{RECORD_MAGIC} {action_id}\n");
        let mut data = Vec::with_capacity(header.len() + document.len());
        data.extend_from_slice(header.as_bytes());
        data.extend_from_slice(document);
        data
    }

    fn decode(subject_id: &str, data: Vec<u8>) -> StorageResult<Record> {
        let corrupted = |detail: &str| StorageError::Corrupted(format!("{subject_id}: {detail}"));

        let newline = data
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| corrupted("missing header"))?;
        let header =
            std::str::from_utf8(&data[..newline]).map_err(|_| corrupted("header is not UTF-8"))?;

        let last_action = match header.split_once(' ') {
            Some((RECORD_MAGIC, id)) => id
                .parse::<u64>()
                .map_err(|_| corrupted("bad action ID in header"))?,
            _ => return Err(corrupted("unrecognized header")),
        };

        Ok(Record {
            subject_id: subject_id.to_string(),
            document: data[newline + 1..].to_vec(),
            last_action,
        })
    }
}

impl ContentStore for DirectoryContentStore {
    fn upsert(&self, subject_id: &str, document: &[u8], action_id: u64) -> StorageResult<()> {
        validate_subject_id(subject_id)?;
        let _guard = self.write_lock.lock();
        write_atomic(
            &self.record_path(subject_id),
            &Self::encode(document, action_id),
        )?;
        Ok(())
    }

    fn remove(&self, subject_id: &str) -> StorageResult<()> {
        validate_subject_id(subject_id)?;
        let _guard = self.write_lock.lock();
        remove_durable(&self.record_path(subject_id))?;
        Ok(())
    }

    fn exists(&self, subject_id: &str) -> bool {
        validate_subject_id(subject_id).is_ok() && self.record_path(subject_id).is_file()
    }

    fn get(&self, subject_id: &str) -> StorageResult<Option<Record>> {
        validate_subject_id(subject_id)?;
        match fs::read(self.record_path(subject_id)) {
            Ok(data) => Self::decode(subject_id, data).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn subject_ids(&self) -> StorageResult<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
