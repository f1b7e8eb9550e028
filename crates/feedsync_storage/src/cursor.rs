//! Single-slot cursor persistence.

use crate::atomic::write_atomic;
use crate::error::{CursorStoreError, CursorStoreResult};
use feedsync_protocol::Cursor;
use parking_lot::RwLock;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Durable storage for the last committed cursor of one installation.
///
/// # Invariants
///
/// - `load` returns `None` only if no cursor was ever saved
/// - A stored value that cannot be read back is an error, not `None`
/// - `save` is atomic: after a crash the slot holds the old or the new value
pub trait CursorStore: Send + Sync {
    /// Loads the committed cursor.
    ///
    /// # Errors
    ///
    /// Returns [`CursorStoreError::Corrupt`] if a value exists but is not a
    /// cursor, or an I/O error.
    fn load(&self) -> CursorStoreResult<Option<Cursor>>;

    /// Replaces the committed cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if the value could not be made durable. The previous
    /// value is still readable in that case.
    fn save(&self, cursor: &Cursor) -> CursorStoreResult<()>;
}

impl<C: CursorStore + ?Sized> CursorStore for Arc<C> {
    fn load(&self) -> CursorStoreResult<Option<Cursor>> {
        (**self).load()
    }

    fn save(&self, cursor: &Cursor) -> CursorStoreResult<()> {
        (**self).save(cursor)
    }
}

/// A cursor slot stored as a small text file.
///
/// The file holds the cursor in decimal with a trailing newline. It is
/// replaced atomically on every save.
///
/// # Example
///
/// ```no_run
/// use feedsync_protocol::Cursor;
/// use feedsync_storage::{CursorStore, FileCursorStore};
/// use std::path::Path;
///
/// let slot = FileCursorStore::open(Path::new("state/last-id")).unwrap();
/// slot.save(&Cursor::new(100)).unwrap();
/// assert_eq!(slot.load().unwrap(), Some(Cursor::new(100)));
/// ```
#[derive(Debug)]
pub struct FileCursorStore {
    path: PathBuf,
}

impl FileCursorStore {
    /// Opens a slot at `path`, creating parent directories if needed.
    ///
    /// The slot file itself is only created by the first `save`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// slot exists but is read-only.
    pub fn open(path: &Path) -> CursorStoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        if let Ok(metadata) = fs::metadata(path) {
            if metadata.permissions().readonly() {
                return Err(CursorStoreError::Io(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    format!("cannot write cursor slot {}", path.display()),
                )));
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Returns the slot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CursorStore for FileCursorStore {
    fn load(&self) -> CursorStoreResult<Option<Cursor>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        parse_slot(&data)
            .map(Some)
            .map_err(|detail| CursorStoreError::Corrupt {
                path: self.path.clone(),
                detail,
            })
    }

    fn save(&self, cursor: &Cursor) -> CursorStoreResult<()> {
        write_atomic(&self.path, format!("{cursor}\n").as_bytes())?;
        tracing::debug!(path = %self.path.display(), %cursor, "cursor saved");
        Ok(())
    }
}

/// Parses slot contents: decimal digits with at most one trailing newline.
fn parse_slot(data: &[u8]) -> Result<Cursor, String> {
    let text = std::str::from_utf8(data).map_err(|_| "slot is not UTF-8".to_string())?;
    let digits = text.strip_suffix('\n').unwrap_or(text);

    if digits.is_empty() {
        return Err("slot is empty".into());
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("{digits:?} is not a cursor"));
    }

    digits
        .parse::<Cursor>()
        .map_err(|e| format!("{digits:?} is not a cursor: {e}"))
}

/// An in-memory cursor slot for tests.
///
/// Can be seeded with raw text to simulate a damaged slot.
#[derive(Debug, Default)]
pub struct MemoryCursorStore {
    raw: RwLock<Option<Vec<u8>>>,
    saves: RwLock<Vec<Cursor>>,
}

impl MemoryCursorStore {
    /// Creates an empty slot (fresh installation).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a slot already holding `cursor`.
    #[must_use]
    pub fn with_cursor(cursor: Cursor) -> Self {
        let store = Self::new();
        *store.raw.write() = Some(format!("{cursor}\n").into_bytes());
        store
    }

    /// Creates a slot holding arbitrary raw contents.
    #[must_use]
    pub fn with_raw(raw: impl Into<Vec<u8>>) -> Self {
        let store = Self::new();
        *store.raw.write() = Some(raw.into());
        store
    }

    /// Returns every cursor saved so far, in order.
    #[must_use]
    pub fn save_history(&self) -> Vec<Cursor> {
        self.saves.read().clone()
    }
}

impl CursorStore for MemoryCursorStore {
    fn load(&self) -> CursorStoreResult<Option<Cursor>> {
        match self.raw.read().as_deref() {
            None => Ok(None),
            Some(data) => parse_slot(data)
                .map(Some)
                .map_err(|detail| CursorStoreError::Corrupt {
                    path: PathBuf::from("<memory>"),
                    detail,
                }),
        }
    }

    fn save(&self, cursor: &Cursor) -> CursorStoreResult<()> {
        *self.raw.write() = Some(format!("{cursor}\n").into_bytes());
        self.saves.write().push(*cursor);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn fresh_slot_loads_none() {
        let dir = tempdir().unwrap();
        let slot = FileCursorStore::open(&dir.path().join("last-id")).unwrap();

        assert_eq!(slot.load().unwrap(), None);
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("last-id");
        let slot = FileCursorStore::open(&path).unwrap();

        slot.save(&Cursor::new(100)).unwrap();
        assert_eq!(slot.load().unwrap(), Some(Cursor::new(100)));
        assert_eq!(fs::read_to_string(&path).unwrap(), "100\n");

        slot.save(&Cursor::new(140)).unwrap();
        let reopened = FileCursorStore::open(&path).unwrap();
        assert_eq!(reopened.load().unwrap(), Some(Cursor::new(140)));
    }

    #[test]
    fn slot_without_newline_is_accepted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last-id");
        fs::write(&path, b"57").unwrap();

        let slot = FileCursorStore::open(&path).unwrap();
        assert_eq!(slot.load().unwrap(), Some(Cursor::new(57)));
    }

    #[test]
    fn garbage_slot_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last-id");
        fs::write(&path, b"12x\n").unwrap();

        let slot = FileCursorStore::open(&path).unwrap();
        assert!(matches!(slot.load(), Err(CursorStoreError::Corrupt { .. })));
    }

    #[test]
    fn empty_slot_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last-id");
        fs::write(&path, b"").unwrap();

        let slot = FileCursorStore::open(&path).unwrap();
        assert!(matches!(slot.load(), Err(CursorStoreError::Corrupt { .. })));
    }

    #[test]
    fn leftover_temp_file_does_not_affect_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last-id");
        let slot = FileCursorStore::open(&path).unwrap();
        slot.save(&Cursor::new(9)).unwrap();

        // A crash mid-save leaves only the temp file torn.
        fs::write(dir.path().join("last-id.tmp"), b"1").unwrap();
        assert_eq!(slot.load().unwrap(), Some(Cursor::new(9)));
    }

    #[test]
    fn memory_slot_behaves_like_file_slot() {
        let slot = MemoryCursorStore::new();
        assert_eq!(slot.load().unwrap(), None);

        slot.save(&Cursor::new(3)).unwrap();
        slot.save(&Cursor::new(8)).unwrap();
        assert_eq!(slot.load().unwrap(), Some(Cursor::new(8)));
        assert_eq!(slot.save_history(), vec![Cursor::new(3), Cursor::new(8)]);

        let seeded = MemoryCursorStore::with_cursor(Cursor::new(5));
        assert_eq!(seeded.load().unwrap(), Some(Cursor::new(5)));

        let damaged = MemoryCursorStore::with_raw("not-a-number");
        assert!(matches!(damaged.load(), Err(CursorStoreError::Corrupt { .. })));
    }

    proptest! {
        #[test]
        fn slot_contents_load_or_report_corrupt(raw in prop::collection::vec(any::<u8>(), 0..24)) {
            let slot = MemoryCursorStore::with_raw(raw);
            match slot.load() {
                Ok(cursor) => prop_assert!(cursor.is_some()),
                Err(err) => prop_assert!(matches!(err, CursorStoreError::Corrupt { .. }), "unexpected error"),
            }
        }

        #[test]
        fn saved_cursor_reads_back(position in any::<u64>()) {
            let slot = MemoryCursorStore::new();
            slot.save(&Cursor::new(position)).unwrap();
            prop_assert_eq!(slot.load().unwrap(), Some(Cursor::new(position)));
        }
    }
}
