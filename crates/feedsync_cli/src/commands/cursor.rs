//! Cursor command implementation.

use crate::config::Settings;
use feedsync_protocol::Cursor;
use feedsync_storage::{CursorStore, FileCursorStore};

/// Reads the committed cursor of an installation.
pub fn load(settings: &Settings) -> Result<Option<Cursor>, Box<dyn std::error::Error>> {
    let slot = FileCursorStore::open(&settings.cursor_path())?;
    Ok(slot.load()?)
}

/// Runs the cursor command.
pub fn run(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    match load(settings)? {
        Some(cursor) => println!("{cursor}"),
        None => println!("none"),
    }
    Ok(())
}
