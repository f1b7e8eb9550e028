//! Inspect command implementation.

use crate::config::Settings;
use feedsync_protocol::Cursor;
use feedsync_storage::{ContentStore, CursorStore, DirectoryContentStore, FileCursorStore};
use serde::Serialize;

/// Installation inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Feed name.
    pub feed: String,
    /// Installation ID.
    pub install_id: String,
    /// Record directory.
    pub store_dir: String,
    /// Committed cursor.
    pub cursor: Option<Cursor>,
    /// Number of stored records.
    pub record_count: usize,
    /// Total document size in bytes.
    pub total_bytes: usize,
    /// One entry per stored record, ordered by subject ID.
    pub records: Vec<RecordSummary>,
}

/// Summary of a single stored record.
#[derive(Debug, Serialize)]
pub struct RecordSummary {
    /// Subject ID.
    pub subject_id: String,
    /// ID of the action that last wrote the record.
    pub last_action: u64,
    /// Document size in bytes.
    pub size: usize,
}

/// Collects the inspection result for an installation.
pub fn collect(settings: &Settings) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let store = DirectoryContentStore::open(&settings.store_dir)?;
    let cursor = FileCursorStore::open(&settings.cursor_path())?.load()?;

    let mut records = Vec::new();
    for subject_id in store.subject_ids()? {
        // A record removed between listing and reading is simply skipped.
        if let Some(record) = store.get(&subject_id)? {
            records.push(RecordSummary {
                subject_id: record.subject_id,
                last_action: record.last_action,
                size: record.document.len(),
            });
        }
    }

    Ok(InspectResult {
        feed: settings.feed.to_string(),
        install_id: settings.install_id.clone(),
        store_dir: settings.store_dir.display().to_string(),
        cursor,
        record_count: records.len(),
        total_bytes: records.iter().map(|r| r.size).sum(),
        records,
    })
}

/// Runs the inspect command.
pub fn run(settings: &Settings, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = collect(settings)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Installation: {} ({})", result.install_id, result.feed);
    println!("Store:        {}", result.store_dir);
    match result.cursor {
        Some(cursor) => println!("Cursor:       {cursor}"),
        None => println!("Cursor:       none"),
    }
    println!(
        "Records:      {} ({} bytes)",
        result.record_count, result.total_bytes
    );

    if !result.records.is_empty() {
        println!();
        println!("{:<40} {:>12} {:>10}", "SUBJECT", "LAST ACTION", "BYTES");
        for record in &result.records {
            println!(
                "{:<40} {:>12} {:>10}",
                record.subject_id, record.last_action, record.size
            );
        }
    }
}
