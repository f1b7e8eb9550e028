//! JSON-lines progress log.

use feedsync_engine::{ProgressSink, SyncEvent};
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Serialize)]
struct LogLine<'a> {
    ts_ms: u64,
    #[serde(flatten)]
    event: &'a SyncEvent,
}

/// Appends one JSON object per progress event to a log file.
///
/// The file is opened when the sink is created and flushed and closed when
/// it is dropped, so a run that ends by error still leaves a complete log.
/// Write failures are reported through `tracing` and never abort the run.
pub struct JsonLinesSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    /// Opens (or creates) `path` for appending.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    fn write_line(&self, event: &SyncEvent) -> io::Result<()> {
        let ts_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        let line = serde_json::to_string(&LogLine { ts_ms, event })?;
        let mut writer = self.writer.lock();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        // Keep the log readable by tail while a long run is in progress.
        if matches!(
            event,
            SyncEvent::PageCommitted { .. } | SyncEvent::Error { .. } | SyncEvent::RunFinished { .. }
        ) {
            writer.flush()?;
        }
        Ok(())
    }
}

impl ProgressSink for JsonLinesSink {
    fn emit(&self, event: &SyncEvent) {
        if let Err(e) = self.write_line(event) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write progress log");
        }
    }
}

impl Drop for JsonLinesSink {
    fn drop(&mut self) {
        if let Err(e) = self.writer.get_mut().flush() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to flush progress log");
        }
    }
}

/// Forwards each event to two sinks.
pub struct TeeSink<A, B> {
    first: A,
    second: B,
}

impl<A: ProgressSink, B: ProgressSink> TeeSink<A, B> {
    /// Creates a sink that emits to `first` then `second`.
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: ProgressSink, B: ProgressSink> ProgressSink for TeeSink<A, B> {
    fn emit(&self, event: &SyncEvent) {
        self.first.emit(event);
        self.second.emit(event);
    }
}
