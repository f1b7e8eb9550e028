//! Sync command implementation.

use crate::client::ReqwestClient;
use crate::config::Settings;
use crate::log_sink::{JsonLinesSink, TeeSink};
use feedsync_engine::{
    HttpClient, HttpFetcher, ProgressSink, StopReason, SyncEngine, SyncReport, TracingSink,
};
use feedsync_storage::{DirectoryContentStore, FileCursorStore, InstallationLock};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::SigId;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs the sync command against the configured endpoint.
pub fn run(settings: &Settings, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = ReqwestClient::new(CONNECT_TIMEOUT, REQUEST_TIMEOUT)?;
    let report = run_with_client(settings, client)?;
    print_report(&report, format)?;
    Ok(())
}

/// Runs one sync of the installation described by `settings` over `client`.
///
/// Holds the installation lock for the whole run. SIGINT and SIGTERM
/// cancel the run at the next page boundary. The progress log, if
/// configured, is closed before this returns.
pub fn run_with_client<C: HttpClient>(
    settings: &Settings,
    client: C,
) -> Result<SyncReport, Box<dyn std::error::Error>> {
    let lock = InstallationLock::acquire(&settings.state_dir)?;
    tracing::info!(
        feed = %settings.feed,
        install = %settings.install_id,
        lock = %lock.path().display(),
        "starting sync"
    );

    let cursors = FileCursorStore::open(&settings.cursor_path())?;
    let store = DirectoryContentStore::open(&settings.store_dir)?;
    let fetcher = HttpFetcher::new(settings.feed, settings.fetcher_config(), client);

    let sink: Arc<dyn ProgressSink> = match &settings.log_file {
        Some(path) => Arc::new(TeeSink::new(TracingSink, JsonLinesSink::open(path)?)),
        None => Arc::new(TracingSink),
    };

    let engine = SyncEngine::new(
        settings.sync_config(),
        fetcher,
        settings.feed.decoder(),
        store,
        cursors,
    )
    .with_sink(sink);

    let signals = register_shutdown(&engine.cancel_handle().shared_flag())?;
    let result = engine.run();
    for id in signals {
        signal_hook::low_level::unregister(id);
    }
    Ok(result?)
}

/// Sets `flag` when the process receives SIGINT or SIGTERM.
fn register_shutdown(flag: &Arc<AtomicBool>) -> std::io::Result<Vec<SigId>> {
    let mut ids = Vec::with_capacity(2);
    for signal in [SIGINT, SIGTERM] {
        ids.push(signal_hook::flag::register(signal, Arc::clone(flag))?);
    }
    Ok(ids)
}

fn print_report(report: &SyncReport, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        _ => {
            let stop = match report.stop {
                StopReason::Completed => "feed exhausted",
                StopReason::Cancelled => "cancelled",
                StopReason::PageLimit => "page limit reached",
            };
            println!("Sync finished ({stop})");
            println!("  Pages fetched:      {}", report.pages_fetched);
            println!("  Actions processed:  {}", report.actions_processed);
            println!("  Duplicates skipped: {}", report.duplicates_skipped);
            match report.final_cursor {
                Some(cursor) => println!("  Cursor:             {cursor}"),
                None => println!("  Cursor:             none"),
            }
            println!("  Duration:           {:.2?}", report.duration);
        }
    }
    Ok(())
}
