//! Filesystem watching with debounce.
//!
//! OS events for the log file (writes, renames into place, chmod) are
//! collapsed into one logical change delivered no sooner than the debounce
//! interval after the last event, so an atomic-rename write triggers
//! exactly one rebuild.

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::error::{Result, ViewerError};

/// Watches one issue log and invokes a callback per coalesced change.
pub struct LogWatcher {
    watcher: Option<RecommendedWatcher>,
    thread: Option<thread::JoinHandle<()>>,
}

impl LogWatcher {
    /// Starts watching `log_path`. The watch is registered on the parent
    /// directory because `bd` mutations land via atomic rename, which the
    /// OS reports against the directory entry rather than the open file.
    pub fn spawn(
        log_path: &Path,
        debounce: Duration,
        on_change: impl Fn() + Send + 'static,
    ) -> Result<LogWatcher> {
        let parent = log_path.parent().unwrap_or_else(|| Path::new("."));
        let target: Option<OsString> = log_path.file_name().map(OsString::from);

        let (raw_tx, raw_rx) = mpsc::channel::<()>();
        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if is_relevant(&event, target.as_deref()) {
                        let _ = raw_tx.send(());
                    }
                }
                Err(err) => {
                    // A watch error may mean missed events; rebuild to be safe.
                    warn!(error = %err, "watcher.error");
                    let _ = raw_tx.send(());
                }
            })
            .map_err(|err| ViewerError::Io(io::Error::other(err)))?;
        watcher
            .watch(parent, RecursiveMode::NonRecursive)
            .map_err(|err| ViewerError::Io(io::Error::other(err)))?;
        debug!(dir = %parent.display(), "watcher.started");

        let thread = thread::Builder::new()
            .name("bv-debounce".into())
            .spawn(move || debounce_loop(&raw_rx, debounce, on_change))?;

        Ok(LogWatcher {
            watcher: Some(watcher),
            thread: Some(thread),
        })
    }
}

impl Drop for LogWatcher {
    fn drop(&mut self) {
        // Dropping the notify handle drops the event sender, which unblocks
        // the debounce thread.
        self.watcher.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn debounce_loop(raw_rx: &mpsc::Receiver<()>, debounce: Duration, on_change: impl Fn()) {
    while raw_rx.recv().is_ok() {
        // Burst started; keep draining until a quiet window passes.
        loop {
            match raw_rx.recv_timeout(debounce) {
                Ok(()) => continue,
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
        on_change();
    }
}

fn is_relevant(event: &Event, target: Option<&std::ffi::OsStr>) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    // No path information: assume the log may have changed.
    if event.paths.is_empty() {
        return true;
    }
    let Some(target) = target else {
        return true;
    };
    event
        .paths
        .iter()
        .any(|path| path.file_name() == Some(target))
}
