//! The build worker: a small state machine with an explicit dirty flag.
//!
//! One worker thread owns all builds for a pipeline. Triggers arriving
//! while a build runs set `dirty` and return; they never spawn a second
//! builder. Every build phase executes inside a panic guard, so a crash in
//! loading or analysis becomes a tagged error and the worker survives.

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Phase, Result, ViewerError};
use crate::loader;
use crate::snapshot::{Snapshot, SnapshotStore};

use super::watcher::LogWatcher;

/// Default quiet window before a burst of file events becomes one build.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);
/// How long shutdown waits for an in-flight build to drain.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const EVENT_QUEUE_DEPTH: usize = 16;

/// Pipeline construction parameters.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Path to the issue log.
    pub log_path: PathBuf,
    /// Debounce interval for filesystem events.
    pub debounce: Duration,
    /// Whether to start the filesystem watcher. Tests drive `trigger`
    /// directly with this off.
    pub watch: bool,
}

impl PipelineConfig {
    pub fn new(log_path: impl Into<PathBuf>) -> PipelineConfig {
        PipelineConfig {
            log_path: log_path.into(),
            debounce: DEFAULT_DEBOUNCE,
            watch: true,
        }
    }

    pub fn without_watcher(mut self) -> PipelineConfig {
        self.watch = false;
        self
    }
}

/// Notifications sent to the consumer. The channel is bounded and sends are
/// non-blocking with drop-on-full semantics: consumers poll the current
/// snapshot when they notice a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEvent {
    /// A new snapshot was published.
    SnapshotReady { hash: u64 },
    /// A build failed in the given phase; the previous snapshot stands.
    BuildFailed { phase: Phase },
}

/// The last recorded build failure.
#[derive(Debug, Clone)]
pub struct LastError {
    pub phase: Phase,
    pub message: String,
    pub at: DateTime<Utc>,
    /// Consecutive failures including this one.
    pub retries: u32,
}

/// Observable worker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    Idle,
    Processing,
    Stopped,
}

enum WorkerMsg {
    Build,
    Shutdown,
}

#[derive(Debug)]
struct PipelineState {
    phase: WorkerPhase,
    dirty: bool,
    queued: bool,
    last_hash: Option<u64>,
    last_error: Option<LastError>,
    error_count: u32,
}

struct Shared {
    log_path: PathBuf,
    state: Mutex<PipelineState>,
    store: SnapshotStore,
    events: SyncSender<PipelineEvent>,
    shutting_down: AtomicBool,
}

/// A running snapshot pipeline. Dropping it shuts the worker down.
pub struct Pipeline {
    shared: Arc<Shared>,
    control: Sender<WorkerMsg>,
    worker: Option<thread::JoinHandle<()>>,
    done_rx: Receiver<()>,
    watcher: Option<LogWatcher>,
}

impl Pipeline {
    /// Spawns the worker (and the watcher unless disabled) and returns the
    /// pipeline handle plus the consumer notification channel.
    pub fn spawn(config: PipelineConfig) -> Result<(Pipeline, Receiver<PipelineEvent>)> {
        let (events_tx, events_rx) = mpsc::sync_channel(EVENT_QUEUE_DEPTH);
        let (control_tx, control_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();

        let shared = Arc::new(Shared {
            log_path: config.log_path.clone(),
            state: Mutex::new(PipelineState {
                phase: WorkerPhase::Idle,
                dirty: false,
                queued: false,
                last_hash: None,
                last_error: None,
                error_count: 0,
            }),
            store: SnapshotStore::new(),
            events: events_tx,
            shutting_down: AtomicBool::new(false),
        });

        let worker = {
            let shared = shared.clone();
            thread::Builder::new()
                .name("bv-pipeline".into())
                .spawn(move || worker_loop(&shared, &control_rx, &done_tx))?
        };

        let watcher = if config.watch {
            let shared = shared.clone();
            let control = control_tx.clone();
            Some(LogWatcher::spawn(
                &config.log_path,
                config.debounce,
                move || request_build(&shared, &control),
            )?)
        } else {
            None
        };

        Ok((
            Pipeline {
                shared,
                control: control_tx,
                worker: Some(worker),
                done_rx,
                watcher,
            },
            events_rx,
        ))
    }

    /// The current snapshot, if one has been published.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.shared.store.current()
    }

    /// Manual refresh. Coalesces with any in-flight or queued build.
    pub fn trigger(&self) {
        request_build(&self.shared, &self.control);
    }

    pub fn last_error(&self) -> Option<LastError> {
        self.shared.state.lock().last_error.clone()
    }

    /// Consecutive build failures since the last success or dedup.
    pub fn error_count(&self) -> u32 {
        self.shared.state.lock().error_count
    }

    /// Hash of the bytes behind the last successful snapshot.
    pub fn last_hash(&self) -> Option<u64> {
        self.shared.state.lock().last_hash
    }

    pub fn worker_phase(&self) -> WorkerPhase {
        self.shared.state.lock().phase
    }

    /// Stops the watcher, drains any in-flight build bounded by the grace
    /// period, and stops the worker. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shared.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.watcher.take();
        let _ = self.control.send(WorkerMsg::Shutdown);
        match self.done_rx.recv_timeout(SHUTDOWN_GRACE) {
            Ok(()) => {
                if let Some(worker) = self.worker.take() {
                    let _ = worker.join();
                }
            }
            Err(_) => {
                // The build is stuck past the grace period; detach.
                warn!(path = %self.shared.log_path.display(), "pipeline.shutdown.timeout");
                self.worker.take();
            }
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn request_build(shared: &Shared, control: &Sender<WorkerMsg>) {
    if shared.shutting_down.load(Ordering::SeqCst) {
        return;
    }
    let mut st = shared.state.lock();
    match st.phase {
        WorkerPhase::Stopped => {}
        WorkerPhase::Processing => st.dirty = true,
        WorkerPhase::Idle => {
            // At most one queued build; it will read the newest bytes anyway.
            if !st.queued {
                st.queued = true;
                let _ = control.send(WorkerMsg::Build);
            }
        }
    }
}

fn worker_loop(shared: &Shared, control_rx: &Receiver<WorkerMsg>, done_tx: &Sender<()>) {
    while let Ok(msg) = control_rx.recv() {
        match msg {
            WorkerMsg::Shutdown => break,
            WorkerMsg::Build => {
                {
                    let mut st = shared.state.lock();
                    st.queued = false;
                    st.phase = WorkerPhase::Processing;
                }
                loop {
                    run_build(shared);
                    let mut st = shared.state.lock();
                    if st.dirty && !shared.shutting_down.load(Ordering::SeqCst) {
                        // Changes arrived mid-build; go straight around.
                        st.dirty = false;
                        continue;
                    }
                    st.phase = WorkerPhase::Idle;
                    break;
                }
                if shared.shutting_down.load(Ordering::SeqCst) {
                    break;
                }
            }
        }
    }
    shared.state.lock().phase = WorkerPhase::Stopped;
    let _ = done_tx.send(());
}

fn run_build(shared: &Shared) {
    debug!(path = %shared.log_path.display(), "pipeline.build.start");

    let bytes = match guarded(Phase::Load, || loader::read_log(&shared.log_path)) {
        Ok(bytes) => bytes,
        Err(err) => return record_error(shared, Phase::Load, &err),
    };

    let hash = loader::content_hash(&bytes);
    {
        let mut st = shared.state.lock();
        if st.last_hash == Some(hash) {
            // Unchanged content is a successful no-op: the error state
            // clears without a publish.
            st.last_error = None;
            st.error_count = 0;
            debug!(hash = %loader::format_hash(hash), "pipeline.build.dedup");
            return;
        }
    }

    let parsed = match guarded(Phase::Parse, || Ok(loader::parse_log(&bytes))) {
        Ok(parsed) => parsed,
        Err(err) => return record_error(shared, Phase::Parse, &err),
    };
    let snapshot = match guarded(Phase::AnalyzePhase1, || {
        Ok(Snapshot::build(parsed.issues, hash, parsed.stats))
    }) {
        Ok(snapshot) => Arc::new(snapshot),
        Err(err) => return record_error(shared, Phase::AnalyzePhase1, &err),
    };

    if shared.shutting_down.load(Ordering::SeqCst) {
        return;
    }
    shared.store.publish(snapshot.clone());
    {
        let mut st = shared.state.lock();
        st.last_hash = Some(hash);
        st.last_error = None;
        st.error_count = 0;
    }
    let _ = shared
        .events
        .try_send(PipelineEvent::SnapshotReady { hash });
    info!(
        hash = %loader::format_hash(hash),
        issues = snapshot.len(),
        skipped = snapshot.parse_stats().skipped,
        "pipeline.snapshot.published"
    );
}

fn record_error(shared: &Shared, phase: Phase, err: &ViewerError) {
    let message = err.to_string();
    let retries = {
        let mut st = shared.state.lock();
        st.error_count += 1;
        st.last_error = Some(LastError {
            phase,
            message: message.clone(),
            at: Utc::now(),
            retries: st.error_count,
        });
        st.error_count
    };
    warn!(phase = %phase, error = %message, retries, "pipeline.build.failed");
    let _ = shared.events.try_send(PipelineEvent::BuildFailed { phase });
}

/// Runs one build phase inside a recovery boundary: a panic becomes a
/// phase-tagged error instead of killing the worker.
fn guarded<T>(phase: Phase, f: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(ViewerError::Build {
            phase,
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic in build step".to_string()
    }
}
