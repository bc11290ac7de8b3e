/// Scanner module: the scan controller.
///
/// A [`Scanner`] owns at most one active scan. It arbitrates start/stop
/// requests and publishes a consistent snapshot of progress to any number of
/// concurrent readers.
///
/// The live [`ScanStatus`] sits behind a single `parking_lot::RwLock`. The
/// background worker (see [`worker`]) takes the write lock briefly for each
/// field update; readers take the read lock and receive a deep clone, so no
/// caller ever holds a reference into the live record.
///
/// ```ignore
/// let scanner = Scanner::new(vec!["/home/user/Downloads".into()]);
/// scanner.start_scan("quick")?;
/// let snapshot = scanner.status();
/// scanner.stop_scan();
/// ```
pub mod cancel;
pub mod progress;
pub(crate) mod worker;

pub use cancel::CancelToken;
pub use progress::{ScanEvent, ScanOutcome, EVENT_CHANNEL_CAPACITY};

use crate::detection::Detector;
use crate::error::ScanError;
use crate::model::ScanStatus;
use crossbeam_channel::Receiver;
use parking_lot::{Mutex, RwLock};
use progress::EventBus;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default pause after each scanned file, so progress is observable.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(5);

/// Mutable state shared between the controller and its worker.
#[derive(Debug, Default)]
pub(crate) struct ScanState {
    pub(crate) status: ScanStatus,
    /// Token of the current (or most recent) scan.
    pub(crate) cancel: Option<CancelToken>,
}

pub(crate) type SharedState = Arc<RwLock<ScanState>>;

/// Tunables for a [`Scanner`].
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Pause after each scanned file. Zero disables throttling.
    pub throttle: Duration,
    /// Whether the count pass honours stop requests.
    pub cancellable_count: bool,
    pub detector: Detector,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            throttle: DEFAULT_THROTTLE,
            cancellable_count: true,
            detector: Detector::default(),
        }
    }
}

impl ScanOptions {
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_cancellable_count(mut self, cancellable: bool) -> Self {
        self.cancellable_count = cancellable;
        self
    }

    pub fn with_detector(mut self, detector: Detector) -> Self {
        self.detector = detector;
        self
    }
}

/// Handle to the scanning engine for a fixed set of root directories.
pub struct Scanner {
    scan_paths: Vec<PathBuf>,
    options: ScanOptions,
    state: SharedState,
    events: EventBus,
    /// Join handle of the most recently spawned worker.
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("scan_paths", &self.scan_paths)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Scanner {
    /// Scanner with default options. Relative paths are resolved against the
    /// current directory once, here.
    pub fn new(scan_paths: Vec<PathBuf>) -> Self {
        Self::with_options(scan_paths, ScanOptions::default())
    }

    pub fn with_options(scan_paths: Vec<PathBuf>, options: ScanOptions) -> Self {
        Self {
            scan_paths: scan_paths.into_iter().map(absolutize).collect(),
            options,
            state: Arc::new(RwLock::new(ScanState::default())),
            events: EventBus::default(),
            worker: Mutex::new(None),
        }
    }

    /// Root directories, in scan order.
    pub fn scan_paths(&self) -> &[PathBuf] {
        &self.scan_paths
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Start a scan in the background and return its initial snapshot.
    ///
    /// Fails with [`ScanError::AlreadyRunning`] if a scan is active; in that
    /// case nothing about the running scan changes. Never waits for the
    /// worker.
    pub fn start_scan(&self, scan_type: &str) -> Result<ScanStatus, ScanError> {
        // Held until the new handle is stored, so concurrent starts and
        // `join()` always see the handle of the scan they raced with.
        // Lock order: worker, then state.
        let mut worker = self.worker.lock();
        let cancel = CancelToken::new();

        let (previous, snapshot) = {
            let mut state = self.state.write();
            if state.status.active {
                return Err(ScanError::AlreadyRunning);
            }
            let previous = std::mem::replace(&mut state.status, ScanStatus::begin(scan_type));
            let previous_cancel = state.cancel.replace(cancel.clone());
            ((previous, previous_cancel), state.status.clone())
        };

        let job = worker::ScanJob {
            roots: self.scan_paths.clone(),
            options: self.options.clone(),
            state: self.state.clone(),
            cancel,
            events: self.events.clone(),
        };

        let spawned = thread::Builder::new()
            .name("threatsleuth-scanner".into())
            .spawn(move || worker::run(job));

        match spawned {
            Ok(handle) => {
                // The previous worker has already run its finish step (the
                // scan was inactive), so its handle can be detached.
                if let Some(old) = worker.replace(handle) {
                    debug!("Detaching finished worker {:?}", old.thread().id());
                }
                info!(
                    "Scan started: type={} folders={}",
                    snapshot.scan_type,
                    self.scan_paths.len()
                );
                Ok(snapshot)
            }
            Err(err) => {
                // Roll back so the failed start leaves no trace.
                let mut state = self.state.write();
                state.status = previous.0;
                state.cancel = previous.1;
                Err(ScanError::Spawn(err))
            }
        }
    }

    /// Request the active scan to stop. No-op when idle or already finished.
    ///
    /// Returns immediately; the worker notices at its next file or folder
    /// boundary.
    pub fn stop_scan(&self) {
        let state = self.state.read();
        if !state.status.active {
            return;
        }
        if let Some(ref cancel) = state.cancel {
            if !cancel.is_cancelled() {
                info!("Stop requested");
            }
            cancel.cancel();
        }
    }

    /// Deep-copied snapshot of the current (or last) scan.
    ///
    /// Returns `ScanStatus::default()` if no scan has ever been started.
    pub fn status(&self) -> ScanStatus {
        self.state.read().status.clone()
    }

    pub fn is_active(&self) -> bool {
        self.state.read().status.active
    }

    /// Receive [`ScanEvent`]s for every scan started after this call.
    pub fn subscribe(&self) -> Receiver<ScanEvent> {
        let (tx, rx) = crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY);
        self.events.subscribe(tx);
        rx
    }

    /// Block until the most recently started worker thread exits.
    ///
    /// Returns immediately if no worker was started or it was already joined.
    pub fn join(&self) {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("Scanner thread panicked");
            }
        }
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        // A worker outliving its scanner would keep walking for nothing.
        self.stop_scan();
    }
}

fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScanPhase;
    use std::time::Instant;

    fn wait_idle(scanner: &Scanner) {
        let deadline = Instant::now() + Duration::from_secs(30);
        while scanner.is_active() {
            assert!(Instant::now() < deadline, "scan did not finish within 30 s");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn never_started_status_is_default() {
        let scanner = Scanner::new(vec![]);
        assert_eq!(scanner.status(), ScanStatus::default());
        assert_eq!(scanner.status().phase(), ScanPhase::Idle);
    }

    #[test]
    fn stop_on_idle_scanner_is_noop() {
        let scanner = Scanner::new(vec![]);
        scanner.stop_scan();
        scanner.stop_scan();
        assert_eq!(scanner.status(), ScanStatus::default());
    }

    #[test]
    fn relative_roots_are_made_absolute() {
        let scanner = Scanner::new(vec![PathBuf::from("some/relative/dir")]);
        assert!(scanner.scan_paths()[0].is_absolute());
        assert!(scanner.scan_paths()[0].ends_with("some/relative/dir"));
    }

    #[test]
    fn scan_with_no_roots_completes() {
        let scanner = Scanner::new(vec![]);
        let snapshot = scanner.start_scan("").unwrap();
        assert!(snapshot.active);
        assert_eq!(snapshot.scan_type, "full");

        scanner.join();
        let status = scanner.status();
        assert!(!status.active);
        assert_eq!(status.current_folder, "Complete");
        assert_eq!(status.phase(), ScanPhase::Complete);
    }

    #[test]
    fn join_waits_for_latest_worker_under_concurrent_starts() {
        let tmp = tempfile::TempDir::new().unwrap();
        for i in 0..20 {
            std::fs::write(tmp.path().join(format!("f{i}.bin")), b"x").unwrap();
        }
        let options = ScanOptions::default().with_throttle(Duration::ZERO);
        let scanner = Scanner::with_options(vec![tmp.path().to_path_buf()], options);

        for _ in 0..50 {
            thread::scope(|s| {
                for _ in 0..4 {
                    s.spawn(|| {
                        let _ = scanner.start_scan("full");
                    });
                }
            });
            scanner.join();
            assert!(!scanner.is_active(), "join returned while a worker was live");
        }
    }

    #[test]
    fn missing_root_degrades_to_zero_files() {
        let scanner = Scanner::new(vec![PathBuf::from("/definitely/not/a/real/root")]);
        scanner.start_scan("quick").unwrap();
        wait_idle(&scanner);
        let status = scanner.status();
        assert_eq!(status.total_files, 0);
        assert_eq!(status.scanned_files, 0);
        assert_eq!(status.phase(), ScanPhase::Complete);
    }
}
