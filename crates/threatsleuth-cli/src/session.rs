/// Terminal scan session.
///
/// Owns the scanner handle and the event receiver for one CLI run. The
/// caller drives it with `tick()`, which drains a bounded number of events
/// and refreshes the status snapshot. Events are advisory: the snapshot is
/// what decides when the scan is over, so a dropped event never hangs the
/// session.
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};
use threatsleuth_core::model::{ScanPhase, ScanStatus, Threat};
use threatsleuth_core::scanner::{ScanEvent, ScanOutcome};
use threatsleuth_core::{ScanError, Scanner};
use tracing::{debug, info, warn};

/// Maximum number of scan events drained per tick.
const MAX_EVENTS_PER_TICK: usize = 500;

/// Pause between ticks in [`ScanSession::run_to_completion`].
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

pub struct ScanSession {
    scanner: Arc<Scanner>,
    events: Receiver<ScanEvent>,

    pub phase: ScanPhase,
    pub last_status: ScanStatus,
    /// Threats reported through events, in detection order.
    pub threats_seen: Vec<Threat>,
    pub outcome: Option<ScanOutcome>,
    /// Set once the count pass has reported.
    pub total_files: Option<u64>,
    /// True when the session itself stopped the scan on its deadline.
    pub timed_out: bool,

    timeout: Option<Duration>,
    deadline: Option<Instant>,
}

impl ScanSession {
    /// Subscribe to `scanner`. Must be created before [`start`](Self::start)
    /// so no event of the scan is missed.
    pub fn new(scanner: Arc<Scanner>) -> Self {
        let events = scanner.subscribe();
        let last_status = scanner.status();
        Self {
            scanner,
            events,
            phase: last_status.phase(),
            last_status,
            threats_seen: Vec::new(),
            outcome: None,
            total_files: None,
            timed_out: false,
            timeout: None,
            deadline: None,
        }
    }

    pub fn scanner(&self) -> &Arc<Scanner> {
        &self.scanner
    }

    /// Stop each scan once `timeout` has elapsed after its
    /// [`start`](Self::start).
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    pub fn start(&mut self, scan_type: &str) -> Result<(), ScanError> {
        let status = self.scanner.start_scan(scan_type)?;
        self.deadline = self.timeout.map(|t| Instant::now() + t);
        self.threats_seen.clear();
        self.outcome = None;
        self.total_files = None;
        self.timed_out = false;
        self.phase = status.phase();
        self.last_status = status;
        Ok(())
    }

    pub fn stop(&self) {
        self.scanner.stop_scan();
    }

    pub fn is_running(&self) -> bool {
        self.phase == ScanPhase::Running
    }

    /// Drain pending scan events. Returns how many were handled.
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        while handled < MAX_EVENTS_PER_TICK {
            let Ok(event) = self.events.try_recv() else {
                break;
            };
            handled += 1;
            match event {
                ScanEvent::Started { scan_type } => {
                    debug!("Worker running: {scan_type}");
                }
                ScanEvent::CountComplete { total_files } => {
                    self.total_files = Some(total_files);
                }
                ScanEvent::FolderEntered { folder } => {
                    debug!("Scanning {}", folder.display());
                }
                ScanEvent::ThreatDetected(threat) => {
                    self.threats_seen.push(threat);
                }
                ScanEvent::Finished { outcome, .. } => {
                    self.outcome = Some(outcome);
                }
            }
        }
        handled
    }

    /// One polling step: drain events, enforce the deadline and refresh the
    /// snapshot.
    pub fn tick(&mut self) -> &ScanStatus {
        self.process_events();

        if let Some(deadline) = self.deadline {
            if self.is_running() && !self.timed_out && Instant::now() >= deadline {
                warn!("Scan timeout reached, stopping");
                self.timed_out = true;
                self.stop();
            }
        }

        self.last_status = self.scanner.status();
        self.phase = self.last_status.phase();

        if !self.is_running() && self.outcome.is_none() {
            // Finished may have been dropped on a full channel.
            self.process_events();
            if self.outcome.is_none() && self.phase != ScanPhase::Idle {
                self.outcome = Some(if self.last_status.stopped {
                    ScanOutcome::Stopped
                } else {
                    ScanOutcome::Completed
                });
            }
        }
        &self.last_status
    }

    /// Tick until the scan is no longer running, calling `on_tick` with each
    /// fresh snapshot.
    pub fn run_to_completion<F>(&mut self, mut on_tick: F) -> &ScanStatus
    where
        F: FnMut(&ScanStatus),
    {
        loop {
            self.tick();
            on_tick(&self.last_status);
            if !self.is_running() {
                break;
            }
            std::thread::sleep(TICK_INTERVAL);
        }
        self.scanner.join();
        info!(
            "Session finished: {} ({} threat(s))",
            self.phase.label(),
            self.last_status.threats_found
        );
        &self.last_status
    }
}
