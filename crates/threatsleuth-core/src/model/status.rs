/// The shared scan status record and its lifecycle phases.
///
/// One `ScanStatus` is live per [`crate::Scanner`]. The worker mutates it
/// under the scanner's write lock; every reader gets a deep clone.
use super::threat::Threat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value written to `current_folder` once a scan has finished or stopped.
pub const COMPLETE_FOLDER: &str = "Complete";

/// Scan type used when the caller passes a blank label.
pub const DEFAULT_SCAN_TYPE: &str = "full";

/// Lifecycle phase derived from a status snapshot.
///
/// `Idle → Running → {Complete | Stopped}`. Both terminal phases are final
/// for that record; a new scan produces a new record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    /// No scan has ever been started on this scanner.
    Idle,
    Running,
    Complete,
    Stopped,
}

impl ScanPhase {
    /// Human-readable label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Running => "Running",
            Self::Complete => "Complete",
            Self::Stopped => "Stopped",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatus {
    /// True from the moment a scan starts until the worker's finishing step.
    pub active: bool,

    /// Files found by the count pass. Stable once the scan pass begins.
    pub total_files: u64,

    /// Files whose detection pipeline has completed.
    pub scanned_files: u64,

    /// Always equal to `threats.len()`.
    pub threats_found: u64,

    pub threats: Vec<Threat>,

    /// `None` only for the never-started status.
    pub start_time: Option<DateTime<Utc>>,

    /// Root directory currently being walked, or [`COMPLETE_FOLDER`].
    pub current_folder: String,

    /// Caller-supplied label, opaque to the engine.
    pub scan_type: String,

    /// True when the scan ended because of a stop request.
    pub stopped: bool,

    pub finished_at: Option<DateTime<Utc>>,
}

impl ScanStatus {
    /// Fresh record for a scan that is starting now.
    pub fn begin(scan_type: &str) -> Self {
        let scan_type = scan_type.trim();
        Self {
            active: true,
            start_time: Some(Utc::now()),
            scan_type: if scan_type.is_empty() {
                DEFAULT_SCAN_TYPE.to_string()
            } else {
                scan_type.to_string()
            },
            ..Self::default()
        }
    }

    /// Record a detection. Keeps `threats_found` in step with `threats`.
    pub fn push_threat(&mut self, threat: Threat) {
        self.threats.push(threat);
        self.threats_found = self.threats.len() as u64;
    }

    /// Terminal transition. Has no effect on a record that already finished.
    pub fn finish(&mut self, stopped: bool) {
        if !self.active {
            return;
        }
        self.active = false;
        self.stopped = stopped;
        self.current_folder = COMPLETE_FOLDER.to_string();
        self.finished_at = Some(Utc::now());
    }

    pub fn phase(&self) -> ScanPhase {
        if self.active {
            ScanPhase::Running
        } else if self.start_time.is_none() {
            ScanPhase::Idle
        } else if self.stopped {
            ScanPhase::Stopped
        } else {
            ScanPhase::Complete
        }
    }

    /// Percentage of counted files already scanned (0.0–100.0).
    ///
    /// Returns 0.0 while nothing has been counted yet.
    pub fn progress_percent(&self) -> f64 {
        if self.total_files == 0 {
            return if self.phase() == ScanPhase::Complete {
                100.0
            } else {
                0.0
            };
        }
        (self.scanned_files as f64 / self.total_files as f64 * 100.0).min(100.0)
    }

    /// Wall-clock time between start and finish (or now, while running).
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        let start = self.start_time?;
        let end = self.finished_at.unwrap_or_else(Utc::now);
        Some(end - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_idle() {
        let status = ScanStatus::default();
        assert_eq!(status.phase(), ScanPhase::Idle);
        assert!(!status.active);
        assert_eq!(status.total_files, 0);
        assert!(status.threats.is_empty());
        assert!(status.elapsed().is_none());
    }

    #[test]
    fn begin_defaults_blank_scan_type() {
        assert_eq!(ScanStatus::begin("").scan_type, "full");
        assert_eq!(ScanStatus::begin("   ").scan_type, "full");
        assert_eq!(ScanStatus::begin("quick").scan_type, "quick");
    }

    #[test]
    fn begin_is_running_with_start_time() {
        let status = ScanStatus::begin("quick");
        assert!(status.active);
        assert!(status.start_time.is_some());
        assert_eq!(status.phase(), ScanPhase::Running);
    }

    #[test]
    fn push_threat_keeps_count_in_step() {
        let mut status = ScanStatus::begin("full");
        status.push_threat(Threat::new("/a.exe", "Malware.Generic.Hash", "00"));
        status.push_threat(Threat::new("/b.exe", "Malware.Generic.Hash", "11"));
        assert_eq!(status.threats_found, 2);
        assert_eq!(status.threats.len(), 2);
    }

    #[test]
    fn finish_sets_terminal_fields_once() {
        let mut status = ScanStatus::begin("full");
        status.current_folder = "/home/user/Downloads".into();
        status.finish(true);
        assert!(!status.active);
        assert!(status.stopped);
        assert_eq!(status.current_folder, COMPLETE_FOLDER);
        assert_eq!(status.phase(), ScanPhase::Stopped);

        let finished_at = status.finished_at;
        status.finish(false);
        assert!(status.stopped, "a finished record must not change outcome");
        assert_eq!(status.finished_at, finished_at);
    }

    #[test]
    fn progress_percent_bounds() {
        let mut status = ScanStatus::begin("full");
        assert_eq!(status.progress_percent(), 0.0);
        status.total_files = 4;
        status.scanned_files = 1;
        assert_eq!(status.progress_percent(), 25.0);
        status.scanned_files = 4;
        assert_eq!(status.progress_percent(), 100.0);

        let mut empty = ScanStatus::begin("full");
        empty.finish(false);
        assert_eq!(empty.progress_percent(), 100.0);
    }
}
