/// Scan events: lightweight messages sent from the scan thread to any
/// subscribed frontend via crossbeam channels.
///
/// Events complement, not replace, [`crate::Scanner::status`]: the status
/// snapshot is always authoritative. Sends never block the worker; a
/// subscriber that falls more than [`EVENT_CHANNEL_CAPACITY`] events behind
/// misses events, and a dropped receiver is pruned on the next send.
use crate::model::Threat;
use crossbeam_channel::{Sender, TrySendError};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Maximum number of events that may queue up per subscriber.
pub const EVENT_CHANNEL_CAPACITY: usize = 1_024;

/// How a scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    /// Every configured root was walked to the end.
    Completed,
    /// A stop request interrupted the walk.
    Stopped,
}

#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// The worker thread is running.
    Started { scan_type: String },
    /// The count pass finished; `total_files` is now fixed.
    CountComplete { total_files: u64 },
    /// The scan pass entered a configured root.
    FolderEntered { folder: PathBuf },
    ThreatDetected(Threat),
    /// Terminal event. The status snapshot is already final when this is sent.
    Finished {
        outcome: ScanOutcome,
        scanned_files: u64,
        threats_found: u64,
        duration: Duration,
    },
}

/// Fan-out of events to every live subscriber.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventBus {
    subscribers: Arc<Mutex<Vec<Sender<ScanEvent>>>>,
}

impl EventBus {
    pub(crate) fn subscribe(&self, tx: Sender<ScanEvent>) {
        self.subscribers.lock().push(tx);
    }

    pub(crate) fn emit(&self, event: ScanEvent) {
        let mut subscribers = self.subscribers.lock();
        if subscribers.is_empty() {
            return;
        }
        subscribers.retain(|tx| {
            !matches!(
                tx.try_send(event.clone()),
                Err(TrySendError::Disconnected(_))
            )
        });
    }
}
