/// The scan worker: runs one scan to completion or cancellation on the
/// background thread spawned by [`super::Scanner::start_scan`].
///
/// # Two passes
///
/// 1. **Count:** walk every root and tally non-directory entries into
///    `total_files`, so frontends can show a meaningful progress bar.
/// 2. **Scan:** walk the roots again in configured order, run the detection
///    pipeline on each file and record hits.
///
/// The count pass finishes for all roots before the scan pass starts.
///
/// # Lock discipline
///
/// The write lock on the shared status is taken only around individual
/// field updates. Directory reads, file reads, hashing and the throttle
/// sleep all happen with no lock held, so `status()` readers are never
/// stalled by I/O. Count increments are batched to cut lock traffic on
/// large trees.
use super::cancel::CancelToken;
use super::progress::{EventBus, ScanEvent, ScanOutcome};
use super::{ScanOptions, SharedState};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Files tallied locally before being published to `total_files`.
const COUNT_FLUSH_INTERVAL: u64 = 256;

/// Everything the worker thread owns for one scan.
pub(crate) struct ScanJob {
    pub(crate) roots: Vec<PathBuf>,
    pub(crate) options: ScanOptions,
    pub(crate) state: SharedState,
    pub(crate) cancel: CancelToken,
    pub(crate) events: EventBus,
}

/// Thread entry point.
pub(crate) fn run(job: ScanJob) {
    let start = Instant::now();
    let scan_type = job.state.read().status.scan_type.clone();
    info!(
        "Starting {scan_type} scan of {} folder(s)",
        job.roots.len()
    );
    job.events.emit(ScanEvent::Started { scan_type });

    let total_files = count_files(&job);
    debug!("Count pass complete: {total_files} files");
    job.events.emit(ScanEvent::CountComplete { total_files });

    let outcome = scan_roots(&job);

    // Finish step: runs on natural completion and on cancellation alike.
    // `Finished` is sent while the write lock is held so that it always
    // precedes the `Started` of any scan launched right after this one.
    let duration = start.elapsed();
    let (scanned_files, threats_found) = {
        let mut state = job.state.write();
        state.status.finish(outcome == ScanOutcome::Stopped);
        let counts = (state.status.scanned_files, state.status.threats_found);
        job.events.emit(ScanEvent::Finished {
            outcome,
            scanned_files: counts.0,
            threats_found: counts.1,
            duration,
        });
        counts
    };

    info!(
        "Scan {}: {scanned_files} files scanned, {threats_found} threats found in {duration:?}",
        match outcome {
            ScanOutcome::Completed => "complete",
            ScanOutcome::Stopped => "stopped",
        }
    );
}

/// Build the directory walker for one root.
///
/// Entries come back sorted by name within each directory; symlinks are
/// reported as entries but never followed into.
fn walker(root: &Path) -> jwalk::WalkDir {
    jwalk::WalkDir::new(root)
        .skip_hidden(false)
        .follow_links(false)
        .sort(true)
        .parallelism(jwalk::Parallelism::RayonNewPool(num_cpus::get()))
}

/// Pass 1. Returns the number of files counted.
///
/// Traversal errors are skipped. When `options.cancellable_count` is off
/// this pass ignores the cancel token entirely.
fn count_files(job: &ScanJob) -> u64 {
    let honour_cancel = job.options.cancellable_count;
    let mut total: u64 = 0;

    'roots: for root in &job.roots {
        if honour_cancel && job.cancel.is_cancelled() {
            break;
        }

        let mut pending: u64 = 0;
        for entry in walker(root) {
            if honour_cancel && job.cancel.is_cancelled() {
                publish_count(job, &mut pending, &mut total);
                break 'roots;
            }
            match entry {
                Ok(entry) if !entry.file_type().is_dir() => pending += 1,
                Ok(_) => {}
                Err(err) => debug!("Count pass skipping entry under {}: {err}", root.display()),
            }
            if pending >= COUNT_FLUSH_INTERVAL {
                publish_count(job, &mut pending, &mut total);
            }
        }
        publish_count(job, &mut pending, &mut total);
    }

    total
}

fn publish_count(job: &ScanJob, pending: &mut u64, total: &mut u64) {
    if *pending == 0 {
        return;
    }
    job.state.write().status.total_files += *pending;
    *total += *pending;
    *pending = 0;
}

/// Pass 2, over all roots in configured order.
fn scan_roots(job: &ScanJob) -> ScanOutcome {
    for root in &job.roots {
        if job.cancel.is_cancelled() {
            return ScanOutcome::Stopped;
        }

        job.state.write().status.current_folder = root.to_string_lossy().into_owned();
        job.events.emit(ScanEvent::FolderEntered {
            folder: root.clone(),
        });

        if scan_root(job, root) == ScanOutcome::Stopped {
            return ScanOutcome::Stopped;
        }
    }
    ScanOutcome::Completed
}

/// Pass 2 for a single root. Abandons the rest of the walk as soon as the
/// cancel token is seen.
fn scan_root(job: &ScanJob, root: &Path) -> ScanOutcome {
    let throttle = job.options.throttle;

    for entry in walker(root) {
        if job.cancel.is_cancelled() {
            return ScanOutcome::Stopped;
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!("Scan pass skipping entry under {}: {err}", root.display());
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        let threat = job.options.detector.scan_file(&path);

        {
            let mut state = job.state.write();
            if let Some(ref threat) = threat {
                state.status.push_threat(threat.clone());
            }
            state.status.scanned_files += 1;
        }

        if let Some(threat) = threat {
            warn!("THREAT DETECTED: {} [{}]", threat.path, threat.threat_type);
            job.events.emit(ScanEvent::ThreatDetected(threat));
        }

        if !throttle.is_zero() {
            std::thread::sleep(throttle);
        }
    }

    ScanOutcome::Completed
}
