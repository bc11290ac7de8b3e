/// ThreatSleuth Core: scanning, detection, and status model.
///
/// This crate contains all business logic with zero frontend dependencies.
/// It is designed to be driven by any caller that can invoke four operations
/// (construct, start, stop, poll status): a CLI, an HTTP handler, or a test.
///
/// # Modules
///
/// - [`model`]: `ScanStatus` / `Threat` records handed out as snapshots.
/// - [`scanner`]: Scan controller and the background two-pass worker.
/// - [`detection`]: Per-file detection pipeline and signature database.
/// - [`config`]: YAML agent configuration.
/// - [`report`]: JSON / CSV export of scan results.
/// - [`action`]: Quarantine and lock actions on detected files.
/// - [`error`]: Error types.
pub mod action;
pub mod config;
pub mod detection;
pub mod error;
pub mod model;
pub mod report;
pub mod scanner;

pub use error::{ActionError, ConfigError, ScanError};
pub use model::{ScanPhase, ScanStatus, Threat};
pub use scanner::{ScanOptions, Scanner};
