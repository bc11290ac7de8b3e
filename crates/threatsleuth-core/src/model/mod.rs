/// Data model for scan state.
///
/// `ScanStatus` is the single mutable record a scan writes into. Callers only
/// ever see clones of it.
pub mod status;
pub mod threat;

pub use status::{ScanPhase, ScanStatus, COMPLETE_FOLDER, DEFAULT_SCAN_TYPE};
pub use threat::Threat;
