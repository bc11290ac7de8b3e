/// Post-scan response: quarantine or lock each detected file.
use crate::CliOptions;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use threatsleuth_core::action::{self, QuarantineRecord};
use threatsleuth_core::{ActionError, Threat};
use tracing::warn;

/// What happened to one flagged file.
#[derive(Debug)]
pub enum ActionResult {
    Quarantined(QuarantineRecord),
    Locked(PathBuf),
    Failed { path: PathBuf, error: ActionError },
}

impl ActionResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// One indented summary line.
    pub fn describe(&self) -> String {
        match self {
            Self::Quarantined(record) => format!(
                "    quarantined {} -> {}",
                record.original_path.display(),
                record.quarantine_path.display()
            ),
            Self::Locked(path) => format!("    locked {}", path.display()),
            Self::Failed { path, error } => format!("    FAILED {}: {error}", path.display()),
        }
    }
}

/// Apply the action selected on the command line to every threat, once per
/// path. Returns an empty list when no action was requested.
pub fn apply_actions(opts: &CliOptions, threats: &[Threat]) -> Vec<ActionResult> {
    if opts.quarantine.is_none() && !opts.lock {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    threats
        .iter()
        .filter(|t| seen.insert(t.path.as_str()))
        .map(|t| act_on(opts, Path::new(&t.path)))
        .collect()
}

fn act_on(opts: &CliOptions, path: &Path) -> ActionResult {
    let result = match opts.quarantine {
        Some(ref dir) => action::quarantine_file(path, dir).map(ActionResult::Quarantined),
        None => action::lock_file(path).map(|()| ActionResult::Locked(path.to_path_buf())),
    };
    result.unwrap_or_else(|error| {
        warn!("Action on {} failed: {error}", path.display());
        ActionResult::Failed {
            path: path.to_path_buf(),
            error,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn threat_at(path: &Path) -> Threat {
        Threat::new(path.to_string_lossy(), "Malware.Test.EICAR", "X5O")
    }

    #[test]
    fn no_action_requested_touches_nothing() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.exe");
        fs::write(&file, b"x").unwrap();

        let opts = CliOptions::parse_from(["ThreatSleuth"]);
        assert!(apply_actions(&opts, &[threat_at(&file)]).is_empty());
        assert!(file.exists());
    }

    #[test]
    fn duplicate_paths_are_acted_on_once() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.exe");
        fs::write(&file, b"x").unwrap();
        let qdir = tmp.path().join("q");

        let opts = CliOptions::parse_from(["ThreatSleuth", "--quarantine", qdir.to_str().unwrap()]);
        let results = apply_actions(&opts, &[threat_at(&file), threat_at(&file)]);

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], ActionResult::Quarantined(_)));
        assert!(results[0].describe().contains("quarantined"));
    }

    #[test]
    fn failure_is_reported_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let present = tmp.path().join("b.bat");
        fs::write(&present, b"@echo off").unwrap();
        let missing = tmp.path().join("gone.exe");

        let opts = CliOptions::parse_from(["ThreatSleuth", "--lock"]);
        let results = apply_actions(&opts, &[threat_at(&missing), threat_at(&present)]);

        assert_eq!(results.len(), 2);
        assert!(results[0].is_failure());
        assert!(results[0].describe().starts_with("    FAILED"));
        assert!(matches!(results[1], ActionResult::Locked(_)));
        assert!(action::is_locked(&present).unwrap());
    }
}
