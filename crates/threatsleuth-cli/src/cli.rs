/// Command-line options.
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "ThreatSleuth", author, version, about)]
pub struct CliOptions {
    /// Path to the YAML config file (defaults to $THREATSLEUTH_CONFIG or ./threatsleuth.yaml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Folder to scan; repeat for several. Replaces the configured scan paths
    #[arg(short, long = "path")]
    pub paths: Vec<PathBuf>,

    /// Scan label reported in the status (e.g. full, quick)
    #[arg(long, default_value = "full")]
    pub scan_type: String,

    /// Pause after each scanned file, in milliseconds
    #[arg(long)]
    pub throttle_ms: Option<u64>,

    /// Extra SHA-256 hash list (`<digest> [label]` per line)
    #[arg(long)]
    pub signatures: Option<PathBuf>,

    /// Stop the scan after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Let the counting pass run to the end even after a stop request
    #[arg(long)]
    pub uninterruptible_count: bool,

    /// Print the final status as JSON instead of a text summary
    #[arg(long)]
    pub json: bool,

    /// Write detected threats to this CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Move every detected file into this directory after the scan
    #[arg(long, value_name = "DIR", conflicts_with = "lock")]
    pub quarantine: Option<PathBuf>,

    /// Make every detected file read-only after the scan
    #[arg(long)]
    pub lock: bool,

    /// Suppress live progress output
    #[arg(short, long)]
    pub quiet: bool,
}

pub fn parse() -> CliOptions {
    CliOptions::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = CliOptions::parse_from(["ThreatSleuth"]);
        assert_eq!(opts.scan_type, "full");
        assert!(opts.paths.is_empty());
        assert!(!opts.json);
        assert!(opts.timeout.is_none());
    }

    #[test]
    fn repeated_paths_keep_order() {
        let opts = CliOptions::parse_from([
            "ThreatSleuth",
            "--path",
            "/b",
            "-p",
            "/a",
            "--scan-type",
            "quick",
            "--timeout",
            "30",
        ]);
        assert_eq!(opts.paths, vec![PathBuf::from("/b"), PathBuf::from("/a")]);
        assert_eq!(opts.scan_type, "quick");
        assert_eq!(opts.timeout, Some(30));
    }

    #[test]
    fn quarantine_and_lock_are_exclusive() {
        let opts = CliOptions::parse_from(["ThreatSleuth", "--quarantine", "/q"]);
        assert_eq!(opts.quarantine, Some(PathBuf::from("/q")));
        assert!(!opts.lock);

        let both = CliOptions::try_parse_from(["ThreatSleuth", "--quarantine", "/q", "--lock"]);
        assert!(both.is_err());
    }
}
