/// Agent configuration: loaded from a YAML file, defaults when absent.
///
/// ```yaml
/// log_level: info
/// scan_paths:
///   - /home/user/Downloads
/// scan:
///   throttle_ms: 5
///   cancellable_count: true
///   signature_file: /etc/threatsleuth/hashes.txt
/// ```
use crate::detection::{Detector, SignatureSet};
use crate::error::ConfigError;
use crate::scanner::ScanOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "THREATSLEUTH_CONFIG";

/// Config file used when [`CONFIG_ENV_VAR`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "threatsleuth.yaml";

/// Folders under the user's home directory scanned by default.
const DEFAULT_HOME_FOLDERS: &[&str] = &["Downloads", "Documents", "Desktop"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Default tracing filter, e.g. `info` or `threatsleuth_core=debug`.
    pub log_level: String,
    /// Root directories, scanned in this order.
    pub scan_paths: Vec<PathBuf>,
    pub scan: ScanSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Pause after each scanned file, in milliseconds.
    pub throttle_ms: u64,
    /// Whether stop requests interrupt the counting pass.
    pub cancellable_count: bool,
    /// Optional hash list merged into the built-in signatures.
    pub signature_file: Option<PathBuf>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            throttle_ms: 5,
            cancellable_count: true,
            signature_file: None,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            scan_paths: default_scan_paths(),
            scan: ScanSettings::default(),
        }
    }
}

impl AgentConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_yaml::from_slice(&bytes).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write as YAML, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self).map_err(ConfigError::Serialise)?;
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, yaml).map_err(io_err)
    }

    /// Build scanner options, loading the signature file when configured.
    pub fn scan_options(&self) -> Result<ScanOptions, ConfigError> {
        let mut options = ScanOptions::default()
            .with_throttle(Duration::from_millis(self.scan.throttle_ms))
            .with_cancellable_count(self.scan.cancellable_count);

        if let Some(ref file) = self.scan.signature_file {
            let mut set = SignatureSet::builtin();
            let added = set.load_hash_list(file)?;
            info!("Loaded {added} hash signature(s) from {}", file.display());
            options = options.with_detector(Detector::new(Arc::new(set)));
        }

        Ok(options)
    }
}

/// Config file location: [`CONFIG_ENV_VAR`] if set, else [`DEFAULT_CONFIG_FILE`].
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV_VAR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// The user's home directory, from `HOME` or `USERPROFILE`.
pub fn home_dir() -> Option<PathBuf> {
    ["HOME", "USERPROFILE"]
        .into_iter()
        .filter_map(|key| std::env::var_os(key))
        .find(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// `Downloads`, `Documents` and `Desktop` under the home directory.
///
/// Empty when the home directory cannot be determined.
pub fn default_scan_paths() -> Vec<PathBuf> {
    match home_dir() {
        Some(home) => DEFAULT_HOME_FOLDERS.iter().map(|f| home.join(f)).collect(),
        None => Vec::new(),
    }
}
