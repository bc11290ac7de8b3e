/// ThreatSleuth CLI: runs one scan from the terminal.
///
/// Loads the agent config, applies command-line overrides, drives a
/// [`session::ScanSession`] until the scan ends, then prints a summary or a
/// JSON status, optionally quarantines or locks flagged files and exports
/// threats as CSV.
pub mod cli;
pub mod logging;
pub mod render;
pub mod response;
pub mod session;

pub use cli::CliOptions;

use anyhow::{bail, Context};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use threatsleuth_core::config::{self, AgentConfig};
use threatsleuth_core::{report, Scanner};
use tracing::{info, warn};

/// Process exit code when the scan found at least one threat.
pub const EXIT_THREATS_FOUND: i32 = 2;

/// Load the config named by `--config`, else the default location.
pub fn load_config(opts: &CliOptions) -> anyhow::Result<AgentConfig> {
    let path = opts.config.clone().unwrap_or_else(config::config_path);
    let mut cfg = AgentConfig::load(&path)
        .with_context(|| format!("loading config {}", path.display()))?;
    apply_overrides(&mut cfg, opts);
    Ok(cfg)
}

/// Command-line flags win over the config file.
pub fn apply_overrides(cfg: &mut AgentConfig, opts: &CliOptions) {
    if !opts.paths.is_empty() {
        cfg.scan_paths = opts.paths.clone();
    }
    if let Some(ms) = opts.throttle_ms {
        cfg.scan.throttle_ms = ms;
    }
    if let Some(ref file) = opts.signatures {
        cfg.scan.signature_file = Some(file.clone());
    }
    if opts.uninterruptible_count {
        cfg.scan.cancellable_count = false;
    }
}

/// Run one scan and return the process exit code.
pub fn run(opts: &CliOptions, cfg: &AgentConfig) -> anyhow::Result<i32> {
    if cfg.scan_paths.is_empty() {
        bail!("no scan paths configured; pass --path or set scan_paths in the config");
    }

    let options = cfg.scan_options().context("building scan options")?;
    let scanner = Arc::new(Scanner::with_options(cfg.scan_paths.clone(), options));

    let handler_scanner = Arc::clone(&scanner);
    if let Err(e) = ctrlc::set_handler(move || handler_scanner.stop_scan()) {
        warn!("Could not install Ctrl-C handler: {e}");
    }

    let mut session = session::ScanSession::new(Arc::clone(&scanner));
    session.set_timeout(opts.timeout.map(Duration::from_secs));
    session.start(&opts.scan_type)?;

    let live = !opts.quiet && !opts.json;
    let final_status = session
        .run_to_completion(|status| {
            if live {
                eprint!("\r{}\x1b[K", render::progress_line(status));
            }
        })
        .clone();
    if live {
        eprintln!();
    }

    let actions = response::apply_actions(opts, &final_status.threats);
    let failed = actions.iter().filter(|a| a.is_failure()).count();
    if failed > 0 {
        warn!("{failed} of {} file action(s) failed", actions.len());
    }

    let stdout = std::io::stdout();
    if opts.json {
        report::write_json(&final_status, stdout.lock()).context("writing JSON status")?;
    } else {
        let mut out = stdout.lock();
        out.write_all(render::summary(&final_status).as_bytes())?;
        if session.timed_out {
            writeln!(out, "  (stopped after the {}s timeout)", opts.timeout.unwrap_or(0))?;
        }
        if !actions.is_empty() {
            writeln!(out, "  Actions:")?;
            for action in &actions {
                writeln!(out, "{}", action.describe())?;
            }
        }
    }

    if let Some(ref csv_path) = opts.csv {
        write_csv(csv_path, &final_status.threats)?;
        info!("Wrote {} threat(s) to {}", final_status.threats.len(), csv_path.display());
    }

    Ok(if final_status.threats_found > 0 {
        EXIT_THREATS_FOUND
    } else {
        0
    })
}

fn write_csv(path: &Path, threats: &[threatsleuth_core::Threat]) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    report::write_threats_csv(threats, file)
        .with_context(|| format!("writing {}", path.display()))
}
