//! ThreatSleuth: on-demand file-threat scanner.
//!
//! Thin binary entry point. All logic lives in the `threatsleuth-core`
//! and `threatsleuth-cli` crates.

fn main() -> anyhow::Result<()> {
    let opts = threatsleuth_cli::cli::parse();
    let log = threatsleuth_cli::logging::init();
    tracing::info!("ThreatSleuth starting");

    let config = threatsleuth_cli::load_config(&opts)?;
    log.apply_config_level(&config.log_level);

    let code = threatsleuth_cli::run(&opts, &config)?;
    std::process::exit(code);
}
