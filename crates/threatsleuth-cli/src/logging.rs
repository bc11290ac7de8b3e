/// Logging setup for the binary.
///
/// The subscriber is installed before the config file is read, so messages
/// from config loading are not lost. It starts at `RUST_LOG` (or `info`);
/// once the config is known its `log_level` replaces that default, unless
/// `RUST_LOG` was set.
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

/// Level used until the config has been read.
const BOOT_LEVEL: &str = "info";

/// Lets the config adjust the filter after start-up.
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl LogHandle {
    /// Switch to the configured level. Ignored when `RUST_LOG` is set.
    pub fn apply_config_level(&self, level: &str) {
        if self.from_env {
            return;
        }
        match EnvFilter::try_new(level) {
            Ok(filter) => {
                if let Err(e) = self.filter.reload(filter) {
                    tracing::warn!("Could not apply log level {level:?}: {e}");
                }
            }
            Err(e) => tracing::warn!("Invalid log_level {level:?} in config: {e}"),
        }
    }
}

/// Install the global subscriber, writing to stderr.
pub fn init() -> LogHandle {
    init_with_writer(std::io::stderr)
}

/// Install the global subscriber with a custom writer.
pub fn init_with_writer<W>(writer: W) -> LogHandle
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let (filter, handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new(BOOT_LEVEL)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer))
        .init();

    LogHandle {
        filter: handle,
        from_env,
    }
}
