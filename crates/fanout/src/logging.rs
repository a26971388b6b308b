use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::Config;

pub const LOG_FILE: &str = "fanout.log";

/// Install the global subscriber.
///
/// Console output always; outside debug mode events are also appended to
/// `log_dir/fanout.log`. The returned guard flushes that file on drop and
/// must live until exit.
pub fn init(config: &Config) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = if config.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    };

    let console = fmt::layer()
        .with_target(false)
        .with_file(config.debug)
        .with_line_number(config.debug);

    let (file_layer, guard) = if config.debug {
        (None, None)
    } else {
        std::fs::create_dir_all(&config.log_dir)
            .with_context(|| format!("failed to create log directory {}", config.log_dir.display()))?;
        let appender = tracing_appender::rolling::never(&config.log_dir, LOG_FILE);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_ansi(false).with_writer(writer);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}
