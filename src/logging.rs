use anyhow::{Context, Result};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_level`. With `to_file` set, output
/// goes to the debug log so an interactive terminal is left alone.
pub fn init_tracing(default_level: &str, to_file: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("agent_diagnosis_cli={default_level}")))
        .context("invalid log level")?;

    let init_result = if to_file {
        let path = crate::storage::debug_log_path()?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open debug log {}", path.display()))?;
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::sync::Arc::new(file))
            .with_ansi(false);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    };

    if let Err(err) = init_result {
        tracing::warn!(error = %err, "tracing already initialized");
    }
    Ok(())
}
