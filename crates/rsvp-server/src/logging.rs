use rsvp_config::{LogFormat, LoggingConfig};
use tracing_subscriber::{fmt, EnvFilter};

/// `RUST_LOG` wins over the configured level; `--verbose` forces `debug`.
pub fn init_logging(config: &LoggingConfig, verbose: bool) {
    let default_level = if verbose { "debug" } else { config.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match config.format {
        LogFormat::Json => fmt()
            .with_env_filter(filter)
            .json()
            .with_target(false)
            .try_init(),
        LogFormat::Compact => fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .try_init(),
    };
    if let Err(err) = result {
        eprintln!("warning: logging not initialized: {err}");
    }
}
