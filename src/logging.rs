//! Logging initialization
//!
//! Configures tracing-subscriber for the `wpsched` binary. Library code only
//! emits events; nothing is printed unless a subscriber is installed here.
//! Events go to stderr so command output on stdout stays parseable.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::storage::{LogFormat, LoggingConfig};

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. `verbose` forces
/// `debug` regardless of both. Calling this more than once is harmless; only
/// the first subscriber wins.
pub fn init_logging(config: &LoggingConfig, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
    };

    let fmt_layer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_target(verbose)
            .with_writer(std::io::stderr)
            .without_time()
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(
            target: "wpsched::init",
            level = %config.level,
            format = ?config.format,
            verbose,
            "Logging initialized"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_does_not_panic() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        };

        init_logging(&config, false);
        init_logging(&config, true);
    }
}
