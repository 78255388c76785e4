//! Tracing subscriber setup.

use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LoggingConfig};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `config.level`. Logs go to stderr; stdout is reserved
/// for the payload and the confirmation line. Calling this twice keeps the
/// first subscriber.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = match config.format {
        LogFormat::Text => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(e) = installed {
        debug!(error = %e, "Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_keeps_first_subscriber() {
        let text = LoggingConfig::default();
        init(&text);
        init(&LoggingConfig {
            format: LogFormat::Json,
            ..text
        });
    }
}
