//! Tracing subscriber setup for the binary.

use crate::config::LoggingConfig;

/// Install the global subscriber. Events go to stderr so stdout stays
/// machine-readable.
///
/// `RUST_LOG` takes precedence over the configured level. Calling this more
/// than once is harmless; later calls are ignored.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}

/// The configured level, raised by `-v` flags.
pub fn effective_level(config: &LoggingConfig, verbose: u8) -> LoggingConfig {
    let level = match verbose {
        0 => config.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    LoggingConfig {
        level,
        json: config.json,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_raises_level() {
        let base = LoggingConfig::default();
        assert_eq!(effective_level(&base, 0).level, "info");
        assert_eq!(effective_level(&base, 1).level, "debug");
        assert_eq!(effective_level(&base, 3).level, "trace");
    }
}
