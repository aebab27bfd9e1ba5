//! Tracing setup for binaries embedding the relay.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the application, which can call [`init`] once at startup.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Configuration for the global tracing subscriber.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// The maximum level captured for `chat_relay` events.
    pub level: Level,
    /// Where formatted events are written.
    pub target: LogTarget,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            target: LogTarget::default(),
        }
    }
}

/// Output target for log lines.
#[derive(Debug, Clone, Default)]
pub enum LogTarget {
    /// Standard error, leaving stdout to the application.
    #[default]
    Stderr,
    /// Append to a file.
    File(String),
}

fn filter(level: Level) -> Result<EnvFilter, Box<dyn std::error::Error>> {
    Ok(EnvFilter::from_default_env().add_directive(format!("chat_relay={level}").parse()?))
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` directives are honoured in addition to `config.level`.
///
/// # Errors
///
/// Fails if the log file cannot be opened or a global subscriber is
/// already installed.
pub fn init(config: ObservabilityConfig) -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = tracing_subscriber::registry().with(filter(config.level)?);

    match config.target {
        LogTarget::Stderr => {
            let layer = fmt::layer().with_writer(std::io::stderr);
            subscriber.with(layer).try_init()?;
        }
        LogTarget::File(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file));
            subscriber.with(layer).try_init()?;
        }
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_accepts_levels() {
        for level in [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE] {
            assert!(filter(level).is_ok(), "level {level}");
        }
    }

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(matches!(config.target, LogTarget::Stderr));
    }
}
