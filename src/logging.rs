/*!
 * Logging and tracing initialization
 */

use std::fs::File;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::BackupConfig;
use crate::error::{BackupError, Result};

/// Initialize structured logging based on configuration
pub fn init_logging(config: &BackupConfig) -> Result<()> {
    let env_filter = build_filter(config)?;

    if let Some(ref log_path) = config.log_file {
        init_file_logging(log_path, env_filter)?;
    } else {
        init_stdout_logging(env_filter);
    }

    Ok(())
}

/// Effective level: verbose wins over the configured level
pub fn effective_level(config: &BackupConfig) -> Level {
    if config.verbose {
        Level::DEBUG
    } else {
        config.log_level.to_tracing_level()
    }
}

fn build_filter(config: &BackupConfig) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env().or_else(|_| default_filter(config))
}

/// Filter used when `RUST_LOG` is unset: every `vidvault` module at the
/// effective level
pub(crate) fn default_filter(config: &BackupConfig) -> Result<EnvFilter> {
    EnvFilter::try_new(format!("vidvault={}", effective_level(config)))
        .map_err(|e| BackupError::Config(format!("Failed to create log filter: {}", e)))
}

/// Initialize logging to stdout
fn init_stdout_logging(env_filter: EnvFilter) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Initialize logging to a file
fn init_file_logging(log_path: &Path, env_filter: EnvFilter) -> Result<()> {
    let file = File::create(log_path)
        .map_err(|e| BackupError::Config(format!("Failed to create log file: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(file)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}

/// Initialize logging with custom format for testing
#[cfg(test)]
pub fn init_test_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vidvault=debug"));

        let fmt_layer = fmt::layer().with_test_writer().with_target(false).compact();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .ok(); // Ignore error if already initialized
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_verbose_overrides_log_level() {
        let config = BackupConfig {
            log_level: LogLevel::Error,
            verbose: true,
            ..Default::default()
        };

        assert_eq!(effective_level(&config), Level::DEBUG);
    }

    #[test]
    fn test_configured_level_used_when_not_verbose() {
        let config = BackupConfig {
            log_level: LogLevel::Warn,
            verbose: false,
            ..Default::default()
        };

        assert_eq!(effective_level(&config), Level::WARN);
    }

    #[test]
    fn test_build_filter() {
        let config = BackupConfig::default();
        assert!(build_filter(&config).is_ok());
    }

    #[test]
    fn test_default_filter_follows_effective_level() {
        let filter = default_filter(&BackupConfig::default()).unwrap();
        let subscriber = tracing_subscriber::registry().with(filter);

        tracing::subscriber::with_default(subscriber, || {
            assert!(tracing::enabled!(target: "vidvault::core::executor", Level::INFO));
            assert!(!tracing::enabled!(target: "vidvault::core::executor", Level::DEBUG));
            assert!(!tracing::enabled!(target: "walkdir", Level::INFO));
        });
    }
}
