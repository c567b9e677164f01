//! Structured logging.
//!
//! # Responsibilities
//! - Build the global tracing subscriber from [`LogConfig`]
//! - Select text or JSON output
//! - Optionally tee records into daily-rotated files, one per level
//!   (`debug`, `info`, `warn`, `error`)
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - File output goes through a non-blocking writer; the returned guard must
//!   be held for the life of the process or buffered lines are lost

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing::Level;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::LogConfig;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("failed to install subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Build the level filter: `RUST_LOG` wins, otherwise the configured level.
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(config.level.to_ascii_lowercase())?),
    }
}

/// Levels that get their own file when `to_file` is set.
pub const LEVEL_FILES: &[&str] = &["debug", "info", "warn", "error"];

/// File a record of `level` is written to. Trace records are never written.
pub fn level_file(level: &Level) -> Option<&'static str> {
    if *level == Level::ERROR {
        Some("error")
    } else if *level == Level::WARN {
        Some("warn")
    } else if *level == Level::INFO {
        Some("info")
    } else if *level == Level::DEBUG {
        Some("debug")
    } else {
        None
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// One daily-rolling file layer per entry in [`LEVEL_FILES`], named
/// `{file_name}-{level}.log` under `config.directory`.
fn file_layers(config: &LogConfig, file_name: &str) -> (Vec<BoxedLayer>, Vec<WorkerGuard>) {
    let json = config.format.eq_ignore_ascii_case("json");
    let mut layers = Vec::with_capacity(LEVEL_FILES.len());
    let mut guards = Vec::with_capacity(LEVEL_FILES.len());

    for &name in LEVEL_FILES {
        let appender =
            tracing_appender::rolling::daily(&config.directory, format!("{}-{}.log", file_name, name));
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let only_this_level = filter_fn(move |meta: &tracing::Metadata<'_>| level_file(meta.level()) == Some(name));

        let layer = if json {
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(only_this_level)
                .boxed()
        } else {
            fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(only_this_level)
                .boxed()
        };
        layers.push(layer);
        guards.push(guard);
    }
    (layers, guards)
}

/// Install the global subscriber.
///
/// `file_name` is the base name for rotated files when `to_file` is set. The
/// returned guards flush those files and must outlive all logging.
pub fn init_logging(config: &LogConfig, file_name: &str) -> Result<Vec<WorkerGuard>, LoggingError> {
    let filter = build_filter(config)?;
    let dev = config.development;
    let json = config.format.eq_ignore_ascii_case("json");

    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_target(dev)
            .with_file(dev)
            .with_line_number(dev)
    });
    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_file(dev)
            .with_line_number(dev)
    });

    let (files, guards) = if config.to_file {
        file_layers(config, file_name)
    } else {
        (Vec::new(), Vec::new())
    };

    tracing_subscriber::registry()
        .with(files)
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .try_init()?;

    tracing::debug!(level = %config.level, format = %config.format, to_file = config.to_file, "Logging initialized");
    Ok(guards)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_config() {
        let config = LogConfig {
            level: "WARN".into(),
            ..LogConfig::default()
        };
        assert!(build_filter(&config).is_ok());
    }

    #[test]
    fn test_level_file_mapping() {
        assert_eq!(level_file(&Level::ERROR), Some("error"));
        assert_eq!(level_file(&Level::WARN), Some("warn"));
        assert_eq!(level_file(&Level::INFO), Some("info"));
        assert_eq!(level_file(&Level::DEBUG), Some("debug"));
        assert_eq!(level_file(&Level::TRACE), None);
    }

    fn read_files_starting_with(dir: &std::path::Path, prefix: &str) -> String {
        let mut out = String::new();
        for entry in std::fs::read_dir(dir).unwrap() {
            let entry = entry.unwrap();
            if entry.file_name().to_string_lossy().starts_with(prefix) {
                out.push_str(&std::fs::read_to_string(entry.path()).unwrap());
            }
        }
        out
    }

    #[test]
    fn test_records_split_by_level() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            to_file: true,
            directory: dir.path().to_string_lossy().into_owned(),
            ..LogConfig::default()
        };

        let (layers, guards) = file_layers(&config, "dynconf");
        let subscriber = tracing_subscriber::registry().with(layers);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("refresh applied");
            tracing::error!("refresh failed");
        });
        drop(guards);

        let info = read_files_starting_with(dir.path(), "dynconf-info.log");
        let error = read_files_starting_with(dir.path(), "dynconf-error.log");
        assert!(info.contains("refresh applied"));
        assert!(!info.contains("refresh failed"));
        assert!(error.contains("refresh failed"));
        assert!(!error.contains("refresh applied"));
    }
}
