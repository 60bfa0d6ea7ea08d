use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_FILE_PREFIX: &str = "territorial.log";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_DIRECTIVE: &str = "territorial_intel=info";

/// Where the JSON run logs go; `TERRITORIAL_LOG_DIR` overrides `logs/`
pub fn log_dir() -> PathBuf {
    std::env::var("TERRITORIAL_LOG_DIR")
        .ok()
        .filter(|dir| !dir.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR))
}

/// `RUST_LOG` plus this crate at `info`
fn env_filter() -> EnvFilter {
    let filter = EnvFilter::from_default_env();
    match DEFAULT_DIRECTIVE.parse::<Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Console output for operators plus a daily-rolling JSON file for ingestion audits.
///
/// Keep the returned guard alive until exit: dropping it flushes the file writer.
/// Calling this twice leaves the first subscriber in place.
pub fn init_logging() -> WorkerGuard {
    let dir = log_dir();
    if let Err(e) = fs::create_dir_all(&dir) {
        eprintln!("cannot create log directory {}: {}", dir.display(), e);
    }

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX));

    let file_layer = fmt::layer().json().with_writer(file_writer);
    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stdout);

    if tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .is_err()
    {
        eprintln!("tracing subscriber already installed");
    }

    guard
}
