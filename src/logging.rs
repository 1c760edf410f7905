//! Logging initialization for the binary.
//!
//! stdout carries the JSON result, so every log line goes to stderr or to
//! the optional log file.

use std::path::Path;

use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Logging options collected from the command line
#[derive(Debug, Clone, Default)]
pub struct LogOptions<'a> {
    /// 0 = WARN, 1 = DEBUG, 2+ = TRACE for this crate
    pub verbosity: u8,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
    /// Append logs to this file instead of stderr
    pub file: Option<&'a Path>,
}

fn crate_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn build_filter(verbosity: u8) -> EnvFilter {
    let level = crate_level(verbosity);

    // RUST_LOG wins over the verbosity flag for other targets
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    match format!("remote_ls={level}").parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Initialize the tracing subscriber.
///
/// Returns the appender guard; it must be kept alive until the process exits
/// or buffered lines are lost.
///
/// # Panics
/// Panics if a global subscriber is already installed.
pub fn init(options: LogOptions<'_>) -> WorkerGuard {
    let filter = build_filter(options.verbosity);
    let subscriber = tracing_subscriber::registry().with(filter);

    let (writer, guard) = match options.file {
        Some(path) => {
            let directory = path.parent().unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "remote-ls.log".into());
            let appender = tracing_appender::rolling::never(directory, file_name);
            tracing_appender::non_blocking(appender)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    if options.json {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(writer),
            )
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(options.file.is_none())
                    .with_writer(writer),
            )
            .init();
    }

    guard
}
