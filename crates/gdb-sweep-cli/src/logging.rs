use std::env;
use tracing::{debug, Level};
use tracing_subscriber::fmt::writer::{MakeWriter, MakeWriterExt};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "./logs/gdb-sweep.log";

/// Sweep messages (info and below) go to stdout, warnings and errors to
/// stderr, and everything to the log file.
///
/// `TRACING_LEVEL` sets the filter, `LOG_FILE_PATH` the file.
pub fn init_logger() -> impl Drop {
    let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter_layer = EnvFilter::new(filter);

    let log_file_path = env::var("LOG_FILE_PATH").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let file_appender = tracing_appender::rolling::never("./", log_file_path);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let messages = fmt::layer()
        .with_writer(message_writer(std::io::stdout))
        .with_target(false)
        .with_file(false)
        .without_time()
        .with_ansi(true);

    let problems = fmt::layer()
        .with_writer(problem_writer(std::io::stderr))
        .pretty()
        .with_file(false)
        .without_time()
        .with_ansi(true);

    let file = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(messages)
        .with(problems)
        .with(file)
        .with(filter_layer)
        .init();

    debug!("Logging to stdout (messages), stderr (warnings and errors) and file");

    guard
}

/// Info, debug and trace events.
fn message_writer<W>(writer: W) -> impl for<'a> MakeWriter<'a>
where
    W: for<'a> MakeWriter<'a>,
{
    writer.with_min_level(Level::INFO)
}

/// Warnings and errors.
fn problem_writer<W>(writer: W) -> impl for<'a> MakeWriter<'a>
where
    W: for<'a> MakeWriter<'a>,
{
    writer.with_max_level(Level::WARN)
}
