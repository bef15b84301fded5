use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "roboswish=debug,providers=debug,shared=debug";

/// Route `tracing` output to an append-only diagnostic file. Best-effort:
/// on failure the app keeps running without a log. Keep the guard alive
/// for the life of the process so buffered lines get flushed.
pub fn init(path: &Path) -> Option<WorkerGuard> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name()?.to_str()?;

    let appender = match RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
    {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("diagnostic log disabled: {}", e);
            return None;
        }
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    match tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .try_init()
    {
        Ok(()) => Some(guard),
        Err(e) => {
            eprintln!("diagnostic log disabled: {}", e);
            None
        }
    }
}
