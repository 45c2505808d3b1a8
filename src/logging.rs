use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "crm_graphql=info,tower_http=info";
const LOG_FILE_PREFIX: &str = "crm.log";

fn file_appender(log_dir: &Path) -> Result<RollingFileAppender, String> {
    fs::create_dir_all(log_dir).map_err(|e| e.to_string())?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(log_dir)
        .map_err(|e| e.to_string())
}

/// Initializes console logging plus a daily-rolling JSON log under `log_dir`.
///
/// When `log_dir` is unusable the file layer is skipped and the reason goes to stderr.
/// The returned guard flushes the file writer on drop; hold it for the life of the process.
pub fn init_logging<P: AsRef<Path>>(log_dir: P) -> Option<WorkerGuard> {
    let log_dir = log_dir.as_ref();

    let (file_layer, guard) = match file_appender(log_dir) {
        Ok(appender) => {
            let (non_blocking_writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().json().with_writer(non_blocking_writer)),
                Some(guard),
            )
        }
        Err(e) => {
            // the subscriber is not installed yet
            eprintln!(
                "File logging disabled, cannot use log directory {}: {}",
                log_dir.display(),
                e
            );
            (None, None)
        }
    };
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_missing_log_dir() {
        let dir = tempdir().unwrap();
        let log_dir = dir.path().join("nested").join("logs");
        assert!(file_appender(&log_dir).is_ok());
        assert!(log_dir.is_dir());
    }

    #[test]
    fn log_dir_under_a_file_is_an_error() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, "x").unwrap();
        assert!(file_appender(&file.join("logs")).is_err());
    }
}
