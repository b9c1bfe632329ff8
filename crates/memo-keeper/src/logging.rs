use crate::{AppError, AppResult};

use std::{panic::Location, path::Path};

use error_location::ErrorLocation;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor `--verbose` is given.
pub(crate) const DEFAULT_FILTER: &str = "memo_keeper=info,memo_keeper_core=info";

const VERBOSE_FILTER: &str = "memo_keeper=debug,memo_keeper_core=debug";

const LOG_FILE_PREFIX: &str = "memo-keeper.log";

/// `--verbose` wins over `RUST_LOG`, which wins over the default.
pub(crate) fn build_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new(VERBOSE_FILTER);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install stderr and daily-rolling file output under `log_dir`.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process.
#[track_caller]
pub(crate) fn init(log_dir: &Path, verbose: bool) -> AppResult<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(build_filter(verbose))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .map_err(|e| AppError::LoggingError {
            reason: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

    Ok(guard)
}
