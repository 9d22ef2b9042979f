/**
 * Initializes the logger
 *
 * https://docs.rs/slog/latest/slog/
 *
 */
use std::sync::Mutex;

use crate::config::Settings;
use slog::{Drain, LevelFilter, Logger};
use slog_async::Async;
use slog_term::FullFormat;

/**
 * Terminal logger behind an async drain, filtered at the configured level.
 * Every record carries the software name and the run mode.
 */
pub(crate) fn init_logger(cfg: &Settings) -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = FullFormat::new(decorator).build().fuse();
    let drain = Async::new(drain).build().fuse();

    let drain = LevelFilter::new(drain, cfg.log_level).fuse();
    Logger::root(
        Mutex::new(drain).fuse(),
        slog::o!("software" => cfg.software_name.clone(), "env" => cfg.environment.as_str()),
    )
}

/// Logger that drops every record, for tests
#[cfg(test)]
pub(crate) fn discard_logger() -> Logger {
    Logger::root(slog::Discard, slog::o!())
}
