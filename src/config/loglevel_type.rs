use serde::de::{self, Deserializer, Visitor};

use slog::Level;
use std::{env, fmt};

const LEVEL_NAMES: &[&str] = &["trace", "debug", "info", "warn", "error", "critical"];

/**
 * Deserialize the log level from the configuration.
 *
 * An unrecognized level falls back to the default of the run mode named by
 * TURN_ENVIRONMENT: debug in development, warn everywhere else.
 */
pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
where
    D: Deserializer<'de>,
{
    match deserializer.deserialize_str(LogLevelVisitor) {
        Ok(level) => Ok(level),
        Err(_) => {
            let run_mode = env::var(super::ENVIRONMENT_VARIABLE).unwrap_or_else(|_| "production".into());
            Ok(default_for(&run_mode))
        }
    }
}

pub(crate) fn default_for(run_mode: &str) -> Level {
    match run_mode.to_lowercase().as_str() {
        "development" | "dev" => Level::Debug,
        _ => Level::Warning,
    }
}

/// Configuration name of `level`, the inverse of `from_name`
pub(crate) fn name_of(level: Level) -> &'static str {
    match level {
        Level::Trace => "trace",
        Level::Debug => "debug",
        Level::Info => "info",
        Level::Warning => "warn",
        Level::Error => "error",
        Level::Critical => "critical",
    }
}

fn from_name(name: &str) -> Option<Level> {
    match name.to_lowercase().as_str() {
        "trace" => Some(Level::Trace),
        "debug" => Some(Level::Debug),
        "info" => Some(Level::Info),
        "warn" | "warning" => Some(Level::Warning),
        "error" => Some(Level::Error),
        "critical" => Some(Level::Critical),
        _ => None,
    }
}

struct LogLevelVisitor;

impl<'de> Visitor<'de> for LogLevelVisitor {
    type Value = Level;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string representing a log level")
    }

    fn visit_str<E>(self, value: &str) -> Result<Level, E>
    where
        E: de::Error,
    {
        from_name(value).ok_or_else(|| de::Error::unknown_variant(value, LEVEL_NAMES))
    }
}
