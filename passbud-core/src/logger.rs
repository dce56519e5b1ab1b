//! Bridge from the `log` facade to a host-provided [`Logger`].
//!
//! Every module logs through `log::info!` and friends. Once the host calls
//! [`set_logger`], records are forwarded to its implementation, e.g. a
//! Kotlin class writing to Logcat:
//!
//! ```kotlin
//! class PassbudLogcat : Logger {
//!     override fun log(level: LogLevel, message: String) {
//!         Log.println(Log.VERBOSE + level.ordinal, "PassBud", message)
//!     }
//! }
//!
//! setLogger(PassbudLogcat(), LogLevel.INFO)
//! ```

use std::sync::{Arc, OnceLock};

/// Receives log messages from the core.
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Records `message` at `level`.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, uniffi::Enum)]
pub enum LogLevel {
    /// Very detailed tracing.
    Trace,
    /// Debugging information.
    Debug,
    /// Progress of normal operation.
    Info,
    /// Something unexpected that the core recovered from.
    Warn,
    /// An operation failed.
    Error,
}

impl LogLevel {
    const fn filter(self) -> log::LevelFilter {
        match self {
            Self::Trace => log::LevelFilter::Trace,
            Self::Debug => log::LevelFilter::Debug,
            Self::Info => log::LevelFilter::Info,
            Self::Warn => log::LevelFilter::Warn,
            Self::Error => log::LevelFilter::Error,
        }
    }
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

/// Debug and trace output of dependencies is dropped; only the core's own
/// modules are verbose.
fn should_forward(module_path: Option<&str>, level: log::Level) -> bool {
    let is_verbose = matches!(level, log::Level::Debug | log::Level::Trace);
    !is_verbose || module_path.is_some_and(|path| path.starts_with("passbud"))
}

struct ForeignLogger;

impl log::Log for ForeignLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if !should_forward(record.module_path(), record.level()) {
            return;
        }
        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(record.level().into(), format!("{}", record.args()));
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Installs the host logger and sets the most verbose level forwarded.
///
/// Only the first logger is kept; later calls just adjust `max_level`.
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>, max_level: LogLevel) {
    static LOGGER: ForeignLogger = ForeignLogger;
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("Logger already set");
    }
    // Fails only if another `log` implementation was installed first.
    if let Err(e) = log::set_logger(&LOGGER) {
        eprintln!("Failed to set logger: {e}");
    }
    log::set_max_level(max_level.filter());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_records_only_from_core() {
        assert!(should_forward(Some("passbud_core::vault"), log::Level::Debug));
        assert!(!should_forward(Some("tokio::runtime"), log::Level::Trace));
        assert!(!should_forward(None, log::Level::Debug));
        assert!(should_forward(Some("tokio::runtime"), log::Level::Warn));
        assert!(should_forward(None, log::Level::Error));
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(LogLevel::from(log::Level::Warn), LogLevel::Warn);
        assert_eq!(LogLevel::Info.filter(), log::LevelFilter::Info);
        assert!(LogLevel::Trace < LogLevel::Error);
    }
}
