//! Logging.
//!
//! A small thread-local logging facility: a [`Log`] trait, a registry of
//! installed loggers, and a standard-error logger that colors records per
//! level. The solver core is strictly single-threaded, so records are
//! written synchronously by the thread that produced them.
//!
//! The [`macros`] (`fatal!` down to `trace!`) are no-ops until [`init`]
//! installs one or more loggers, so library users and tests never have to
//! set logging up.
//!
//! # Example
//!
//! ```rust
//! use qssim::log::{init, LoglevelFilter, StdioLog};
//! use qssim::note;
//!
//! init(vec![StdioLog::boxed(LoglevelFilter::Note)]).unwrap();
//! note!("simulation starting");
//! ```
//!
//! [`Log`]: ./trait.Log.html
//! [`init`]: ./fn.init.html
//! [`macros`]: ../index.html#macros

use crate::error::{log_err, Result};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::time::SystemTime;
use strum_macros::{Display, EnumIter, EnumString};

/// Loglevel for log records.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    PartialOrd,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
)]
pub enum Loglevel {
    /// Fatal problems: the simulation cannot continue. Also reported to
    /// the caller through `Result::Err`.
    Fatal = 1,

    /// Non-fatal errors caused by the caller doing something wrong. Also
    /// reported through `Result::Err` where applicable.
    Error,

    /// Something unexpected that the solver can recover from.
    Warn,

    /// Information explicitly requested by the user, such as the event
    /// counters printed after a run.
    Note,

    /// Information not specifically requested, such as lifecycle
    /// messages.
    Info,

    /// Debugging information for users of the crate API.
    Debug,

    /// Debugging information about solver internals.
    Trace,
}

/// LoglevelFilter for implementors of the Log trait.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    PartialOrd,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
)]
pub enum LoglevelFilter {
    /// A level lower than all log levels.
    #[strum(to_string = "Off", serialize = "off", serialize = "o")]
    Off = 0,
    /// Corresponds to the `Fatal` log level.
    #[strum(to_string = "Fatal", serialize = "fatal", serialize = "f")]
    Fatal,
    /// Corresponds to the `Error` log level.
    #[strum(to_string = "Error", serialize = "error", serialize = "e")]
    Error,
    /// Corresponds to the `Warn` log level.
    #[strum(to_string = "Warn", serialize = "warn", serialize = "w")]
    Warn,
    /// Corresponds to the `Note` log level.
    #[strum(to_string = "Note", serialize = "note", serialize = "n")]
    Note,
    /// Corresponds to the `Info` log level.
    #[strum(to_string = "Info", serialize = "info", serialize = "i")]
    Info,
    /// Corresponds to the `Debug` log level.
    #[strum(to_string = "Debug", serialize = "debug", serialize = "d")]
    Debug,
    /// Corresponds to the `Trace` log level.
    #[strum(to_string = "Trace", serialize = "trace", serialize = "t")]
    Trace,
}

impl From<Loglevel> for LoglevelFilter {
    fn from(level: Loglevel) -> LoglevelFilter {
        match level {
            Loglevel::Fatal => LoglevelFilter::Fatal,
            Loglevel::Error => LoglevelFilter::Error,
            Loglevel::Warn => LoglevelFilter::Warn,
            Loglevel::Note => LoglevelFilter::Note,
            Loglevel::Info => LoglevelFilter::Info,
            Loglevel::Debug => LoglevelFilter::Debug,
            Loglevel::Trace => LoglevelFilter::Trace,
        }
    }
}

impl From<Loglevel> for term::color::Color {
    fn from(level: Loglevel) -> term::color::Color {
        match level {
            Loglevel::Fatal => term::color::BRIGHT_RED,
            Loglevel::Error => term::color::RED,
            Loglevel::Warn => term::color::YELLOW,
            Loglevel::Note => term::color::WHITE,
            Loglevel::Info => term::color::BLUE,
            Loglevel::Debug => term::color::CYAN,
            Loglevel::Trace => term::color::BRIGHT_BLACK,
        }
    }
}

/// A log record: level, origin module and payload.
#[derive(Debug, Clone)]
pub struct LogRecord {
    level: Loglevel,
    module: &'static str,
    payload: String,
    timestamp: SystemTime,
}

impl LogRecord {
    /// Returns the level of this record.
    pub fn level(&self) -> Loglevel {
        self.level
    }

    /// Returns the module path that produced this record.
    pub fn module(&self) -> &str {
        self.module
    }

    /// Returns the message payload.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Returns the time at which the record was produced.
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:>5} {} {}", self.level, self.module, self.payload)
    }
}

/// The Log trait.
pub trait Log {
    /// Returns the name of this logger.
    fn name(&self) -> &str;
    /// Returns true if the provided loglevel is enabled.
    fn enabled(&self, level: Loglevel) -> bool;
    /// Log the incoming record.
    fn log(&self, record: &LogRecord);
}

thread_local! {
    /// The thread-local loggers.
    static LOGGERS: RefCell<Option<Vec<Box<dyn Log>>>> = RefCell::new(None);
}

/// Installs the given loggers in this thread.
///
/// Fails if loggers were already installed.
pub fn init(loggers: Vec<Box<dyn Log>>) -> Result<()> {
    LOGGERS.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_some() {
            log_err("loggers already initialized")
        } else {
            slot.replace(loggers);
            Ok(())
        }
    })
}

/// Removes the installed loggers from this thread.
pub fn deinit() -> Result<()> {
    LOGGERS.with(|slot| {
        if slot.borrow_mut().take().is_some() {
            Ok(())
        } else {
            log_err("loggers not initialized")
        }
    })
}

/// Submits a record to the installed loggers. Used by the log macros; a
/// no-op when no loggers are installed.
pub fn submit(level: Loglevel, module: &'static str, payload: String) {
    LOGGERS.with(|slot| {
        if let Some(loggers) = slot.borrow().as_ref() {
            let record = LogRecord {
                level,
                module,
                payload,
                timestamp: SystemTime::now(),
            };
            for logger in loggers {
                if logger.enabled(level) {
                    logger.log(&record);
                }
            }
        }
    })
}

/// A logger that writes colored records to standard error.
pub struct StdioLog {
    filter: LoglevelFilter,
}

impl StdioLog {
    /// Constructs a standard-error logger with the given level filter.
    pub fn new(filter: LoglevelFilter) -> StdioLog {
        StdioLog { filter }
    }

    /// Constructs a boxed standard-error logger, ready for [`init`].
    ///
    /// [`init`]: ./fn.init.html
    pub fn boxed(filter: LoglevelFilter) -> Box<dyn Log> {
        Box::new(StdioLog::new(filter))
    }

    fn write_colored(&self, record: &LogRecord) -> std::result::Result<(), term::Error> {
        match term::stderr() {
            Some(mut t) => {
                t.reset()?;
                if t.supports_attr(term::Attr::Dim) {
                    t.attr(term::Attr::Dim)?;
                }
                write!(
                    t,
                    "{} ",
                    humantime::format_rfc3339_seconds(record.timestamp())
                )?;
                t.reset()?;
                if t.supports_attr(term::Attr::ForegroundColor(9)) {
                    t.fg(record.level().into())?;
                }
                write!(t, "{:>5} ", format!("{}", record.level()))?;
                t.reset()?;
                writeln!(t, "{}", record.payload())?;
                Ok(())
            }
            None => {
                eprintln!(
                    "{} {:>5} {}",
                    humantime::format_rfc3339_seconds(record.timestamp()),
                    record.level(),
                    record.payload()
                );
                Ok(())
            }
        }
    }
}

impl Log for StdioLog {
    fn name(&self) -> &str {
        "stderr"
    }

    fn enabled(&self, level: Loglevel) -> bool {
        LoglevelFilter::from(level) <= self.filter
    }

    fn log(&self, record: &LogRecord) {
        if self.write_colored(record).is_err() {
            eprintln!("{}", record);
        }
    }
}

/// Submits a log record at the given level.
#[macro_export]
macro_rules! log {
    ($level:expr, $($arg:tt)+) => {
        $crate::log::submit($level, module_path!(), format!($($arg)+))
    };
}

/// Submits a Fatal log record.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)+) => { $crate::log!($crate::log::Loglevel::Fatal, $($arg)+) };
}

/// Submits an Error log record.
#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => { $crate::log!($crate::log::Loglevel::Error, $($arg)+) };
}

/// Submits a Warn log record.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => { $crate::log!($crate::log::Loglevel::Warn, $($arg)+) };
}

/// Submits a Note log record.
#[macro_export]
macro_rules! note {
    ($($arg:tt)+) => { $crate::log!($crate::log::Loglevel::Note, $($arg)+) };
}

/// Submits an Info log record.
#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => { $crate::log!($crate::log::Loglevel::Info, $($arg)+) };
}

/// Submits a Debug log record.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => { $crate::log!($crate::log::Loglevel::Debug, $($arg)+) };
}

/// Submits a Trace log record.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)+) => { $crate::log!($crate::log::Loglevel::Trace, $($arg)+) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn level_filter_order() {
        assert!(LoglevelFilter::Off < LoglevelFilter::Fatal);
        assert!(LoglevelFilter::Fatal < LoglevelFilter::Trace);
        assert_eq!(LoglevelFilter::from(Loglevel::Note), LoglevelFilter::Note);
    }

    #[test]
    fn level_strings() {
        assert_eq!(Loglevel::from_str("Debug").unwrap(), Loglevel::Debug);
        assert_eq!(
            LoglevelFilter::from_str("info").unwrap(),
            LoglevelFilter::Info
        );
        assert_eq!(
            LoglevelFilter::from_str("t").unwrap(),
            LoglevelFilter::Trace
        );
        assert_eq!(format!("{}", Loglevel::Warn), "Warn");
        assert!(LoglevelFilter::from_str("chatty").is_err());
    }

    #[test]
    fn uninitialized_is_noop() {
        // Must not panic without init().
        trace!("nothing to see here");
        assert!(deinit().is_err());
    }

    #[test]
    fn macros_reach_logger() {
        // Not Sync, but the registry is thread-local so this is fine.
        struct Sink;
        thread_local! {
            static SEEN: std::cell::RefCell<Vec<String>> =
                std::cell::RefCell::new(vec![]);
        }
        impl Log for Sink {
            fn name(&self) -> &str {
                "sink"
            }
            fn enabled(&self, level: Loglevel) -> bool {
                LoglevelFilter::from(level) <= LoglevelFilter::Info
            }
            fn log(&self, record: &LogRecord) {
                SEEN.with(|s| s.borrow_mut().push(record.payload().to_string()));
            }
        }
        init(vec![Box::new(Sink)]).unwrap();
        info!("hello {}", 42);
        debug!("filtered out");
        deinit().unwrap();
        SEEN.with(|s| {
            assert_eq!(&*s.borrow(), &["hello 42".to_string()]);
        });
    }
}
