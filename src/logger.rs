//! Injectable logger for internal diagnostics (info/warn/error) that must
//! not be allowed to crash the reactor.
//!
//! `Severity` and the shape of `LogRecord` are carried over from
//! `core/src/protocol/log.rs`'s `Severity`/`LogMessage`. The dual-mode
//! `Logger` in `core/src/logger.rs` (`Standalone` vs
//! `Embedded(Sender<LogMessage>)`) is generalized here into a `Log` trait so
//! a `Device` or `NetworkContext` can be handed any sink, rather than
//! reaching for one process-global singleton — a library with multiple
//! independent devices in the same process can't share one global logger
//! the way a single application process can.

use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Debug => write!(f, "DEBUG"),
            Severity::Info => write!(f, "INFO"),
            Severity::Warn => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// A single log entry, as handed to a [`Log`] sink.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub severity: Severity,
    pub target: String,
    pub message: String,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.target, self.message)
    }
}

/// A log sink. Implementations must be cheap to call from the reactor
/// thread — no blocking I/O beyond what the implementation itself accepts.
pub trait Log: Send + Sync {
    fn log(&self, record: LogRecord);

    fn debug(&self, target: &str, message: impl Into<String>) {
        self.log(LogRecord { severity: Severity::Debug, target: target.to_string(), message: message.into() });
    }
    fn info(&self, target: &str, message: impl Into<String>) {
        self.log(LogRecord { severity: Severity::Info, target: target.to_string(), message: message.into() });
    }
    fn warn(&self, target: &str, message: impl Into<String>) {
        self.log(LogRecord { severity: Severity::Warn, target: target.to_string(), message: message.into() });
    }
    fn error(&self, target: &str, message: impl Into<String>) {
        self.log(LogRecord { severity: Severity::Error, target: target.to_string(), message: message.into() });
    }
}

/// Default sink: forwards to the `tracing` crate. Suitable whenever the
/// embedding application already installs a `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl Log for TracingLog {
    fn log(&self, record: LogRecord) {
        match record.severity {
            Severity::Debug => tracing::debug!(target: "branchwire", node = %record.target, "{}", record.message),
            Severity::Info => tracing::info!(target: "branchwire", node = %record.target, "{}", record.message),
            Severity::Warn => tracing::warn!(target: "branchwire", node = %record.target, "{}", record.message),
            Severity::Error | Severity::Fatal => {
                tracing::error!(target: "branchwire", node = %record.target, "{}", record.message)
            }
        }
    }
}

/// Forwards every record to a channel instead of `tracing`, for embedders
/// that want to capture log records programmatically (a GUI log pane, a
/// test harness asserting on emitted diagnostics). Grounded in
/// `core/src/logger.rs`'s `LoggerMode::Embedded`.
pub struct ChannelLog(pub crossbeam_channel::Sender<LogRecord>);

impl Log for ChannelLog {
    fn log(&self, record: LogRecord) {
        // A full or disconnected channel must not take the reactor down;
        // fall back to stderr exactly once per dropped record.
        if self.0.try_send(record).is_err() {
            eprintln!("branchwire: log channel unavailable, dropping record");
        }
    }
}

pub fn default_logger() -> Arc<dyn Log> {
    Arc::new(TracingLog)
}
