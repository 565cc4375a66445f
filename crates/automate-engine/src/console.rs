//! Script console: tracing events, an in-memory ring buffer and an optional embedder sink.

use std::{
    collections::VecDeque,
    fmt,
    sync::Arc,
    time::SystemTime,
};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

/// Console severity as named by scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    /// `console.log` and `print`.
    Log,
    /// `console.info`.
    Info,
    /// `console.warn`.
    Warn,
    /// `console.error`.
    Error,
    /// `console.debug`.
    Debug,
}

impl LogLevel {
    /// Lowercase name passed to sinks.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives every console message, e.g. to mirror it in the host UI.
///
/// Called on the script thread while the script waits. Implementations must not call back into
/// the engine.
pub trait LogSink: Send + Sync {
    /// Handle one message.
    fn on_log(&self, level: &str, message: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str, &str) + Send + Sync,
{
    fn on_log(&self, level: &str, message: &str) {
        self(level, message)
    }
}

/// A retained console message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Severity.
    pub level: LogLevel,
    /// Rendered message.
    pub message: String,
    /// When the message was emitted.
    pub timestamp: SystemTime,
}

/// Shared console state. Clones write to the same buffer and sink.
#[derive(Clone)]
pub struct Console {
    /// Most recent entries, oldest first.
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    /// Maximum retained entries.
    capacity: usize,
    /// Optional embedder sink.
    sink: Arc<Mutex<Option<Arc<dyn LogSink>>>>,
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console")
            .field("capacity", &self.capacity)
            .field("len", &self.entries.lock().len())
            .finish()
    }
}

impl Console {
    /// A console retaining at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity,
            sink: Arc::new(Mutex::new(None)),
        }
    }

    /// Install or remove the sink.
    pub fn set_sink(&self, sink: Option<Arc<dyn LogSink>>) {
        *self.sink.lock() = sink;
    }

    /// Record a message.
    pub fn emit(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Log | LogLevel::Info => info!(target: "automate::script", "{}", message),
            LogLevel::Warn => warn!(target: "automate::script", "{}", message),
            LogLevel::Error => error!(target: "automate::script", "{}", message),
            LogLevel::Debug => debug!(target: "automate::script", "{}", message),
        }

        if self.capacity > 0 {
            let mut entries = self.entries.lock();
            if entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(LogEntry {
                level,
                message: message.to_string(),
                timestamp: SystemTime::now(),
            });
        }

        // Sink runs without the lock held.
        let sink = self.sink.lock().clone();
        if let Some(sink) = sink {
            sink.on_log(level.as_str(), message);
        }
    }

    /// Copy of the retained entries, oldest first.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Drop all retained entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
