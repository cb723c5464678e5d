//! The logger handle passed to a script's `main`.

use std::sync::{Mutex, PoisonError};

use tracing::Level;

/// Leveled message sink handed to script bodies.
pub trait Logger: Send + Sync {
    /// Informational message.
    fn info(&self, message: &str);
    /// Something unexpected that does not stop the script.
    fn warn(&self, message: &str);
    /// A failure.
    fn error(&self, message: &str);
}

/// Logger that emits `tracing` events tagged with the script name.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    script: String,
}

impl TracingLogger {
    /// A logger bound to `script`.
    pub fn new(script: &str) -> Self {
        Self {
            script: script.to_string(),
        }
    }

    /// Script this logger is bound to.
    pub fn script(&self) -> &str {
        &self.script
    }
}

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(script = %self.script, "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(script = %self.script, "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(script = %self.script, "{message}");
    }
}

/// Logger that keeps every entry in memory.
///
/// # Examples
///
/// ```
/// use quickscript::{Logger, MemoryLogger};
/// use tracing::Level;
///
/// let logger = MemoryLogger::new();
/// logger.warn("disk almost full");
/// assert_eq!(logger.entries(), vec![(Level::WARN, "disk almost full".to_string())]);
/// ```
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<(Level, String)>>,
}

impl MemoryLogger {
    /// An empty logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry in emission order.
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages logged at `level`.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message)
            .collect()
    }

    fn push(&self, level: Level, message: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }
}

impl Logger for MemoryLogger {
    fn info(&self, message: &str) {
        self.push(Level::INFO, message);
    }

    fn warn(&self, message: &str) {
        self.push(Level::WARN, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::ERROR, message);
    }
}
