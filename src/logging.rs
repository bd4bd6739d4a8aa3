//! Logging port for the engine and scheduler.
//!
//! Long-lived components take an [`EventLog`] at construction instead of
//! talking to a process-wide logger, so tests can capture what was logged
//! and embedders can route events wherever they like. The binary wires in
//! [`TracingLog`].

use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Sink for engine and scheduler events.
pub trait EventLog: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// [`EventLog`] that forwards to the `tracing` macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl EventLog for TracingLog {
    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// [`EventLog`] that keeps messages in memory, prefixed with their level.
/// Exists for assertions in tests.
#[derive(Debug, Default)]
pub struct MemoryLog {
    messages: Mutex<Vec<String>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }

    fn record(&self, level: &str, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push(format!("{level}: {message}"));
    }
}

impl EventLog for MemoryLog {
    fn debug(&self, message: &str) {
        self.record("DEBUG", message);
    }

    fn info(&self, message: &str) {
        self.record("INFO", message);
    }

    fn warn(&self, message: &str) {
        self.record("WARN", message);
    }

    fn error(&self, message: &str) {
        self.record("ERROR", message);
    }
}

/// Install the global tracing subscriber for the binary. `RUST_LOG` wins
/// over the verbosity flag when set.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
