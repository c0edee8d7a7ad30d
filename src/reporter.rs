//! Diagnostics sink handed to bound query runners.

use parking_lot::Mutex;
use std::fmt;
use tracing::{error, info, warn};

/// Severity of a reported diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLevel {
    Info,
    Warn,
    Error,
}

/// Receives diagnostics produced while executing queries.
pub trait Reporter: Send + Sync {
    fn report(&self, level: ReportLevel, message: &str);

    fn info(&self, message: &str) {
        self.report(ReportLevel::Info, message)
    }

    fn warn(&self, message: &str) {
        self.report(ReportLevel::Warn, message)
    }

    fn error(&self, message: &str) {
        self.report(ReportLevel::Error, message)
    }
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, level: ReportLevel, message: &str) {
        match level {
            ReportLevel::Info => info!(target: "rebuild_batch::reporter", "{}", message),
            ReportLevel::Warn => warn!(target: "rebuild_batch::reporter", "{}", message),
            ReportLevel::Error => error!(target: "rebuild_batch::reporter", "{}", message),
        }
    }
}

/// A recorded diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub level: ReportLevel,
    pub message: String,
}

/// Keeps diagnostics in memory for later inspection.
#[derive(Default)]
pub struct MemoryReporter {
    entries: Mutex<Vec<ReportEntry>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ReportEntry> {
        self.entries.lock().clone()
    }

    pub fn count(&self, level: ReportLevel) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.level == level)
            .count()
    }
}

impl fmt::Debug for MemoryReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryReporter")
            .field("entries", &self.entries.lock().len())
            .finish()
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, level: ReportLevel, message: &str) {
        self.entries.lock().push(ReportEntry {
            level,
            message: message.to_string(),
        });
    }
}
