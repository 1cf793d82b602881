//! Where page-description dumps go.

use log::{Level, error, info, log_enabled, warn};
use std::fmt::Debug;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticEntry {
    pub level: DiagnosticLevel,
    pub message: String,
    /// The generated page-description markup, when it could be captured.
    pub markup: Option<String>,
}

/// Receives the diagnostics of an export. Shared across exports, so
/// implementations must tolerate concurrent calls.
pub trait DiagnosticSink: Send + Sync + Debug {
    /// Whether every export should dump its page-description markup.
    fn verbose(&self) -> bool;

    fn record(&self, entry: DiagnosticEntry);
}

/// Forwards diagnostics to the `log` facade under `folio::diagnostics`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiagnostics {
    verbose: Option<bool>,
}

impl LogDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the default, which is to dump markup when debug logging is on.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }
}

const TARGET: &str = "folio::diagnostics";

impl DiagnosticSink for LogDiagnostics {
    fn verbose(&self) -> bool {
        self.verbose.unwrap_or_else(|| log_enabled!(target: TARGET, Level::Debug))
    }

    fn record(&self, entry: DiagnosticEntry) {
        let markup = entry.markup.as_deref().unwrap_or("<not captured>");
        match entry.level {
            DiagnosticLevel::Info => info!(target: TARGET, "{}\n{}", entry.message, markup),
            DiagnosticLevel::Warn => warn!(target: TARGET, "{}", entry.message),
            DiagnosticLevel::Error => error!(target: TARGET, "{}\n{}", entry.message, markup),
        }
    }
}

/// Keeps every entry in memory.
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    verbose: bool,
    entries: Mutex<Vec<DiagnosticEntry>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verbose() -> Self {
        Self { verbose: true, ..Self::default() }
    }

    pub fn entries(&self) -> Vec<DiagnosticEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DiagnosticSink for MemoryDiagnostics {
    fn verbose(&self) -> bool {
        self.verbose
    }

    fn record(&self, entry: DiagnosticEntry) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}
