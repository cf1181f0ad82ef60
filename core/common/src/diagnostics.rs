//! Diagnostics sink for user-visible failure messages.
//!
//! Recording is fire-and-forget: a sink never influences control flow.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Severity of a diagnostic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(label)
    }
}

/// A single recorded diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
    /// URL, path or platform name the message refers to.
    pub context: String,
}

/// Sink for diagnostics shown to the host's user.
pub trait Diagnostics: Send + Sync {
    fn record(&self, message: &str, severity: Severity, context: &str);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn record(&self, message: &str, severity: Severity, context: &str) {
        match severity {
            Severity::Debug => debug!(context = %context, "{}", message),
            Severity::Info => info!(context = %context, "{}", message),
            Severity::Warning => warn!(context = %context, "{}", message),
            Severity::Error => error!(context = %context, "{}", message),
        }
    }
}

/// Keeps every record in memory.
///
/// Useful for tests and for hosts that render the collected messages
/// after an operation finished.
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    records: Mutex<Vec<Diagnostic>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records so far.
    pub fn records(&self) -> Vec<Diagnostic> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Whether any record has the given severity.
    pub fn has(&self, severity: Severity) -> bool {
        self.records().iter().any(|d| d.severity == severity)
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn record(&self, message: &str, severity: Severity, context: &str) {
        let diagnostic = Diagnostic {
            message: message.to_string(),
            severity,
            context: context.to_string(),
        };
        match self.records.lock() {
            Ok(mut records) => records.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}
