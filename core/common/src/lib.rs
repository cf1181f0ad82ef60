//! Common utilities and types shared across mediabucket crates.
//!
//! This module provides the error taxonomy, the diagnostics sink and the
//! plain data types that travel between the storage client, the tree engine
//! and the platforms.

pub mod diagnostics;
pub mod error;
pub mod types;

pub use diagnostics::{Diagnostic, Diagnostics, MemoryDiagnostics, Severity, TracingDiagnostics};
pub use error::{Error, Result};
pub use types::{AttachmentRef, ObjectEntry, UserId};
