//! Application layer for mediabucket.
//!
//! Wires the credential resolver, the platform registry and the export
//! bridge into one facade a host or the command line can drive.

pub mod bucket;
pub mod config;

pub use bucket::{ImportJob, MediaBucket, ResolvedUrl};
pub use config::{AppConfig, CONFIG_ENV, PASSPHRASE_ENV};
