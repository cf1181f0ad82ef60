//! Export and import bridge for mediabucket.
//!
//! Moves locally held attachments into a bucket, removes them again, and
//! plans imports of listed objects in batches.

pub mod bridge;
pub mod import;
pub mod local;
pub mod records;

pub use bridge::{ExportBridge, ExportRequest};
pub use import::{ImportItem, ImportPlan};
pub use local::{FsLocalFiles, LocalFiles, MemoryLocalFiles};
pub use records::{ExportRecords, MemoryRecords, SqliteRecords, KEY_FIELD};
