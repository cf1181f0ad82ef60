//! Per-attachment export records.
//!
//! A record maps an attachment and a field name to a value. The bridge
//! writes the object key of every successful export under [`KEY_FIELD`]
//! and reads it back when the exported object is deleted.

use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, info};

use mediabucket_common::{AttachmentRef, Error, Result};

/// Field holding the object key of an exported attachment.
pub const KEY_FIELD: &str = "s3_key";

/// Record storage of the host.
pub trait ExportRecords: Send + Sync {
    /// Stored value, `None` if the field was never written.
    fn get(&self, attachment: &AttachmentRef, field: &str) -> Result<Option<String>>;

    /// Store a value, replacing any previous one.
    fn set(&self, attachment: &AttachmentRef, field: &str, value: &str) -> Result<()>;
}

/// Records held in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryRecords {
    values: RwLock<HashMap<(String, String), String>>,
}

impl MemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExportRecords for MemoryRecords {
    fn get(&self, attachment: &AttachmentRef, field: &str) -> Result<Option<String>> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        Ok(values
            .get(&(attachment.as_str().to_string(), field.to_string()))
            .cloned())
    }

    fn set(&self, attachment: &AttachmentRef, field: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                (attachment.as_str().to_string(), field.to_string()),
                value.to_string(),
            );
        Ok(())
    }
}

/// Records persisted in a SQLite database.
pub struct SqliteRecords {
    conn: Mutex<Connection>,
}

impl SqliteRecords {
    /// Create or open a records database.
    ///
    /// # Errors
    /// - `Error::Database` if the file cannot be opened or the schema cannot be created
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path).map_err(db_error)?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS export_records (
                attachment TEXT NOT NULL,
                field TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (attachment, field)
            );
            "#,
        )
        .map_err(db_error)?;

        info!("Export records opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ExportRecords for SqliteRecords {
    fn get(&self, attachment: &AttachmentRef, field: &str) -> Result<Option<String>> {
        let conn = self.conn();
        let value = conn.query_row(
            "SELECT value FROM export_records WHERE attachment = ?1 AND field = ?2",
            params![attachment.as_str(), field],
            |row| row.get::<_, String>(0),
        );

        match value {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_error(e)),
        }
    }

    fn set(&self, attachment: &AttachmentRef, field: &str, value: &str) -> Result<()> {
        debug!(attachment = %attachment, field, "Writing export record");
        self.conn()
            .execute(
                r#"
                INSERT OR REPLACE INTO export_records (attachment, field, value)
                VALUES (?1, ?2, ?3)
                "#,
                params![attachment.as_str(), field, value],
            )
            .map_err(db_error)?;
        Ok(())
    }
}

fn db_error(err: rusqlite::Error) -> Error {
    Error::Database(err.to_string())
}
