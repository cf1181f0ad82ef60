//! Credential resolution for mediabucket platforms.
//!
//! Platform fields are stored either once for all users or per user, with
//! secret values sealed. They are read and opened on every request.

pub mod resolver;
pub mod settings;
pub mod writer;

pub use resolver::{CredentialResolver, CredentialScope};
pub use settings::{SettingsSnapshot, SettingsStore};
pub use writer::store_fields;
