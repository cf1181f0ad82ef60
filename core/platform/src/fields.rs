//! Resolved credential fields of a platform.

use std::fmt;
use zeroize::Zeroize;

/// One resolved field value.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Field {
    pub value: String,
    /// Fixed by configuration, not editable by the caller.
    pub readonly: bool,
    /// Part of the access credential pair; never printed.
    pub credential: bool,
}

impl Field {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            readonly: false,
            credential: false,
        }
    }

    pub fn credential(value: impl Into<String>) -> Self {
        let mut field = Self::new(value);
        field.credential = true;
        field
    }

    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value: &dyn fmt::Debug = if self.credential && !self.value.is_empty() {
            &"[REDACTED]"
        } else {
            &self.value
        };
        f.debug_struct("Field")
            .field("value", value)
            .field("readonly", &self.readonly)
            .finish()
    }
}

impl Drop for Field {
    fn drop(&mut self) {
        if self.credential {
            self.value.zeroize();
        }
    }
}

/// Ordered mapping of field name to resolved value.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PlatformFields {
    entries: Vec<(String, Field)>,
}

impl PlatformFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field, keeping the position of an existing one.
    pub fn insert(&mut self, name: impl Into<String>, field: Field) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = field,
            None => self.entries.push((name, field)),
        }
    }

    /// Builder-style insert of a plain value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, Field::new(value));
        self
    }

    /// Builder-style insert of a credential value.
    pub fn with_credential(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, Field::credential(value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, field)| field)
    }

    /// Value of a field, empty if absent.
    pub fn value(&self, name: &str) -> &str {
        self.get(name).map(|f| f.value.as_str()).unwrap_or("")
    }

    /// Interpret a field as a checkbox.
    pub fn flag(&self, name: &str) -> bool {
        matches!(
            self.value(name).trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    }

    /// Whether every field is absent or empty.
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|(_, f)| f.value.is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.entries.iter().map(|(n, f)| (n.as_str(), f))
    }
}

impl fmt::Debug for PlatformFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(n, field)| (n, field)))
            .finish()
    }
}
