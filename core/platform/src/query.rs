//! Shaping of the listing query.

use serde::{Deserialize, Serialize};

use mediabucket_storage::ListQuery;

/// Adjusts the listing query before it is sent.
///
/// `prefix` is the requested directory relative to the bucket root, with a
/// trailing `/`, or `None` when the bucket root is requested.
pub trait QueryShaper: Send + Sync {
    fn shape(&self, query: ListQuery, prefix: Option<&str>) -> ListQuery;
}

/// List the whole bucket in one call.
#[derive(Debug, Default, Clone, Copy)]
pub struct FullBucket;

impl QueryShaper for FullBucket {
    fn shape(&self, query: ListQuery, _prefix: Option<&str>) -> ListQuery {
        query
    }
}

/// List only the direct children of the requested directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrefixScoped;

impl QueryShaper for PrefixScoped {
    fn shape(&self, query: ListQuery, prefix: Option<&str>) -> ListQuery {
        match prefix {
            Some(prefix) if !prefix.is_empty() => query.scoped(prefix, "/"),
            _ => query,
        }
    }
}

/// Configurable choice of shaper.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    #[default]
    Full,
    Prefix,
}

impl QueryMode {
    pub fn shaper(&self) -> &'static dyn QueryShaper {
        match self {
            QueryMode::Full => &FullBucket,
            QueryMode::Prefix => &PrefixScoped,
        }
    }
}
