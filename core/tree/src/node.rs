//! Tree node representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mime::Icon;
use mediabucket_common::{Error, Result};

/// Normalise a directory path so it ends with exactly one `/`.
///
/// An empty path is the root `/`.
pub fn directory_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    format!("{}/", trimmed)
}

/// A file inside a directory node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Full object key.
    pub key: String,
    /// Display name (last key segment).
    pub title: String,
    /// Public URL synthesized by the platform.
    pub url: String,
    /// Size in bytes.
    pub size: u64,
    pub mime_type: String,
    pub last_modified: DateTime<Utc>,
    pub icon: Icon,
}

/// A directory.
///
/// `dirs` keeps discovery order. Every child key is prefixed by the key of
/// its parent and unique among its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Full directory key, always ending with `/`.
    pub key: String,
    /// Display segment.
    pub title: String,
    pub files: Vec<FileEntry>,
    pub dirs: Vec<TreeNode>,
}

impl TreeNode {
    /// Create an empty directory.
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            files: Vec::new(),
            dirs: Vec::new(),
        }
    }

    /// Whether the directory has neither files nor sub-directories.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }

    /// Direct sub-directory with the given key.
    pub fn dir(&self, key: &str) -> Option<&TreeNode> {
        self.dirs.iter().find(|d| d.key == key)
    }

    /// Direct file with the given key.
    pub fn file(&self, key: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.key == key)
    }

    /// Depth-first search for a directory, this node included.
    ///
    /// Children are visited in insertion order; the first match wins.
    pub fn find(&self, key: &str) -> Option<&TreeNode> {
        if self.key == key {
            return Some(self);
        }
        self.dirs.iter().find_map(|d| d.find(key))
    }

    /// Visit every directory below this node in pre-order.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a TreeNode)) {
        for dir in &self.dirs {
            visit(dir);
            dir.walk(visit);
        }
    }

    /// Number of files in this directory and below.
    pub fn file_count(&self) -> usize {
        self.files.len() + self.dirs.iter().map(TreeNode::file_count).sum::<usize>()
    }

    /// Number of directories below this node.
    pub fn dir_count(&self) -> usize {
        self.dirs.len() + self.dirs.iter().map(TreeNode::dir_count).sum::<usize>()
    }

    /// Total size of all files in this directory and below.
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum::<u64>()
            + self.dirs.iter().map(TreeNode::total_size).sum::<u64>()
    }

    /// Every file of this directory and below, in tree order.
    pub fn all_files(&self) -> Vec<&FileEntry> {
        let mut files: Vec<&FileEntry> = self.files.iter().collect();
        for dir in &self.dirs {
            files.extend(dir.all_files());
        }
        files
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(key: &str, size: u64) -> FileEntry {
        FileEntry {
            key: key.to_string(),
            title: key.rsplit('/').next().unwrap_or(key).to_string(),
            url: format!("https://cdn.example.com/{}", key),
            size,
            mime_type: "text/plain".to_string(),
            last_modified: Utc::now(),
            icon: Icon::Text,
        }
    }

    fn sample() -> TreeNode {
        let mut inner = TreeNode::new("/b/x/y/", "y");
        inner.files.push(file("x/y/c.txt", 3));

        let mut x = TreeNode::new("/b/x/", "x");
        x.files.push(file("x/b.txt", 2));
        x.dirs.push(inner);

        let mut root = TreeNode::new("/b/", "/b/");
        root.files.push(file("a.txt", 1));
        root.dirs.push(x);
        root.dirs.push(TreeNode::new("/b/z/", "z"));
        root
    }

    #[test]
    fn test_directory_path() {
        assert_eq!(directory_path("/bucket"), "/bucket/");
        assert_eq!(directory_path("/bucket//"), "/bucket/");
        assert_eq!(directory_path(""), "/");
        assert_eq!(directory_path("aws-s3://media/"), "aws-s3://media/");
    }

    #[test]
    fn test_find_depth_first() {
        let tree = sample();
        assert_eq!(tree.find("/b/x/y/").map(|n| n.title.as_str()), Some("y"));
        assert_eq!(tree.find("/b/").map(|n| n.key.as_str()), Some("/b/"));
        assert!(tree.find("/b/missing/").is_none());
    }

    #[test]
    fn test_counts() {
        let tree = sample();
        assert_eq!(tree.file_count(), 3);
        assert_eq!(tree.dir_count(), 3);
        assert_eq!(tree.total_size(), 6);
        assert_eq!(tree.all_files().len(), 3);
        assert!(tree.dir("/b/z/").is_some_and(TreeNode::is_empty));
    }

    #[test]
    fn test_walk_is_preorder() {
        let tree = sample();
        let mut keys = Vec::new();
        tree.walk(&mut |node| keys.push(node.key.clone()));
        assert_eq!(keys, vec!["/b/x/", "/b/x/y/", "/b/z/"]);
    }

    #[test]
    fn test_json_roundtrip() {
        let tree = sample();
        let json = tree.to_json().unwrap();
        assert_eq!(TreeNode::from_json(&json).unwrap(), tree);
    }
}
