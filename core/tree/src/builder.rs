//! Flat key listing to directory tree.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::mime::{icon_for_mime, mime_for_name, MimeFilter};
use crate::node::{directory_path, FileEntry, TreeNode};
use mediabucket_common::ObjectEntry;

/// Directory under construction.
struct Slot {
    key: String,
    title: String,
    files: Vec<FileEntry>,
    file_keys: HashSet<String>,
    children: Vec<usize>,
}

impl Slot {
    fn new(key: String, title: &str) -> Self {
        Self {
            key,
            title: title.to_string(),
            files: Vec::new(),
            file_keys: HashSet::new(),
            children: Vec::new(),
        }
    }
}

/// Index-based tree used while assembling.
///
/// Directories are looked up by full key, so each one is created once no
/// matter how many objects share its prefix.
pub(crate) struct Arena {
    slots: Vec<Slot>,
    index: HashMap<String, usize>,
}

impl Arena {
    pub(crate) const ROOT: usize = 0;

    pub(crate) fn new(root_key: &str, root_title: &str) -> Self {
        let mut index = HashMap::new();
        index.insert(root_key.to_string(), Self::ROOT);
        Self {
            slots: vec![Slot::new(root_key.to_string(), root_title)],
            index,
        }
    }

    pub(crate) fn root_key(&self) -> &str {
        &self.slots[Self::ROOT].key
    }

    /// Return the directory with `key`, creating it under `parent` if absent.
    pub(crate) fn ensure(&mut self, parent: usize, key: String, title: &str) -> usize {
        if let Some(&id) = self.index.get(&key) {
            return id;
        }

        let id = self.slots.len();
        self.index.insert(key.clone(), id);
        self.slots.push(Slot::new(key, title));
        self.slots[parent].children.push(id);
        id
    }

    /// Ensure every directory along `segments` below the root.
    ///
    /// Returns the deepest one, or the root for an empty path.
    pub(crate) fn ensure_path<'s>(&mut self, segments: impl IntoIterator<Item = &'s str>) -> usize {
        let mut current = Self::ROOT;
        let mut key = self.root_key().to_string();
        for segment in segments.into_iter().filter(|s| !s.is_empty()) {
            key.push_str(segment);
            key.push('/');
            current = self.ensure(current, key.clone(), segment);
        }
        current
    }

    /// Add a file to a directory unless one with the same key is there.
    ///
    /// Returns whether the file was added.
    pub(crate) fn push_file(&mut self, dir: usize, file: FileEntry) -> bool {
        let slot = &mut self.slots[dir];
        if !slot.file_keys.insert(file.key.clone()) {
            return false;
        }
        slot.files.push(file);
        true
    }

    /// Assemble the owned tree.
    pub(crate) fn into_tree(self) -> TreeNode {
        let mut slots: Vec<Option<Slot>> = self.slots.into_iter().map(Some).collect();
        assemble(&mut slots, Self::ROOT)
    }
}

fn assemble(slots: &mut [Option<Slot>], id: usize) -> TreeNode {
    let Some(slot) = slots[id].take() else {
        // A slot is linked from exactly one parent
        return TreeNode::new(String::new(), String::new());
    };

    let dirs = slot
        .children
        .iter()
        .map(|&child| assemble(slots, child))
        .collect();

    TreeNode {
        key: slot.key,
        title: slot.title,
        files: slot.files,
        dirs,
    }
}

/// Builds a directory tree from one bucket listing.
///
/// Every key is split on `/`. Non-final segments become directories keyed
/// `base + accumulated path + "/"`, the final segment becomes a file of the
/// innermost directory. Keys ending with `/` only create directories.
/// Objects without a mime type, or rejected by the filter, are dropped.
pub struct TreeBuilder<'a> {
    base_directory: String,
    public_url: &'a dyn Fn(&str) -> String,
    filter: &'a dyn MimeFilter,
}

impl<'a> TreeBuilder<'a> {
    /// Create a builder rooted at `base_directory`.
    ///
    /// `public_url` maps an object key to the URL stored in each file entry.
    pub fn new(
        base_directory: &str,
        public_url: &'a dyn Fn(&str) -> String,
        filter: &'a dyn MimeFilter,
    ) -> Self {
        Self {
            base_directory: directory_path(base_directory),
            public_url,
            filter,
        }
    }

    /// Build the tree.
    ///
    /// # Postconditions
    /// - Root key and title are the base directory
    /// - Each directory exists exactly once
    /// - Files keep listing order inside their directory
    pub fn build(&self, objects: &[ObjectEntry]) -> TreeNode {
        let mut arena = Arena::new(&self.base_directory, &self.base_directory);
        let mut dropped = 0usize;

        for object in objects {
            let (parents, name) = match object.key.rsplit_once('/') {
                Some((parents, name)) => (parents, name),
                None => ("", object.key.as_str()),
            };

            let dir = arena.ensure_path(parents.split('/'));
            if name.is_empty() {
                continue;
            }

            match self.file_entry(object, name) {
                Some(file) => {
                    arena.push_file(dir, file);
                }
                None => dropped += 1,
            }
        }

        let tree = arena.into_tree();
        debug!(
            base = %self.base_directory,
            objects = objects.len(),
            dirs = tree.dir_count(),
            dropped,
            "Built directory tree"
        );
        tree
    }

    fn file_entry(&self, object: &ObjectEntry, name: &str) -> Option<FileEntry> {
        let mime = mime_for_name(name).filter(|m| !m.is_empty())?;
        if !self.filter.allows(&object.key, &mime) {
            return None;
        }

        Some(FileEntry {
            key: object.key.clone(),
            title: name.to_string(),
            url: (self.public_url)(&object.key),
            size: object.size,
            icon: icon_for_mime(&mime),
            mime_type: mime,
            last_modified: object.last_modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mime::{AllowAll, AllowList};
    use chrono::Utc;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn objects(keys: &[&str]) -> Vec<ObjectEntry> {
        keys.iter()
            .map(|k| ObjectEntry::new(*k, 10, Utc::now()))
            .collect()
    }

    fn url(key: &str) -> String {
        format!("https://cdn.example.com/{}", key)
    }

    fn build(base: &str, keys: &[&str]) -> TreeNode {
        TreeBuilder::new(base, &url, &AllowAll).build(&objects(keys))
    }

    fn file_keys(node: &TreeNode) -> Vec<&str> {
        node.files.iter().map(|f| f.key.as_str()).collect()
    }

    #[test]
    fn test_nested_scenario() {
        let tree = build("/bucket/", &["a.txt", "dir1/b.txt", "dir1/dir2/c.txt"]);

        assert_eq!(tree.key, "/bucket/");
        assert_eq!(file_keys(&tree), vec!["a.txt"]);
        assert_eq!(tree.dirs.len(), 1);

        let dir1 = tree.dir("/bucket/dir1/").unwrap();
        assert_eq!(dir1.title, "dir1");
        assert_eq!(file_keys(dir1), vec!["dir1/b.txt"]);

        let dir2 = dir1.dir("/bucket/dir1/dir2/").unwrap();
        assert_eq!(file_keys(dir2), vec!["dir1/dir2/c.txt"]);
        assert!(dir2.dirs.is_empty());
    }

    #[test]
    fn test_empty_listing() {
        let tree = build("aws-s3://media/", &[]);
        assert_eq!(tree.key, "aws-s3://media/");
        assert!(tree.is_empty());
    }

    #[test]
    fn test_shared_prefixes_collapse() {
        let tree = build("/b/", &["x/1.jpg", "x/2.jpg", "y/3.jpg", "x/4.jpg"]);
        let keys: Vec<_> = tree.dirs.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["/b/x/", "/b/y/"]);
        assert_eq!(tree.dir("/b/x/").unwrap().files.len(), 3);
    }

    #[test]
    fn test_folder_placeholder_creates_directory_only() {
        let tree = build("/b/", &["empty/", "deep/er/"]);
        assert!(tree.dir("/b/empty/").is_some_and(TreeNode::is_empty));
        assert!(tree.find("/b/deep/er/").is_some());
        assert_eq!(tree.file_count(), 0);
    }

    #[test]
    fn test_empty_segments_are_skipped() {
        let tree = build("/b/", &["x//a.txt", "/top.txt"]);
        assert!(tree.dir("/b/x/").is_some());
        assert_eq!(tree.dirs.len(), 1);
        assert_eq!(file_keys(&tree), vec!["/top.txt"]);
    }

    #[test]
    fn test_unknown_mime_dropped() {
        let tree = build("/b/", &["README", "dir/Makefile", "dir/a.png"]);
        assert!(tree.files.is_empty());
        assert_eq!(file_keys(tree.dir("/b/dir/").unwrap()), vec!["dir/a.png"]);
    }

    #[test]
    fn test_filter_rejects() {
        let filter = AllowList::new(["image/*"]);
        let tree = TreeBuilder::new("/b/", &url, &filter).build(&objects(&["a.txt", "b.gif"]));
        assert_eq!(file_keys(&tree), vec!["b.gif"]);
    }

    #[test]
    fn test_file_entry_fields() {
        let tree = build("/b/", &["photos/beach.jpg"]);
        let file = &tree.dir("/b/photos/").unwrap().files[0];
        assert_eq!(file.title, "beach.jpg");
        assert_eq!(file.url, "https://cdn.example.com/photos/beach.jpg");
        assert_eq!(file.mime_type, "image/jpeg");
        assert_eq!(file.size, 10);
        assert_eq!(file.icon.as_str(), "media-image");
    }

    fn key_strategy() -> impl Strategy<Value = String> {
        "[a-c]{1,2}(/[a-c]{1,2}){0,3}(\\.txt|\\.jpg|)"
    }

    fn all_dir_keys(tree: &TreeNode) -> Vec<String> {
        let mut keys = Vec::new();
        tree.walk(&mut |n| keys.push(n.key.clone()));
        keys
    }

    proptest! {
        #[test]
        fn prop_directories_are_strict_prefixes(
            keys in prop::collection::btree_set(key_strategy(), 0..30)
        ) {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            let tree = build("/b/", &keys);

            let mut expected = BTreeSet::new();
            for key in &keys {
                let segments: Vec<&str> = key.split('/').collect();
                for end in 1..segments.len() {
                    expected.insert(format!("/b/{}/", segments[..end].join("/")));
                }
            }

            let found = all_dir_keys(&tree);
            let unique: BTreeSet<String> = found.iter().cloned().collect();
            prop_assert_eq!(found.len(), unique.len());
            prop_assert_eq!(unique, expected);
        }

        #[test]
        fn prop_children_prefixed_by_parent(
            keys in prop::collection::btree_set(key_strategy(), 0..30)
        ) {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            let tree = build("/b/", &keys);

            fn check(node: &TreeNode) -> bool {
                node.dirs.iter().all(|d| d.key.starts_with(&node.key) && d.key != node.key && check(d))
            }
            prop_assert!(check(&tree));
        }

        #[test]
        fn prop_files_always_have_mime(
            keys in prop::collection::btree_set(key_strategy(), 0..30)
        ) {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            let tree = build("/b/", &keys);

            prop_assert!(tree.all_files().iter().all(|f| !f.mime_type.is_empty()));
            let with_extension = keys.iter().filter(|k| k.contains('.')).count();
            prop_assert_eq!(tree.file_count(), with_extension);
        }
    }
}
