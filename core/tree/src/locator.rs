//! Re-rooting a built tree at a requested directory.

use tracing::debug;

use crate::builder::Arena;
use crate::node::{directory_path, TreeNode};

/// Outcome of a directory lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// The base directory was requested; the tree is the whole listing.
    Base,
    /// The requested directory exists; the tree is rooted at it.
    Found,
    /// No directory matched; the tree is the unmodified full listing.
    NotFound,
}

/// A tree together with how it was located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub tree: TreeNode,
    pub lookup: Lookup,
}

impl Located {
    pub fn is_not_found(&self) -> bool {
        self.lookup == Lookup::NotFound
    }
}

/// Re-insert every directory at the position its key describes.
///
/// Each directory ends up exactly one level per key segment below the root,
/// duplicates are merged and files follow their directory. Directories whose
/// key does not extend the root key are kept as direct children of the root.
/// Builder output passes through unchanged.
pub fn flatten(tree: &TreeNode) -> TreeNode {
    let mut arena = Arena::new(&tree.key, &tree.title);
    for file in &tree.files {
        arena.push_file(Arena::ROOT, file.clone());
    }

    tree.walk(&mut |node| {
        let dir = match node.key.strip_prefix(tree.key.as_str()) {
            Some(relative) => arena.ensure_path(relative.split('/')),
            None => arena.ensure(Arena::ROOT, node.key.clone(), &node.title),
        };
        for file in &node.files {
            arena.push_file(dir, file.clone());
        }
    });

    arena.into_tree()
}

/// Re-root `tree` at `requested`.
///
/// Both paths are compared with a single trailing `/`. Requesting the base
/// directory yields the whole tree. Otherwise the directories are searched
/// depth first in insertion order and the first exact key match becomes the
/// new root. When nothing matches, the input tree is handed back untouched
/// with `Lookup::NotFound`.
///
/// Applying `reroot` to its own result with the same request is a no-op.
pub fn reroot(tree: TreeNode, requested: &str, base_directory: &str) -> Located {
    let requested = directory_path(requested);
    let flattened = flatten(&tree);

    if requested == directory_path(base_directory) {
        return Located {
            tree: flattened,
            lookup: Lookup::Base,
        };
    }

    if flattened.key == requested {
        return Located {
            tree: flattened,
            lookup: Lookup::Found,
        };
    }

    match flattened.find(&requested) {
        Some(subtree) => {
            debug!(requested = %requested, files = subtree.file_count(), "Directory located");
            Located {
                tree: subtree.clone(),
                lookup: Lookup::Found,
            }
        }
        None => {
            debug!(requested = %requested, root = %tree.key, "Directory not found");
            Located {
                tree,
                lookup: Lookup::NotFound,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TreeBuilder;
    use crate::mime::AllowAll;
    use chrono::Utc;
    use mediabucket_common::ObjectEntry;
    use proptest::prelude::*;

    fn url(key: &str) -> String {
        format!("https://cdn.example.com/{}", key)
    }

    fn build(keys: &[&str]) -> TreeNode {
        let objects: Vec<ObjectEntry> = keys
            .iter()
            .map(|k| ObjectEntry::new(*k, 1, Utc::now()))
            .collect();
        TreeBuilder::new("/bucket/", &url, &AllowAll).build(&objects)
    }

    fn scenario() -> TreeNode {
        build(&["a.txt", "dir1/b.txt", "dir1/dir2/c.txt"])
    }

    #[test]
    fn test_base_request_returns_full_tree() {
        let tree = scenario();
        let located = reroot(tree.clone(), "/bucket/", "/bucket/");
        assert_eq!(located.lookup, Lookup::Base);
        assert_eq!(located.tree, tree);
    }

    #[test]
    fn test_base_request_without_trailing_slash() {
        let located = reroot(scenario(), "/bucket", "/bucket/");
        assert_eq!(located.lookup, Lookup::Base);
    }

    #[test]
    fn test_subdirectory_found() {
        let located = reroot(scenario(), "/bucket/dir1/dir2", "/bucket/");
        assert_eq!(located.lookup, Lookup::Found);
        assert_eq!(located.tree.key, "/bucket/dir1/dir2/");
        assert_eq!(located.tree.files[0].key, "dir1/dir2/c.txt");
    }

    #[test]
    fn test_missing_directory_returns_input() {
        let tree = scenario();
        let located = reroot(tree.clone(), "/bucket/nope/", "/bucket/");
        assert!(located.is_not_found());
        assert_eq!(located.tree, tree);
    }

    #[test]
    fn test_reroot_is_idempotent() {
        for requested in ["/bucket/", "/bucket/dir1/", "/bucket/dir1/dir2/", "/bucket/x/"] {
            let once = reroot(scenario(), requested, "/bucket/");
            let twice = reroot(once.tree.clone(), requested, "/bucket/");
            assert_eq!(once, twice, "request {}", requested);
        }
    }

    #[test]
    fn test_flatten_identity_on_builder_output() {
        let tree = build(&["x/y/z/1.jpg", "x/2.jpg", "w/3.jpg", "x/y/4.jpg"]);
        assert_eq!(flatten(&tree), tree);
    }

    #[test]
    fn test_flatten_lifts_misplaced_directories() {
        // A grandchild hung directly under the root with a deep key
        let mut misplaced = TreeNode::new("/bucket/a/b/", "b");
        misplaced.files.push(scenario().dirs[0].files[0].clone());
        let mut root = TreeNode::new("/bucket/", "/bucket/");
        root.dirs.push(TreeNode::new("/bucket/a/", "a"));
        root.dirs.push(misplaced);

        let flat = flatten(&root);
        assert_eq!(flat.dirs.len(), 1);
        let a = flat.dir("/bucket/a/").unwrap();
        assert_eq!(a.dir("/bucket/a/b/").unwrap().files.len(), 1);
    }

    #[test]
    fn test_flatten_merges_duplicates() {
        let file = scenario().files[0].clone();
        let mut first = TreeNode::new("/bucket/a/", "a");
        first.files.push(file.clone());
        let mut second = TreeNode::new("/bucket/a/", "a");
        second.files.push(file);
        let mut root = TreeNode::new("/bucket/", "/bucket/");
        root.dirs.push(first);
        root.dirs.push(second);

        let flat = flatten(&root);
        assert_eq!(flat.dirs.len(), 1);
        assert_eq!(flat.dirs[0].files.len(), 1);
    }

    #[test]
    fn test_reroot_large_directory() {
        let keys: Vec<String> = (0..20_000).map(|i| format!("big/{:05}.jpg", i)).collect();
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        let tree = build(&keys);

        let located = reroot(tree, "/bucket/big/", "/bucket/");
        assert_eq!(located.lookup, Lookup::Found);
        assert_eq!(located.tree.files.len(), 20_000);
        assert_eq!(located.tree.files[0].key, "big/00000.jpg");
        assert_eq!(located.tree.files[19_999].key, "big/19999.jpg");
    }

    proptest! {
        #[test]
        fn prop_reroot_idempotent(
            keys in prop::collection::btree_set("[a-c](/[a-c]){0,3}\\.txt", 0..20),
            requested in "(/bucket/)([a-c]/){0,3}",
        ) {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            let once = reroot(build(&keys), &requested, "/bucket/");
            let twice = reroot(once.tree.clone(), &requested, "/bucket/");
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_found_tree_is_rooted_at_request(
            keys in prop::collection::btree_set("[a-c](/[a-c]){0,3}\\.txt", 1..20),
            requested in "(/bucket/)([a-c]/){1,3}",
        ) {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            let located = reroot(build(&keys), &requested, "/bucket/");
            if located.lookup == Lookup::Found {
                prop_assert_eq!(located.tree.key, requested);
            } else {
                prop_assert_eq!(located.tree.key, "/bucket/".to_string());
            }
        }
    }
}
