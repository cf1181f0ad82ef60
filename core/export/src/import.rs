//! Planning imports of listed objects.

use serde::{Deserialize, Serialize};

use mediabucket_tree::{FileEntry, TreeNode};

/// One object to import as an external reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportItem {
    pub url: String,
    pub title: String,
    pub mime_type: String,
    pub size: u64,
}

impl From<&FileEntry> for ImportItem {
    fn from(file: &FileEntry) -> Self {
        Self {
            url: file.url.clone(),
            title: file.title.clone(),
            mime_type: file.mime_type.clone(),
            size: file.size,
        }
    }
}

/// Files of a located directory, in tree order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportPlan {
    /// Key of the directory the plan was made for.
    pub directory: String,
    pub items: Vec<ImportItem>,
}

impl ImportPlan {
    /// Collect the files of `tree`, with or without its sub-directories.
    pub fn from_tree(tree: &TreeNode, recursive: bool) -> Self {
        let items = if recursive {
            tree.all_files().into_iter().map(ImportItem::from).collect()
        } else {
            tree.files.iter().map(ImportItem::from).collect()
        };

        Self {
            directory: tree.key.clone(),
            items,
        }
    }

    /// Split the plan into batches of at most `limit` items.
    ///
    /// A limit of zero is treated as one.
    pub fn batches(&self, limit: usize) -> impl Iterator<Item = &[ImportItem]> + '_ {
        self.items.chunks(limit.max(1))
    }

    pub fn urls(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.url.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.items.iter().map(|item| item.size).sum()
    }
}
