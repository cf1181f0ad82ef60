//! Directory tree engine for mediabucket.
//!
//! Turns the flat key listing of a bucket into a navigable folder tree
//! and re-roots that tree at a requested sub-directory.

pub mod builder;
pub mod locator;
pub mod mime;
pub mod node;

pub use builder::TreeBuilder;
pub use locator::{reroot, Located, Lookup};
pub use mime::{icon_for_mime, mime_for_name, AllowAll, AllowList, Icon, MimeFilter};
pub use node::{directory_path, FileEntry, TreeNode};
