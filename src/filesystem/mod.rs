//! In-memory hierarchical filesystem.
//!
//! Nodes live in a [`NodeTree`] arena and are either files (byte content) or
//! directories (children keyed by name). Children refer to their parent by
//! handle only, so the tree owns every node exactly once. [`Filesystem`] is the
//! path based entry point on top of it.

mod filesystem;
mod node;
mod path;
mod tree;

pub use filesystem::{Filesystem, FilesystemError, Metadata, WalkEntry};
pub use node::{Directory, EntryKind, File, Node, NodeId, NodeKind};
pub use path::{Segments, split_path};
pub use tree::{NodeRef, NodeTree, ROOT_NAME, TreeError};
