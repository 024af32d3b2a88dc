use snafu::prelude::*;
use tracing::{debug, trace};

use super::node::{Directory, EntryKind, File, Node, NodeId, NodeKind};
use super::path::Segments;
use super::tree::{NodeRef, NodeTree, TreeError};

/// Path based facade over a [`NodeTree`].
///
/// Every operation resolves its path from the root, so no handle into the
/// tree survives between calls. Resolution always finishes before anything is
/// mutated: a failed operation leaves the tree exactly as it was.
///
/// Policies:
/// - [`Filesystem::mkdir`] creates missing intermediate directories,
///   [`Filesystem::create_dir`] does not.
/// - [`Filesystem::write_file`] appends to the existing content.
/// - [`Filesystem::list`] only lists directories.
#[derive(Debug, Clone, Default)]
pub struct Filesystem {
    tree: NodeTree,
}

/// Snapshot of a single entry, as returned by [`Filesystem::stat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    pub size: usize,
    /// Name of the containing directory, `None` for the root.
    pub parent: Option<String>,
}

/// One entry produced by [`Filesystem::walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    pub size: usize,
    /// 1 for direct children of the walked directory.
    pub depth: usize,
}

impl Filesystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    /// Resolves `path` to the node it names.
    pub fn lookup(&self, path: &str) -> Result<NodeRef<'_>, FilesystemError> {
        let segments = Self::segments(path)?;
        let id = self.resolve(&segments)?;
        self.tree.node(id).context(NotFoundSnafu {
            path: segments.canonical(),
        })
    }

    /// Resolves the directory that contains, or would contain, `path`.
    pub fn lookup_parent(&self, path: &str) -> Result<NodeRef<'_>, FilesystemError> {
        let segments = Self::segments(path)?;
        let id = self.resolve_parent(&segments)?;
        self.tree.node(id).context(NotFoundSnafu {
            path: segments.prefix(segments.len().saturating_sub(1)),
        })
    }

    /// Creates the directory at `path` along with any missing parents.
    pub fn mkdir(&mut self, path: &str) -> Result<(), FilesystemError> {
        let segments = Self::segments(path)?;

        let mut current = self.tree.root();
        let mut existing = 0;
        for (index, name) in segments.iter().enumerate() {
            let Some(next) = self.tree.child(current, name) else {
                break;
            };
            let is_last = index + 1 == segments.len();
            ensure!(
                is_last || self.is_directory(next),
                NotADirectorySnafu {
                    path: segments.prefix(index + 1)
                }
            );
            current = next;
            existing = index + 1;
        }
        ensure!(
            existing < segments.len(),
            AlreadyExistsSnafu {
                path: segments.canonical()
            }
        );

        for name in &segments[existing..] {
            current = self
                .tree
                .add_child(current, name, NodeKind::Directory(Directory::new()))
                .context(TreeSnafu)?;
        }
        debug!(
            "Created directory {} ({} new)",
            segments.canonical(),
            segments.len() - existing
        );

        Ok(())
    }

    /// Creates the directory at `path`; its parent must already exist.
    pub fn create_dir(&mut self, path: &str) -> Result<(), FilesystemError> {
        let segments = Self::segments(path)?;
        let (parent, name) = self.resolve_vacant(&segments)?;

        self.tree
            .add_child(parent, name, NodeKind::Directory(Directory::new()))
            .context(TreeSnafu)?;
        debug!("Created directory {}", segments.canonical());

        Ok(())
    }

    /// Creates a file at `path` holding `content`; its parent must already exist.
    pub fn create_file(
        &mut self,
        path: &str,
        content: impl AsRef<[u8]>,
    ) -> Result<(), FilesystemError> {
        let segments = Self::segments(path)?;
        let (parent, name) = self.resolve_vacant(&segments)?;
        let content = content.as_ref();

        self.tree
            .add_child(parent, name, NodeKind::File(File::with_content(content)))
            .context(TreeSnafu)?;
        debug!(
            "Created file {} ({} bytes)",
            segments.canonical(),
            content.len()
        );

        Ok(())
    }

    /// Appends `data` to the file at `path`.
    pub fn write_file(
        &mut self,
        path: &str,
        data: impl AsRef<[u8]>,
    ) -> Result<(), FilesystemError> {
        let segments = Self::segments(path)?;
        let id = self.resolve_file(&segments)?;
        let data = data.as_ref();

        self.tree
            .file_mut(id)
            .context(NotFoundSnafu {
                path: segments.canonical(),
            })?
            .write(data);
        trace!("Appended {} bytes to {}", data.len(), segments);

        Ok(())
    }

    pub fn read_file(&self, path: &str) -> Result<&[u8], FilesystemError> {
        let segments = Self::segments(path)?;
        let id = self.resolve_file(&segments)?;

        self.tree
            .get(id)
            .and_then(Node::as_file)
            .map(File::read)
            .context(NotFoundSnafu {
                path: segments.canonical(),
            })
    }

    /// Sorted names of the entries of the directory at `path`.
    pub fn list(&self, path: &str) -> Result<Vec<String>, FilesystemError> {
        let segments = Self::segments(path)?;
        let id = self.resolve(&segments)?;

        let directory = self.tree.directory(id).context(NotADirectorySnafu {
            path: segments.canonical(),
        })?;
        Ok(directory.list())
    }

    /// Removes the file or directory at `path`, including everything below it.
    pub fn delete(&mut self, path: &str) -> Result<(), FilesystemError> {
        let segments = Self::segments(path)?;
        let Some(name) = segments.last() else {
            return InvalidPathSnafu {
                path,
                reason: "the root directory cannot be deleted",
            }
            .fail();
        };
        let parent = self.resolve_parent(&segments)?;
        ensure!(
            self.tree.child(parent, name).is_some(),
            NotFoundSnafu {
                path: segments.canonical()
            }
        );

        self.tree.remove_child(parent, name).context(TreeSnafu)?;
        debug!("Deleted {}", segments.canonical());

        Ok(())
    }

    /// Content size of the file, or total size of the directory, at `path`.
    pub fn size(&self, path: &str) -> Result<usize, FilesystemError> {
        let segments = Self::segments(path)?;
        let id = self.resolve(&segments)?;

        self.tree.size(id).context(NotFoundSnafu {
            path: segments.canonical(),
        })
    }

    pub fn exists(&self, path: &str) -> bool {
        Self::segments(path)
            .and_then(|segments| self.resolve(&segments))
            .is_ok()
    }

    pub fn stat(&self, path: &str) -> Result<Metadata, FilesystemError> {
        let node = self.lookup(path)?;

        Ok(Metadata {
            name: node.name().to_string(),
            path: node.path(),
            kind: node.entry_kind(),
            size: node.size(),
            parent: node.parent().map(|parent| parent.name().to_string()),
        })
    }

    /// Every entry below the directory at `path`, depth first with siblings
    /// in name order. The directory itself is not included.
    pub fn walk(&self, path: &str) -> Result<Vec<WalkEntry>, FilesystemError> {
        let segments = Self::segments(path)?;
        let id = self.resolve(&segments)?;
        let start = segments.canonical();
        ensure!(
            self.is_directory(id),
            NotADirectorySnafu { path: start.clone() }
        );

        let base = if segments.is_root() { String::new() } else { start };
        let mut entries = Vec::new();
        let mut stack = Vec::new();
        self.push_children(&mut stack, id, &base, 1);
        while let Some((current, path, depth)) = stack.pop() {
            let Some(node) = self.tree.node(current) else {
                continue;
            };
            entries.push(WalkEntry {
                name: node.name().to_string(),
                path: path.clone(),
                kind: node.entry_kind(),
                size: node.size(),
                depth,
            });
            self.push_children(&mut stack, current, &path, depth + 1);
        }

        Ok(entries)
    }

    /// Absolute paths of every entry called `name`, in walk order.
    pub fn find(&self, name: &str) -> Vec<String> {
        self.walk("/")
            .unwrap_or_default()
            .into_iter()
            .filter(|entry| entry.name == name)
            .map(|entry| entry.path)
            .collect()
    }

    /// Queues the children of `id` so that the smallest name is popped first.
    fn push_children(
        &self,
        stack: &mut Vec<(NodeId, String, usize)>,
        id: NodeId,
        prefix: &str,
        depth: usize,
    ) {
        if let Some(directory) = self.tree.directory(id) {
            for (name, child) in directory.entries().into_iter().rev() {
                stack.push((child, format!("{prefix}/{name}"), depth));
            }
        }
    }

    fn segments(path: &str) -> Result<Segments<'_>, FilesystemError> {
        let segments = Segments::parse(path);
        if let Some(segment) = segments.first_invalid() {
            return InvalidPathSnafu {
                path,
                reason: format!("'{segment}' is not allowed as a path segment"),
            }
            .fail();
        }
        Ok(segments)
    }

    fn is_directory(&self, id: NodeId) -> bool {
        self.tree.directory(id).is_some()
    }

    /// Walks every segment but the last, each of which must be a directory.
    fn resolve_parent(&self, segments: &Segments<'_>) -> Result<NodeId, FilesystemError> {
        let mut current = self.tree.root();
        for (index, name) in segments.parent().iter().enumerate() {
            let next = self.tree.child(current, name).context(NotFoundSnafu {
                path: segments.prefix(index + 1),
            })?;
            ensure!(
                self.is_directory(next),
                NotADirectorySnafu {
                    path: segments.prefix(index + 1)
                }
            );
            current = next;
        }
        Ok(current)
    }

    fn resolve(&self, segments: &Segments<'_>) -> Result<NodeId, FilesystemError> {
        let parent = self.resolve_parent(segments)?;
        match segments.last() {
            Some(name) => self.tree.child(parent, name).context(NotFoundSnafu {
                path: segments.canonical(),
            }),
            None => Ok(parent),
        }
    }

    /// Resolves a path that must name an existing file.
    fn resolve_file(&self, segments: &Segments<'_>) -> Result<NodeId, FilesystemError> {
        let id = self.resolve(segments)?;
        ensure!(
            !self.is_directory(id),
            NotFoundSnafu {
                path: segments.canonical()
            }
        );
        Ok(id)
    }

    /// Resolves the parent of a path whose final segment must still be free.
    fn resolve_vacant<'p>(
        &self,
        segments: &Segments<'p>,
    ) -> Result<(NodeId, &'p str), FilesystemError> {
        let name = segments.last().context(AlreadyExistsSnafu { path: "/" })?;
        let parent = self.resolve_parent(segments)?;
        ensure!(
            self.tree.child(parent, name).is_none(),
            AlreadyExistsSnafu {
                path: segments.canonical()
            }
        );
        Ok((parent, name))
    }
}

#[derive(Debug, Snafu)]
pub enum FilesystemError {
    #[snafu(display("No such file or directory: {}", path))]
    NotFound { path: String },
    #[snafu(display("Not a directory: {}", path))]
    NotADirectory { path: String },
    #[snafu(display("Already exists: {}", path))]
    AlreadyExists { path: String },
    #[snafu(display("Invalid path '{}': {}", path, reason))]
    InvalidPath { path: String, reason: String },
    #[snafu(display("Filesystem tree rejected the operation"))]
    Tree { source: TreeError },
}
