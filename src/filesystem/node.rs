use std::collections::HashMap;

use derive_more::Display;

/// Handle to a node stored in a [`NodeTree`](super::NodeTree).
///
/// A handle stays valid for as long as the node it was issued for is alive.
/// Once the node is removed its slot may be reused, but the generation is
/// bumped so the old handle resolves to nothing instead of the new occupant.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display("#{index}.{generation}")]
pub struct NodeId {
    pub(super) index: usize,
    pub(super) generation: u32,
}

/// Discriminant of a [`NodeKind`], used in listings and metadata.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    #[display("file")]
    File,
    #[display("dir")]
    Directory,
}

/// A single entry of the tree: shared identity plus a kind specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    name: String,
    parent: Option<NodeId>,
    kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    File(File),
    Directory(Directory),
}

impl Node {
    pub(super) fn new(name: impl Into<String>, parent: Option<NodeId>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            parent,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Containing directory, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub(super) fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    pub fn entry_kind(&self) -> EntryKind {
        match self.kind {
            NodeKind::File(_) => EntryKind::File,
            NodeKind::Directory(_) => EntryKind::Directory,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory(_))
    }

    pub fn as_file(&self) -> Option<&File> {
        match &self.kind {
            NodeKind::File(file) => Some(file),
            NodeKind::Directory(_) => None,
        }
    }

    pub fn as_directory(&self) -> Option<&Directory> {
        match &self.kind {
            NodeKind::Directory(directory) => Some(directory),
            NodeKind::File(_) => None,
        }
    }
}

/// Leaf payload. Writes always append to the existing content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct File {
    content: Vec<u8>,
}

impl File {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn read(&self) -> &[u8] {
        &self.content
    }

    pub fn write(&mut self, data: &[u8]) {
        self.content.extend_from_slice(data);
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Composite payload: child handles keyed by name.
///
/// Operations that need to look at the children themselves (adding, removing,
/// size aggregation) live on [`NodeTree`](super::NodeTree), which owns them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    children: HashMap<String, NodeId>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.children.get(name).copied()
    }

    /// Child names in lexicographic order.
    pub fn list(&self) -> Vec<String> {
        let mut names = self.children.keys().cloned().collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    /// Children sorted by name.
    pub fn entries(&self) -> Vec<(&str, NodeId)> {
        let mut entries = self
            .children
            .iter()
            .map(|(name, id)| (name.as_str(), *id))
            .collect::<Vec<_>>();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub(super) fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.values().copied()
    }

    pub(super) fn insert(&mut self, name: String, id: NodeId) {
        self.children.insert(name, id);
    }

    pub(super) fn take(&mut self, name: &str) -> Option<NodeId> {
        self.children.remove(name)
    }
}
