use snafu::prelude::*;
use tracing::trace;

use super::node::{Directory, EntryKind, File, Node, NodeId, NodeKind};

/// Name given to the root directory.
pub const ROOT_NAME: &str = "/";

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena that owns every node of a single directory tree.
///
/// Directories hold [`NodeId`] handles to their children and every node holds
/// the handle of its parent. Only the arena owns nodes, so parent handles never
/// keep anything alive and removing a directory frees its whole subtree.
#[derive(Debug, Clone)]
pub struct NodeTree {
    slots: Vec<Slot>,
    free: Vec<usize>,
    root: NodeId,
    live: usize,
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTree {
    pub fn new() -> Self {
        let root = NodeId {
            index: 0,
            generation: 0,
        };
        let root_node = Node::new(ROOT_NAME, None, NodeKind::Directory(Directory::new()));

        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(root_node),
            }],
            free: Vec::new(),
            root,
            live: 1,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 1
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.get(id).map(|node| NodeRef {
            tree: self,
            id,
            node,
        })
    }

    pub fn directory(&self, id: NodeId) -> Option<&Directory> {
        self.get(id).and_then(Node::as_directory)
    }

    pub fn file_mut(&mut self, id: NodeId) -> Option<&mut File> {
        match self.get_mut(id)?.kind_mut() {
            NodeKind::File(file) => Some(file),
            NodeKind::Directory(_) => None,
        }
    }

    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.directory(parent)?.get(name)
    }

    /// Creates a node named `name` inside the directory `parent`.
    ///
    /// Fails instead of replacing an existing entry of the same name.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: &str,
        kind: NodeKind,
    ) -> Result<NodeId, TreeError> {
        ensure!(
            !name.is_empty() && !name.contains('/'),
            InvalidNameSnafu { name }
        );
        let directory = self
            .get(parent)
            .context(StaleHandleSnafu { id: parent })?
            .as_directory()
            .context(NotADirectorySnafu { id: parent })?;
        ensure!(!directory.exists(name), DuplicateNameSnafu { name });

        let id = self.allocate(Node::new(name, Some(parent), kind));
        if let Some(NodeKind::Directory(directory)) = self.get_mut(parent).map(Node::kind_mut) {
            directory.insert(name.to_string(), id);
        }
        trace!("Added node {} '{}' under {}", id, name, parent);

        Ok(id)
    }

    /// Detaches `name` from the directory `parent` and frees its subtree.
    pub fn remove_child(&mut self, parent: NodeId, name: &str) -> Result<(), TreeError> {
        let node = self.get_mut(parent).context(StaleHandleSnafu { id: parent })?;
        let NodeKind::Directory(directory) = node.kind_mut() else {
            return NotADirectorySnafu { id: parent }.fail();
        };
        let id = directory.take(name).context(NoSuchEntrySnafu { name })?;

        let freed = self.free_subtree(id);
        trace!("Removed '{}' from {}, freed {} nodes", name, parent, freed);

        Ok(())
    }

    /// Total content size of the subtree rooted at `id`.
    pub fn size(&self, id: NodeId) -> Option<usize> {
        self.get(id)?;

        let mut total = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match self.get(current).map(Node::kind) {
                Some(NodeKind::File(file)) => total += file.size(),
                Some(NodeKind::Directory(directory)) => stack.extend(directory.ids()),
                None => {}
            }
        }

        Some(total)
    }

    /// Absolute path of a live node, rebuilt from its parent handles.
    pub fn path_of(&self, id: NodeId) -> Option<String> {
        let mut names = Vec::new();
        let mut current = self.get(id)?;
        while let Some(parent) = current.parent() {
            names.push(current.name());
            current = self.get(parent)?;
        }

        names.reverse();
        Some(format!("/{}", names.join("/")))
    }

    fn allocate(&mut self, node: Node) -> NodeId {
        self.live += 1;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    /// Frees `id` and all of its descendants, children before their parents.
    fn free_subtree(&mut self, id: NodeId) -> usize {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(directory) = self.directory(current) {
                stack.extend(directory.ids());
            }
            order.push(current);
        }

        // Pre-order puts every directory ahead of its descendants.
        for current in order.iter().rev() {
            if let Some(slot) = self.slots.get_mut(current.index) {
                slot.node = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(current.index);
                self.live -= 1;
            }
        }

        order.len()
    }
}

/// Borrowed view of a live node together with the tree it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a NodeTree,
    id: NodeId,
    node: &'a Node,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &'a str {
        self.node.name()
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.tree.node(self.node.parent()?)
    }

    pub fn is_directory(&self) -> bool {
        self.node.is_directory()
    }

    pub fn entry_kind(&self) -> EntryKind {
        self.node.entry_kind()
    }

    pub fn size(&self) -> usize {
        self.tree.size(self.id).unwrap_or_default()
    }

    pub fn path(&self) -> String {
        self.tree.path_of(self.id).unwrap_or_default()
    }

    pub fn as_file(&self) -> Option<&'a File> {
        self.node.as_file()
    }

    pub fn as_directory(&self) -> Option<&'a Directory> {
        self.node.as_directory()
    }
}

#[derive(Debug, Snafu)]
pub enum TreeError {
    #[snafu(display("Node {} no longer exists", id))]
    StaleHandle { id: NodeId },
    #[snafu(display("Node {} is not a directory", id))]
    NotADirectory { id: NodeId },
    #[snafu(display("An entry named '{}' already exists", name))]
    DuplicateName { name: String },
    #[snafu(display("No entry named '{}'", name))]
    NoSuchEntry { name: String },
    #[snafu(display("'{}' is not a valid entry name", name))]
    InvalidName { name: String },
}
