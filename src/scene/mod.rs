//! Scene registry: nodes keyed by stable handles
//!
//! Commands never hold references into the scene. They store [`NodeHandle`]s
//! and look nodes up again every time they run, so a node that was removed and
//! later restored by undo is found under the same identity.

mod handle;
mod node;

pub use handle::NodeHandle;
pub use node::Node;

use crate::error::HistoryError;
use cgmath::{Matrix4, SquareMatrix};
use std::collections::HashMap;

/// Arena of scene nodes plus the root list and the current selection
pub struct Scene {
    nodes: HashMap<NodeHandle, Node>,
    roots: Vec<NodeHandle>,

    /// Selected nodes, most recently selected last
    selection: Vec<NodeHandle>,

    next_handle: u32,
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            roots: Vec::new(),
            selection: Vec::new(),
            next_handle: 1,
        }
    }

    /// Add a node with an identity transform as the last child of `parent`
    /// (or as the last root node).
    ///
    /// # Errors
    /// Returns [`HistoryError::NodeNotFound`] if `parent` does not exist.
    pub fn add_node(
        &mut self,
        parent: Option<NodeHandle>,
        name: impl Into<String>,
    ) -> Result<NodeHandle, HistoryError> {
        if let Some(parent) = parent {
            if !self.contains(parent) {
                return Err(HistoryError::NodeNotFound(parent));
            }
        }

        let handle = self.allocate_handle();
        self.insert_node(Node::new(handle, name.into()), parent, usize::MAX)?;
        self.refresh_world_transforms(handle);
        Ok(handle)
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(&handle)
    }

    pub fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(&handle)
    }

    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.nodes.contains_key(&handle)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeHandle] {
        &self.roots
    }

    /// Children of `parent`, or the root list for `None`
    pub fn children_of(&self, parent: Option<NodeHandle>) -> Option<&[NodeHandle]> {
        match parent {
            None => Some(&self.roots),
            Some(parent) => self.nodes.get(&parent).map(Node::children),
        }
    }

    /// Position of a node within its parent's child list (or the root list)
    pub fn index_in_parent(&self, handle: NodeHandle) -> Option<usize> {
        let node = self.nodes.get(&handle)?;
        self.children_of(node.parent())?
            .iter()
            .position(|&sibling| sibling == handle)
    }

    /// Whether `node` is `ancestor` or lies somewhere below it
    pub fn is_descendant_of(&self, node: NodeHandle, ancestor: NodeHandle) -> bool {
        let mut current = Some(node);
        while let Some(handle) = current {
            if handle == ancestor {
                return true;
            }
            current = self.nodes.get(&handle).and_then(Node::parent);
        }
        false
    }

    /// `handle` followed by all of its descendants, parents before children
    /// and siblings in order
    pub fn subtree(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        let mut ordered = Vec::new();
        let mut pending = vec![handle];
        while let Some(current) = pending.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            ordered.push(current);
            pending.extend(node.children().iter().rev());
        }
        ordered
    }

    pub(crate) fn allocate_handle(&mut self) -> NodeHandle {
        let handle = NodeHandle::from_raw(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn siblings_mut(
        &mut self,
        parent: Option<NodeHandle>,
    ) -> Result<&mut Vec<NodeHandle>, HistoryError> {
        match parent {
            None => Ok(&mut self.roots),
            Some(parent) => self
                .nodes
                .get_mut(&parent)
                .map(Node::children_mut)
                .ok_or(HistoryError::NodeNotFound(parent)),
        }
    }

    /// Insert a detached node under `parent` at `index` (clamped to the
    /// sibling count). The node keeps its own handle; any child links it
    /// carried are dropped.
    pub(crate) fn insert_node(
        &mut self,
        mut node: Node,
        parent: Option<NodeHandle>,
        index: usize,
    ) -> Result<(), HistoryError> {
        let handle = node.handle();
        debug_assert!(handle.is_valid(), "inserting a node with the invalid handle");
        debug_assert!(!self.contains(handle), "handle {} is already live", handle);

        let siblings = self.siblings_mut(parent)?;
        let index = index.min(siblings.len());
        siblings.insert(index, handle);

        node.set_parent(parent);
        node.children_mut().clear();
        self.nodes.insert(handle, node);

        // Restored handles were allocated here before, keep the counter ahead of them
        if handle.raw() >= self.next_handle {
            self.next_handle = handle.raw() + 1;
        }
        Ok(())
    }

    /// Move a node under `new_parent` at `index`, where `index` is counted
    /// after the node has left its old sibling list.
    ///
    /// Returns the index the node actually landed at.
    pub fn move_node(
        &mut self,
        handle: NodeHandle,
        new_parent: Option<NodeHandle>,
        index: usize,
    ) -> Result<usize, HistoryError> {
        if !self.contains(handle) {
            return Err(HistoryError::NodeNotFound(handle));
        }
        if let Some(parent) = new_parent {
            if !self.contains(parent) {
                return Err(HistoryError::NodeNotFound(parent));
            }
            if self.is_descendant_of(parent, handle) {
                return Err(HistoryError::InvalidParent {
                    node: handle,
                    parent,
                });
            }
        }

        self.detach(handle)?;
        self.attach(handle, new_parent, index)
    }

    fn detach(&mut self, handle: NodeHandle) -> Result<(), HistoryError> {
        let parent = self
            .nodes
            .get(&handle)
            .ok_or(HistoryError::NodeNotFound(handle))?
            .parent();
        self.siblings_mut(parent)?.retain(|&sibling| sibling != handle);
        if let Some(node) = self.nodes.get_mut(&handle) {
            node.set_parent(None);
        }
        Ok(())
    }

    fn attach(
        &mut self,
        handle: NodeHandle,
        parent: Option<NodeHandle>,
        index: usize,
    ) -> Result<usize, HistoryError> {
        let siblings = self.siblings_mut(parent)?;
        let index = index.min(siblings.len());
        siblings.insert(index, handle);

        let node = self
            .nodes
            .get_mut(&handle)
            .ok_or(HistoryError::NodeNotFound(handle))?;
        node.set_parent(parent);
        Ok(index)
    }

    /// Remove a childless node from the scene and hand it back
    pub(crate) fn take_node(&mut self, handle: NodeHandle) -> Result<Node, HistoryError> {
        debug_assert!(
            self.node(handle).map_or(true, |node| node.children().is_empty()),
            "children of {} must be moved away before it is removed",
            handle
        );

        self.detach(handle)?;
        self.deselect(handle);
        self.nodes
            .remove(&handle)
            .ok_or(HistoryError::NodeNotFound(handle))
    }

    /// Whether any live node already uses `name`
    pub fn name_in_use(&self, name: &str) -> bool {
        self.nodes.values().any(|node| node.name() == name)
    }

    /// Derive a name no live node uses: `"Cube"` becomes `"Cube.001"`,
    /// `"Cube.001"` becomes `"Cube.002"` and so on.
    pub fn unique_name(&self, name: &str) -> String {
        if !self.name_in_use(name) {
            return name.to_string();
        }

        let stem = match name.rsplit_once('.') {
            Some((stem, suffix))
                if suffix.len() == 3 && suffix.bytes().all(|b| b.is_ascii_digit()) =>
            {
                stem
            }
            _ => name,
        };

        let mut counter = 1u32;
        loop {
            let candidate = format!("{}.{:03}", stem, counter);
            if !self.name_in_use(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    pub fn selection(&self) -> &[NodeHandle] {
        &self.selection
    }

    pub fn is_selected(&self, handle: NodeHandle) -> bool {
        self.selection.contains(&handle)
    }

    /// Replace the selection with a single node
    pub fn select_only(&mut self, handle: NodeHandle) {
        self.selection.clear();
        self.selection.push(handle);
    }

    /// Add a node to the selection
    pub fn select(&mut self, handle: NodeHandle) {
        if !self.is_selected(handle) {
            self.selection.push(handle);
        }
    }

    pub fn deselect(&mut self, handle: NodeHandle) {
        self.selection.retain(|&selected| selected != handle);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Recompute the cached world transform of a node and its whole subtree
    pub fn refresh_world_transforms(&mut self, handle: NodeHandle) {
        let Some(node) = self.nodes.get(&handle) else {
            return;
        };
        let parent_world = node
            .parent()
            .and_then(|parent| self.nodes.get(&parent))
            .map(Node::world_transform)
            .unwrap_or_else(Matrix4::identity);

        let mut pending = vec![(handle, parent_world)];
        while let Some((current, parent_world)) = pending.pop() {
            let Some(node) = self.nodes.get_mut(&current) else {
                continue;
            };
            let world = parent_world * node.local_transform();
            node.set_world_transform(world);
            pending.extend(node.children().iter().map(|&child| (child, world)));
        }
    }

    /// Recompute every cached world transform
    pub fn refresh_all_world_transforms(&mut self) {
        for root in self.roots.clone() {
            self.refresh_world_transforms(root);
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
