//! Structural node edits that compute their own inverse
//!
//! Removing a node cannot be undone by diffing: the node is gone, and its
//! children have moved. These commands record exactly what they did, keyed
//! on [`NodeHandle`]s, and hand back the command that puts it back.

use super::command::{Command, CommandFlags, CommandGroup};
use crate::document::Document;
use crate::error::HistoryError;
use crate::scene::{Node, NodeHandle, Scene};
use std::collections::HashMap;

/// Insert a copy of a node.
///
/// As a user edit this duplicates a node and its whole subtree next to the
/// original, every copy under a fresh handle and unique name. As the inverse
/// of [`RemoveNode`] it restores the removed node under its original handle
/// and takes back the children that were handed to its parent.
pub struct DuplicateNode {
    pub(crate) flags: CommandFlags,
    handle: NodeHandle,
    parent: Option<NodeHandle>,
    insert_index: usize,
    node: Node,

    /// Copies of the target's descendants, parents first, each with the slot
    /// of its parent (0 is the copied target, `k` is `descendants[k - 1]`)
    descendants: Vec<(Node, usize)>,

    /// `(child, index)` pairs to re-attach under the inserted node
    children: Vec<(NodeHandle, usize)>,
    is_restore: bool,
}

impl DuplicateNode {
    /// Duplicate `target` into its own parent at `insert_index`
    pub fn new(scene: &Scene, target: NodeHandle, insert_index: usize) -> Result<Self, HistoryError> {
        let node = scene
            .node(target)
            .ok_or(HistoryError::NodeNotFound(target))?;

        let mut slots = HashMap::from([(target, 0)]);
        let mut descendants = Vec::new();
        for handle in scene.subtree(target).into_iter().skip(1) {
            let Some(descendant) = scene.node(handle) else {
                continue;
            };
            let parent_slot = descendant
                .parent()
                .and_then(|parent| slots.get(&parent).copied())
                .unwrap_or(0);
            slots.insert(handle, descendants.len() + 1);
            descendants.push((descendant.clone(), parent_slot));
        }

        Ok(Self {
            flags: CommandFlags::default(),
            handle: target,
            parent: node.parent(),
            insert_index,
            node: node.clone(),
            descendants,
            children: Vec::new(),
            is_restore: false,
        })
    }

    /// Duplicate `target` directly after itself
    pub fn after(scene: &Scene, target: NodeHandle) -> Result<Self, HistoryError> {
        let index = scene
            .index_in_parent(target)
            .ok_or(HistoryError::NodeNotFound(target))?;
        Self::new(scene, target, index + 1)
    }

    fn restore(
        node: Node,
        parent: Option<NodeHandle>,
        insert_index: usize,
        children: Vec<(NodeHandle, usize)>,
    ) -> Self {
        Self {
            flags: CommandFlags::default(),
            handle: node.handle(),
            parent,
            insert_index,
            node,
            descendants: Vec::new(),
            children,
            is_restore: true,
        }
    }

    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    pub fn is_restore(&self) -> bool {
        self.is_restore
    }

    /// Children that will be moved under the inserted node
    pub fn children(&self) -> &[(NodeHandle, usize)] {
        &self.children
    }

    /// Number of descendants copied along with the target
    pub fn descendant_count(&self) -> usize {
        self.descendants.len()
    }

    pub(crate) fn exec(self, doc: &mut Document) -> Result<Command, HistoryError> {
        let scene = &mut doc.scene;

        if let Some(parent) = self.parent {
            if !scene.contains(parent) {
                log::error!("Cannot insert node: parent {} no longer exists", parent);
                return Err(HistoryError::NodeNotFound(parent));
            }
        }
        for &(child, _) in &self.children {
            if !scene.contains(child) {
                log::error!("Cannot restore node: child {} no longer exists", child);
                return Err(HistoryError::NodeNotFound(child));
            }
            if let Some(parent) = self.parent {
                if scene.is_descendant_of(parent, child) {
                    log::error!("Cannot restore node: {} now lies under child {}", parent, child);
                    return Err(HistoryError::InvalidParent {
                        node: child,
                        parent,
                    });
                }
            }
        }

        let mut node = self.node;
        let handle = if self.is_restore {
            self.handle
        } else {
            let handle = scene.allocate_handle();
            let name = scene.unique_name(node.name());
            node.set_name(name);
            handle
        };
        node.set_handle(handle);

        scene.insert_node(node, self.parent, self.insert_index)?;

        let mut copies = vec![handle];
        for (mut descendant, parent_slot) in self.descendants {
            let copy = scene.allocate_handle();
            let name = scene.unique_name(descendant.name());
            descendant.set_name(name);
            descendant.set_handle(copy);
            scene.insert_node(descendant, Some(copies[parent_slot]), usize::MAX)?;
            copies.push(copy);
        }

        let mut children = self.children;
        children.sort_by_key(|&(_, index)| index);
        for (child, index) in children {
            scene.move_node(child, Some(handle), index)?;
        }

        scene.select_only(handle);
        log::debug!(
            "{} node {} under {:?} ({} descendants copied)",
            if self.is_restore { "Restored" } else { "Duplicated" },
            handle,
            self.parent,
            copies.len() - 1
        );

        if copies.len() == 1 {
            return Ok(Command::RemoveNode(RemoveNode::new(handle)));
        }

        // Leaves first, so every copy is childless by the time it goes
        let mut removal = CommandGroup::new();
        for &copy in copies.iter().rev() {
            removal.add_command(RemoveNode::new(copy));
        }
        Ok(Command::Group(removal))
    }
}

/// Delete a node, handing its children to its parent at its own position
pub struct RemoveNode {
    pub(crate) flags: CommandFlags,
    handle: NodeHandle,
}

impl RemoveNode {
    pub fn new(target: NodeHandle) -> Self {
        Self {
            flags: CommandFlags::default(),
            handle: target,
        }
    }

    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    pub(crate) fn exec(self, doc: &mut Document) -> Result<Command, HistoryError> {
        let scene = &mut doc.scene;

        let Some(node) = scene.node(self.handle) else {
            log::error!("Cannot remove node {}: not in the scene", self.handle);
            return Err(HistoryError::NodeNotFound(self.handle));
        };
        let parent = node.parent();
        let children = node.children().to_vec();
        let index = scene
            .index_in_parent(self.handle)
            .ok_or(HistoryError::NodeNotFound(self.handle))?;

        // Children take the removed node's slot, keeping their order
        let mut reattach = Vec::with_capacity(children.len());
        for (offset, child) in children.into_iter().enumerate() {
            scene.move_node(child, parent, index + offset)?;
            reattach.push((child, offset));
        }

        let node = scene.take_node(self.handle)?;
        log::debug!(
            "Removed node {} ({} children moved up)",
            self.handle,
            reattach.len()
        );

        Ok(Command::DuplicateNode(DuplicateNode::restore(
            node, parent, index, reattach,
        )))
    }
}

/// Move a node to another parent or another position among its siblings
pub struct ReparentNode {
    pub(crate) flags: CommandFlags,
    handle: NodeHandle,
    from: (Option<NodeHandle>, usize),
    to: (Option<NodeHandle>, usize),
}

impl ReparentNode {
    /// Move `target` under `new_parent` (`None` for the root list) at
    /// `index`, counted after `target` has left its current siblings.
    pub fn new(
        scene: &Scene,
        target: NodeHandle,
        new_parent: Option<NodeHandle>,
        index: usize,
    ) -> Result<Self, HistoryError> {
        let node = scene
            .node(target)
            .ok_or(HistoryError::NodeNotFound(target))?;
        let old_index = scene
            .index_in_parent(target)
            .ok_or(HistoryError::NodeNotFound(target))?;

        Ok(Self {
            flags: CommandFlags::default(),
            handle: target,
            from: (node.parent(), old_index),
            to: (new_parent, index),
        })
    }

    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    pub(crate) fn contains_changes(&self) -> bool {
        self.from != self.to
    }

    pub(crate) fn exec(self, doc: &mut Document) -> Result<Command, HistoryError> {
        let (parent, index) = self.to;
        let landed = doc
            .scene
            .move_node(self.handle, parent, index)
            .inspect_err(|e| log::error!("Cannot reparent node {}: {}", self.handle, e))?;

        Ok(Command::ReparentNode(ReparentNode {
            flags: CommandFlags::default(),
            handle: self.handle,
            from: (parent, landed),
            to: self.from,
        }))
    }

    pub(crate) fn on_commit_transaction(&self, doc: &mut Document) {
        doc.scene.refresh_world_transforms(self.handle);
    }
}
