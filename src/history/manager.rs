//! Undo/redo stacks and the commit protocol

use super::command::Command;
use super::snapshot::Snapshot;
use crate::document::Document;
use crate::error::HistoryError;
use crate::settings::HistorySettings;

/// Linear undo/redo history of committed commands.
///
/// The stacks hold inverses: every entry on the undo stack is the command
/// that reverts one committed edit, and every entry on the redo stack is the
/// command that re-applies one undone edit.
pub struct UndoRedoManager {
    /// Commands that revert committed edits, most recent last
    undo_stack: Vec<Command>,

    /// Commands that re-apply undone edits, most recent last
    redo_stack: Vec<Command>,

    max_undo_steps: usize,
}

impl UndoRedoManager {
    /// Create an empty history with the default depth limit
    pub fn new() -> Self {
        Self::with_settings(&HistorySettings::default())
    }

    pub fn with_settings(settings: &HistorySettings) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_undo_steps: settings.max_undo_steps.max(1),
        }
    }

    /// Commit a snapshot taken before an edit that has since been applied.
    ///
    /// Snapshots without changes are dropped. Otherwise the snapshot absorbs
    /// the undo-stack top if that is a mergeable snapshot of the same target,
    /// so a whole drag ends up as one undo step.
    pub fn commit_snapshot(&mut self, doc: &mut Document, snapshot: Snapshot) -> bool {
        if !snapshot.contains_changes(doc) {
            log::debug!("Discarding snapshot of {:?}: no changes", snapshot.target());
            return false;
        }

        let mut command = Command::Snapshot(snapshot);
        if let Some(top) = self.undo_stack.last_mut() {
            if command.merge(top) {
                log::debug!("Merged snapshot into previous undo step");
                self.undo_stack.pop();
            }
        }

        let breaks_history = command.should_break_history();
        self.push_committed(doc, command, breaks_history);
        true
    }

    /// Execute an action command and record its inverse.
    ///
    /// Returns `Ok(false)` for commands that would not change anything.
    pub fn commit_command(
        &mut self,
        doc: &mut Document,
        command: impl Into<Command>,
    ) -> Result<bool, HistoryError> {
        let command = command.into();
        if let Command::Group(group) = &command {
            if group.is_empty() {
                return Ok(false);
            }
        }
        if !command.contains_changes(doc) {
            log::debug!("Discarding {} command: no changes", command.name());
            return Ok(false);
        }

        let name = command.name();
        let breaks_history = command.should_break_history();
        let inverse = command
            .exec(doc)
            .inspect_err(|e| log::error!("Failed to execute {} command: {}", name, e))?;

        log::debug!("Committed {} command", name);
        self.push_committed(doc, inverse, breaks_history);
        Ok(true)
    }

    fn push_committed(&mut self, doc: &mut Document, command: Command, breaks_history: bool) {
        command.on_commit_transaction(doc);

        if breaks_history {
            log::info!(
                "Clearing {} undo steps: committed edit breaks history",
                self.undo_stack.len()
            );
            self.undo_stack.clear();
        }

        self.undo_stack.push(command);
        if self.undo_stack.len() > self.max_undo_steps {
            let excess = self.undo_stack.len() - self.max_undo_steps;
            self.undo_stack.drain(..excess);
        }

        self.redo_stack.clear();
    }

    /// Revert the most recent committed edit.
    ///
    /// # Errors
    /// [`HistoryError::NothingToUndo`] if the undo stack is empty; callers
    /// should check [`has_undo_commands`](Self::has_undo_commands) first.
    pub fn undo(&mut self, doc: &mut Document) -> Result<(), HistoryError> {
        let command = self.undo_stack.pop().ok_or(HistoryError::NothingToUndo)?;
        let name = command.name();
        let mut redo = command
            .exec(doc)
            .inspect_err(|e| log::error!("Failed to undo {} command: {}", name, e))?;

        redo.set_allow_merging(false);
        redo.on_commit_transaction(doc);
        self.redo_stack.push(redo);
        log::debug!("Undid {} command", name);
        Ok(())
    }

    /// Re-apply the most recently undone edit.
    ///
    /// # Errors
    /// [`HistoryError::NothingToRedo`] if the redo stack is empty.
    pub fn redo(&mut self, doc: &mut Document) -> Result<(), HistoryError> {
        let command = self.redo_stack.pop().ok_or(HistoryError::NothingToRedo)?;
        let name = command.name();
        let mut undo = command
            .exec(doc)
            .inspect_err(|e| log::error!("Failed to redo {} command: {}", name, e))?;

        undo.set_allow_merging(false);
        undo.on_commit_transaction(doc);
        self.undo_stack.push(undo);
        log::debug!("Redid {} command", name);
        Ok(())
    }

    /// Stop later snapshots from merging into the current undo step, e.g. at
    /// the end of a drag gesture.
    pub fn set_merge_fence(&mut self) {
        if let Some(top) = self.undo_stack.last_mut() {
            top.set_allow_merging(false);
        }
    }

    pub fn has_undo_commands(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn has_redo_commands(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for UndoRedoManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{CommandGroup, RemoveNode, ReparentNode};
    use crate::scene::NodeHandle;
    use cgmath::Point3;

    fn setup() -> (UndoRedoManager, Document, NodeHandle) {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut doc = Document::default();
        let node = doc.scene.add_node(None, "Cube").unwrap();
        (UndoRedoManager::new(), doc, node)
    }

    fn x_of(doc: &Document, node: NodeHandle) -> f32 {
        doc.scene.node(node).unwrap().position().x
    }

    /// Snapshot, move the node to `x`, commit
    fn translate(manager: &mut UndoRedoManager, doc: &mut Document, node: NodeHandle, x: f32) -> bool {
        let snapshot = Snapshot::capture_node(&doc.scene, node).unwrap();
        doc.scene
            .node_mut(node)
            .unwrap()
            .set_position(Point3::new(x, 0.0, 0.0));
        manager.commit_snapshot(doc, snapshot)
    }

    #[test]
    fn test_translate_undo_redo() {
        let (mut manager, mut doc, node) = setup();

        assert!(translate(&mut manager, &mut doc, node, 1.0));
        assert_eq!(
            doc.scene.node(node).unwrap().position(),
            Point3::new(1.0, 0.0, 0.0)
        );

        manager.undo(&mut doc).unwrap();
        assert_eq!(
            doc.scene.node(node).unwrap().position(),
            Point3::new(0.0, 0.0, 0.0)
        );

        manager.redo(&mut doc).unwrap();
        assert_eq!(
            doc.scene.node(node).unwrap().position(),
            Point3::new(1.0, 0.0, 0.0)
        );
    }

    #[test]
    fn test_commit_refreshes_world_transform() {
        let (mut manager, mut doc, node) = setup();
        translate(&mut manager, &mut doc, node, 3.0);
        assert_eq!(doc.scene.node(node).unwrap().world_transform().w.x, 3.0);

        manager.undo(&mut doc).unwrap();
        assert_eq!(doc.scene.node(node).unwrap().world_transform().w.x, 0.0);
    }

    #[test]
    fn test_undo_redo_symmetry() {
        let (mut manager, mut doc, node) = setup();
        let other = doc.scene.add_node(None, "Sphere").unwrap();

        for step in 1..=4 {
            let target = if step % 2 == 0 { node } else { other };
            assert!(translate(&mut manager, &mut doc, target, step as f32));
            manager.set_merge_fence();
        }
        assert_eq!(manager.undo_count(), 4);
        let final_positions = (x_of(&doc, node), x_of(&doc, other));

        while manager.has_undo_commands() {
            manager.undo(&mut doc).unwrap();
        }
        assert_eq!((x_of(&doc, node), x_of(&doc, other)), (0.0, 0.0));
        assert_eq!(manager.redo_count(), 4);

        while manager.has_redo_commands() {
            manager.redo(&mut doc).unwrap();
        }
        assert_eq!((x_of(&doc, node), x_of(&doc, other)), final_positions);
        assert_eq!(manager.undo_count(), 4);
        assert_eq!(manager.redo_count(), 0);
    }

    #[test]
    fn test_commit_clears_redo() {
        let (mut manager, mut doc, node) = setup();
        translate(&mut manager, &mut doc, node, 1.0);
        manager.undo(&mut doc).unwrap();
        assert!(manager.has_redo_commands());

        translate(&mut manager, &mut doc, node, 2.0);
        assert!(!manager.has_redo_commands());

        manager.undo(&mut doc).unwrap();
        let other = doc.scene.add_node(None, "Other").unwrap();
        assert!(manager
            .commit_command(&mut doc, RemoveNode::new(other))
            .unwrap());
        assert!(!manager.has_redo_commands());
    }

    #[test]
    fn test_snapshot_without_changes_is_discarded() {
        let (mut manager, mut doc, node) = setup();
        let snapshot = Snapshot::capture_node(&doc.scene, node).unwrap();

        assert!(!manager.commit_snapshot(&mut doc, snapshot));
        assert_eq!(manager.undo_count(), 0);

        // A drag that ends where it started
        let snapshot = Snapshot::capture_node(&doc.scene, node).unwrap();
        doc.scene
            .node_mut(node)
            .unwrap()
            .set_position(Point3::new(5.0, 0.0, 0.0));
        doc.scene
            .node_mut(node)
            .unwrap()
            .set_position(Point3::new(0.0, 0.0, 0.0));
        assert!(!manager.commit_snapshot(&mut doc, snapshot));
        assert_eq!(manager.undo_count(), 0);
    }

    #[test]
    fn test_merge_coalesces_same_target() {
        let (mut manager, mut doc, node) = setup();

        translate(&mut manager, &mut doc, node, 1.0);
        translate(&mut manager, &mut doc, node, 2.0);
        assert_eq!(manager.undo_count(), 1);

        manager.undo(&mut doc).unwrap();
        assert_eq!(x_of(&doc, node), 0.0);
        assert!(!manager.has_undo_commands());

        manager.redo(&mut doc).unwrap();
        assert_eq!(x_of(&doc, node), 2.0);
    }

    #[test]
    fn test_merge_fence_separates_steps() {
        let (mut manager, mut doc, node) = setup();

        translate(&mut manager, &mut doc, node, 1.0);
        manager.set_merge_fence();
        translate(&mut manager, &mut doc, node, 2.0);
        assert_eq!(manager.undo_count(), 2);

        manager.undo(&mut doc).unwrap();
        assert_eq!(x_of(&doc, node), 1.0);
        manager.undo(&mut doc).unwrap();
        assert_eq!(x_of(&doc, node), 0.0);
    }

    #[test]
    fn test_different_targets_do_not_merge() {
        let (mut manager, mut doc, node) = setup();
        let other = doc.scene.add_node(None, "Sphere").unwrap();

        translate(&mut manager, &mut doc, node, 1.0);
        translate(&mut manager, &mut doc, other, 1.0);
        assert_eq!(manager.undo_count(), 2);
    }

    #[test]
    fn test_redone_step_does_not_absorb_new_edits() {
        let (mut manager, mut doc, node) = setup();

        translate(&mut manager, &mut doc, node, 1.0);
        manager.undo(&mut doc).unwrap();
        manager.redo(&mut doc).unwrap();
        translate(&mut manager, &mut doc, node, 2.0);
        assert_eq!(manager.undo_count(), 2);

        manager.undo(&mut doc).unwrap();
        assert_eq!(x_of(&doc, node), 1.0);
    }

    #[test]
    fn test_undo_on_empty_stack_is_an_error() {
        let (mut manager, mut doc, _node) = setup();
        assert_eq!(manager.undo(&mut doc), Err(HistoryError::NothingToUndo));
        assert_eq!(manager.redo(&mut doc), Err(HistoryError::NothingToRedo));
    }

    #[test]
    fn test_break_history_clears_undo_stack() {
        let (mut manager, mut doc, node) = setup();
        translate(&mut manager, &mut doc, node, 1.0);
        manager.set_merge_fence();
        translate(&mut manager, &mut doc, node, 2.0);
        assert_eq!(manager.undo_count(), 2);

        let mut snapshot = Snapshot::capture_node(&doc.scene, node).unwrap();
        snapshot.set_breaks_history(true);
        doc.scene.node_mut(node).unwrap().set_name("Renamed");
        assert!(manager.commit_snapshot(&mut doc, snapshot));

        assert_eq!(manager.undo_count(), 1);
        manager.undo(&mut doc).unwrap();
        assert_eq!(doc.scene.node(node).unwrap().name(), "Cube");
        assert!(!manager.has_undo_commands());
    }

    #[test]
    fn test_break_history_on_action_command() {
        let (mut manager, mut doc, node) = setup();
        translate(&mut manager, &mut doc, node, 1.0);

        let mut command = Command::from(RemoveNode::new(node));
        command.set_breaks_history(true);
        assert!(manager.commit_command(&mut doc, command).unwrap());
        assert_eq!(manager.undo_count(), 1);
    }

    #[test]
    fn test_commit_command_stores_inverse() {
        let (mut manager, mut doc, node) = setup();
        let parent = doc.scene.add_node(None, "Parent").unwrap();

        let command = ReparentNode::new(&doc.scene, node, Some(parent), 0).unwrap();
        assert!(manager.commit_command(&mut doc, command).unwrap());
        assert_eq!(doc.scene.node(node).unwrap().parent(), Some(parent));

        manager.undo(&mut doc).unwrap();
        assert_eq!(doc.scene.roots(), &[node, parent]);

        manager.redo(&mut doc).unwrap();
        assert_eq!(doc.scene.node(node).unwrap().parent(), Some(parent));
    }

    #[test]
    fn test_remove_undo_redo_through_manager() {
        let (mut manager, mut doc, node) = setup();
        let child = doc.scene.add_node(Some(node), "Child").unwrap();

        manager
            .commit_command(&mut doc, RemoveNode::new(node))
            .unwrap();
        assert!(!doc.scene.contains(node));
        assert_eq!(doc.scene.roots(), &[child]);

        manager.undo(&mut doc).unwrap();
        assert_eq!(doc.scene.roots(), &[node]);
        assert_eq!(doc.scene.children_of(Some(node)).unwrap(), &[child]);

        manager.redo(&mut doc).unwrap();
        assert!(!doc.scene.contains(node));
    }

    #[test]
    fn test_empty_group_is_not_committed() {
        let (mut manager, mut doc, _node) = setup();
        assert!(!manager
            .commit_command(&mut doc, CommandGroup::new())
            .unwrap());
        assert_eq!(manager.undo_count(), 0);
    }

    #[test]
    fn test_failed_command_leaves_stacks_alone() {
        let (mut manager, mut doc, node) = setup();
        translate(&mut manager, &mut doc, node, 1.0);
        manager.undo(&mut doc).unwrap();

        let ghost = doc.scene.add_node(None, "Ghost").unwrap();
        doc.scene.take_node(ghost).unwrap();
        let result = manager.commit_command(&mut doc, RemoveNode::new(ghost));

        assert_eq!(result, Err(HistoryError::NodeNotFound(ghost)));
        assert_eq!(manager.undo_count(), 0);
        assert_eq!(manager.redo_count(), 1);
    }

    #[test]
    fn test_failed_group_commit_leaves_scene_unchanged() {
        let (mut manager, mut doc, node) = setup();
        let parent = doc.scene.add_node(None, "Parent").unwrap();
        let ghost = doc.scene.add_node(None, "Ghost").unwrap();
        doc.scene.take_node(ghost).unwrap();

        let mut group = CommandGroup::new();
        group.add_command(ReparentNode::new(&doc.scene, node, Some(parent), 0).unwrap());
        group.add_command(RemoveNode::new(ghost));

        let result = manager.commit_command(&mut doc, group);
        assert_eq!(result, Err(HistoryError::NodeNotFound(ghost)));
        assert_eq!(doc.scene.node(node).unwrap().parent(), None);
        assert_eq!(doc.scene.roots(), &[node, parent]);
        assert_eq!(manager.undo_count(), 0);
    }

    #[test]
    fn test_failed_undo_leaves_scene_unchanged() {
        let (mut manager, mut doc, node) = setup();
        let parent = doc.scene.add_node(None, "Parent").unwrap();
        let other = doc.scene.add_node(None, "Other").unwrap();

        let mut group = CommandGroup::new();
        group.add_command(ReparentNode::new(&doc.scene, node, Some(parent), 0).unwrap());
        group.add_command(RemoveNode::new(other));
        assert!(manager.commit_command(&mut doc, group).unwrap());

        // Undo restores `other` first, then cannot move the vanished node back
        doc.scene.take_node(node).unwrap();
        let result = manager.undo(&mut doc);
        assert_eq!(result, Err(HistoryError::NodeNotFound(node)));
        assert!(!doc.scene.contains(other));
        assert_eq!(doc.scene.roots(), &[parent]);
        assert_eq!(manager.undo_count(), 0);
        assert_eq!(manager.redo_count(), 0);
    }

    #[test]
    fn test_history_limit_drops_oldest() {
        let _ = env_logger::builder().is_test(true).try_init();
        let settings = HistorySettings {
            max_undo_steps: 3,
            ..HistorySettings::default()
        };
        let mut manager = UndoRedoManager::with_settings(&settings);
        let mut doc = Document::new(&settings);
        let node = doc.scene.add_node(None, "Cube").unwrap();

        for step in 1..=5 {
            translate(&mut manager, &mut doc, node, step as f32);
            manager.set_merge_fence();
        }
        assert_eq!(manager.undo_count(), 3);

        while manager.has_undo_commands() {
            manager.undo(&mut doc).unwrap();
        }
        assert_eq!(x_of(&doc, node), 2.0);
    }

    #[test]
    fn test_clear() {
        let (mut manager, mut doc, node) = setup();
        translate(&mut manager, &mut doc, node, 1.0);
        manager.set_merge_fence();
        translate(&mut manager, &mut doc, node, 2.0);
        manager.undo(&mut doc).unwrap();

        manager.clear();
        assert!(!manager.has_undo_commands());
        assert!(!manager.has_redo_commands());
    }
}
