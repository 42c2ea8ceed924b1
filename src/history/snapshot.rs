//! Snapshots: commands that capture a target's state before an edit

use super::command::CommandFlags;
use crate::document::Document;
use crate::error::HistoryError;
use crate::scene::{Node, NodeHandle, Scene};
use crate::texture::{TextureDelta, TextureId};

/// What a snapshot restores
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotTarget {
    /// Editable properties of one scene node
    Node(NodeHandle),
    /// Pixel contents of one texture
    Texture(TextureId),
}

enum Captured {
    Node(Node),
    Texture(TextureDelta),
}

/// Captured state of one target, taken before the edit happens.
///
/// The caller mutates the live target directly; whether anything changed is
/// only worked out when the snapshot is committed.
pub struct Snapshot {
    pub(crate) flags: CommandFlags,
    target: SnapshotTarget,

    // Empty once another snapshot has absorbed this one
    captured: Option<Captured>,
}

impl Snapshot {
    /// Capture the current properties of a node
    pub fn capture_node(scene: &Scene, handle: NodeHandle) -> Result<Self, HistoryError> {
        let node = scene
            .node(handle)
            .ok_or(HistoryError::NodeNotFound(handle))?;
        Ok(Self::with_capture(
            SnapshotTarget::Node(handle),
            Captured::Node(node.clone()),
        ))
    }

    /// Wrap a delta holding the pre-edit tiles of a texture
    pub fn texture(texture: TextureId, delta: TextureDelta) -> Self {
        Self::with_capture(SnapshotTarget::Texture(texture), Captured::Texture(delta))
    }

    fn with_capture(target: SnapshotTarget, captured: Captured) -> Self {
        Self {
            flags: CommandFlags::default(),
            target,
            captured: Some(captured),
        }
    }

    pub fn target(&self) -> SnapshotTarget {
        self.target
    }

    /// Whether this snapshot has been absorbed by another and holds nothing
    pub fn is_spent(&self) -> bool {
        self.captured.is_none()
    }

    /// Captured node state, if this is a node snapshot
    pub fn captured_node(&self) -> Option<&Node> {
        match &self.captured {
            Some(Captured::Node(node)) => Some(node),
            _ => None,
        }
    }

    /// Captured tiles, if this is a texture snapshot
    pub fn captured_delta(&self) -> Option<&TextureDelta> {
        match &self.captured {
            Some(Captured::Texture(delta)) => Some(delta),
            _ => None,
        }
    }

    pub fn allow_merging(&self) -> bool {
        self.flags.allow_merging
    }

    pub fn set_allow_merging(&mut self, allow: bool) {
        self.flags.allow_merging = allow;
    }

    pub fn breaks_history(&self) -> bool {
        self.flags.breaks_history
    }

    pub fn set_breaks_history(&mut self, breaks: bool) {
        self.flags.breaks_history = breaks;
    }

    /// Absorb an older snapshot of the same target.
    ///
    /// This snapshot ends up holding the older capture (so undoing it goes
    /// back to the state before both edits) and `older` is left empty.
    #[must_use = "returns whether the snapshots were merged"]
    pub fn merge(&mut self, older: &mut Snapshot) -> bool {
        if !self.flags.allow_merging || !older.flags.allow_merging || self.target != older.target {
            return false;
        }

        let merged = match (&mut self.captured, &mut older.captured) {
            (Some(Captured::Node(node)), Some(Captured::Node(older_node))) => {
                std::mem::swap(node, older_node);
                true
            }
            (Some(Captured::Texture(delta)), Some(Captured::Texture(older_delta))) => {
                delta.absorb_older(older_delta)
            }
            _ => false,
        };

        if merged {
            older.captured = None;
            self.flags.breaks_history |= older.flags.breaks_history;
        }
        merged
    }

    /// Whether the live target differs from the captured state
    pub fn contains_changes(&self, doc: &Document) -> bool {
        match (&self.captured, self.target) {
            (Some(Captured::Node(captured)), SnapshotTarget::Node(handle)) => doc
                .scene
                .node(handle)
                .is_some_and(|live| live.differs_from(captured)),
            (Some(Captured::Texture(delta)), SnapshotTarget::Texture(texture)) => {
                !delta.is_empty() && doc.textures.contains(texture)
            }
            _ => false,
        }
    }

    /// Put the captured state back into the live target and return a
    /// snapshot of what was there before.
    pub(crate) fn exec(self, doc: &mut Document) -> Result<Snapshot, HistoryError> {
        let captured = match self.captured {
            Some(captured) => captured,
            None => return Ok(self),
        };

        match (captured, self.target) {
            (Captured::Node(captured), SnapshotTarget::Node(handle)) => {
                let Some(live) = doc.scene.node_mut(handle) else {
                    log::error!("Snapshot target node {} no longer exists", handle);
                    return Err(HistoryError::NodeNotFound(handle));
                };
                let current = live.clone();
                live.copy_from(&captured);
                Ok(Self::with_capture(self.target, Captured::Node(current)))
            }
            (Captured::Texture(delta), SnapshotTarget::Texture(texture)) => {
                let Some(raster) = doc.textures.raster_mut(texture) else {
                    log::error!("Snapshot target texture {} no longer exists", texture);
                    return Err(HistoryError::TextureNotFound(texture));
                };
                let inverse = delta.capture_inverse(raster).unwrap_or_else(|| {
                    TextureDelta::empty(raster.width(), raster.height(), delta.tile_size())
                });
                delta.apply_to(raster);
                Ok(Self::with_capture(self.target, Captured::Texture(inverse)))
            }
            (_, target) => {
                debug_assert!(false, "snapshot capture does not match target {:?}", target);
                Ok(Self {
                    flags: CommandFlags::default(),
                    target,
                    captured: None,
                })
            }
        }
    }

    pub(crate) fn on_commit_transaction(&self, doc: &mut Document) {
        match self.target {
            SnapshotTarget::Node(handle) => doc.scene.refresh_world_transforms(handle),
            SnapshotTarget::Texture(texture) => doc.textures.mark_modified(texture),
        }
    }
}
