//! History error types

use crate::scene::NodeHandle;
use crate::texture::TextureId;
use thiserror::Error;

/// Errors surfaced by the undo engine.
///
/// Recoverable no-op outcomes (a refused merge, a snapshot without changes,
/// an empty texture delta) are plain `bool`/`Option` results and never show
/// up here. Every variant below is a programming error on the caller's side.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// `undo()` was called with an empty undo stack
    #[error("nothing to undo")]
    NothingToUndo,

    /// `redo()` was called with an empty redo stack
    #[error("nothing to redo")]
    NothingToRedo,

    /// A command referenced a node that no longer exists in the scene
    #[error("node not found: {0}")]
    NodeNotFound(NodeHandle),

    /// A command referenced a texture that is no longer in the store
    #[error("texture not found: {0}")]
    TextureNotFound(TextureId),

    /// A node cannot be moved below itself or one of its descendants
    #[error("node {node} cannot be parented under {parent}")]
    InvalidParent { node: NodeHandle, parent: NodeHandle },
}
