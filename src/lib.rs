//! scene-history: transactional undo/redo for a scene and texture editor
//!
//! Every undoable edit is a [`Command`](history::Command). Property edits are
//! captured as [`Snapshot`](history::Snapshot)s of the target's state before
//! the edit and diffed when they are committed; structural edits (duplicate,
//! remove, reparent) are action commands that work out their own inverse.
//! Paint strokes on large textures are recorded as sparse tile deltas by
//! [`TextureHistory`](texture::TextureHistory), so an undo step costs memory
//! in proportion to the tiles it touched.
//!
//! ```
//! use cgmath::Point3;
//! use scene_history::{Document, ScopedTransaction, UndoRedoManager};
//!
//! # fn main() -> Result<(), scene_history::HistoryError> {
//! let mut doc = Document::default();
//! let mut history = UndoRedoManager::new();
//! let cube = doc.scene.add_node(None, "Cube")?;
//!
//! {
//!     let mut tx = ScopedTransaction::node(&mut history, &mut doc, cube)?;
//!     if let Some(node) = tx.scene.node_mut(cube) {
//!         node.set_position(Point3::new(1.0, 0.0, 0.0));
//!     }
//! } // committed here
//!
//! history.undo(&mut doc)?;
//! assert_eq!(doc.scene.node(cube).map(|node| node.position().x), Some(0.0));
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod error;
pub mod history;
pub mod scene;
pub mod settings;
pub mod texture;

pub use document::Document;
pub use error::HistoryError;
pub use history::{
    Command, CommandGroup, DuplicateNode, RemoveNode, ReparentNode, ScopedTransaction, Snapshot,
    UndoRedoManager,
};
pub use scene::{Node, NodeHandle, Scene};
pub use settings::HistorySettings;
pub use texture::{TextureDelta, TextureHistory, TextureId};
