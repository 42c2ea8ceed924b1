//! Scope-bound transactions
//!
//! A [`ScopedTransaction`] takes its snapshot when it is created and commits
//! it when it goes out of scope, including early returns and panics. While
//! it lives it is the only way to reach the document, so edits made through
//! it are exactly the edits it captures.

use super::manager::UndoRedoManager;
use super::snapshot::Snapshot;
use crate::document::Document;
use crate::error::HistoryError;
use crate::scene::NodeHandle;
use crate::texture::TextureId;
use std::ops::{Deref, DerefMut};

enum Pending {
    Snapshot(Snapshot),

    /// Tile baseline registered under the texture's baseline key
    Texture(TextureId),
}

/// Commits its snapshot exactly once, when dropped
pub struct ScopedTransaction<'a> {
    manager: &'a mut UndoRedoManager,
    doc: &'a mut Document,
    pending: Option<Pending>,
}

impl<'a> ScopedTransaction<'a> {
    /// Open a transaction around an already captured snapshot
    pub fn new(manager: &'a mut UndoRedoManager, doc: &'a mut Document, snapshot: Snapshot) -> Self {
        Self {
            manager,
            doc,
            pending: Some(Pending::Snapshot(snapshot)),
        }
    }

    /// Capture a node and open a transaction for editing it
    pub fn node(
        manager: &'a mut UndoRedoManager,
        doc: &'a mut Document,
        handle: NodeHandle,
    ) -> Result<Self, HistoryError> {
        let snapshot = Snapshot::capture_node(&doc.scene, handle)?;
        Ok(Self::new(manager, doc, snapshot))
    }

    /// Take a tile baseline of a texture and open a transaction for painting
    /// on it.
    ///
    /// If the baseline cannot be allocated the transaction still opens, but
    /// the edit will not be undoable.
    pub fn texture(
        manager: &'a mut UndoRedoManager,
        doc: &'a mut Document,
        texture: TextureId,
    ) -> Result<Self, HistoryError> {
        let raster = doc
            .textures
            .raster(texture)
            .ok_or(HistoryError::TextureNotFound(texture))?;

        let pending = doc
            .texture_history
            .start_snapshot(&texture.baseline_key(), raster, false)
            .map(|_| Pending::Texture(texture));
        if pending.is_none() {
            log::warn!("Painting on texture {} without undo", texture);
        }

        Ok(Self {
            manager,
            doc,
            pending,
        })
    }

    /// Drop the pending transaction without committing it
    pub fn cancel(mut self) {
        if let Some(Pending::Texture(texture)) = self.pending.take() {
            self.doc.texture_history.end_snapshot(&texture.baseline_key());
        }
    }

    fn commit(&mut self) -> bool {
        let snapshot = match self.pending.take() {
            Some(Pending::Snapshot(snapshot)) => snapshot,
            Some(Pending::Texture(texture)) => {
                let key = texture.baseline_key();
                let Some(raster) = self.doc.textures.raster(texture) else {
                    log::error!("Texture {} disappeared during its transaction", texture);
                    self.doc.texture_history.end_snapshot(&key);
                    return false;
                };
                let delta = self.doc.texture_history.create_delta(&key, raster);
                self.doc.texture_history.end_snapshot(&key);
                Snapshot::texture(texture, delta)
            }
            None => return false,
        };

        self.manager.commit_snapshot(self.doc, snapshot)
    }
}

impl Deref for ScopedTransaction<'_> {
    type Target = Document;

    fn deref(&self) -> &Document {
        self.doc
    }
}

impl DerefMut for ScopedTransaction<'_> {
    fn deref_mut(&mut self) -> &mut Document {
        self.doc
    }
}

impl Drop for ScopedTransaction<'_> {
    fn drop(&mut self) {
        self.commit();
    }
}
