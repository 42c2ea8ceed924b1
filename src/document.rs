//! Editing context handed to every command

use crate::scene::Scene;
use crate::settings::HistorySettings;
use crate::texture::{TextureHistory, TextureStore, TileComparator};

/// Everything an undoable edit can touch.
///
/// Each open document owns its own scene, textures and tile baselines, so
/// several documents can keep independent histories side by side.
pub struct Document {
    pub scene: Scene,
    pub textures: TextureStore,
    pub texture_history: TextureHistory,
}

impl Document {
    /// Empty document diffing textures on the CPU
    pub fn new(settings: &HistorySettings) -> Self {
        Self {
            scene: Scene::new(),
            textures: TextureStore::new(),
            texture_history: TextureHistory::new(settings.tile_size),
        }
    }

    /// Empty document with a custom tile comparator (e.g. a GPU compute pass)
    pub fn with_comparator(settings: &HistorySettings, comparator: Box<dyn TileComparator>) -> Self {
        Self {
            scene: Scene::new(),
            textures: TextureStore::new(),
            texture_history: TextureHistory::with_comparator(settings.tile_size, comparator),
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(&HistorySettings::default())
    }
}
