//! History settings persistence
//!
//! Settings are stored in a JSON file at the platform-appropriate config location:
//! - macOS: ~/Library/Application Support/scene-history/settings.json
//! - Windows: %APPDATA%/scene-history/settings.json
//! - Linux: ~/.config/scene-history/settings.json

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of undo steps kept before the oldest are dropped
pub const DEFAULT_MAX_UNDO_STEPS: usize = 1000;

/// Default edge length of a texture tile in pixels
pub const DEFAULT_TILE_SIZE: u32 = 64;

/// Tunables for the undo engine and the tile diff engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Maximum depth of the undo stack
    pub max_undo_steps: usize,

    /// Edge length of the square tiles used for texture deltas
    pub tile_size: u32,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_undo_steps: DEFAULT_MAX_UNDO_STEPS,
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

impl HistorySettings {
    /// Get the path to the settings file
    fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("scene-history");
            path.push("settings.json");
            path
        })
    }

    /// Load settings from the config directory, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            log::warn!("Could not determine config directory, using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load settings from an explicit file
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(settings) => {
                    log::info!("Loaded history settings from {}", path.display());
                    settings.sanitized()
                }
                Err(e) => {
                    log::warn!("Failed to parse settings file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Failed to read settings file: {}", e);
                }
                Self::default()
            }
        }
    }

    /// Save settings to the config directory
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else {
            log::warn!("Could not determine config directory, settings not saved");
            return;
        };
        self.save_to(&path);
    }

    /// Save settings to an explicit file, logging failures
    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::warn!("Failed to create config directory: {}", e);
                return;
            }
        }

        match serde_json::to_string_pretty(self) {
            Ok(contents) => {
                if let Err(e) = std::fs::write(path, contents) {
                    log::warn!("Failed to write settings file: {}", e);
                } else {
                    log::info!("Saved history settings to {}", path.display());
                }
            }
            Err(e) => {
                log::warn!("Failed to serialize settings: {}", e);
            }
        }
    }

    /// Replace values that would make the engine unusable with defaults
    pub fn sanitized(mut self) -> Self {
        if self.tile_size == 0 {
            log::warn!("Tile size of 0 is invalid, using {}", DEFAULT_TILE_SIZE);
            self.tile_size = DEFAULT_TILE_SIZE;
        }
        if self.max_undo_steps == 0 {
            log::warn!(
                "Undo limit of 0 is invalid, using {}",
                DEFAULT_MAX_UNDO_STEPS
            );
            self.max_undo_steps = DEFAULT_MAX_UNDO_STEPS;
        }
        self
    }
}
