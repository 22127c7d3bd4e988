use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_NEW_NOTE_VELOCITY, DEFAULT_PIXELS_PER_KEY, DEFAULT_PIXELS_PER_TICK,
    DEFAULT_QUANTIZE_DIVISOR,
};
use crate::paths::config_path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub editing: EditingConfig,
    pub view: ViewConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditingConfig {
    pub quantize_divisor: u32,
    pub quantize_enabled: bool,
    pub new_note_velocity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    pub pixels_per_tick: f64,
    pub pixels_per_key: f64,
    pub scroll_follows_playhead: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            editing: EditingConfig {
                quantize_divisor: DEFAULT_QUANTIZE_DIVISOR,
                quantize_enabled: true,
                new_note_velocity: DEFAULT_NEW_NOTE_VELOCITY,
            },
            view: ViewConfig {
                pixels_per_tick: DEFAULT_PIXELS_PER_TICK,
                pixels_per_key: DEFAULT_PIXELS_PER_KEY,
                scroll_follows_playhead: true,
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(path) = config_path() {
            self.save_to(&path)?;
        }
        Ok(())
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
