//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vista_lod::LodTable;
use vista_mesh::MeshSettings;
use vista_streaming::{StreamingConfig, TerrainSettings};
use vista_terrain::{HeightMapSettings, TerrainLayer};

use crate::error::ConfigError;

/// File name of the settings file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "terrain.ron";

/// Top-level terrain configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Noise, response curve and falloff.
    pub height: HeightMapSettings,
    /// Mesh resolution and world scale.
    pub mesh: MeshSettings,
    /// Detail levels and the collider level.
    pub lod: LodConfig,
    /// Viewer movement tuning.
    pub streaming: StreamingConfig,
    /// Height-banded material layers, bottom first.
    pub layers: Vec<TerrainLayer>,
    /// Offline preview output.
    pub preview: PreviewConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Detail level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodConfig {
    /// Detail levels in increasing distance. Validated while parsing.
    pub levels: LodTable,
    /// Index into `levels` whose mesh is also used as the collider.
    pub collider_level: usize,
}

/// What the preview renders.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum DrawMode {
    /// Grayscale heightfield.
    #[default]
    NoiseMap,
    /// Mesh statistics for a single chunk at `editor_lod`.
    Mesh,
    /// Grayscale falloff mask.
    FalloffMap,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreviewConfig {
    pub draw_mode: DrawMode,
    /// Mesh LOD used by [`DrawMode::Mesh`].
    pub editor_lod: usize,
    /// Regenerate the preview whenever observed settings change.
    pub auto_update: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            draw_mode: DrawMode::NoiseMap,
            editor_lod: 0,
            auto_update: true,
        }
    }
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level filter (e.g., "debug", "info", "vista_streaming=trace").
    pub log_level: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

// --- Derived settings ---

impl Config {
    /// Platform config directory for the terrain tools, e.g. `~/.config/vista`.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("vista"))
    }

    /// Validate and bundle the sections the streaming core needs.
    pub fn terrain_settings(&self) -> Result<TerrainSettings, ConfigError> {
        Ok(TerrainSettings::new(
            self.height.clone(),
            self.mesh.clone(),
            self.lod.levels.clone(),
            self.lod.collider_level,
            self.streaming.clone(),
        )?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.terrain_settings().map(|_| ())
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            config.validate()?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as [`CONFIG_FILE_NAME`].
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            new_config.validate()?;
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
