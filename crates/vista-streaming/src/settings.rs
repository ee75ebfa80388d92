//! Validated settings bundle shared by the store and its workers.

use serde::{Deserialize, Serialize};
use vista_lod::LodTable;
use vista_mesh::{MeshSettings, MeshSettingsError, NUM_SUPPORTED_LODS};
use vista_terrain::HeightMapSettings;

/// Viewer-movement tuning for the streaming loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Distance the viewer must travel before the visible window is rebuilt.
    pub viewer_move_threshold: f32,
    /// Distance to a chunk's nearest edge within which its collider is attached.
    pub collider_generation_distance: f32,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            viewer_move_threshold: 25.0,
            collider_generation_distance: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error(transparent)]
    Mesh(#[from] MeshSettingsError),
    #[error("collider level {index} out of range for {len} lod levels")]
    ColliderLevel { index: usize, len: usize },
    #[error("level {index} uses lod {lod}, only {max} are supported")]
    Lod { index: usize, lod: usize, max: usize },
    #[error("{field} must be a non-negative finite number, got {value}")]
    Streaming { field: &'static str, value: f32 },
}

/// Everything a chunk needs to build its heightfield and meshes.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainSettings {
    pub height: HeightMapSettings,
    pub mesh: MeshSettings,
    pub lods: LodTable,
    /// Index into `lods` of the level whose mesh doubles as the collider.
    pub collider_level: usize,
    pub streaming: StreamingConfig,
}

impl TerrainSettings {
    pub fn new(
        height: HeightMapSettings,
        mesh: MeshSettings,
        lods: LodTable,
        collider_level: usize,
        streaming: StreamingConfig,
    ) -> Result<Self, SettingsError> {
        mesh.validate()?;
        if collider_level >= lods.len() {
            return Err(SettingsError::ColliderLevel {
                index: collider_level,
                len: lods.len(),
            });
        }
        if let Some((index, level)) = lods
            .levels()
            .iter()
            .enumerate()
            .find(|(_, level)| level.lod >= NUM_SUPPORTED_LODS)
        {
            return Err(SettingsError::Lod {
                index,
                lod: level.lod,
                max: NUM_SUPPORTED_LODS,
            });
        }
        for (field, value) in [
            ("viewer_move_threshold", streaming.viewer_move_threshold),
            ("collider_generation_distance", streaming.collider_generation_distance),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SettingsError::Streaming { field, value });
            }
        }
        Ok(Self {
            height,
            mesh,
            lods,
            collider_level,
            streaming,
        })
    }

    /// Square window half-extent, in chunks, covering the view radius.
    pub fn chunks_in_view(&self) -> i32 {
        (self.lods.max_view_distance() / self.mesh.world_size()).round() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vista_lod::LodLevel;

    fn lods() -> LodTable {
        LodTable::new(vec![LodLevel::new(0, 100.0), LodLevel::new(2, 300.0)]).unwrap()
    }

    #[test]
    fn test_valid_settings() {
        let s = TerrainSettings::new(
            HeightMapSettings::default(),
            MeshSettings::default(),
            lods(),
            1,
            StreamingConfig::default(),
        )
        .unwrap();
        // 240 + 2 quads at scale 2.5 per chunk.
        assert_eq!(s.mesh.world_size(), 605.0);
        assert_eq!(s.chunks_in_view(), 0);
    }

    #[test]
    fn test_rejects_collider_level_out_of_range() {
        let err = TerrainSettings::new(
            HeightMapSettings::default(),
            MeshSettings::default(),
            lods(),
            2,
            StreamingConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, SettingsError::ColliderLevel { index: 2, len: 2 });
    }

    #[test]
    fn test_rejects_unsupported_lod() {
        let table = LodTable::new(vec![LodLevel::new(5, 100.0)]).unwrap();
        let err = TerrainSettings::new(
            HeightMapSettings::default(),
            MeshSettings::default(),
            table,
            0,
            StreamingConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SettingsError::Lod { lod: 5, .. }));
    }

    #[test]
    fn test_rejects_invalid_mesh_and_streaming() {
        let mesh = MeshSettings {
            chunk_size_index: 42,
            ..Default::default()
        };
        let err = TerrainSettings::new(
            HeightMapSettings::default(),
            mesh,
            lods(),
            0,
            StreamingConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SettingsError::Mesh(_)));

        let streaming = StreamingConfig {
            viewer_move_threshold: -1.0,
            ..Default::default()
        };
        let err = TerrainSettings::new(
            HeightMapSettings::default(),
            MeshSettings::default(),
            lods(),
            0,
            streaming,
        )
        .unwrap_err();
        assert!(matches!(err, SettingsError::Streaming { field: "viewer_move_threshold", .. }));
    }
}
