//! Mesh resolution and world-scale settings.

use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

/// Number of distinct mesh LODs a chunk can be built at.
pub const NUM_SUPPORTED_LODS: usize = 5;
/// Number of entries in [`SUPPORTED_CHUNK_SIZES`].
pub const NUM_SUPPORTED_CHUNK_SIZES: usize = 9;
/// Flat shading triples the vertex count, so only the smallest sizes are allowed.
pub const NUM_SUPPORTED_FLATSHADED_CHUNK_SIZES: usize = 3;

/// Renderable quads per chunk side. Every entry is a multiple of 24, the least
/// common multiple of all LOD skip increments (1, 2, 4, 6, 8).
pub const SUPPORTED_CHUNK_SIZES: [usize; NUM_SUPPORTED_CHUNK_SIZES] =
    [48, 72, 96, 120, 144, 168, 192, 216, 240];

const fn sizes_partition_every_lod() -> bool {
    let mut i = 0;
    while i < NUM_SUPPORTED_CHUNK_SIZES {
        let mut lod = 1;
        while lod < NUM_SUPPORTED_LODS {
            if SUPPORTED_CHUNK_SIZES[i] % (lod * 2) != 0 {
                return false;
            }
            lod += 1;
        }
        i += 1;
    }
    true
}

const_assert!(sizes_partition_every_lod());
const_assert!(NUM_SUPPORTED_FLATSHADED_CHUNK_SIZES <= NUM_SUPPORTED_CHUNK_SIZES);

/// Errors from [`MeshSettings::validate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshSettingsError {
    /// Chunk size selector out of range.
    #[error("chunk size index {index} out of range (max {max})")]
    ChunkSizeIndex { index: usize, max: usize },
    /// Flat-shaded chunk size selector out of range.
    #[error("flat-shaded chunk size index {index} out of range (max {max})")]
    FlatshadedChunkSizeIndex { index: usize, max: usize },
    /// World scale must be a positive finite number.
    #[error("mesh scale must be positive, got {0}")]
    Scale(f32),
    /// A LOD's skip increment does not tile the chunk.
    #[error("chunk size {size} is not divisible by the skip increment of lod {lod}")]
    Indivisible { size: usize, lod: usize },
}

/// Settings controlling mesh resolution and world-space size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSettings {
    /// Emit one vertex per triangle corner instead of shared, smoothed vertices.
    pub use_flat_shading: bool,
    /// World units per heightfield sample.
    pub mesh_scale: f32,
    /// Index into [`SUPPORTED_CHUNK_SIZES`] for smooth-shaded meshes.
    pub chunk_size_index: usize,
    /// Index into the flat-shading subset of [`SUPPORTED_CHUNK_SIZES`].
    pub flatshaded_chunk_size_index: usize,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            use_flat_shading: false,
            mesh_scale: 2.5,
            chunk_size_index: NUM_SUPPORTED_CHUNK_SIZES - 1,
            flatshaded_chunk_size_index: NUM_SUPPORTED_FLATSHADED_CHUNK_SIZES - 1,
        }
    }
}

impl MeshSettings {
    /// Check the selectors and scale. Called once when settings are loaded;
    /// the accessors below assume a validated configuration.
    pub fn validate(&self) -> Result<(), MeshSettingsError> {
        if self.chunk_size_index >= NUM_SUPPORTED_CHUNK_SIZES {
            return Err(MeshSettingsError::ChunkSizeIndex {
                index: self.chunk_size_index,
                max: NUM_SUPPORTED_CHUNK_SIZES - 1,
            });
        }
        if self.flatshaded_chunk_size_index >= NUM_SUPPORTED_FLATSHADED_CHUNK_SIZES {
            return Err(MeshSettingsError::FlatshadedChunkSizeIndex {
                index: self.flatshaded_chunk_size_index,
                max: NUM_SUPPORTED_FLATSHADED_CHUNK_SIZES - 1,
            });
        }
        if !(self.mesh_scale.is_finite() && self.mesh_scale > 0.0) {
            return Err(MeshSettingsError::Scale(self.mesh_scale));
        }
        let size = self.chunk_size();
        if let Some(lod) = (1..NUM_SUPPORTED_LODS).find(|lod| size % (lod * 2) != 0) {
            return Err(MeshSettingsError::Indivisible { size, lod });
        }
        Ok(())
    }

    /// Renderable quads per side at LOD 0 for the active shading mode.
    pub fn chunk_size(&self) -> usize {
        if self.use_flat_shading {
            SUPPORTED_CHUNK_SIZES[self.flatshaded_chunk_size_index]
        } else {
            SUPPORTED_CHUNK_SIZES[self.chunk_size_index]
        }
    }

    /// Heightfield samples per side: chunk size plus the two border rings on
    /// each side and one extra sample for normal continuity.
    pub fn verts_per_line(&self) -> usize {
        self.chunk_size() + 5
    }

    /// World-space side length of one chunk.
    pub fn world_size(&self) -> f32 {
        (self.verts_per_line() - 3) as f32 * self.mesh_scale
    }
}
