//! Terrain meshing: turns a border-padded heightfield into a seam-safe LOD mesh.

pub mod builder;
pub mod settings;
pub mod terrain_mesh;

pub use builder::{MeshLayout, build_terrain_mesh, skip_increment};
pub use settings::{
    MeshSettings, MeshSettingsError, NUM_SUPPORTED_CHUNK_SIZES, NUM_SUPPORTED_FLATSHADED_CHUNK_SIZES,
    NUM_SUPPORTED_LODS, SUPPORTED_CHUNK_SIZES,
};
pub use terrain_mesh::{TerrainMesh, TerrainVertex};
