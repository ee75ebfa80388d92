//! Procedural heightfield synthesis: seeded multi-octave noise, radial falloff,
//! response curves, and preview/material helpers for the presentation layer.

mod curve;
mod falloff;
mod grid;
mod heightmap;
mod layers;
mod noise_map;
mod texture;

pub use curve::{CurveEvaluator, CurveKey, HeightCurve};
pub use falloff::FalloffMask;
pub use grid::Grid;
pub use heightmap::{HeightMapBuilder, HeightMapSettings, Heightfield};
pub use layers::{LAYER_TEXTURE_SIZE, LayerUniforms, TerrainLayer, build_texture_array, load_layer_textures};
pub use noise_map::{NoiseSettings, NormalizeMode, generate_noise_map};
pub use texture::{falloff_to_image, grid_to_image, heightfield_to_image};
