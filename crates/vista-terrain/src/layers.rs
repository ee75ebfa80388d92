//! Material layer descriptors and the uniform arrays a shader binder consumes.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

/// Side length of every slice in the layer texture array.
pub const LAYER_TEXTURE_SIZE: u32 = 512;

/// One height-banded material layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainLayer {
    /// Source texture for the layer, if any.
    pub texture: Option<PathBuf>,
    /// RGBA tint in linear `[0, 1]`.
    pub tint: [f32; 4],
    /// How strongly the tint replaces the texture, `[0, 1]`.
    pub tint_strength: f32,
    /// Normalized height at which the layer starts, `[0, 1]`.
    pub start_height: f32,
    /// Blend width into the layer below, `[0, 1]`.
    pub blend_strength: f32,
    /// World-space tiling of the texture.
    pub texture_scale: f32,
}

impl Default for TerrainLayer {
    fn default() -> Self {
        Self {
            texture: None,
            tint: [1.0, 1.0, 1.0, 1.0],
            tint_strength: 0.0,
            start_height: 0.0,
            blend_strength: 0.0,
            texture_scale: 1.0,
        }
    }
}

/// Struct-of-arrays layout of the layer list plus the active height range.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerUniforms {
    pub layer_count: u32,
    pub base_colors: Vec<[f32; 4]>,
    pub base_start_heights: Vec<f32>,
    pub base_blends: Vec<f32>,
    pub base_color_strengths: Vec<f32>,
    pub base_texture_scales: Vec<f32>,
    pub min_height: f32,
    pub max_height: f32,
}

impl LayerUniforms {
    /// Flatten `layers` for upload, with the current elevation range.
    pub fn from_layers(layers: &[TerrainLayer], min_height: f32, max_height: f32) -> Self {
        Self {
            layer_count: layers.len() as u32,
            base_colors: layers.iter().map(|l| l.tint).collect(),
            base_start_heights: layers.iter().map(|l| l.start_height).collect(),
            base_blends: layers.iter().map(|l| l.blend_strength).collect(),
            base_color_strengths: layers.iter().map(|l| l.tint_strength).collect(),
            base_texture_scales: layers.iter().map(|l| l.texture_scale).collect(),
            min_height,
            max_height,
        }
    }

    /// Refresh the elevation range after the height settings changed.
    pub fn update_mesh_heights(&mut self, min_height: f32, max_height: f32) {
        self.min_height = min_height;
        self.max_height = max_height;
    }
}

/// Load the source texture of every layer, in layer order.
///
/// Relative paths resolve against `base_dir`. A layer without a texture gets a
/// single white pixel so that its tint alone decides the colour.
pub fn load_layer_textures(layers: &[TerrainLayer], base_dir: &Path) -> image::ImageResult<Vec<RgbaImage>> {
    layers
        .iter()
        .map(|layer| match &layer.texture {
            Some(path) => Ok(image::open(base_dir.join(path))?.into_rgba8()),
            None => Ok(RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]))),
        })
        .collect()
}

/// Resample every source texture into a fixed-size slice of a texture array.
pub fn build_texture_array(textures: &[RgbaImage]) -> Vec<RgbaImage> {
    textures
        .iter()
        .map(|tex| {
            if tex.dimensions() == (LAYER_TEXTURE_SIZE, LAYER_TEXTURE_SIZE) {
                tex.clone()
            } else {
                imageops::resize(tex, LAYER_TEXTURE_SIZE, LAYER_TEXTURE_SIZE, FilterType::Triangle)
            }
        })
        .collect()
}
