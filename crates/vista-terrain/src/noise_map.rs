//! Seeded multi-octave coherent noise sampled over a rectangular grid.
//!
//! Each octave is offset by a pseudo-random vector drawn from a generator seeded
//! with [`NoiseSettings::seed`], so layered octaves never line up. Output is
//! normalized either per call ([`NormalizeMode::Local`]) or against the
//! theoretical amplitude sum ([`NormalizeMode::Global`]), the latter being what
//! lets independently generated chunks meet without visible seams.

use glam::Vec2;
use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::grid::Grid;

/// Range of the per-octave random offset, in noise-space units.
const OCTAVE_OFFSET_RANGE: i32 = 100_000;

/// Lowest scale accepted before sampling.
const MIN_SCALE: f32 = 1e-3;

/// How raw octave sums are mapped into the output range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizeMode {
    /// Remap the observed `[min, max]` of this grid onto `[0, 1]`.
    #[default]
    Local,
    /// Remap against the theoretical maximum amplitude, clamped to `>= 0`.
    /// Values are consistent across grids, so neighbouring chunks interconnect.
    Global,
}

/// Parameters for fractal noise generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    /// Normalization applied after octave summation.
    pub normalize_mode: NormalizeMode,
    /// Zoom factor; larger values stretch features. Floored at `1e-3`.
    pub scale: f32,
    /// Number of octaves summed. At least 1.
    pub octaves: u32,
    /// Amplitude multiplier between octaves, in `[0, 1]`.
    pub persistence: f32,
    /// Frequency multiplier between octaves, at least 1.
    pub lacunarity: f32,
    /// Seed for the per-octave offsets.
    pub seed: u64,
    /// Constant translation of the sampled region.
    pub offset: Vec2,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            normalize_mode: NormalizeMode::Local,
            scale: 50.0,
            octaves: 8,
            persistence: 0.5,
            lacunarity: 2.0,
            seed: 0,
            offset: Vec2::ZERO,
        }
    }
}

impl NoiseSettings {
    /// Return a copy with degenerate values clamped to their documented floors.
    pub fn validated(&self) -> Self {
        Self {
            scale: self.scale.max(MIN_SCALE),
            octaves: self.octaves.max(1),
            lacunarity: self.lacunarity.max(1.0),
            persistence: self.persistence.clamp(0.0, 1.0),
            ..self.clone()
        }
    }

    /// Theoretical maximum of the summed octave amplitudes (`sum persistence^i`).
    pub fn max_possible_height(&self) -> f64 {
        let mut sum = 0.0;
        let mut amplitude = 1.0;
        for _ in 0..self.octaves.max(1) {
            sum += amplitude;
            amplitude *= self.persistence.clamp(0.0, 1.0) as f64;
        }
        sum
    }

    /// Per-octave sampling offsets for a grid centred on `sample_center`.
    ///
    /// The y component is flipped so that increasing grid rows walk towards
    /// decreasing world y, matching the mesh layout.
    fn octave_offsets(&self, sample_center: Vec2) -> Vec<[f64; 2]> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        (0..self.octaves)
            .map(|_| {
                let ox: i32 = rng.random_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE);
                let oy: i32 = rng.random_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE);
                [
                    ox as f64 + self.offset.x as f64 + sample_center.x as f64,
                    oy as f64 - self.offset.y as f64 - sample_center.y as f64,
                ]
            })
            .collect()
    }
}

/// Sample a `width` x `height` grid of normalized fractal noise centred on `sample_center`.
///
/// Settings are clamped with [`NoiseSettings::validated`] first. Identical inputs
/// always reproduce bit-identical output.
pub fn generate_noise_map(
    width: usize,
    height: usize,
    settings: &NoiseSettings,
    sample_center: Vec2,
) -> Grid {
    let settings = settings.validated();
    let perlin = Perlin::new(Perlin::DEFAULT_SEED);
    let offsets = settings.octave_offsets(sample_center);
    let max_possible_height = settings.max_possible_height();

    let scale = settings.scale as f64;
    let persistence = settings.persistence as f64;
    let lacunarity = settings.lacunarity as f64;

    // Recentre so that changing the scale zooms about the middle of the grid.
    let half_width = width as f64 / 2.0;
    let half_height = height as f64 / 2.0;

    let mut local_min = f64::MAX;
    let mut local_max = f64::MIN;
    let mut raw = Vec::with_capacity(width * height);

    for y in 0..height {
        for x in 0..width {
            let mut amplitude = 1.0;
            let mut frequency = 1.0;
            let mut noise_height = 0.0;

            for offset in &offsets {
                let sample_x = (x as f64 - half_width + offset[0]) / scale * frequency;
                let sample_y = (y as f64 - half_height + offset[1]) / scale * frequency;
                noise_height += (2.0 * coherent(&perlin, sample_x, sample_y) - 1.0) * amplitude;

                amplitude *= persistence;
                frequency *= lacunarity;
            }

            local_min = local_min.min(noise_height);
            local_max = local_max.max(noise_height);
            raw.push(noise_height);
        }
    }

    let mut grid = Grid::new(width, height);
    for (cell, &value) in grid.values_mut().iter_mut().zip(&raw) {
        *cell = match settings.normalize_mode {
            NormalizeMode::Local => inverse_lerp(local_min, local_max, value) as f32,
            NormalizeMode::Global => ((value + 1.0) / max_possible_height).max(0.0) as f32,
        };
    }
    grid
}

/// 2D Perlin noise remapped from roughly `[-1, 1]` onto `[0, 1]`.
#[inline]
fn coherent(perlin: &Perlin, x: f64, y: f64) -> f64 {
    ((perlin.get([x, y]) + 1.0) * 0.5).clamp(0.0, 1.0)
}

/// Position of `value` between `a` and `b` as a fraction in `[0, 1]`; 0 when `a == b`.
#[inline]
fn inverse_lerp(a: f64, b: f64, value: f64) -> f64 {
    if a == b {
        0.0
    } else {
        ((value - a) / (b - a)).clamp(0.0, 1.0)
    }
}
