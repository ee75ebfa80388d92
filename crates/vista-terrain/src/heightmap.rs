//! Heightfield synthesis: noise → optional falloff → response curve → elevation.

use std::sync::Arc;

use dashmap::DashMap;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::curve::HeightCurve;
use crate::falloff::FalloffMask;
use crate::grid::Grid;
use crate::noise_map::{NoiseSettings, generate_noise_map};

/// Everything needed to turn noise into calibrated elevation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightMapSettings {
    /// Source noise parameters.
    pub noise: NoiseSettings,
    /// Scalar applied after the response curve.
    pub height_multiplier: f32,
    /// Response curve applied to each normalized sample.
    pub height_curve: HeightCurve,
    /// Subtract a radial falloff mask before the curve.
    pub use_falloff: bool,
}

impl Default for HeightMapSettings {
    fn default() -> Self {
        Self {
            noise: NoiseSettings::default(),
            height_multiplier: 30.0,
            height_curve: HeightCurve::linear(),
            use_falloff: false,
        }
    }
}

impl HeightMapSettings {
    /// Lowest elevation the settings can produce.
    pub fn min_height(&self) -> f32 {
        self.height_multiplier * self.height_curve.evaluate(0.0)
    }

    /// Highest elevation the settings can produce.
    pub fn max_height(&self) -> f32 {
        self.height_multiplier * self.height_curve.evaluate(1.0)
    }
}

/// A grid of elevations plus the min/max observed while building it.
///
/// Immutable once built; chunks share it with their mesh jobs through an `Arc`.
#[derive(Clone, Debug, PartialEq)]
pub struct Heightfield {
    values: Grid,
    min_value: f32,
    max_value: f32,
}

impl Heightfield {
    /// Wrap a grid, computing its observed range.
    pub fn from_grid(values: Grid) -> Self {
        let (min_value, max_value) = values.min_max();
        Self {
            values,
            min_value,
            max_value,
        }
    }

    /// A heightfield with every cell at `elevation`.
    pub fn flat(width: usize, height: usize, elevation: f32) -> Self {
        Self::from_grid(Grid::from_fn(width, height, |_, _| elevation))
    }

    pub fn width(&self) -> usize {
        self.values.width()
    }

    pub fn height(&self) -> usize {
        self.values.height()
    }

    /// Elevation at `(x, y)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values.get(x, y)
    }

    pub fn min_value(&self) -> f32 {
        self.min_value
    }

    pub fn max_value(&self) -> f32 {
        self.max_value
    }

    pub fn values(&self) -> &Grid {
        &self.values
    }
}

/// Builds heightfields. Safe to share between worker threads.
///
/// Falloff masks are pure in their size and cached here; every build creates
/// its own curve evaluator so concurrent builds never share evaluation state.
#[derive(Debug, Default)]
pub struct HeightMapBuilder {
    falloff_cache: DashMap<usize, Arc<FalloffMask>>,
}

impl HeightMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Falloff mask of the given size, generated on first use.
    pub fn falloff(&self, size: usize) -> Arc<FalloffMask> {
        self.falloff_cache
            .entry(size)
            .or_insert_with(|| Arc::new(FalloffMask::generate(size)))
            .clone()
    }

    /// Build a `width` x `height` heightfield centred on `sample_center`.
    pub fn build(
        &self,
        width: usize,
        height: usize,
        settings: &HeightMapSettings,
        sample_center: Vec2,
    ) -> Heightfield {
        let mut values = generate_noise_map(width, height, &settings.noise, sample_center);

        if settings.use_falloff {
            let mask = self.falloff(width.max(height));
            for y in 0..height {
                for x in 0..width {
                    let v = values.get(x, y) - mask.value(x, y);
                    values.set(x, y, v.clamp(0.0, 1.0));
                }
            }
        }

        let mut curve = settings.height_curve.evaluator();
        for v in values.values_mut() {
            *v = curve.evaluate(*v) * settings.height_multiplier;
        }

        Heightfield::from_grid(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::CurveKey;
    use crate::noise_map::NormalizeMode;

    const EPSILON: f32 = 1e-4;

    fn settings() -> HeightMapSettings {
        HeightMapSettings {
            noise: NoiseSettings {
                seed: 9,
                scale: 20.0,
                octaves: 4,
                ..Default::default()
            },
            height_multiplier: 10.0,
            height_curve: HeightCurve::linear(),
            use_falloff: false,
        }
    }

    #[test]
    fn test_linear_curve_scales_noise() {
        let s = settings();
        let builder = HeightMapBuilder::new();
        let hf = builder.build(40, 40, &s, Vec2::ZERO);
        let noise = generate_noise_map(40, 40, &s.noise, Vec2::ZERO);

        for y in 0..40 {
            for x in 0..40 {
                let expected = noise.get(x, y) * 10.0;
                assert!((hf.get(x, y) - expected).abs() < EPSILON);
            }
        }
        assert!((hf.max_value() - 10.0).abs() < EPSILON, "local noise peaks at 1");
        assert!(hf.min_value().abs() < EPSILON, "local noise bottoms at 0");
    }

    #[test]
    fn test_min_max_tracks_values() {
        let hf = HeightMapBuilder::new().build(32, 24, &settings(), Vec2::new(5.0, 5.0));
        assert_eq!((hf.width(), hf.height()), (32, 24));
        let (lo, hi) = hf.values().min_max();
        assert_eq!(hf.min_value(), lo);
        assert_eq!(hf.max_value(), hi);
    }

    #[test]
    fn test_falloff_sinks_edges() {
        let mut s = settings();
        s.use_falloff = true;
        s.noise.normalize_mode = NormalizeMode::Global;
        let hf = HeightMapBuilder::new().build(48, 48, &s, Vec2::ZERO);
        assert!(hf.get(0, 0).abs() < EPSILON, "corner should be fully attenuated");
        for &v in hf.values().values() {
            assert!((0.0..=10.0 + EPSILON).contains(&v));
        }
    }

    #[test]
    fn test_falloff_masks_are_cached() {
        let builder = HeightMapBuilder::new();
        let a = builder.falloff(33);
        let b = builder.falloff(33);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_min_max_height_from_curve() {
        let s = HeightMapSettings {
            height_multiplier: 20.0,
            height_curve: HeightCurve::new(vec![
                CurveKey::new(0.0, 0.1, 0.0),
                CurveKey::new(1.0, 0.9, 0.0),
            ]),
            ..Default::default()
        };
        assert!((s.min_height() - 2.0).abs() < EPSILON);
        assert!((s.max_height() - 18.0).abs() < EPSILON);
    }

    #[test]
    fn test_concurrent_builds_match_sequential() {
        let builder = Arc::new(HeightMapBuilder::new());
        let mut s = settings();
        s.use_falloff = true;
        s.height_curve = HeightCurve::new(vec![
            CurveKey::new(0.0, 0.0, 0.0),
            CurveKey::new(0.3, 0.05, 0.2),
            CurveKey::new(1.0, 1.0, 2.5),
        ]);
        let s = Arc::new(s);
        let centers: Vec<Vec2> = (0..6).map(|i| Vec2::new(i as f32 * 24.0, 0.0)).collect();
        let expected: Vec<Heightfield> = centers
            .iter()
            .map(|&c| builder.build(29, 29, &s, c))
            .collect();

        let handles: Vec<_> = centers
            .iter()
            .map(|&c| {
                let builder = Arc::clone(&builder);
                let s = Arc::clone(&s);
                std::thread::spawn(move || builder.build(29, 29, &s, c))
            })
            .collect();

        for (handle, expected) in handles.into_iter().zip(expected) {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }
}
