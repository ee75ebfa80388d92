//! Keyframed response curve mapping normalized noise onto elevation.
//!
//! Keys are interpolated with cubic Hermite segments. Evaluation state (the
//! cached segment index) lives in a [`CurveEvaluator`], never in the curve
//! itself, so every concurrent heightfield build works on a private evaluator.

use serde::{Deserialize, Serialize};

/// One keyframe of a [`HeightCurve`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    /// Input position of the key.
    pub time: f32,
    /// Output value at `time`.
    pub value: f32,
    /// Slope arriving at this key.
    #[serde(default)]
    pub in_tangent: f32,
    /// Slope leaving this key.
    #[serde(default)]
    pub out_tangent: f32,
}

impl CurveKey {
    /// A key with equal in/out tangents.
    pub fn new(time: f32, value: f32, tangent: f32) -> Self {
        Self {
            time,
            value,
            in_tangent: tangent,
            out_tangent: tangent,
        }
    }
}

/// Piecewise cubic Hermite curve, clamped to its end values outside the key range.
///
/// Keys are kept sorted by time; unsorted input is sorted rather than rejected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<CurveKey>", into = "Vec<CurveKey>")]
pub struct HeightCurve {
    keys: Vec<CurveKey>,
}

impl Default for HeightCurve {
    fn default() -> Self {
        Self::linear()
    }
}

impl From<Vec<CurveKey>> for HeightCurve {
    fn from(keys: Vec<CurveKey>) -> Self {
        Self::new(keys)
    }
}

impl From<HeightCurve> for Vec<CurveKey> {
    fn from(curve: HeightCurve) -> Self {
        curve.keys
    }
}

impl HeightCurve {
    /// Build a curve from arbitrary keys.
    pub fn new(mut keys: Vec<CurveKey>) -> Self {
        keys.retain(|k| k.time.is_finite() && k.value.is_finite());
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys }
    }

    /// The identity response `f(t) = t` on `[0, 1]`.
    pub fn linear() -> Self {
        Self::new(vec![CurveKey::new(0.0, 0.0, 1.0), CurveKey::new(1.0, 1.0, 1.0)])
    }

    /// A flat response returning `value` everywhere.
    pub fn constant(value: f32) -> Self {
        Self::new(vec![CurveKey::new(0.0, value, 0.0)])
    }

    /// Sorted keys.
    pub fn keys(&self) -> &[CurveKey] {
        &self.keys
    }

    /// Create an evaluator with its own segment cache.
    pub fn evaluator(&self) -> CurveEvaluator<'_> {
        CurveEvaluator {
            keys: &self.keys,
            segment: 0,
        }
    }

    /// One-off evaluation. Prefer [`HeightCurve::evaluator`] in loops.
    pub fn evaluate(&self, t: f32) -> f32 {
        self.evaluator().evaluate(t)
    }
}

/// Evaluates a [`HeightCurve`], remembering the last segment it landed in.
///
/// Not shareable between threads by design of its `&mut self` API: each
/// computation creates its own.
#[derive(Debug)]
pub struct CurveEvaluator<'a> {
    keys: &'a [CurveKey],
    segment: usize,
}

impl CurveEvaluator<'_> {
    /// Value of the curve at `t`.
    pub fn evaluate(&mut self, t: f32) -> f32 {
        let keys = self.keys;
        match keys {
            [] => 0.0,
            [only] => only.value,
            [first, .., last] => {
                if t <= first.time {
                    return first.value;
                }
                if t >= last.time {
                    return last.value;
                }
                let i = self.locate(t);
                hermite(&keys[i], &keys[i + 1], t)
            }
        }
    }

    /// Index `i` such that `keys[i].time <= t < keys[i + 1].time`.
    fn locate(&mut self, t: f32) -> usize {
        let keys = self.keys;
        let cached = self.segment;
        if cached + 1 < keys.len() && keys[cached].time <= t && t < keys[cached + 1].time {
            return cached;
        }
        let upper = keys.partition_point(|k| k.time <= t);
        self.segment = upper.saturating_sub(1).min(keys.len() - 2);
        self.segment
    }
}

#[inline]
fn hermite(k0: &CurveKey, k1: &CurveKey, t: f32) -> f32 {
    let dt = k1.time - k0.time;
    if dt <= f32::EPSILON {
        return k0.value;
    }
    let s = (t - k0.time) / dt;
    let s2 = s * s;
    let s3 = s2 * s;

    let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
    let h10 = s3 - 2.0 * s2 + s;
    let h01 = -2.0 * s3 + 3.0 * s2;
    let h11 = s3 - s2;

    h00 * k0.value + h10 * dt * k0.out_tangent + h01 * k1.value + h11 * dt * k1.in_tangent
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_linear_is_identity() {
        let curve = HeightCurve::linear();
        let mut eval = curve.evaluator();
        for i in 0..=100 {
            let t = i as f32 / 100.0;
            assert!((eval.evaluate(t) - t).abs() < EPSILON, "f({t}) != {t}");
        }
    }

    #[test]
    fn test_clamped_outside_key_range() {
        let curve = HeightCurve::linear();
        assert_eq!(curve.evaluate(-3.0), 0.0);
        assert_eq!(curve.evaluate(7.0), 1.0);
    }

    #[test]
    fn test_hits_key_values() {
        let curve = HeightCurve::new(vec![
            CurveKey::new(0.0, 0.0, 0.0),
            CurveKey::new(0.4, 0.05, 0.0),
            CurveKey::new(1.0, 1.0, 2.0),
        ]);
        assert!((curve.evaluate(0.4) - 0.05).abs() < EPSILON);
        assert!((curve.evaluate(1.0) - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_unsorted_keys_are_sorted() {
        let curve = HeightCurve::new(vec![
            CurveKey::new(1.0, 1.0, 1.0),
            CurveKey::new(0.0, 0.0, 1.0),
        ]);
        assert_eq!(curve.keys()[0].time, 0.0);
        assert!((curve.evaluate(0.5) - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_evaluator_cache_handles_random_access() {
        let curve = HeightCurve::new(vec![
            CurveKey::new(0.0, 0.0, 0.0),
            CurveKey::new(0.25, 0.1, 0.5),
            CurveKey::new(0.5, 0.3, 1.0),
            CurveKey::new(0.75, 0.6, 1.5),
            CurveKey::new(1.0, 1.0, 2.0),
        ]);
        let mut cached = curve.evaluator();
        for t in [0.9, 0.1, 0.6, 0.6, 0.3, 0.99, 0.0, 0.5] {
            let fresh = curve.evaluator().evaluate(t);
            assert_eq!(cached.evaluate(t), fresh, "cache changed result at t={t}");
        }
    }

    #[test]
    fn test_constant_and_empty_curves() {
        assert_eq!(HeightCurve::constant(0.3).evaluate(0.8), 0.3);
        assert_eq!(HeightCurve::new(Vec::new()).evaluate(0.8), 0.0);
    }

    #[test]
    fn test_independent_evaluators_across_threads() {
        let curve = std::sync::Arc::new(HeightCurve::new(vec![
            CurveKey::new(0.0, 0.0, 0.0),
            CurveKey::new(0.5, 0.2, 0.8),
            CurveKey::new(1.0, 1.0, 2.0),
        ]));
        let expected: Vec<f32> = (0..256).map(|i| curve.evaluate(i as f32 / 255.0)).collect();

        let handles: Vec<_> = (0..4)
            .map(|n| {
                let curve = std::sync::Arc::clone(&curve);
                std::thread::spawn(move || {
                    let mut eval = curve.evaluator();
                    (0..256)
                        .map(|i| {
                            let idx = if n % 2 == 0 { i } else { 255 - i };
                            (idx, eval.evaluate(idx as f32 / 255.0))
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            for (idx, value) in handle.join().unwrap() {
                assert_eq!(value, expected[idx]);
            }
        }
    }

    #[test]
    fn test_serde_sorts_keys() {
        let curve: HeightCurve =
            ron::from_str("[(time: 1.0, value: 1.0), (time: 0.0, value: 0.0)]").unwrap();
        assert_eq!(curve.keys()[0].time, 0.0);
    }
}
