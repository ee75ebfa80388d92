//! Radial falloff mask used to sink the edges of a single-island heightfield.

use crate::grid::Grid;

/// Steepness exponent of the falloff curve.
const FALLOFF_A: f32 = 3.0;
/// Shift of the falloff curve's midpoint towards the edge.
const FALLOFF_B: f32 = 2.2;

/// Square grid of attenuation values in `[0, 1]`: ~0 in the middle, ~1 at the rim.
#[derive(Clone, Debug, PartialEq)]
pub struct FalloffMask {
    grid: Grid,
}

impl FalloffMask {
    /// Generate a `size` x `size` mask. Pure in `size`, so results can be cached.
    pub fn generate(size: usize) -> Self {
        let grid = Grid::from_fn(size, size, |i, j| {
            let x = i as f32 / size as f32 * 2.0 - 1.0;
            let y = j as f32 / size as f32 * 2.0 - 1.0;
            evaluate(x.abs().max(y.abs()))
        });
        Self { grid }
    }

    /// Side length of the mask.
    pub fn size(&self) -> usize {
        self.grid.width()
    }

    /// Attenuation at `(x, y)`.
    #[inline]
    pub fn value(&self, x: usize, y: usize) -> f32 {
        self.grid.get(x, y)
    }

    /// Underlying grid, for previews.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }
}

#[inline]
fn evaluate(d: f32) -> f32 {
    let near = d.powf(FALLOFF_A);
    near / (near + (FALLOFF_B - FALLOFF_B * d).powf(FALLOFF_A))
}
