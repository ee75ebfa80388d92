//! Grayscale preview images of heightfields and falloff masks.

use image::{GrayImage, Luma};

use crate::falloff::FalloffMask;
use crate::grid::Grid;
use crate::heightmap::Heightfield;

/// Render `grid` black at `min` to white at `max`.
pub fn grid_to_image(grid: &Grid, min: f32, max: f32) -> GrayImage {
    let range = max - min;
    GrayImage::from_fn(grid.width() as u32, grid.height() as u32, |x, y| {
        let v = grid.get(x as usize, y as usize);
        let t = if range > 0.0 { ((v - min) / range).clamp(0.0, 1.0) } else { 0.0 };
        Luma([(t * 255.0).round() as u8])
    })
}

/// Preview of a heightfield scaled across its observed range.
pub fn heightfield_to_image(heightfield: &Heightfield) -> GrayImage {
    grid_to_image(
        heightfield.values(),
        heightfield.min_value(),
        heightfield.max_value(),
    )
}

/// Preview of a falloff mask over `[0, 1]`.
pub fn falloff_to_image(mask: &FalloffMask) -> GrayImage {
    grid_to_image(mask.grid(), 0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heightfield_extremes_map_to_black_and_white() {
        let hf = Heightfield::from_grid(Grid::from_fn(4, 1, |x, _| x as f32 * 2.0 - 3.0));
        let img = heightfield_to_image(&hf);
        assert_eq!(img.dimensions(), (4, 1));
        assert_eq!(img.get_pixel(0, 0)[0], 0);
        assert_eq!(img.get_pixel(3, 0)[0], 255);
    }

    #[test]
    fn test_flat_heightfield_is_black() {
        let img = heightfield_to_image(&Heightfield::flat(3, 3, 5.0));
        assert!(img.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_falloff_preview_dark_center() {
        let img = falloff_to_image(&FalloffMask::generate(32));
        assert_eq!(img.get_pixel(16, 16)[0], 0);
        assert_eq!(img.get_pixel(0, 0)[0], 255);
    }
}
