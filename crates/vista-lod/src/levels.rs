//! Distance-based detail level selection.

use serde::{Deserialize, Serialize};

/// One detail level: the mesh LOD to use and how far away it stays in use.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LodLevel {
    /// Mesh LOD index (0 = full resolution).
    pub lod: usize,
    /// Largest viewer distance, measured to the chunk's nearest edge, for which
    /// this level is selected.
    pub visible_distance: f32,
}

impl LodLevel {
    pub fn new(lod: usize, visible_distance: f32) -> Self {
        Self {
            lod,
            visible_distance,
        }
    }
}

/// Errors from [`LodTable::new`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LodTableError {
    #[error("lod table must have at least one level")]
    Empty,
    #[error("level {index} has non-positive distance {distance}")]
    NonPositive { index: usize, distance: f32 },
    #[error("level {index} distance {distance} does not exceed the previous level's {previous}")]
    NotIncreasing {
        index: usize,
        distance: f32,
        previous: f32,
    },
}

/// Detail levels ordered by strictly increasing visible distance.
///
/// The last distance doubles as the streaming radius: chunks further than it
/// are hidden.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LodLevel>", into = "Vec<LodLevel>")]
pub struct LodTable {
    levels: Vec<LodLevel>,
}

impl Default for LodTable {
    fn default() -> Self {
        Self {
            levels: vec![
                LodLevel::new(0, 200.0),
                LodLevel::new(1, 400.0),
                LodLevel::new(2, 600.0),
                LodLevel::new(4, 900.0),
            ],
        }
    }
}

impl TryFrom<Vec<LodLevel>> for LodTable {
    type Error = LodTableError;

    fn try_from(levels: Vec<LodLevel>) -> Result<Self, Self::Error> {
        Self::new(levels)
    }
}

impl From<LodTable> for Vec<LodLevel> {
    fn from(table: LodTable) -> Self {
        table.levels
    }
}

impl LodTable {
    /// Validate and wrap `levels`.
    pub fn new(levels: Vec<LodLevel>) -> Result<Self, LodTableError> {
        if levels.is_empty() {
            return Err(LodTableError::Empty);
        }
        for (index, level) in levels.iter().enumerate() {
            let distance = level.visible_distance;
            if !(distance > 0.0) {
                return Err(LodTableError::NonPositive { index, distance });
            }
            if index > 0 {
                let previous = levels[index - 1].visible_distance;
                if distance <= previous {
                    return Err(LodTableError::NotIncreasing {
                        index,
                        distance,
                        previous,
                    });
                }
            }
        }
        Ok(Self { levels })
    }

    pub fn levels(&self) -> &[LodLevel] {
        &self.levels
    }

    /// Level at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&LodLevel> {
        self.levels.get(index)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Distance beyond which nothing is visible.
    pub fn max_view_distance(&self) -> f32 {
        self.levels
            .last()
            .map_or(0.0, |level| level.visible_distance)
    }

    /// Index of the first level whose distance is not exceeded by `distance`.
    ///
    /// Returns 0 inside the first threshold and the last index beyond every
    /// threshold. A distance exactly on a threshold stays on the finer level.
    pub fn select(&self, distance: f32) -> usize {
        let last = self.levels.len().saturating_sub(1);
        self.levels[..last]
            .iter()
            .position(|level| distance <= level.visible_distance)
            .unwrap_or(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LodTable {
        LodTable::new(vec![
            LodLevel::new(0, 100.0),
            LodLevel::new(1, 200.0),
            LodLevel::new(3, 400.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_zero_distance_selects_first_level() {
        assert_eq!(table().select(0.0), 0);
    }

    #[test]
    fn test_threshold_boundary_behavior() {
        let t = table();
        assert_eq!(t.select(100.0), 0);
        assert_eq!(t.select(100.01), 1);
        assert_eq!(t.select(200.0), 1);
        assert_eq!(t.select(250.0), 2);
    }

    #[test]
    fn test_far_distance_returns_last_level() {
        let t = table();
        assert_eq!(t.select(400.0), 2);
        assert_eq!(t.select(10_000.0), 2);
        assert_eq!(t.select(f32::MAX), 2);
    }

    #[test]
    fn test_monotonically_non_decreasing_with_distance() {
        let t = table();
        let mut prev = 0;
        for d in [0.0, 50.0, 100.0, 150.0, 200.0, 300.0, 400.0, 5000.0] {
            let index = t.select(d);
            assert!(index >= prev, "index must not decrease: d={d}, index={index}, prev={prev}");
            prev = index;
        }
    }

    #[test]
    fn test_single_level_table() {
        let t = LodTable::new(vec![LodLevel::new(2, 50.0)]).unwrap();
        assert_eq!(t.select(0.0), 0);
        assert_eq!(t.select(1000.0), 0);
        assert_eq!(t.max_view_distance(), 50.0);
    }

    #[test]
    fn test_max_view_distance_is_last_threshold() {
        assert_eq!(table().max_view_distance(), 400.0);
        assert_eq!(LodTable::default().max_view_distance(), 900.0);
    }

    #[test]
    fn test_invalid_tables_rejected() {
        assert_eq!(LodTable::new(Vec::new()), Err(LodTableError::Empty));
        assert!(matches!(
            LodTable::new(vec![LodLevel::new(0, 0.0)]),
            Err(LodTableError::NonPositive { index: 0, .. })
        ));
        assert!(matches!(
            LodTable::new(vec![LodLevel::new(0, 100.0), LodLevel::new(1, 50.0)]),
            Err(LodTableError::NotIncreasing { index: 1, .. })
        ));
        assert!(matches!(
            LodTable::new(vec![LodLevel::new(0, 100.0), LodLevel::new(1, 100.0)]),
            Err(LodTableError::NotIncreasing { index: 1, .. })
        ));
    }

    #[test]
    fn test_default_table_is_valid() {
        let levels: Vec<LodLevel> = LodTable::default().into();
        assert!(LodTable::new(levels).is_ok());
    }
}
