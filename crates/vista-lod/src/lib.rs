//! Level-of-detail selection: distance thresholds per detail level and the
//! chunk bounds distances they are compared against.

mod bounds;
mod levels;

pub use bounds::Bounds2;
pub use levels::{LodLevel, LodTable, LodTableError};
