//! Terrain inputs for grass placement: mask, heightmap, reference point

pub mod heightmap;
pub mod mask;
pub mod reference;

pub use heightmap::{Heightmap, HeightmapParams};
pub use mask::PlacementMask;
pub use reference::ReferencePoint;
