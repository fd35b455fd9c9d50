//! Sward - GPU-resident grass placement, culling and stream compaction

pub mod core;
pub mod math;
pub mod render;
pub mod compaction;
pub mod grass;
pub mod terrain;
pub mod wind;
