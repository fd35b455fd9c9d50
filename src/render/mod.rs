//! GPU context, buffer helpers and draw commands

pub mod buffer;
pub mod context;
pub mod draw;

pub use context::GpuContext;
pub use draw::{DrawCommand, FrameDraws};
