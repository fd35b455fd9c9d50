//! GPU stream compaction: vote -> local scan -> group-sum scan -> compact.
//!
//! Turns a chunk's instance buffer into a tight, order-preserving buffer of
//! the instances that survive culling, and writes the survivor count into
//! the chunk's indirect draw arguments. Nothing is read back to the CPU.

pub mod dispatch;
pub mod engine;
pub mod scratch;

pub use dispatch::DispatchPlan;
pub use engine::{check_device_limits, cull_shader_source, CompactionEngine, CullTarget};
pub use scratch::{CullPass, ScanScratch};
