//! glam re-exports and the crate `Result`

pub use glam::{Mat4, Vec2, Vec3, Vec4};

pub type Result<T> = std::result::Result<T, crate::core::error::Error>;
