//! Bounds, rays and frustum planes for chunk culling and ground queries

pub mod aabb;
pub mod frustum;
pub mod ray;

pub use aabb::Aabb;
pub use frustum::{Frustum, Plane};
pub use ray::Ray;
