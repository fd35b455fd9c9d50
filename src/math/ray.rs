//! Rays for ground queries against the terrain bound

use crate::core::types::Vec3;
use super::aabb::Aabb;

#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction
    pub direction: Vec3,
    inv_direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            inv_direction: direction.recip(),
        }
    }

    /// Straight down from `origin`
    pub fn down(origin: Vec3) -> Self {
        Self::new(origin, Vec3::NEG_Y)
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Slab test. Returns the `(enter, exit)` parameters, with `enter`
    /// clamped to 0 when the origin is inside.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> Option<(f32, f32)> {
        let t1 = (aabb.min - self.origin) * self.inv_direction;
        let t2 = (aabb.max - self.origin) * self.inv_direction;

        let enter = t1.min(t2).max_element();
        let exit = t1.max(t2).min_element();

        (enter <= exit && exit >= 0.0).then(|| (enter.max(0.0), exit))
    }
}
