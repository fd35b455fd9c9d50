//! Axis-aligned bounds for chunks and the grass field

use crate::core::types::Vec3;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center_half_extent(center: Vec3, half_extent: Vec3) -> Self {
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    /// Union of all boxes; `None` for an empty set
    pub fn enclosing<'a>(boxes: impl IntoIterator<Item = &'a Aabb>) -> Option<Aabb> {
        boxes
            .into_iter()
            .copied()
            .reduce(|acc, b| acc.merged(&b))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn half_extent(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// Inclusive on every face
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    pub fn merged(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_style_bound() {
        // 16-unit chunk, 10 high terrain: half extent is a full chunk horizontally
        let bound = Aabb::from_center_half_extent(Vec3::new(8.0, 5.0, 8.0), Vec3::new(16.0, 6.0, 16.0));
        assert_eq!(bound.min, Vec3::new(-8.0, -1.0, -8.0));
        assert_eq!(bound.max, Vec3::new(24.0, 11.0, 24.0));
        assert_eq!(bound.center(), Vec3::new(8.0, 5.0, 8.0));
        assert_eq!(bound.half_extent(), Vec3::new(16.0, 6.0, 16.0));
    }

    #[test]
    fn test_contains_point_inclusive() {
        let bound = Aabb::new(Vec3::ZERO, Vec3::splat(4.0));
        assert!(bound.contains_point(Vec3::splat(2.0)));
        assert!(bound.contains_point(Vec3::splat(4.0)));
        assert!(!bound.contains_point(Vec3::new(2.0, 4.5, 2.0)));
    }

    #[test]
    fn test_enclosing_grid_of_chunks() {
        let chunks: Vec<Aabb> = (0..3)
            .map(|i| Aabb::new(Vec3::new(i as f32 * 10.0, 0.0, 0.0), Vec3::new(i as f32 * 10.0 + 10.0, 2.0, 10.0)))
            .collect();
        let field = Aabb::enclosing(&chunks).unwrap();
        assert_eq!(field.min, Vec3::ZERO);
        assert_eq!(field.max, Vec3::new(30.0, 2.0, 10.0));
        assert_eq!(field.size(), Vec3::new(30.0, 2.0, 10.0));
    }

    #[test]
    fn test_enclosing_nothing() {
        assert!(Aabb::enclosing(&[]).is_none());
    }
}
