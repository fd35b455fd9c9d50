//! View frustum for culling

use crate::core::types::{Vec3, Vec4, Mat4};
use super::aabb::Aabb;

/// A plane defined by normal and distance from origin
#[derive(Clone, Copy, Debug)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// Signed distance from point to plane (positive = in front)
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    /// Packed as `vec4(normal, distance)` for shader uniforms
    pub fn to_array(&self) -> [f32; 4] {
        [self.normal.x, self.normal.y, self.normal.z, self.distance]
    }
}

/// View frustum with 6 planes (Near, Far, Left, Right, Top, Bottom)
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract frustum planes from a view-projection matrix (Gribb/Hartmann).
    ///
    /// Clip depth is wgpu's 0..w range, so the near plane is row2 alone.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let row = |i: usize| Vec4::new(vp.col(0)[i], vp.col(1)[i], vp.col(2)[i], vp.col(3)[i]);
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        let near = Self::normalize_plane(r2);
        let far = Self::normalize_plane(r3 - r2);
        let left = Self::normalize_plane(r3 + r0);
        let right = Self::normalize_plane(r3 - r0);
        let top = Self::normalize_plane(r3 - r1);
        let bottom = Self::normalize_plane(r3 + r1);

        Self {
            planes: [near, far, left, right, top, bottom],
        }
    }

    fn normalize_plane(plane: Vec4) -> Plane {
        let normal = plane.truncate();
        let len = normal.length();
        if len > 0.0 {
            Plane {
                normal: normal / len,
                distance: plane.w / len,
            }
        } else {
            Plane::new(Vec3::ZERO, plane.w)
        }
    }

    /// Check if point is inside frustum
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.contains_point_with_margin(point, 0.0)
    }

    /// Point test with slack: points up to `margin` outside a plane still pass.
    /// Mirrors the per-instance test in `grass_cull.wgsl`.
    pub fn contains_point_with_margin(&self, point: Vec3, margin: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(point) >= -margin)
    }

    /// Check if AABB intersects frustum (conservative test)
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        for plane in &self.planes {
            // Find the corner most aligned with plane normal (p-vertex)
            let p = Vec3::new(
                if plane.normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if plane.normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if plane.normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );

            // If p-vertex is outside, AABB is completely outside
            if plane.distance_to_point(p) < 0.0 {
                return false;
            }
        }
        true
    }

    /// Planes packed for the cull uniform
    pub fn gpu_planes(&self) -> [[f32; 4]; 6] {
        self.planes.map(|p| p.to_array())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::camera::Camera;

    /// Eye 2 units above the ground at the origin, looking down +z
    fn ground_view() -> Frustum {
        let camera = Camera::look_at(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 2.0, 10.0), Vec3::Y).with_far(100.0);
        Frustum::from_view_projection(&camera.state().view_projection())
    }

    #[test]
    fn test_planes_normalized() {
        for plane in &ground_view().planes {
            assert!((plane.normal.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_blades_ahead_and_behind() {
        let frustum = ground_view();
        assert!(frustum.contains_point(Vec3::new(0.0, 0.5, 10.0)));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.5, -10.0)));
        // Past the far plane
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.5, 150.0)));
    }

    #[test]
    fn test_near_plane_uses_zero_depth() {
        let frustum = ground_view();
        // Between the eye and the 0.1 near plane
        assert!(!frustum.contains_point(Vec3::new(0.0, 2.0, 0.05)));
        assert!(frustum.contains_point(Vec3::new(0.0, 2.0, 0.2)));
    }

    #[test]
    fn test_margin_admits_blades_past_the_edge() {
        let frustum = ground_view();
        // Half width at depth 10 is 10 * tan(30deg) * 16/9 ~= 10.26
        let p = Vec3::new(10.6, 2.0, 10.0);
        assert!(!frustum.contains_point(p));
        assert!(frustum.contains_point_with_margin(p, 0.5));
    }

    #[test]
    fn test_chunk_bounds() {
        let frustum = ground_view();
        let ahead = Aabb::new(Vec3::new(-8.0, 0.0, 8.0), Vec3::new(8.0, 1.0, 24.0));
        let behind = Aabb::new(Vec3::new(-8.0, 0.0, -24.0), Vec3::new(8.0, 1.0, -8.0));
        // Straddles the eye: partly visible
        let around = Aabb::new(Vec3::new(-8.0, 0.0, -8.0), Vec3::new(8.0, 1.0, 8.0));
        assert!(frustum.intersects_aabb(&ahead));
        assert!(!frustum.intersects_aabb(&behind));
        assert!(frustum.intersects_aabb(&around));
    }

    #[test]
    fn test_gpu_planes_layout() {
        let frustum = ground_view();
        let packed = frustum.gpu_planes();
        assert_eq!(packed[0][3], frustum.planes[0].distance);
        assert_eq!(packed[5][1], frustum.planes[5].normal.y);
    }
}
