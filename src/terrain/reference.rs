//! Auxiliary reference marker kept resting on the terrain

use glam::Vec3;

use crate::grass::config::GrassConfig;
use crate::math::{Aabb, Ray};
use crate::terrain::Heightmap;

/// Bisection steps after the march brackets the surface
const REFINE_STEPS: u32 = 8;

/// A point recentred over the terrain and dropped onto its surface
#[derive(Clone, Copy, Debug)]
pub struct ReferencePoint {
    pub position: Vec3,
    /// Height above the ground the point rests at
    pub hover: f32,
}

impl Default for ReferencePoint {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            hover: 1.0,
        }
    }
}

impl ReferencePoint {
    pub fn new(hover: f32) -> Self {
        Self { hover, ..Default::default() }
    }

    /// Move to the terrain centre and cast down onto the heightmap.
    /// Returns the ground height hit, or `None` when the ray misses.
    pub fn update(&mut self, heightmap: &Heightmap, config: &GrassConfig) -> Option<f32> {
        let origin = Vec3::from(config.terrain_origin);
        let size = config.terrain_world_size();
        let bounds = Aabb::new(
            origin,
            origin + Vec3::new(size, config.height_scale.max(f32::EPSILON), size),
        );

        let center = bounds.center();
        let ray = Ray::down(Vec3::new(center.x, bounds.max.y + self.hover + 1.0, center.z));
        let ground = march(&ray, &bounds, heightmap, config)?;

        self.position = Vec3::new(center.x, ground + self.hover, center.z);
        Some(ground)
    }
}

/// World height of the terrain surface under (x, z)
pub fn ground_height(heightmap: &Heightmap, config: &GrassConfig, x: f32, z: f32) -> f32 {
    let size = config.terrain_world_size();
    let u = (x - config.terrain_origin[0]) / size;
    let v = (z - config.terrain_origin[2]) / size;
    config.terrain_origin[1] + heightmap.sample_uv(u, v) * config.height_scale
}

fn march(ray: &Ray, bounds: &Aabb, heightmap: &Heightmap, config: &GrassConfig) -> Option<f32> {
    let (t_enter, t_exit) = ray.intersects_aabb(bounds)?;
    let step = (config.cell_size * 0.5).max(1e-3);

    let above = |t: f32| {
        let p = ray.at(t);
        p.y > ground_height(heightmap, config, p.x, p.z)
    };

    let mut t_prev = t_enter;
    let mut t = t_enter;
    while t <= t_exit + step {
        if !above(t) {
            // Bracketed between t_prev (above) and t (below)
            let (mut lo, mut hi) = (t_prev, t);
            for _ in 0..REFINE_STEPS {
                let mid = 0.5 * (lo + hi);
                if above(mid) {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            let hit = ray.at(hi);
            return Some(ground_height(heightmap, config, hit.x, hit.z));
        }
        t_prev = t;
        t += step;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GrassConfig {
        GrassConfig {
            terrain_dimension: 64,
            cell_size: 1.0,
            terrain_origin: [10.0, 5.0, -20.0],
            height_scale: 20.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_rests_on_flat_ground() {
        let config = config();
        let heightmap = Heightmap::flat(64, 0.5);
        let mut point = ReferencePoint::default();

        let ground = point.update(&heightmap, &config).unwrap();
        assert!((ground - 15.0).abs() < 1e-3);
        assert!((point.position.y - 16.0).abs() < 1e-3);
        assert_eq!(point.position.x, 42.0);
        assert_eq!(point.position.z, 12.0);
    }

    #[test]
    fn test_hover_offset() {
        let config = config();
        let heightmap = Heightmap::flat(64, 0.0);
        let mut point = ReferencePoint::new(3.0);
        point.update(&heightmap, &config).unwrap();
        assert!((point.position.y - 8.0).abs() < 1e-3);
    }

    #[test]
    fn test_follows_procedural_terrain() {
        let config = config();
        let heightmap = Heightmap::generate(64, &Default::default());
        let mut point = ReferencePoint::default();

        let ground = point.update(&heightmap, &config).unwrap();
        let expected = ground_height(&heightmap, &config, point.position.x, point.position.z);
        assert!((ground - expected).abs() < 1e-3);
    }
}
