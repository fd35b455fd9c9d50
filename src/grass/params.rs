//! GPU-ready uniforms for placement and culling (16-byte aligned).

use bytemuck::{Pod, Zeroable};

use crate::compaction::DispatchPlan;
use crate::core::camera::CameraState;
use crate::grass::config::GrassConfig;
use crate::grass::lod::LodTier;
use crate::math::Frustum;

/// Per-chunk culling uniform. Must match `CullParams` in grass_cull.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CullParams {
    pub planes: [[f32; 4]; 6],
    // -- 96 bytes --
    pub camera_position: [f32; 4],
    // -- 16 bytes --
    pub instance_count: u32,
    pub padded_count: u32,
    pub group_count: u32,
    pub lod_tier: u32,
    // -- 16 bytes --
    pub distance_cutoff: f32,
    pub thinning_distance: f32,
    pub density_divisor: u32,
    pub frustum_margin: f32,
    // -- 16 bytes --
    // Total: 144 bytes
}

impl CullParams {
    pub fn new(
        frustum: &Frustum,
        camera: &CameraState,
        plan: &DispatchPlan,
        tier: LodTier,
        config: &GrassConfig,
    ) -> Self {
        Self {
            planes: frustum.gpu_planes(),
            camera_position: camera.position.extend(1.0).to_array(),
            instance_count: plan.instance_count,
            padded_count: plan.padded_count(),
            group_count: plan.group_count,
            lod_tier: tier.as_u32(),
            distance_cutoff: config.distance_cutoff,
            thinning_distance: config.thinning_distance,
            density_divisor: config.density_divisor,
            frustum_margin: config.frustum_margin,
        }
    }
}

/// Placement uniform. Must match `PlacementParams` in grass_placement.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PlacementParams {
    /// World origin of cell (0, 0); w = cell size
    pub terrain_origin: [f32; 4],
    // -- 16 bytes --
    pub cell_origin: [u32; 2],
    pub chunk_cells: u32,
    pub resolution: u32,
    // -- 16 bytes --
    pub height_scale: f32,
    pub seed: u32,
    /// 0 = probe (count only), 1 = append instances
    pub write_instances: u32,
    pub capacity: u32,
    // -- 16 bytes --
    // Total: 48 bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::camera::Camera;
    use glam::Vec3;

    #[test]
    fn test_cull_params_size() {
        assert_eq!(std::mem::size_of::<CullParams>(), 144);
        assert_eq!(std::mem::size_of::<CullParams>() % 16, 0);
    }

    #[test]
    fn test_placement_params_size() {
        assert_eq!(std::mem::size_of::<PlacementParams>(), 48);
    }

    #[test]
    fn test_cull_params_from_plan() {
        let camera = Camera::look_at(Vec3::new(0.0, 5.0, 10.0), Vec3::ZERO, Vec3::Y).state();
        let frustum = Frustum::from_view_projection(&camera.view_projection());
        let plan = DispatchPlan::new(130, 128);
        let config = GrassConfig::default();

        let params = CullParams::new(&frustum, &camera, &plan, LodTier::Lod, &config);
        assert_eq!(params.instance_count, 130);
        assert_eq!(params.padded_count, 256);
        assert_eq!(params.group_count, 2);
        assert_eq!(params.lod_tier, 1);
        assert_eq!(params.camera_position, [0.0, 5.0, 10.0, 1.0]);
        assert_eq!(params.density_divisor, config.density_divisor);
    }
}
