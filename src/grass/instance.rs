//! Wire formats shared between placement, culling and the host draw.
//!
//! Both structs are read and written by WGSL. Field order, sizes and
//! alignment are fixed; the size assertions below are the contract.

use bytemuck::{Pod, Zeroable};

/// One placed grass blade (32 bytes, 16-byte aligned).
/// Must match `GrassInstance` in grass_placement.wgsl and grass_cull.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GrassInstance {
    /// World xyz; w carries the sampled terrain height
    pub position: [f32; 4],
    // -- 16 bytes --
    /// Terrain-space UV of the placement cell centre
    pub uv: [f32; 2],
    /// Per-blade random value in [0, 1)
    pub displacement: f32,
    /// 1 when placed, 0 for an unused slot
    pub valid: u32,
    // -- 16 bytes --
}

impl GrassInstance {
    pub fn is_valid(&self) -> bool {
        self.valid != 0
    }

    pub fn world_position(&self) -> glam::Vec3 {
        glam::Vec3::new(self.position[0], self.position[1], self.position[2])
    }
}

/// `draw_indexed_indirect` argument record (20 bytes).
///
/// Layout matches wgpu's indexed indirect arguments. Culling rewrites only
/// `instance_count`; the rest is written once when the chunk is allocated.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndexedIndirectArgs {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}

impl DrawIndexedIndirectArgs {
    /// Byte offset of `instance_count` inside the record
    pub const INSTANCE_COUNT_OFFSET: u64 = 4;

    /// Arguments for a mesh with `index_count` indices and no instances yet
    pub fn for_mesh(index_count: u32) -> Self {
        Self {
            index_count,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_size() {
        assert_eq!(std::mem::size_of::<GrassInstance>(), 32);
        assert_eq!(std::mem::size_of::<GrassInstance>() % 16, 0);
    }

    #[test]
    fn test_instance_field_offsets() {
        assert_eq!(std::mem::offset_of!(GrassInstance, uv), 16);
        assert_eq!(std::mem::offset_of!(GrassInstance, displacement), 24);
        assert_eq!(std::mem::offset_of!(GrassInstance, valid), 28);
    }

    #[test]
    fn test_draw_args_layout() {
        assert_eq!(std::mem::size_of::<DrawIndexedIndirectArgs>(), 20);
        assert_eq!(
            std::mem::offset_of!(DrawIndexedIndirectArgs, instance_count) as u64,
            DrawIndexedIndirectArgs::INSTANCE_COUNT_OFFSET
        );
    }

    #[test]
    fn test_for_mesh() {
        let args = DrawIndexedIndirectArgs::for_mesh(36);
        assert_eq!(args.index_count, 36);
        assert_eq!(args.instance_count, 0);
        assert_eq!(bytemuck::bytes_of(&args).len(), 20);
    }

    #[test]
    fn test_default_instance_invalid() {
        let inst = GrassInstance::default();
        assert!(!inst.is_valid());
        assert_eq!(inst.world_position(), glam::Vec3::ZERO);
    }
}
