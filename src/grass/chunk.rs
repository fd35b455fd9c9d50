//! Chunk partitioning and per-chunk GPU resources
//!
//! The terrain is split into a square grid of disjoint footprints. Each
//! footprint is probed once for its instance count; only non-empty chunks
//! get buffers, and the set never changes for the session.

use glam::Vec3;

use crate::compaction::{CompactionEngine, CullTarget, DispatchPlan, ScanScratch};
use crate::core::Result;
use crate::grass::config::GrassConfig;
use crate::grass::instance::{DrawIndexedIndirectArgs, GrassInstance};
use crate::grass::lod::LodTier;
use crate::grass::params::CullParams;
use crate::math::Aabb;
use crate::render::buffer::create_checked_buffer;

/// One tile of the chunk grid, before any GPU allocation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChunkFootprint {
    /// Grid index (x, z)
    pub coord: [u32; 2],
    /// First placement cell (x, z) covered by the chunk
    pub cell_origin: [u32; 2],
    /// Cells per side; cells past the terrain edge are skipped
    pub cells: u32,
    /// Conservative world bound used for LOD distance
    pub bounds: Aabb,
}

/// The `chunks_per_side x chunks_per_side` footprint grid
#[derive(Clone, Debug)]
pub struct ChunkGrid {
    footprints: Vec<ChunkFootprint>,
}

impl ChunkGrid {
    pub fn new(config: &GrassConfig) -> Self {
        let cells = config.cells_per_chunk();
        let chunk_size = config.chunk_world_size();
        let origin = Vec3::from(config.terrain_origin);
        let half_height = config.height_scale * 0.5;
        // Horizontal half-extent is a full chunk size so displaced blades stay inside
        let half_extent = Vec3::new(chunk_size, half_height + 1.0, chunk_size);

        let mut footprints = Vec::with_capacity((config.chunks_per_side * config.chunks_per_side) as usize);
        for z in 0..config.chunks_per_side {
            for x in 0..config.chunks_per_side {
                let center = origin
                    + Vec3::new(
                        (x as f32 + 0.5) * chunk_size,
                        half_height,
                        (z as f32 + 0.5) * chunk_size,
                    );
                footprints.push(ChunkFootprint {
                    coord: [x, z],
                    cell_origin: [x * cells, z * cells],
                    cells,
                    bounds: Aabb::from_center_half_extent(center, half_extent),
                });
            }
        }
        Self { footprints }
    }

    pub fn footprints(&self) -> &[ChunkFootprint] {
        &self.footprints
    }

    pub fn len(&self) -> usize {
        self.footprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.footprints.is_empty()
    }

    /// Count instances per footprint and keep the non-empty ones, in grid order.
    /// The first counting error aborts the probe.
    pub fn probe(
        &self,
        mut count: impl FnMut(&ChunkFootprint) -> Result<u32>,
    ) -> Result<Vec<(ChunkFootprint, u32)>> {
        let mut active = Vec::new();
        for footprint in &self.footprints {
            let n = count(footprint)?;
            if n == 0 {
                log::debug!("Chunk {:?} is empty, skipped", footprint.coord);
                continue;
            }
            active.push((*footprint, n));
        }
        Ok(active)
    }
}

/// An active chunk and the GPU buffers it owns exclusively
pub struct GrassChunk {
    footprint: ChunkFootprint,
    capacity: u32,
    plan: DispatchPlan,
    instances: wgpu::Buffer,
    culled: wgpu::Buffer,
    /// Draw arguments per tier, indexed by `LodTier::index`
    args: [wgpu::Buffer; 2],
    params: wgpu::Buffer,
    bind_groups: [wgpu::BindGroup; 2],
}

impl GrassChunk {
    /// Allocate buffers for `capacity` instances and bind them to the
    /// shared scratch set. Draw arguments start with the tier's index count
    /// and zero instances.
    pub fn allocate(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        footprint: ChunkFootprint,
        capacity: u32,
        config: &GrassConfig,
        engine: &CompactionEngine,
        scratch: &ScanScratch,
    ) -> Result<Self> {
        let plan = engine.plan(capacity)?;
        let instance_bytes = capacity as u64 * std::mem::size_of::<GrassInstance>() as u64;
        let [x, z] = footprint.coord;

        let instances = create_checked_buffer(
            device,
            &format!("chunk_{x}_{z}_instances"),
            instance_bytes,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
        )?;
        let culled = create_checked_buffer(
            device,
            &format!("chunk_{x}_{z}_culled"),
            instance_bytes,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_SRC,
        )?;
        let params = create_checked_buffer(
            device,
            &format!("chunk_{x}_{z}_cull_params"),
            std::mem::size_of::<CullParams>() as u64,
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        )?;

        let make_args = |tier: LodTier| -> Result<wgpu::Buffer> {
            let buffer = create_checked_buffer(
                device,
                &format!("chunk_{x}_{z}_args_{tier:?}"),
                std::mem::size_of::<DrawIndexedIndirectArgs>() as u64,
                wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::INDIRECT
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
            )?;
            let initial = DrawIndexedIndirectArgs::for_mesh(config.mesh_tier(tier).index_count);
            queue.write_buffer(&buffer, 0, bytemuck::bytes_of(&initial));
            Ok(buffer)
        };
        let args = [make_args(LodTier::Full)?, make_args(LodTier::Lod)?];

        let bind_groups = LodTier::ALL.map(|tier| {
            engine.create_bind_group(
                device,
                scratch,
                &CullTarget {
                    params: &params,
                    instances: &instances,
                    culled: &culled,
                    args: &args[tier.index()],
                },
            )
        });

        Ok(Self {
            footprint,
            capacity,
            plan,
            instances,
            culled,
            args,
            params,
            bind_groups,
        })
    }

    pub fn coord(&self) -> [u32; 2] {
        self.footprint.coord
    }

    pub fn footprint(&self) -> &ChunkFootprint {
        &self.footprint
    }

    pub fn bounds(&self) -> &Aabb {
        &self.footprint.bounds
    }

    /// Placed instances; fixed for the session
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn plan(&self) -> &DispatchPlan {
        &self.plan
    }

    pub fn instances(&self) -> &wgpu::Buffer {
        &self.instances
    }

    pub fn culled(&self) -> &wgpu::Buffer {
        &self.culled
    }

    pub fn args(&self, tier: LodTier) -> &wgpu::Buffer {
        &self.args[tier.index()]
    }

    pub fn params(&self) -> &wgpu::Buffer {
        &self.params
    }

    pub fn bind_group(&self, tier: LodTier) -> &wgpu::BindGroup {
        &self.bind_groups[tier.index()]
    }

    /// Destroy every buffer the chunk owns. Returns the number released.
    pub fn release(self) -> usize {
        let buffers = [
            &self.instances,
            &self.culled,
            &self.params,
            &self.args[0],
            &self.args[1],
        ];
        for buffer in buffers {
            buffer.destroy();
        }
        buffers.len()
    }
}

/// Broad-phase bound over every active chunk
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Field {
    pub bounds: Aabb,
    pub chunk_count: usize,
    pub instance_count: u64,
}

impl Field {
    /// `None` when there are no active chunks
    pub fn from_chunks(chunks: &[GrassChunk]) -> Option<Self> {
        let bounds = Aabb::enclosing(chunks.iter().map(|c| c.bounds()))?;
        Some(Self {
            bounds,
            chunk_count: chunks.len(),
            instance_count: chunks.iter().map(|c| c.capacity() as u64).sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Error;
    use crate::terrain::PlacementMask;

    fn small_config() -> GrassConfig {
        GrassConfig {
            terrain_dimension: 64,
            chunks_per_side: 4,
            cell_size: 1.0,
            height_scale: 10.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_grid_layout() {
        let config = small_config();
        let grid = ChunkGrid::new(&config);
        assert_eq!(grid.len(), 16);

        let first = grid.footprints()[0];
        assert_eq!(first.coord, [0, 0]);
        assert_eq!(first.cell_origin, [0, 0]);
        assert_eq!(first.cells, 16);
        assert_eq!(first.bounds.center(), Vec3::new(8.0, 5.0, 8.0));
        assert_eq!(first.bounds.half_extent(), Vec3::new(16.0, 6.0, 16.0));

        // Row-major: x varies fastest
        let fifth = grid.footprints()[5];
        assert_eq!(fifth.coord, [1, 1]);
        assert_eq!(fifth.cell_origin, [16, 16]);
    }

    #[test]
    fn test_grid_respects_origin() {
        let mut config = small_config();
        config.terrain_origin = [-32.0, 2.0, 100.0];
        let grid = ChunkGrid::new(&config);
        let last = grid.footprints().last().unwrap();
        assert_eq!(last.coord, [3, 3]);
        assert_eq!(last.bounds.center(), Vec3::new(-32.0 + 56.0, 7.0, 156.0));
    }

    #[test]
    fn test_footprints_tile_without_overlap() {
        let mut config = small_config();
        config.terrain_dimension = 66;
        let grid = ChunkGrid::new(&config);
        let mask = PlacementMask::filled(66);
        let covered: u32 = grid
            .footprints()
            .iter()
            .map(|fp| mask.count_in(fp.cell_origin, fp.cells))
            .sum();
        assert_eq!(covered, 66 * 66);
    }

    #[test]
    fn test_probe_excludes_empty_chunks() {
        let config = small_config();
        // Grass only in the lower-left quadrant (chunks x < 2, z < 2)
        let mask = PlacementMask::from_fn(64, |x, z| x < 32 && z < 32);
        let grid = ChunkGrid::new(&config);

        let active = grid.probe(|fp| Ok(mask.count_in(fp.cell_origin, fp.cells))).unwrap();
        assert_eq!(active.len(), 4);
        for (fp, count) in &active {
            assert!(fp.coord[0] < 2 && fp.coord[1] < 2);
            assert_eq!(*count, 256);
        }
    }

    #[test]
    fn test_probe_error_aborts() {
        let grid = ChunkGrid::new(&small_config());
        let mut calls = 0;
        let result = grid.probe(|_| {
            calls += 1;
            if calls == 3 {
                Err(Error::Gpu("lost".into()))
            } else {
                Ok(1)
            }
        });
        assert!(result.is_err());
        assert_eq!(calls, 3);
    }
}
