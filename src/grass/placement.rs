//! GPU grass placement
//!
//! Two dispatches of the same shader per chunk. The probe counts valid
//! cells and is read back once at startup; the append pass writes dense
//! instance records into the chunk's buffer.

use crate::core::error::Error;
use crate::core::Result;
use crate::grass::chunk::ChunkFootprint;
use crate::grass::config::GrassConfig;
use crate::grass::instance::GrassInstance;
use crate::grass::params::PlacementParams;
use crate::render::buffer::{create_checked_buffer, read_buffer};
use crate::terrain::{Heightmap, PlacementMask};

/// Threads per side of a placement workgroup
const PLACEMENT_TILE: u32 = 8;

/// Mask and heightmap on the GPU plus the placement pipeline.
/// Only lives through initialization.
pub struct PlacementGenerator {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    params_buffer: wgpu::Buffer,
    mask_buffer: wgpu::Buffer,
    height_buffer: wgpu::Buffer,
    counter_buffer: wgpu::Buffer,
    /// Bound as the instance output while probing; never written
    probe_sink: wgpu::Buffer,
    probe_bind_group: Option<wgpu::BindGroup>,
    terrain_origin: [f32; 4],
    resolution: u32,
    height_scale: f32,
    seed: u32,
}

impl PlacementGenerator {
    /// Upload the mask and heightmap. The mask must already be at the
    /// terrain resolution; the heightmap is resampled to it.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        mask: &PlacementMask,
        heightmap: &Heightmap,
        config: &GrassConfig,
    ) -> Result<Self> {
        let resolution = config.terrain_dimension;
        if mask.resolution() != resolution {
            return Err(Error::Config(format!(
                "mask resolution {} does not match terrain_dimension {}",
                mask.resolution(),
                resolution
            )));
        }
        if heightmap.resolution() == 0 {
            return Err(Error::Config("heightmap is empty".into()));
        }
        let heights = heightmap.resampled(resolution);
        let cell_count = resolution as u64 * resolution as u64;

        let mask_buffer = create_checked_buffer(
            device,
            "placement_mask",
            cell_count * 4,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        )?;
        queue.write_buffer(&mask_buffer, 0, bytemuck::cast_slice(&mask.gpu_words()));

        let height_buffer = create_checked_buffer(
            device,
            "placement_heights",
            cell_count * 4,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        )?;
        queue.write_buffer(&height_buffer, 0, bytemuck::cast_slice(heights.heights()));

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("placement_params"),
            size: std::mem::size_of::<PlacementParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let counter_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("placement_counter"),
            size: 4,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let probe_sink = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("placement_probe_sink"),
            size: std::mem::size_of::<GrassInstance>() as u64,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("grass_placement_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../shaders/grass_placement.wgsl").into()),
        });

        let entry = |binding: u32, ty: wgpu::BufferBindingType| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("grass_placement_layout"),
            entries: &[
                entry(0, wgpu::BufferBindingType::Uniform),
                entry(1, wgpu::BufferBindingType::Storage { read_only: true }),
                entry(2, wgpu::BufferBindingType::Storage { read_only: true }),
                entry(3, wgpu::BufferBindingType::Storage { read_only: false }),
                entry(4, wgpu::BufferBindingType::Storage { read_only: false }),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("grass_placement_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("grass_placement_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("place"),
            compilation_options: Default::default(),
            cache: None,
        });

        let mut generator = Self {
            device: device.clone(),
            queue: queue.clone(),
            pipeline,
            bind_group_layout,
            params_buffer,
            mask_buffer,
            height_buffer,
            counter_buffer,
            probe_bind_group: None,
            probe_sink,
            terrain_origin: [
                config.terrain_origin[0],
                config.terrain_origin[1],
                config.terrain_origin[2],
                config.cell_size,
            ],
            resolution,
            height_scale: config.height_scale,
            seed: config.seed,
        };
        generator.probe_bind_group = Some(generator.bind_group(&generator.probe_sink));
        Ok(generator)
    }

    fn bind_group(&self, instances: &wgpu::Buffer) -> wgpu::BindGroup {
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("grass_placement_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: self.params_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: self.mask_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: self.height_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 3, resource: self.counter_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 4, resource: instances.as_entire_binding() },
            ],
        })
    }

    fn params(&self, footprint: &ChunkFootprint, capacity: Option<u32>) -> PlacementParams {
        PlacementParams {
            terrain_origin: self.terrain_origin,
            cell_origin: footprint.cell_origin,
            chunk_cells: footprint.cells,
            resolution: self.resolution,
            height_scale: self.height_scale,
            seed: self.seed,
            write_instances: capacity.is_some() as u32,
            capacity: capacity.unwrap_or(0),
        }
    }

    /// Reset the counter and record one placement dispatch over the footprint
    fn submit(&self, footprint: &ChunkFootprint, params: &PlacementParams, bind_group: &wgpu::BindGroup) {
        self.queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(params));

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("grass_placement_encoder"),
        });
        encoder.clear_buffer(&self.counter_buffer, 0, None);
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("grass_placement_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            let groups = footprint.cells.div_ceil(PLACEMENT_TILE);
            pass.dispatch_workgroups(groups, groups, 1);
        }
        self.queue.submit(Some(encoder.finish()));
    }

    /// Exact number of valid cells in the footprint. Blocks on a readback.
    pub fn count(&self, footprint: &ChunkFootprint) -> Result<u32> {
        let Some(probe_bind_group) = &self.probe_bind_group else {
            return Err(Error::Gpu("placement probe bind group missing".into()));
        };
        self.submit(footprint, &self.params(footprint, None), probe_bind_group);
        let counter: Vec<u32> = read_buffer(&self.device, &self.queue, &self.counter_buffer, 0, 1)?;
        Ok(counter[0])
    }

    /// Append the footprint's instances into `instances`, which must hold
    /// `capacity` records. Slots at or past `capacity` are never written.
    pub fn generate(&self, footprint: &ChunkFootprint, capacity: u32, instances: &wgpu::Buffer) -> Result<()> {
        let needed = capacity as u64 * std::mem::size_of::<GrassInstance>() as u64;
        if needed > instances.size() {
            return Err(Error::ResourceExhausted {
                label: instances_label(footprint),
                requested: needed,
                limit: instances.size(),
            });
        }
        let bind_group = self.bind_group(instances);
        self.submit(footprint, &self.params(footprint, Some(capacity)), &bind_group);
        Ok(())
    }

    /// Destroy the uploaded terrain and scratch buffers
    pub fn release(self) -> usize {
        let buffers = [
            &self.params_buffer,
            &self.mask_buffer,
            &self.height_buffer,
            &self.counter_buffer,
            &self.probe_sink,
        ];
        for buffer in buffers {
            buffer.destroy();
        }
        buffers.len()
    }
}

fn instances_label(footprint: &ChunkFootprint) -> String {
    let [x, z] = footprint.coord;
    format!("chunk_{x}_{z}_instances")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grass::chunk::ChunkGrid;
    use crate::render::context::test_gpu;

    #[test]
    fn test_placement_params_match() {
        assert_eq!(std::mem::size_of::<PlacementParams>(), 48);
    }

    #[test]
    fn test_shader_validates() {
        let module =
            naga::front::wgsl::parse_str(include_str!("../../shaders/grass_placement.wgsl")).unwrap();
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .unwrap();
    }

    fn config() -> GrassConfig {
        GrassConfig {
            terrain_dimension: 48,
            chunks_per_side: 3,
            cell_size: 2.0,
            terrain_origin: [-10.0, 1.0, 4.0],
            height_scale: 8.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_mask_resolution_mismatch_rejected() {
        let Some(gpu) = test_gpu() else { return };
        let err = PlacementGenerator::new(
            &gpu.device,
            &gpu.queue,
            &PlacementMask::filled(32),
            &Heightmap::flat(48, 0.0),
            &config(),
        );
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn test_probe_count_matches_mask() {
        let Some(gpu) = test_gpu() else { return };
        let config = config();
        let mask = PlacementMask::from_fn(48, |x, z| (x * 7 + z * 3) % 5 == 0 && x < 40);
        let placement =
            PlacementGenerator::new(&gpu.device, &gpu.queue, &mask, &Heightmap::flat(48, 0.5), &config)
                .unwrap();

        for fp in ChunkGrid::new(&config).footprints() {
            let gpu_count = placement.count(fp).unwrap();
            assert_eq!(gpu_count, mask.count_in(fp.cell_origin, fp.cells), "chunk {:?}", fp.coord);
        }
        assert_eq!(placement.release(), 5);
    }

    #[test]
    fn test_generated_instances_lie_in_their_chunk() {
        let Some(gpu) = test_gpu() else { return };
        let config = config();
        let mask = PlacementMask::filled(48);
        let placement =
            PlacementGenerator::new(&gpu.device, &gpu.queue, &mask, &Heightmap::flat(48, 0.5), &config)
                .unwrap();
        let fp = ChunkGrid::new(&config).footprints()[4];
        let count = placement.count(&fp).unwrap();
        assert_eq!(count, 256);

        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("placed"),
            size: count as u64 * 32,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        placement.generate(&fp, count, &buffer).unwrap();
        let placed: Vec<GrassInstance> = read_buffer(&gpu.device, &gpu.queue, &buffer, 0, count as usize).unwrap();

        // Chunk (1, 1) spans cells 16..32 -> world x in [-10 + 32, -10 + 64)
        for blade in &placed {
            assert!(blade.is_valid());
            assert!(blade.position[0] >= 22.0 && blade.position[0] < 54.0);
            assert!(blade.position[2] >= 36.0 && blade.position[2] < 68.0);
            assert!((blade.position[1] - 5.0).abs() < 1e-4, "y = origin + 0.5 * 8");
            assert!((0.0..1.0).contains(&blade.displacement));
            assert!((0.0..=1.0).contains(&blade.uv[0]));
        }
    }

    #[test]
    fn test_append_never_exceeds_capacity() {
        let Some(gpu) = test_gpu() else { return };
        let config = config();
        let placement = PlacementGenerator::new(
            &gpu.device,
            &gpu.queue,
            &PlacementMask::filled(48),
            &Heightmap::flat(48, 0.0),
            &config,
        )
        .unwrap();
        let fp = ChunkGrid::new(&config).footprints()[0];

        // Room for 300 records, but only 100 granted: the tail must stay zeroed
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("short"),
            size: 300 * 32,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        placement.generate(&fp, 100, &buffer).unwrap();
        let placed: Vec<GrassInstance> = read_buffer(&gpu.device, &gpu.queue, &buffer, 0, 300).unwrap();
        assert_eq!(placed.iter().filter(|b| b.is_valid()).count(), 100);
        assert!(placed[100..].iter().all(|b| !b.is_valid()));
    }

    #[test]
    fn test_undersized_buffer_rejected() {
        let Some(gpu) = test_gpu() else { return };
        let config = config();
        let placement = PlacementGenerator::new(
            &gpu.device,
            &gpu.queue,
            &PlacementMask::filled(48),
            &Heightmap::flat(48, 0.0),
            &config,
        )
        .unwrap();
        let fp = ChunkGrid::new(&config).footprints()[0];
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tiny"),
            size: 32,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });
        let err = placement.generate(&fp, 2, &buffer).unwrap_err();
        assert!(matches!(err, Error::ResourceExhausted { .. }));
    }

    #[test]
    fn test_placement_is_reproducible() {
        let Some(gpu) = test_gpu() else { return };
        let config = config();
        let placement = PlacementGenerator::new(
            &gpu.device,
            &gpu.queue,
            &PlacementMask::filled(48),
            &Heightmap::generate(48, &Default::default()),
            &config,
        )
        .unwrap();
        let fp = ChunkGrid::new(&config).footprints()[2];
        let count = placement.count(&fp).unwrap();

        let run = || {
            let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("repro"),
                size: count as u64 * 32,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            });
            placement.generate(&fp, count, &buffer).unwrap();
            let mut placed: Vec<GrassInstance> =
                read_buffer(&gpu.device, &gpu.queue, &buffer, 0, count as usize).unwrap();
            // Slot order depends on thread scheduling; contents do not
            placed.sort_by(|a, b| a.uv.partial_cmp(&b.uv).unwrap());
            placed
        };
        assert_eq!(run(), run());
    }
}
