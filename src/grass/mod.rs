//! GPU grass: placement, chunking, per-frame culling and indirect draws.
//!
//! [`GrassSubsystem`] owns everything. `initialize` places instances and
//! allocates chunks once; `tick` culls every active chunk on the GPU and
//! returns one [`DrawCommand`] per chunk; `shutdown` releases all GPU
//! resources exactly once.

pub mod chunk;
pub mod config;
pub mod instance;
pub mod lod;
pub mod params;
pub mod placement;

pub use chunk::{ChunkFootprint, ChunkGrid, Field, GrassChunk};
pub use config::{GrassConfig, MeshTier};
pub use instance::{DrawIndexedIndirectArgs, GrassInstance};
pub use lod::LodTier;
pub use params::{CullParams, PlacementParams};
pub use placement::PlacementGenerator;

use crate::compaction::{check_device_limits, CompactionEngine, ScanScratch};
use crate::core::camera::CameraState;
use crate::core::error::Error;
use crate::core::Result;
use crate::math::Frustum;
use crate::render::{DrawCommand, FrameDraws, GpuContext};
use crate::terrain::{Heightmap, PlacementMask};
use crate::wind::WindField;

/// Host-provided terrain data; the mask must be at `terrain_dimension`
pub struct TerrainInputs {
    pub mask: PlacementMask,
    pub heightmap: Heightmap,
}

/// What `shutdown` released
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReleaseStats {
    pub chunks: usize,
    /// Buffers and textures destroyed
    pub resources: usize,
}

/// Resources that exist between `initialize` and `shutdown`
struct ActiveState {
    engine: CompactionEngine,
    scratch: ScanScratch,
    chunks: Vec<GrassChunk>,
    field: Option<Field>,
    wind: WindField,
}

pub struct GrassSubsystem {
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: GrassConfig,
    state: Option<ActiveState>,
}

impl GrassSubsystem {
    /// Validate, place, probe and allocate. Nothing is kept on error.
    pub fn initialize(gpu: &GpuContext, config: GrassConfig, inputs: TerrainInputs) -> Result<Self> {
        config.validate()?;
        let device = &gpu.device;
        let queue = &gpu.queue;
        check_device_limits(&device.limits(), config.group_size)?;

        let engine = CompactionEngine::new(device, config.group_size)?;
        let placement = PlacementGenerator::new(device, queue, &inputs.mask, &inputs.heightmap, &config)?;

        let grid = ChunkGrid::new(&config);
        let probed = grid.probe(|footprint| placement.count(footprint))?;
        let largest = probed.iter().map(|(_, count)| *count).max().unwrap_or(0);
        log::debug!(
            "Probed {} chunks: {} non-empty, largest {} instances",
            grid.len(),
            probed.len(),
            largest
        );

        let scratch = ScanScratch::new(device, largest, config.group_size)?;

        let mut chunks = Vec::with_capacity(probed.len());
        for (footprint, count) in probed {
            let chunk = GrassChunk::allocate(device, queue, footprint, count, &config, &engine, &scratch)?;
            placement.generate(&footprint, count, chunk.instances())?;
            chunks.push(chunk);
        }
        placement.release();

        let wind = WindField::new(device, &config.wind)?;
        let field = Field::from_chunks(&chunks);

        match &field {
            Some(field) => log::info!(
                "Grass initialized: {} of {} chunks active, {} instances, field {:?}..{:?}",
                field.chunk_count,
                grid.len(),
                field.instance_count,
                field.bounds.min,
                field.bounds.max
            ),
            None => log::warn!("Grass initialized with no placeable cells"),
        }

        Ok(Self {
            device: device.clone(),
            queue: queue.clone(),
            config,
            state: Some(ActiveState {
                engine,
                scratch,
                chunks,
                field,
                wind,
            }),
        })
    }

    /// Cull every active chunk for this camera and return the draws.
    ///
    /// Records the wind update and all culling into one submission. Chunks
    /// are encoded one after another through a single scratch lease.
    pub fn tick(&mut self, camera: &CameraState, time_seconds: f32) -> Result<FrameDraws> {
        let state = self.state.as_mut().ok_or(Error::StaleHandle)?;
        let ActiveState { engine, scratch, chunks, field, wind } = state;

        let frustum = Frustum::from_view_projection(&camera.view_projection());
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("grass_frame_encoder"),
        });
        wind.dispatch(&mut encoder, &self.queue, time_seconds);

        let mut draws = FrameDraws {
            field_visible: field.as_ref().is_some_and(|f| frustum.intersects_aabb(&f.bounds)),
            ..Default::default()
        };
        let mut pass = scratch.begin_pass();
        for chunk in chunks.iter() {
            let distance = camera.position.distance(chunk.bounds().center());
            let tier = LodTier::select(distance, self.config.lod_cutoff);

            let params = CullParams::new(&frustum, camera, chunk.plan(), tier, &self.config);
            self.queue.write_buffer(chunk.params(), 0, bytemuck::bytes_of(&params));

            if let Err(e) = pass.encode(engine, &mut encoder, chunk.bind_group(tier), chunk.plan()) {
                log::warn!("Skipping chunk {:?} this frame: {}", chunk.coord(), e);
                draws.skipped += 1;
                continue;
            }

            // Commands only exist when there is at least one chunk, so the field is set
            let Some(field) = field.as_ref() else { continue };
            draws.push(DrawCommand {
                chunk: chunk.coord(),
                tier,
                mesh: *self.config.mesh_tier(tier),
                args: chunk.args(tier).clone(),
                instances: chunk.culled().clone(),
                chunk_bounds: *chunk.bounds(),
                field_bounds: field.bounds,
            });
        }
        let culled = pass.end();
        self.queue.submit(Some(encoder.finish()));

        log::trace!(
            "Grass frame: {} chunks culled ({} full, {} lod, {} skipped)",
            culled,
            draws.full_detail,
            draws.lod,
            draws.skipped
        );
        Ok(draws)
    }

    /// Destroy every GPU resource. `None` if already shut down.
    pub fn shutdown(&mut self) -> Option<ReleaseStats> {
        let state = self.state.take()?;
        let chunks = state.chunks.len();
        let mut resources = 0;
        for chunk in state.chunks {
            resources += chunk.release();
        }
        resources += state.scratch.release();
        resources += state.wind.release();

        log::info!("Grass shut down: {} chunks, {} resources released", chunks, resources);
        Some(ReleaseStats { chunks, resources })
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    pub fn config(&self) -> &GrassConfig {
        &self.config
    }

    /// Active chunks; empty after shutdown
    pub fn chunks(&self) -> &[GrassChunk] {
        self.state.as_ref().map_or(&[], |s| s.chunks.as_slice())
    }

    pub fn active_chunk_count(&self) -> usize {
        self.chunks().len()
    }

    pub fn field(&self) -> Option<&Field> {
        self.state.as_ref().and_then(|s| s.field.as_ref())
    }

    /// Wind texture for blade shaders
    pub fn wind_view(&self) -> Option<&wgpu::TextureView> {
        self.state.as_ref().map(|s| s.wind.view())
    }
}

impl Drop for GrassSubsystem {
    fn drop(&mut self) {
        if self.state.is_some() {
            log::debug!("GrassSubsystem dropped without shutdown");
            self.shutdown();
        }
    }
}
