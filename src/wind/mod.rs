//! Wind field generator
//!
//! A square `Rgba16Float` storage texture rewritten once per frame from
//! scrolling value noise. Blade shaders sample it with the instance UV;
//! culling never reads it.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::Result;

pub const WIND_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Wind tunables
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindConfig {
    /// Scroll speed of the noise pattern (noise cells per second along `direction`)
    pub speed: f32,
    /// Noise cells across the texture
    pub frequency: f32,
    /// Scale of the rg flow vector
    pub amplitude: f32,
    /// Scroll direction in the xz plane; normalized on upload
    pub direction: [f32; 2],
    /// Texture side in texels
    pub resolution: u32,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            speed: 0.6,
            frequency: 4.0,
            amplitude: 1.0,
            direction: [1.0, 0.3],
            resolution: 256,
        }
    }
}

impl WindConfig {
    pub fn validate(&self) -> Result<()> {
        if self.resolution == 0 {
            return Err(Error::Config("wind.resolution must be > 0".into()));
        }
        for (name, value) in [
            ("wind.speed", self.speed),
            ("wind.frequency", self.frequency),
            ("wind.amplitude", self.amplitude),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::Config(format!("{name} must be finite and >= 0, got {value}")));
            }
        }
        let [x, z] = self.direction;
        if !(x.is_finite() && z.is_finite()) || (x == 0.0 && z == 0.0) {
            return Err(Error::Config("wind.direction must be a finite non-zero vector".into()));
        }
        Ok(())
    }

    fn normalized_direction(&self) -> [f32; 2] {
        glam::Vec2::from(self.direction).normalize_or_zero().to_array()
    }
}

/// Wind uniform (32 bytes). Must match `WindParams` in wind_field.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct WindParams {
    pub direction: [f32; 2],
    pub time: f32,
    pub frequency: f32,
    // -- 16 bytes --
    pub amplitude: f32,
    pub speed: f32,
    pub resolution: u32,
    pub _pad: u32,
    // -- 16 bytes --
}

impl WindParams {
    pub fn new(config: &WindConfig, time: f32) -> Self {
        Self {
            direction: config.normalized_direction(),
            time,
            frequency: config.frequency,
            amplitude: config.amplitude,
            speed: config.speed,
            resolution: config.resolution,
            _pad: 0,
        }
    }
}

/// GPU wind field: storage texture, uniform and compute pipeline
pub struct WindField {
    config: WindConfig,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    params_buffer: wgpu::Buffer,
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
}

impl WindField {
    pub fn new(device: &wgpu::Device, config: &WindConfig) -> Result<Self> {
        config.validate()?;
        let max_dimension = device.limits().max_texture_dimension_2d;
        if config.resolution > max_dimension {
            return Err(Error::Config(format!(
                "wind.resolution {} exceeds device texture limit {}",
                config.resolution, max_dimension
            )));
        }

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("wind_field_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../shaders/wind_field.wgsl").into()),
        });

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("wind_field"),
            size: wgpu::Extent3d {
                width: config.resolution,
                height: config.resolution,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: WIND_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("wind_params"),
            size: std::mem::size_of::<WindParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("wind_field_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: WIND_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("wind_field_bind_group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("wind_field_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("wind_field_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Ok(Self {
            config: config.clone(),
            texture,
            view,
            params_buffer,
            pipeline,
            bind_group,
        })
    }

    /// Upload this frame's parameters and record the field update
    pub fn dispatch(&self, encoder: &mut wgpu::CommandEncoder, queue: &wgpu::Queue, time: f32) {
        let params = WindParams::new(&self.config, time);
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("wind_field_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        let groups = self.config.resolution.div_ceil(8);
        pass.dispatch_workgroups(groups, groups, 1);
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn resolution(&self) -> u32 {
        self.config.resolution
    }

    /// Destroy the texture and uniform. Returns the number of resources released.
    pub fn release(self) -> usize {
        self.texture.destroy();
        self.params_buffer.destroy();
        2
    }
}
