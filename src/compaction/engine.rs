//! Culling + stream compaction compute pipelines
//!
//! One shader module, four entry points, one bind group layout. Each stage
//! is recorded in its own compute pass; the pass boundary is the barrier
//! that makes one stage's writes visible to the next.

use crate::compaction::{DispatchPlan, ScanScratch};
use crate::core::error::Error;
use crate::core::Result;
use crate::grass::config::validate_group_size;

/// Stage entry points in dispatch order
const STAGES: [&str; 4] = ["vote", "scan_local", "scan_groups", "compact"];

/// WGSL for the culling pipelines with the workgroup size baked in.
pub fn cull_shader_source(group_size: u32) -> String {
    format!(
        "const GROUP_SIZE: u32 = {group_size}u;\n{}",
        include_str!("../../shaders/grass_cull.wgsl")
    )
}

/// Reject group sizes the device cannot run as a single workgroup.
pub fn check_device_limits(limits: &wgpu::Limits, group_size: u32) -> Result<()> {
    validate_group_size(group_size)?;
    if group_size > limits.max_compute_workgroup_size_x
        || group_size > limits.max_compute_invocations_per_workgroup
    {
        return Err(Error::Config(format!(
            "group_size {} exceeds device workgroup limits (size_x {}, invocations {})",
            group_size,
            limits.max_compute_workgroup_size_x,
            limits.max_compute_invocations_per_workgroup
        )));
    }
    let shared_bytes = group_size * 4;
    if shared_bytes > limits.max_compute_workgroup_storage_size {
        return Err(Error::Config(format!(
            "group_size {} needs {} bytes of workgroup storage, device allows {}",
            group_size, shared_bytes, limits.max_compute_workgroup_storage_size
        )));
    }
    Ok(())
}

/// Per-chunk buffers a culling bind group points at
pub struct CullTarget<'a> {
    /// `CullParams` uniform
    pub params: &'a wgpu::Buffer,
    /// Placed instances, read only
    pub instances: &'a wgpu::Buffer,
    /// Compacted output, same capacity as `instances`
    pub culled: &'a wgpu::Buffer,
    /// `DrawIndexedIndirectArgs` of the tier being drawn
    pub args: &'a wgpu::Buffer,
}

/// Vote / scan / compact pipelines for one group size
pub struct CompactionEngine {
    group_size: u32,
    max_workgroups: u32,
    bind_group_layout: wgpu::BindGroupLayout,
    pipelines: [wgpu::ComputePipeline; 4],
}

impl CompactionEngine {
    /// Build the pipelines. Fails with a configuration error when
    /// `group_size` is invalid or beyond the device limits.
    pub fn new(device: &wgpu::Device, group_size: u32) -> Result<Self> {
        let limits = device.limits();
        check_device_limits(&limits, group_size)?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("grass_cull_shader"),
            source: wgpu::ShaderSource::Wgsl(cull_shader_source(group_size).into()),
        });

        let storage = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("grass_cull_layout"),
            entries: &[
                // Cull params
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
                storage(1, true),  // instances
                storage(2, false), // votes
                storage(3, false), // local offsets
                storage(4, false), // group sums
                storage(5, false), // scanned group sums
                storage(6, false), // culled instances
                storage(7, false), // draw args
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("grass_cull_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipelines = STAGES.map(|entry| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(entry),
                compilation_options: Default::default(),
                cache: None,
            })
        });

        log::debug!("Compaction pipelines built (group size {})", group_size);

        Ok(Self {
            group_size,
            max_workgroups: limits.max_compute_workgroups_per_dimension,
            bind_group_layout,
            pipelines,
        })
    }

    pub fn group_size(&self) -> u32 {
        self.group_size
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    /// Dispatch plan for a chunk, checked against the per-dimension
    /// workgroup limit.
    pub fn plan(&self, instance_count: u32) -> Result<DispatchPlan> {
        let plan = DispatchPlan::new(instance_count, self.group_size);
        if plan.group_count > self.max_workgroups {
            return Err(Error::ResourceExhausted {
                label: "cull_workgroups".into(),
                requested: plan.group_count as u64,
                limit: self.max_workgroups as u64,
            });
        }
        Ok(plan)
    }

    /// Bind a chunk's buffers together with the shared scratch set
    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        scratch: &ScanScratch,
        target: &CullTarget<'_>,
    ) -> wgpu::BindGroup {
        let buffers = [
            target.params,
            target.instances,
            scratch.votes(),
            scratch.local_offsets(),
            scratch.group_sums(),
            scratch.scanned_group_sums(),
            target.culled,
            target.args,
        ];
        let entries: Vec<wgpu::BindGroupEntry> = buffers
            .iter()
            .enumerate()
            .map(|(binding, buffer)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("grass_cull_bind_group"),
            layout: &self.bind_group_layout,
            entries: &entries,
        })
    }

    /// Record the four stages. Only reachable through a [`crate::compaction::CullPass`].
    pub(crate) fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        bind_group: &wgpu::BindGroup,
        plan: &DispatchPlan,
    ) {
        for (&stage, pipeline) in STAGES.iter().zip(&self.pipelines) {
            let workgroups = match stage {
                "scan_groups" => 1,
                _ => plan.group_count,
            };
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(stage),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(workgroups, 1, 1);
        }
    }
}
