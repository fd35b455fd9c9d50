//! Scan scratch buffers shared by every chunk, and the lease that
//! serializes access to them.

use crate::compaction::{CompactionEngine, DispatchPlan};
use crate::core::error::Error;
use crate::core::Result;
use crate::render::buffer::create_checked_buffer;

const SCRATCH_USAGE: wgpu::BufferUsages =
    wgpu::BufferUsages::STORAGE.union(wgpu::BufferUsages::COPY_SRC);

/// Vote, local-scan and group-sum buffers sized for the largest chunk.
pub struct ScanScratch {
    votes: wgpu::Buffer,
    local_offsets: wgpu::Buffer,
    group_sums: wgpu::Buffer,
    scanned_group_sums: wgpu::Buffer,
    group_size: u32,
    slot_capacity: u32,
    group_capacity: u32,
}

impl ScanScratch {
    /// Allocate scratch for chunks of up to `max_instances` instances.
    pub fn new(device: &wgpu::Device, max_instances: u32, group_size: u32) -> Result<Self> {
        let plan = DispatchPlan::new(max_instances, group_size);
        let slot_bytes = plan.padded_count() as u64 * 4;
        let group_bytes = plan.group_count as u64 * 4;

        let scratch = Self {
            votes: create_checked_buffer(device, "scan_votes", slot_bytes, SCRATCH_USAGE)?,
            local_offsets: create_checked_buffer(device, "scan_local_offsets", slot_bytes, SCRATCH_USAGE)?,
            group_sums: create_checked_buffer(device, "scan_group_sums", group_bytes, SCRATCH_USAGE)?,
            scanned_group_sums: create_checked_buffer(
                device,
                "scan_scanned_group_sums",
                group_bytes,
                SCRATCH_USAGE,
            )?,
            group_size,
            slot_capacity: plan.padded_count(),
            group_capacity: plan.group_count,
        };

        log::debug!(
            "Scan scratch: {} slots, {} groups of {} ({} KB)",
            scratch.slot_capacity,
            scratch.group_capacity,
            group_size,
            (slot_bytes * 2 + group_bytes * 2) / 1024
        );
        Ok(scratch)
    }

    /// Whether a chunk with this plan can be culled through this scratch set
    pub fn fits(&self, plan: &DispatchPlan) -> bool {
        plan.group_size == self.group_size
            && plan.padded_count() <= self.slot_capacity
            && plan.group_count <= self.group_capacity
    }

    pub fn slot_capacity(&self) -> u32 {
        self.slot_capacity
    }

    pub fn group_size(&self) -> u32 {
        self.group_size
    }

    pub fn votes(&self) -> &wgpu::Buffer {
        &self.votes
    }

    pub fn local_offsets(&self) -> &wgpu::Buffer {
        &self.local_offsets
    }

    pub fn group_sums(&self) -> &wgpu::Buffer {
        &self.group_sums
    }

    pub fn scanned_group_sums(&self) -> &wgpu::Buffer {
        &self.scanned_group_sums
    }

    /// Lease the scratch set for a sequence of chunk culls.
    ///
    /// The lease holds `&mut self`, so two passes cannot interleave their
    /// stages on the same buffers.
    pub fn begin_pass(&mut self) -> CullPass<'_> {
        CullPass {
            scratch: self,
            chunks: 0,
        }
    }

    /// Destroy the scratch buffers. Returns the number of buffers released.
    pub fn release(self) -> usize {
        for buffer in [
            &self.votes,
            &self.local_offsets,
            &self.group_sums,
            &self.scanned_group_sums,
        ] {
            buffer.destroy();
        }
        4
    }
}

/// Exclusive lease on a [`ScanScratch`] for one frame's culling.
pub struct CullPass<'a> {
    scratch: &'a mut ScanScratch,
    chunks: u32,
}

impl CullPass<'_> {
    /// Record all four stages for one chunk.
    ///
    /// `bind_group` must have been created by `engine` against this scratch
    /// set. A plan that does not fit the scratch is rejected without
    /// recording anything.
    pub fn encode(
        &mut self,
        engine: &CompactionEngine,
        encoder: &mut wgpu::CommandEncoder,
        bind_group: &wgpu::BindGroup,
        plan: &DispatchPlan,
    ) -> Result<()> {
        if !self.scratch.fits(plan) {
            return Err(Error::ResourceExhausted {
                label: "scan_scratch".into(),
                requested: plan.padded_count() as u64 * 4,
                limit: self.scratch.slot_capacity as u64 * 4,
            });
        }
        engine.encode(encoder, bind_group, plan);
        self.chunks += 1;
        Ok(())
    }

    /// Chunks recorded so far
    pub fn chunks(&self) -> u32 {
        self.chunks
    }

    /// Release the lease, returning the number of chunks culled through it
    pub fn end(self) -> u32 {
        self.chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::context::test_gpu;

    #[test]
    fn test_scratch_sized_for_largest_chunk() {
        let Some(gpu) = test_gpu() else { return };
        let scratch = ScanScratch::new(&gpu.device, 130, 128).unwrap();
        assert_eq!(scratch.slot_capacity(), 256);
        assert_eq!(scratch.votes().size(), 256 * 4);
        assert_eq!(scratch.group_sums().size(), 2 * 4);

        assert!(scratch.fits(&DispatchPlan::new(130, 128)));
        assert!(scratch.fits(&DispatchPlan::new(1, 128)));
        assert!(!scratch.fits(&DispatchPlan::new(257, 128)));
        // Same slot count, different group size
        assert!(!scratch.fits(&DispatchPlan::new(130, 64)));
        assert_eq!(scratch.release(), 4);
    }

    #[test]
    fn test_oversized_plan_rejected_by_lease() {
        let Some(gpu) = test_gpu() else { return };
        let engine = CompactionEngine::new(&gpu.device, 64).unwrap();
        let mut scratch = ScanScratch::new(&gpu.device, 64, 64).unwrap();
        let mut encoder = gpu.device.create_command_encoder(&Default::default());

        // Nothing is recorded: the plan is rejected before the bind group is used
        let buffer = |label: &str, size: u64, usage: wgpu::BufferUsages| {
            gpu.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage,
                mapped_at_creation: false,
            })
        };
        let params = buffer("params", 144, wgpu::BufferUsages::UNIFORM);
        let instances = buffer("instances", 64 * 32, wgpu::BufferUsages::STORAGE);
        let culled = buffer("culled", 64 * 32, wgpu::BufferUsages::STORAGE);
        let args = buffer("args", 20, wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::INDIRECT);
        let target = crate::compaction::CullTarget {
            params: &params,
            instances: &instances,
            culled: &culled,
            args: &args,
        };
        let bind_group = engine.create_bind_group(&gpu.device, &scratch, &target);

        let mut pass = scratch.begin_pass();
        let err = pass
            .encode(&engine, &mut encoder, &bind_group, &DispatchPlan::new(1000, 64))
            .unwrap_err();
        assert!(matches!(err, Error::ResourceExhausted { .. }));
        assert_eq!(pass.end(), 0);
    }
}
