//! Dispatch sizing for the vote / scan / compact stages.
//!
//! Every stage dispatches `group_count` workgroups of `group_size` threads.
//! Slots past the chunk's instance count are padding and always vote 0.

/// Workgroup arithmetic for one chunk's culling pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchPlan {
    /// Real instances in the chunk
    pub instance_count: u32,
    /// Threads per workgroup (power of two)
    pub group_size: u32,
    /// Workgroups dispatched by vote, local scan and compact
    pub group_count: u32,
}

impl DispatchPlan {
    /// `group_count` is the smallest value `>= ceil(instances / group_size)`
    /// (at least 1) such that, once it exceeds `group_size`, it is also a
    /// multiple of `group_size`. The group-sum scan then always consumes
    /// whole tiles of `group_size` sums, and the dispatched thread count
    /// `group_count * group_size` is a multiple of `group_size`.
    pub fn new(instance_count: u32, group_size: u32) -> Self {
        debug_assert!(group_size.is_power_of_two());
        let mut group_count = instance_count.div_ceil(group_size).max(1);
        if group_count > group_size {
            group_count = group_count.next_multiple_of(group_size);
        }
        Self {
            instance_count,
            group_size,
            group_count,
        }
    }

    /// Threads dispatched per stage (and scratch slots touched)
    pub fn padded_count(&self) -> u32 {
        self.group_count * self.group_size
    }

    /// Tiles the single-workgroup group-sum scan walks through
    pub fn group_scan_tiles(&self) -> u32 {
        self.group_count.div_ceil(self.group_size)
    }

    /// Workgroup index owning instance slot `slot`
    pub fn group_of(&self, slot: u32) -> u32 {
        slot / self.group_size
    }
}
