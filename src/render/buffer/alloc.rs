//! Capacity-checked buffer allocation
//!
//! wgpu reports oversized buffers through the device error callback, long
//! after the allocation call returns. Checking against the device limits up
//! front turns that into an [`Error::ResourceExhausted`] at initialization.

use crate::core::error::Error;
use crate::core::Result;

/// Validate that a buffer of `size` bytes fits the device limits.
///
/// Storage buffers must also fit a single binding.
pub fn check_buffer_size(
    limits: &wgpu::Limits,
    label: &str,
    size: u64,
    usage: wgpu::BufferUsages,
) -> Result<()> {
    let mut limit = limits.max_buffer_size;
    if usage.contains(wgpu::BufferUsages::STORAGE) {
        limit = limit.min(limits.max_storage_buffer_binding_size as u64);
    }
    if size > limit {
        return Err(Error::ResourceExhausted {
            label: label.to_string(),
            requested: size,
            limit,
        });
    }
    Ok(())
}

/// Create a buffer after checking it against the device limits.
///
/// Sizes are rounded up to `COPY_BUFFER_ALIGNMENT` and never zero.
pub fn create_checked_buffer(
    device: &wgpu::Device,
    label: &str,
    size: u64,
    usage: wgpu::BufferUsages,
) -> Result<wgpu::Buffer> {
    let size = size
        .max(wgpu::COPY_BUFFER_ALIGNMENT)
        .next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
    check_buffer_size(&device.limits(), label, size, usage)?;

    Ok(device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage,
        mapped_at_creation: false,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_limits() -> wgpu::Limits {
        wgpu::Limits {
            max_buffer_size: 1024,
            max_storage_buffer_binding_size: 512,
            ..wgpu::Limits::downlevel_defaults()
        }
    }

    #[test]
    fn test_within_limits() {
        let limits = small_limits();
        assert!(check_buffer_size(&limits, "ok", 512, wgpu::BufferUsages::STORAGE).is_ok());
        assert!(check_buffer_size(&limits, "ok", 1024, wgpu::BufferUsages::INDIRECT).is_ok());
    }

    #[test]
    fn test_storage_binding_limit() {
        let limits = small_limits();
        let err = check_buffer_size(&limits, "instances", 600, wgpu::BufferUsages::STORAGE).unwrap_err();
        match err {
            Error::ResourceExhausted { label, requested, limit } => {
                assert_eq!(label, "instances");
                assert_eq!(requested, 600);
                assert_eq!(limit, 512);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_max_buffer_size_limit() {
        let limits = small_limits();
        assert!(check_buffer_size(&limits, "staging", 2048, wgpu::BufferUsages::MAP_READ).is_err());
    }
}
