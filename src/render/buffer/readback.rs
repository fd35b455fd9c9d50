//! Blocking GPU->CPU readback
//!
//! Used once per chunk at startup to read the placement counter. The
//! per-frame path never reads back.

use bytemuck::Pod;

use crate::core::error::Error;
use crate::core::Result;

/// Copy `count` elements of `T` from `src` (starting at byte `offset`) into
/// a staging buffer and block until they are mapped.
pub fn read_buffer<T: Pod>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    src: &wgpu::Buffer,
    offset: u64,
    count: usize,
) -> Result<Vec<T>> {
    let size = (count * std::mem::size_of::<T>()) as u64;
    if size == 0 {
        return Ok(Vec::new());
    }

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback_staging"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback_encoder"),
    });
    encoder.copy_buffer_to_buffer(src, offset, &staging, 0, size);
    queue.submit(Some(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::Wait { submission_index: None, timeout: None })
        .map_err(|e| Error::Gpu(format!("poll failed during readback: {e}")))?;

    rx.recv()
        .map_err(|e| Error::Gpu(format!("readback channel closed: {e}")))?
        .map_err(|e| Error::Gpu(format!("buffer map failed: {e}")))?;

    let values = {
        let data = slice.get_mapped_range();
        bytemuck::pod_collect_to_vec::<u8, T>(&data)
    };
    staging.unmap();
    staging.destroy();

    Ok(values)
}
