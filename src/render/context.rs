//! GPU context management using wgpu

use crate::core::error::Error;

/// GPU compute context.
///
/// The grass subsystem never presents to a surface, so the context is
/// headless. Hosts that already own a device wrap it with [`GpuContext::from_parts`].
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Adapter description, `None` when built from an existing device
    pub adapter_info: Option<wgpu::AdapterInfo>,
}

impl GpuContext {
    /// Create a headless context on the highest-performance adapter
    pub async fn headless() -> Result<Self, Error> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| Error::Gpu(format!("No suitable adapter found: {:?}", e)))?;

        // Request exactly what the adapter offers so downlevel adapters still
        // satisfy the request; workgroup limits are validated per config later.
        let adapter_limits = adapter.limits();

        let device_desc = wgpu::DeviceDescriptor {
            label: Some("sward_device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter_limits.clone(),
            memory_hints: wgpu::MemoryHints::Performance,
            experimental_features: Default::default(),
            trace: Default::default(),
        };

        let (device, queue) = adapter
            .request_device(&device_desc)
            .await
            .map_err(|e| Error::Gpu(e.to_string()))?;

        let info = adapter.get_info();
        log::info!("GPU adapter: {} ({:?})", info.name, info.backend);
        log::info!("GPU buffer limits: max_buffer_size={}MB, max_storage_binding={}MB, max_invocations={}",
            adapter_limits.max_buffer_size / 1024 / 1024,
            adapter_limits.max_storage_buffer_binding_size as u64 / 1024 / 1024,
            adapter_limits.max_compute_invocations_per_workgroup);

        Ok(Self {
            device,
            queue,
            adapter_info: Some(info),
        })
    }

    /// Wrap a device and queue owned by the host engine
    pub fn from_parts(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            adapter_info: None,
        }
    }

    /// Device limits in effect
    pub fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }
}

/// Headless context for GPU tests; `None` when the machine has no adapter,
/// in which case the calling test returns early.
#[cfg(test)]
pub(crate) fn test_gpu() -> Option<GpuContext> {
    crate::core::logging::init_test();
    match pollster::block_on(GpuContext::headless()) {
        Ok(gpu) => Some(gpu),
        Err(e) => {
            log::warn!("skipping GPU test: {}", e);
            None
        }
    }
}
