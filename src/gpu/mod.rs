//! GPU resources.
//!
//! [`GpuContext`] is created once per process and shared by every surface.
//! Each surface then owns its own [`ParticleStore`], [`SimulationStage`] and
//! [`RenderStage`]; nothing particle-related is shared between surfaces.

mod render;
mod simulation;
mod store;

use std::sync::Arc;

use tracing::{error, info};

pub use render::{choose_alpha_mode, RenderStage};
pub use simulation::SimulationStage;
pub use store::ParticleStore;

use crate::error::GpuError;

/// Instance, adapter, device and queue shared by all overlay surfaces.
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    pub fn create_instance() -> wgpu::Instance {
        wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        })
    }

    /// Pick an adapter able to present to `surface` (if any) and open a device.
    pub async fn request(
        instance: wgpu::Instance,
        surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Arc<Self>, GpuError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Snowfall Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        device.on_uncaptured_error(Box::new(|e: wgpu::Error| {
            error!("uncaptured GPU error: {}", e);
        }));

        let info = adapter.get_info();
        info!(
            adapter = %info.name,
            backend = ?info.backend,
            "GPU device ready"
        );

        Ok(Arc::new(Self {
            instance,
            adapter,
            device,
            queue,
        }))
    }

    /// Blocking device without a surface, for offscreen rendering and tests.
    pub fn request_headless() -> Result<Arc<Self>, GpuError> {
        pollster::block_on(Self::request(Self::create_instance(), None))
    }

    /// Whether this context's adapter can present to `surface`.
    pub fn supports_surface(&self, surface: &wgpu::Surface<'_>) -> bool {
        !surface.get_capabilities(&self.adapter).formats.is_empty()
    }

    /// Run `f` inside validation and out-of-memory error scopes.
    ///
    /// Returns the first error raised while `f` ran, if any.
    pub(crate) fn capture<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());
        (value, validation.or(oom))
    }
}
