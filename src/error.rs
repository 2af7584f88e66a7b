//! Error types for snowfall.
//!
//! GPU failures are fatal for the surface that hit them only; settings and
//! window-provider failures are recoverable and mostly logged.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while creating or driving GPU resources.
#[derive(Debug, Error)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    #[error("failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found; a Vulkan/Metal/DX12/GL capable GPU is required")]
    NoAdapter,
    /// Failed to create GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
    /// The surface cannot be presented by the selected adapter.
    #[error("surface is not supported by the selected adapter")]
    UnsupportedSurface,
    /// Shader module or pipeline creation was rejected by validation.
    #[error("failed to create {label} pipeline: {message}")]
    Pipeline {
        /// Which pipeline failed.
        label: &'static str,
        /// Validation message reported by wgpu.
        message: String,
    },
    /// The particle buffer could not be allocated.
    #[error("failed to allocate particle buffer for {capacity} particles: {message}")]
    BufferAllocation {
        /// Requested particle capacity.
        capacity: u32,
        /// Allocation error reported by wgpu.
        message: String,
    },
    /// Failed to map buffer for reading.
    #[error("failed to map GPU buffer: {0}")]
    BufferMapping(String),
    /// The presentable surface ran out of memory.
    #[error("surface acquisition failed: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

/// Errors from loading or saving the settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read or write the settings file.
    #[error("settings file {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The settings file is not valid JSON for [`crate::Settings`].
    #[error("settings file {path} is malformed: {source}")]
    Malformed {
        /// File that failed.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// Failed to serialize settings.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
    /// Failed to start watching the settings file.
    #[error("failed to watch settings file: {0}")]
    Watch(#[from] notify::Error),
}

/// Errors reported by an active-window provider.
///
/// All of these are treated exactly like "no window found".
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The OS refused window enumeration (missing screen-recording or
    /// accessibility permission).
    #[error("window enumeration permission denied")]
    PermissionDenied,
    /// Window enumeration failed or is not available on this platform.
    #[error("window enumeration unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur when running the overlay.
#[derive(Debug, Error)]
pub enum SnowError {
    /// Failed to create event loop.
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    /// Failed to create an overlay window.
    #[error("failed to create overlay window: {0}")]
    Window(#[from] winit::error::OsError),
    /// GPU initialization or rendering failed.
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    /// Settings could not be loaded or saved.
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
}
