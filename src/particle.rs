//! The GPU particle record.

use bytemuck::{Pod, Zeroable};

/// One snowflake, laid out exactly as the WGSL `Particle` struct.
///
/// | field | offset |
/// |-------|--------|
/// | `position` | 0 |
/// | `velocity` | 8 |
/// | `size` | 16 |
/// | `opacity` | 20 |
/// | `phase` | 24 |
/// | `seed` | 28 |
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Particle {
    /// Local surface pixels, Y down.
    pub position: [f32; 2],
    /// Pixels per second.
    pub velocity: [f32; 2],
    /// Visual radius in pixels.
    pub size: f32,
    /// 1 at spawn, falls while melting.
    pub opacity: f32,
    /// Drift phase in `[0, 1)`.
    pub phase: f32,
    /// Hash state the particle was spawned from.
    pub seed: u32,
}

impl Particle {
    /// Size of one record in the particle buffer.
    pub const STRIDE: u64 = std::mem::size_of::<Particle>() as u64;

    // Velocity and the trailing fields stay compute-only.
    const INSTANCE_ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x2,
            offset: 0,
            shader_location: 0,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32,
            offset: 16,
            shader_location: 1,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32,
            offset: 20,
            shader_location: 2,
        },
    ];

    /// Instance-rate view of the particle buffer: position, size, opacity.
    pub fn instance_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::STRIDE,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::INSTANCE_ATTRIBUTES,
        }
    }
}
