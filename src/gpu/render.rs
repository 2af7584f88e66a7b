//! Render pass: particles as instanced, alpha-blended soft discs.

use std::num::NonZeroU64;

use tracing::warn;

use super::{GpuContext, ParticleStore};
use crate::error::GpuError;
use crate::particle::Particle;
use crate::shader::{render_shader_source, FRAGMENT_ENTRY, VERTEX_ENTRY};
use crate::uniforms::SnowUniforms;

/// Straight alpha-over for color and alpha alike, so the composited overlay
/// keeps a meaningful alpha channel.
const SNOW_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Vertices per particle quad.
const QUAD_VERTICES: u32 = 6;

pub struct RenderStage {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
}

impl RenderStage {
    pub fn new(
        ctx: &GpuContext,
        format: wgpu::TextureFormat,
        uniform_buffer: &wgpu::Buffer,
    ) -> Result<Self, GpuError> {
        let ((pipeline, bind_group), err) = ctx.capture(|device| {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Snow Render Shader"),
                source: wgpu::ShaderSource::Wgsl(render_shader_source().into()),
            });

            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Snow Uniform Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(SnowUniforms::SIZE),
                    },
                    count: None,
                }],
            });

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Snow Uniform Bind Group"),
                layout: &layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Snow Render Pipeline Layout"),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });

            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Snow Render Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some(VERTEX_ENTRY),
                    compilation_options: Default::default(),
                    buffers: &[Particle::instance_layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(FRAGMENT_ENTRY),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(SNOW_BLEND),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

            (pipeline, bind_group)
        });

        if let Some(e) = err {
            return Err(GpuError::Pipeline {
                label: "render",
                message: e.to_string(),
            });
        }

        Ok(Self {
            pipeline,
            bind_group,
        })
    }

    /// Record a pass that clears `view` to transparent and draws the first
    /// `count` particles of `store`.
    pub fn encode_draw(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        store: &ParticleStore,
        count: u32,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Snow Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let count = count.min(store.capacity());
        if count == 0 {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, store.buffer().slice(..));
        pass.draw(0..QUAD_VERTICES, 0..count);
    }
}

/// Composite alpha mode for a transparent overlay: post-multiplied, then
/// pre-multiplied, then whatever comes first.
pub fn choose_alpha_mode(supported: &[wgpu::CompositeAlphaMode]) -> wgpu::CompositeAlphaMode {
    const PREFERRED: [wgpu::CompositeAlphaMode; 2] = [
        wgpu::CompositeAlphaMode::PostMultiplied,
        wgpu::CompositeAlphaMode::PreMultiplied,
    ];

    if let Some(mode) = PREFERRED.into_iter().find(|m| supported.contains(m)) {
        return mode;
    }
    let fallback = supported
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);
    warn!(
        "surface has no transparent composite alpha mode, using {:?}; the overlay may be opaque",
        fallback
    );
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::CompositeAlphaMode as Mode;

    #[test]
    fn test_alpha_mode_preference() {
        assert_eq!(
            choose_alpha_mode(&[Mode::Opaque, Mode::PreMultiplied, Mode::PostMultiplied]),
            Mode::PostMultiplied
        );
        assert_eq!(
            choose_alpha_mode(&[Mode::Opaque, Mode::PreMultiplied]),
            Mode::PreMultiplied
        );
        assert_eq!(choose_alpha_mode(&[Mode::Inherit, Mode::Opaque]), Mode::Inherit);
        assert_eq!(choose_alpha_mode(&[]), Mode::Auto);
    }
}
