//! Compute pass: particle initialization and per-frame update.

use std::num::NonZeroU64;

use tracing::debug;

use super::{GpuContext, ParticleStore};
use crate::error::GpuError;
use crate::shader::{compute_shader_source, INIT_ENTRY, UPDATE_ENTRY, WORKGROUP_SIZE};
use crate::uniforms::SnowUniforms;

/// The two compute pipelines and their bind group.
pub struct SimulationStage {
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    bound_generation: u64,
    init_pipeline: wgpu::ComputePipeline,
    update_pipeline: wgpu::ComputePipeline,
}

impl SimulationStage {
    pub fn new(
        ctx: &GpuContext,
        store: &ParticleStore,
        uniform_buffer: &wgpu::Buffer,
    ) -> Result<Self, GpuError> {
        let ((layout, init_pipeline, update_pipeline), err) = ctx.capture(|device| {
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Snow Compute Shader"),
                source: wgpu::ShaderSource::Wgsl(compute_shader_source().into()),
            });

            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Snow Compute Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: false },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: NonZeroU64::new(SnowUniforms::SIZE),
                        },
                        count: None,
                    },
                ],
            });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Snow Compute Pipeline Layout"),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });

            let pipeline = |label: &str, entry: &str| {
                device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(label),
                    layout: Some(&pipeline_layout),
                    module: &module,
                    entry_point: Some(entry),
                    compilation_options: Default::default(),
                    cache: None,
                })
            };

            let init = pipeline("Snow Init Pipeline", INIT_ENTRY);
            let update = pipeline("Snow Update Pipeline", UPDATE_ENTRY);
            (layout, init, update)
        });

        if let Some(e) = err {
            return Err(GpuError::Pipeline {
                label: "compute",
                message: e.to_string(),
            });
        }

        let bind_group = create_bind_group(&ctx.device, &layout, store, uniform_buffer);
        Ok(Self {
            bind_group_layout: layout,
            bind_group,
            bound_generation: store.generation(),
            init_pipeline,
            update_pipeline,
        })
    }

    /// Rebuild the bind group if `store` was reallocated since the last bind.
    pub fn rebind(&mut self, device: &wgpu::Device, store: &ParticleStore, uniform_buffer: &wgpu::Buffer) {
        if store.generation() == self.bound_generation {
            return;
        }
        self.bind_group = create_bind_group(device, &self.bind_group_layout, store, uniform_buffer);
        self.bound_generation = store.generation();
        debug!(generation = self.bound_generation, "compute bind group rebuilt");
    }

    /// Record a pass that respawns the first `count` slots across the surface.
    pub fn encode_init(&self, encoder: &mut wgpu::CommandEncoder, count: u32) {
        self.dispatch(encoder, &self.init_pipeline, "Snow Init Pass", count);
    }

    /// Record a pass that advances the first `count` slots by one frame.
    pub fn encode_step(&self, encoder: &mut wgpu::CommandEncoder, count: u32) {
        self.dispatch(encoder, &self.update_pipeline, "Snow Update Pass", count);
    }

    fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::ComputePipeline,
        label: &str,
        count: u32,
    ) {
        if count == 0 {
            return;
        }
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(label),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.dispatch_workgroups(workgroup_count(count), 1, 1);
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    store: &ParticleStore,
    uniform_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Snow Compute Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: store.buffer().as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: uniform_buffer.as_entire_binding(),
            },
        ],
    })
}

/// Workgroups needed to cover `count` invocations.
pub(crate) fn workgroup_count(count: u32) -> u32 {
    count.div_ceil(WORKGROUP_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workgroup_count() {
        assert_eq!(workgroup_count(1), 1);
        assert_eq!(workgroup_count(256), 1);
        assert_eq!(workgroup_count(257), 2);
        assert_eq!(workgroup_count(100_000), 391);
    }
}
