//! The GPU-resident particle array.

use tracing::debug;

use super::GpuContext;
use crate::error::GpuError;
use crate::particle::Particle;

/// Storage buffer holding one [`Particle`] per slot.
///
/// The buffer is also bound as an instance-rate vertex buffer by the render
/// pass, so it is never copied between passes.
pub struct ParticleStore {
    buffer: wgpu::Buffer,
    capacity: u32,
    generation: u64,
    needs_init: bool,
}

impl ParticleStore {
    /// Allocate room for `capacity` particles (at least one).
    pub fn new(ctx: &GpuContext, capacity: u32) -> Result<Self, GpuError> {
        let capacity = capacity.max(1);
        Ok(Self {
            buffer: allocate(ctx, capacity)?,
            capacity,
            generation: 0,
            needs_init: true,
        })
    }

    /// Reallocate for `capacity` particles and request a full re-init.
    ///
    /// Returns `Ok(false)` without touching anything if the capacity is
    /// unchanged. Zero is raised to one.
    pub fn resize(&mut self, ctx: &GpuContext, capacity: u32) -> Result<bool, GpuError> {
        let capacity = capacity.max(1);
        if capacity == self.capacity {
            return Ok(false);
        }

        self.buffer = allocate(ctx, capacity)?;
        debug!(from = self.capacity, to = capacity, "particle buffer reallocated");
        self.capacity = capacity;
        self.generation += 1;
        self.needs_init = true;
        Ok(true)
    }

    #[inline]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Bumped by every reallocation.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn needs_init(&self) -> bool {
        self.needs_init
    }

    pub fn mark_initialized(&mut self) {
        self.needs_init = false;
    }

    /// Copy every slot back to the host. Blocks until the copy finishes.
    pub fn read_back(&self, ctx: &GpuContext) -> Result<Vec<Particle>, GpuError> {
        let size = self.buffer.size();
        let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Readback Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Particle Readback Encoder"),
            });
        encoder.copy_buffer_to_buffer(&self.buffer, 0, &staging, 0, size);
        let index = ctx.queue.submit(Some(encoder.finish()));

        let (tx, rx) = crossbeam_channel::bounded(1);
        let slice = staging.slice(..);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        ctx.device
            .poll(wgpu::Maintain::WaitForSubmissionIndex(index));

        rx.recv()
            .map_err(|_| GpuError::BufferMapping("map callback dropped".into()))?
            .map_err(|e| GpuError::BufferMapping(e.to_string()))?;

        let particles = {
            let data = slice.get_mapped_range();
            bytemuck::cast_slice::<u8, Particle>(&data).to_vec()
        };
        staging.unmap();
        Ok(particles)
    }
}

fn allocate(ctx: &GpuContext, capacity: u32) -> Result<wgpu::Buffer, GpuError> {
    let (buffer, err) = ctx.capture(|device| {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Buffer"),
            size: capacity as u64 * Particle::STRIDE,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    });
    match err {
        None => Ok(buffer),
        Some(e) => Err(GpuError::BufferAllocation {
            capacity,
            message: e.to_string(),
        }),
    }
}
