//! One overlay surface: its particles, passes, clock and inputs.
//!
//! A [`SurfaceController`] is created when a display gets an overlay and
//! dropped when the overlay goes away. Per frame it runs
//!
//! 1. capacity check (reallocate and re-initialize if the setting changed),
//! 2. frame acquisition,
//! 3. clock update,
//! 4. window tracker refresh,
//! 5. uniform upload,
//! 6. compute step and render draw in one submission, then present.

use std::sync::Arc;
use std::time::Instant;

use glam::Vec2;
use tracing::{debug, info, warn};
use winit::event::WindowEvent;

use crate::error::GpuError;
use crate::geometry::SurfaceSpace;
use crate::gpu::{choose_alpha_mode, GpuContext, ParticleStore, RenderStage, SimulationStage};
use crate::input::PointerState;
use crate::settings::Settings;
use crate::time::FrameClock;
use crate::tracker::WindowRectTracker;
use crate::uniforms::{build_uniforms, FrameInputs, SnowUniforms};

/// Frames between frame-rate log lines.
const FPS_LOG_FRAMES: u64 = 600;

/// Format used for offscreen targets.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Where frames go.
pub enum FrameTarget {
    /// A window's swapchain.
    Window {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    /// A texture, for headless use.
    Offscreen { texture: wgpu::Texture },
}

impl FrameTarget {
    fn format(&self) -> wgpu::TextureFormat {
        match self {
            FrameTarget::Window { config, .. } => config.format,
            FrameTarget::Offscreen { texture } => texture.format(),
        }
    }
}

/// Outcome of [`SurfaceController::render_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The frame was drawn (and presented, for windows).
    Rendered,
    /// No texture this time; try again next frame.
    Skipped,
}

/// Drives the snow on one display surface.
pub struct SurfaceController {
    name: String,
    ctx: Arc<GpuContext>,
    target: FrameTarget,
    space: SurfaceSpace,
    settings: Settings,
    store: ParticleStore,
    uniform_buffer: wgpu::Buffer,
    simulation: SimulationStage,
    render: RenderStage,
    tracker: WindowRectTracker,
    clock: FrameClock,
    pointer: PointerState,
    last_uniforms: Option<SnowUniforms>,
}

impl SurfaceController {
    /// Controller presenting to a window surface of `size` physical pixels.
    pub fn for_window(
        name: impl Into<String>,
        ctx: Arc<GpuContext>,
        surface: wgpu::Surface<'static>,
        size: (u32, u32),
        space: SurfaceSpace,
        tracker: WindowRectTracker,
        settings: &Settings,
    ) -> Result<Self, GpuError> {
        let caps = surface.get_capabilities(&ctx.adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| caps.formats.first().copied())
            .ok_or(GpuError::UnsupportedSurface)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.0.max(1),
            height: size.1.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: choose_alpha_mode(&caps.alpha_modes),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&ctx.device, &config);

        Self::build(
            name.into(),
            ctx,
            FrameTarget::Window { surface, config },
            space,
            tracker,
            settings,
        )
    }

    /// Controller rendering into a texture of `size` pixels.
    pub fn offscreen(
        name: impl Into<String>,
        ctx: Arc<GpuContext>,
        size: (u32, u32),
        space: SurfaceSpace,
        tracker: WindowRectTracker,
        settings: &Settings,
    ) -> Result<Self, GpuError> {
        let texture = create_offscreen_texture(&ctx.device, size);
        Self::build(
            name.into(),
            ctx,
            FrameTarget::Offscreen { texture },
            space,
            tracker,
            settings,
        )
    }

    fn build(
        name: String,
        ctx: Arc<GpuContext>,
        target: FrameTarget,
        space: SurfaceSpace,
        tracker: WindowRectTracker,
        settings: &Settings,
    ) -> Result<Self, GpuError> {
        let store = ParticleStore::new(&ctx, settings.particle_capacity())?;

        let uniform_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Snow Uniform Buffer"),
            size: SnowUniforms::SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let simulation = SimulationStage::new(&ctx, &store, &uniform_buffer)?;
        let render = RenderStage::new(&ctx, target.format(), &uniform_buffer)?;

        info!(
            surface = %name,
            width = space.size.x,
            height = space.size.y,
            format = ?target.format(),
            "overlay surface created"
        );

        Ok(Self {
            name,
            ctx,
            target,
            space,
            settings: settings.clone(),
            store,
            uniform_buffer,
            simulation,
            render,
            tracker,
            clock: FrameClock::new(),
            pointer: PointerState::new(),
            last_uniforms: None,
        })
    }

    /// Size the particle store for `capacity` and scatter every slot over the
    /// surface. Blocks until the GPU has finished.
    ///
    /// A no-op when the store already has that capacity and is initialized.
    pub fn initialize(&mut self, capacity: u32) -> Result<(), GpuError> {
        self.store.resize(&self.ctx, capacity)?;
        if !self.store.needs_init() {
            return Ok(());
        }
        self.simulation
            .rebind(&self.ctx.device, &self.store, &self.uniform_buffer);

        let count = self.store.capacity();
        let uniforms = build_uniforms(
            &self.settings,
            &FrameInputs {
                window_rect: self.tracker.local_rect(),
                screen_size: self.space.size,
                pointer: self.pointer.position(),
                elapsed: self.clock.elapsed(),
                delta: 0.0,
                particle_count: count,
            },
        );
        self.ctx
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Snow Init Encoder"),
            });
        self.simulation.encode_init(&mut encoder, count);
        let index = self.ctx.queue.submit(Some(encoder.finish()));
        self.ctx
            .device
            .poll(wgpu::Maintain::WaitForSubmissionIndex(index));

        self.store.mark_initialized();
        debug!(surface = %self.name, count, "particles initialized");
        Ok(())
    }

    /// Follow a change in the surface's pixel size. Zero sizes (minimized
    /// windows) are ignored.
    pub fn on_surface_resized(&mut self, size: (u32, u32)) {
        if size.0 == 0 || size.1 == 0 {
            debug!(surface = %self.name, "ignoring zero-sized resize");
            return;
        }

        match &mut self.target {
            FrameTarget::Window { surface, config } => {
                config.width = size.0;
                config.height = size.1;
                surface.configure(&self.ctx.device, config);
            }
            FrameTarget::Offscreen { texture } => {
                *texture = create_offscreen_texture(&self.ctx.device, size);
            }
        }
        self.space.size = Vec2::new(size.0 as f32, size.1 as f32);
        debug!(surface = %self.name, width = size.0, height = size.1, "surface resized");
    }

    /// Pointer position in local pixels, `None` once it leaves the surface.
    pub fn set_pointer(&mut self, position: Option<Vec2>) {
        self.pointer.set(position);
    }

    /// Feed a window event to the pointer tracker. Returns `true` if used.
    pub fn handle_pointer_event(&mut self, event: &WindowEvent) -> bool {
        self.pointer.handle_event(event)
    }

    /// Advance and draw one frame using `settings`.
    pub fn render_frame(&mut self, settings: &Settings) -> Result<FrameStatus, GpuError> {
        if settings != &self.settings {
            self.settings = settings.clone();
        }

        let capacity = self.settings.particle_capacity();
        if capacity != self.store.capacity() || self.store.needs_init() {
            self.initialize(capacity)?;
        }

        let Some(frame) = self.acquire()? else {
            return Ok(FrameStatus::Skipped);
        };

        let now = Instant::now();
        self.clock.set_paused(self.settings.is_paused);
        let (elapsed, delta) = self.clock.update_at(now);
        let frame_index = self.clock.frame();
        if !self.clock.is_paused() && frame_index > 0 && frame_index % FPS_LOG_FRAMES == 0 {
            debug!(surface = %self.name, fps = self.clock.fps(), "frame rate");
        }

        self.tracker
            .refresh_if_due(now, self.settings.window_interaction, &self.space);
        let window_rect = self.tracker.local_rect();

        // A window covering the whole display hides the snow.
        let hidden = self.settings.pause_in_fullscreen
            && self.settings.window_interaction
            && window_rect.contains(&self.space.local_bounds());

        let count = self.store.capacity();
        let uniforms = build_uniforms(
            &self.settings,
            &FrameInputs {
                window_rect,
                screen_size: self.space.size,
                pointer: self.pointer.position(),
                elapsed,
                delta,
                particle_count: count,
            },
        );
        self.ctx
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
        self.last_uniforms = Some(uniforms);

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Snow Frame Encoder"),
            });
        if !self.settings.is_paused && !hidden {
            self.simulation.encode_step(&mut encoder, count);
        }
        let drawn = if hidden { 0 } else { count };
        self.render
            .encode_draw(&mut encoder, frame.view(), &self.store, drawn);
        self.ctx.queue.submit(Some(encoder.finish()));

        frame.present();
        Ok(FrameStatus::Rendered)
    }

    fn acquire(&self) -> Result<Option<AcquiredFrame>, GpuError> {
        match &self.target {
            FrameTarget::Window { surface, config } => match surface.get_current_texture() {
                Ok(texture) => {
                    let view = texture
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default());
                    Ok(Some(AcquiredFrame::Surface { texture, view }))
                }
                Err(wgpu::SurfaceError::Timeout) => {
                    debug!(surface = %self.name, "surface texture timed out, skipping frame");
                    Ok(None)
                }
                Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                    debug!(surface = %self.name, "surface outdated, reconfiguring");
                    surface.configure(&self.ctx.device, config);
                    Ok(None)
                }
                Err(wgpu::SurfaceError::OutOfMemory) => Err(wgpu::SurfaceError::OutOfMemory.into()),
                Err(e) => {
                    warn!(surface = %self.name, "failed to acquire surface texture: {}", e);
                    Ok(None)
                }
            },
            FrameTarget::Offscreen { texture } => Ok(Some(AcquiredFrame::Offscreen {
                view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn space(&self) -> &SurfaceSpace {
        &self.space
    }

    pub fn capacity(&self) -> u32 {
        self.store.capacity()
    }

    pub fn store(&self) -> &ParticleStore {
        &self.store
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn tracker(&self) -> &WindowRectTracker {
        &self.tracker
    }

    pub fn pointer(&self) -> Option<Vec2> {
        self.pointer.position()
    }

    /// Uniforms used by the most recent rendered frame.
    pub fn last_uniforms(&self) -> Option<&SnowUniforms> {
        self.last_uniforms.as_ref()
    }

    /// Copy the particle buffer to the host (blocking).
    pub fn read_particles(&self) -> Result<Vec<crate::particle::Particle>, GpuError> {
        self.store.read_back(&self.ctx)
    }
}

impl Drop for SurfaceController {
    fn drop(&mut self) {
        debug!(surface = %self.name, "overlay surface dropped");
    }
}

enum AcquiredFrame {
    Surface {
        texture: wgpu::SurfaceTexture,
        view: wgpu::TextureView,
    },
    Offscreen {
        view: wgpu::TextureView,
    },
}

impl AcquiredFrame {
    fn view(&self) -> &wgpu::TextureView {
        match self {
            AcquiredFrame::Surface { view, .. } | AcquiredFrame::Offscreen { view } => view,
        }
    }

    fn present(self) {
        if let AcquiredFrame::Surface { texture, view } = self {
            drop(view);
            texture.present();
        }
    }
}

fn create_offscreen_texture(device: &wgpu::Device, size: (u32, u32)) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Snow Offscreen Target"),
        size: wgpu::Extent3d {
            width: size.0.max(1),
            height: size.1.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}
