//! The winit application: one transparent overlay window per display.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::monitor::MonitorHandle;
use winit::window::{Window, WindowId, WindowLevel};

use crate::error::{GpuError, SnowError};
use crate::geometry::{DisplayLayout, MonitorFrame, SurfaceSpace};
use crate::gpu::GpuContext;
use crate::settings::{Settings, SettingsStore, SettingsWatcher};
use crate::surface::SurfaceController;
use crate::tracker::WindowRectTracker;
use crate::window_info::WindowProvider;

/// How often the monitor list is compared against the current layout.
const TOPOLOGY_CHECK_INTERVAL: Duration = Duration::from_secs(2);

struct Overlay {
    // Dropped before the window its surface points at.
    controller: SurfaceController,
    window: Arc<Window>,
}

/// Application state driving every overlay.
pub struct SnowApp {
    store: Arc<SettingsStore>,
    watcher: Option<SettingsWatcher>,
    provider: Arc<dyn WindowProvider>,
    gpu: Option<Arc<GpuContext>>,
    overlays: HashMap<WindowId, Overlay>,
    layout: DisplayLayout,
    /// Settings the current overlay set was built from.
    built_with: Settings,
    last_topology_check: Instant,
    started: bool,
}

impl SnowApp {
    pub fn new(store: Arc<SettingsStore>, provider: Arc<dyn WindowProvider>) -> Self {
        let built_with = store.snapshot();
        Self {
            store,
            watcher: None,
            provider,
            gpu: None,
            overlays: HashMap::new(),
            layout: DisplayLayout::new(Vec::new()),
            built_with,
            last_topology_check: Instant::now(),
            started: false,
        }
    }

    /// Reload settings whenever the watcher reports a change.
    pub fn with_watcher(mut self, watcher: SettingsWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Create the event loop and run until every overlay is closed.
    pub fn run(mut self) -> Result<(), SnowError> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Wait);
        event_loop.run_app(&mut self)?;
        Ok(())
    }

    fn rebuild_overlays(&mut self, event_loop: &ActiveEventLoop) {
        if !self.overlays.is_empty() {
            info!("rebuilding {} overlay(s)", self.overlays.len());
        }
        self.overlays.clear();

        let (frames, handles) = enumerate_monitors(event_loop);
        self.layout = DisplayLayout::new(frames);
        self.built_with = self.store.snapshot();
        self.last_topology_check = Instant::now();

        if self.layout.is_empty() {
            warn!("no displays found, nothing to draw on");
            return;
        }

        let layout = self.layout.clone();
        for ((frame, space), handle) in layout.iter().zip(handles) {
            if !self.built_with.shows_display(&frame.name) {
                debug!(display = %frame.name, "display not selected");
                continue;
            }
            match self.create_overlay(event_loop, frame, *space, &handle) {
                Ok(overlay) => {
                    overlay.window.request_redraw();
                    self.overlays.insert(overlay.window.id(), overlay);
                }
                Err(e) => error!(display = %frame.name, "overlay unavailable: {}", e),
            }
        }

        if self.overlays.is_empty() {
            warn!("no overlay could be created");
        } else {
            info!(
                overlays = self.overlays.len(),
                displays = self.layout.len(),
                "snowfall running"
            );
        }
    }

    fn create_overlay(
        &mut self,
        event_loop: &ActiveEventLoop,
        frame: &MonitorFrame,
        space: SurfaceSpace,
        monitor: &MonitorHandle,
    ) -> Result<Overlay, SnowError> {
        let attrs = Window::default_attributes()
            .with_title("Snowfall")
            .with_transparent(true)
            .with_decorations(false)
            .with_resizable(false)
            .with_active(false)
            .with_window_level(WindowLevel::AlwaysOnTop)
            .with_position(monitor.position())
            .with_inner_size(monitor.size());

        let window = Arc::new(event_loop.create_window(attrs)?);
        if let Err(e) = window.set_cursor_hittest(false) {
            warn!(display = %frame.name, "overlay cannot be made click-through: {}", e);
        }

        let (ctx, surface) = match &self.gpu {
            Some(ctx) => {
                let surface = ctx.instance.create_surface(window.clone()).map_err(GpuError::from)?;
                if !ctx.supports_surface(&surface) {
                    return Err(GpuError::UnsupportedSurface.into());
                }
                (ctx.clone(), surface)
            }
            None => {
                let instance = GpuContext::create_instance();
                let surface = instance.create_surface(window.clone()).map_err(GpuError::from)?;
                let ctx = pollster::block_on(GpuContext::request(instance, Some(&surface)))?;
                self.gpu = Some(ctx.clone());
                (ctx, surface)
            }
        };

        let size = window.inner_size();
        let settings = self.store.snapshot();
        let mut controller = SurfaceController::for_window(
            frame.name.clone(),
            ctx,
            surface,
            (size.width, size.height),
            space,
            WindowRectTracker::threaded(self.provider.clone()),
            &settings,
        )?;
        controller.initialize(settings.particle_capacity())?;

        Ok(Overlay { controller, window })
    }

    fn reload_settings(&mut self, event_loop: &ActiveEventLoop) {
        let changed = self
            .watcher
            .as_ref()
            .is_some_and(|watcher| watcher.poll_changed());
        if !changed {
            return;
        }

        match self.store.reload() {
            Ok(true) => {
                if self.store.snapshot().display_selection_differs(&self.built_with) {
                    info!("display selection changed");
                    self.rebuild_overlays(event_loop);
                }
            }
            Ok(false) => {}
            Err(e) => warn!("keeping current settings: {}", e),
        }
    }

    /// Drop one overlay. Exits once the last one is gone, since nothing
    /// is left to draw or to wake the loop.
    fn remove_overlay(&mut self, event_loop: &ActiveEventLoop, id: WindowId) {
        self.overlays.remove(&id);
        if self.overlays.is_empty() {
            info!("no overlays left, exiting");
            event_loop.exit();
        }
    }

    fn check_topology(&mut self, event_loop: &ActiveEventLoop) {
        if self.last_topology_check.elapsed() < TOPOLOGY_CHECK_INTERVAL {
            return;
        }
        self.last_topology_check = Instant::now();

        let (frames, _) = enumerate_monitors(event_loop);
        if DisplayLayout::new(frames) != self.layout {
            info!("display configuration changed");
            self.rebuild_overlays(event_loop);
        }
    }
}

impl ApplicationHandler for SnowApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !self.started {
            self.started = true;
            self.rebuild_overlays(event_loop);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(overlay) = self.overlays.get_mut(&id) else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                info!(display = %overlay.controller.name(), "overlay closed");
                self.remove_overlay(event_loop, id);
            }
            WindowEvent::Resized(size) => {
                overlay
                    .controller
                    .on_surface_resized((size.width, size.height));
            }
            WindowEvent::CursorMoved { .. } | WindowEvent::CursorLeft { .. } => {
                overlay.controller.handle_pointer_event(&event);
            }
            WindowEvent::RedrawRequested => {
                let settings = self.store.snapshot();
                match overlay.controller.render_frame(&settings) {
                    Ok(_) => overlay.window.request_redraw(),
                    Err(e) => {
                        error!(display = %overlay.controller.name(), "overlay stopped: {}", e);
                        self.remove_overlay(event_loop, id);
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.reload_settings(event_loop);
        self.check_topology(event_loop);
        event_loop.set_control_flow(idle_control_flow(!self.overlays.is_empty(), Instant::now()));
    }
}

/// Redraws drive the loop while overlays exist. Without any, wake up on the
/// topology interval so settings reloads and display changes are still seen.
fn idle_control_flow(has_overlays: bool, now: Instant) -> ControlFlow {
    if has_overlays {
        ControlFlow::Wait
    } else {
        ControlFlow::WaitUntil(now + TOPOLOGY_CHECK_INTERVAL)
    }
}

/// Current monitors as layout frames, with their handles in the same order.
fn enumerate_monitors(event_loop: &ActiveEventLoop) -> (Vec<MonitorFrame>, Vec<MonitorHandle>) {
    event_loop
        .available_monitors()
        .enumerate()
        .map(|(i, handle)| {
            let position = handle.position();
            let size = handle.size();
            let frame = MonitorFrame {
                name: handle.name().unwrap_or_else(|| format!("display-{}", i)),
                position: (position.x, position.y),
                size: (size.width, size.height),
            };
            (frame, handle)
        })
        .unzip()
}
