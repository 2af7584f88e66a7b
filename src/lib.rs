//! # Snowfall
//!
//! A transparent, click-through snow overlay rendered on the GPU.
//!
//! Every display gets its own overlay window. Snowflakes live entirely on the
//! GPU: a compute pass moves them each frame and a render pass draws them as
//! soft discs straight out of the same buffer. Flakes drift with the wind,
//! swerve around the pointer, and settle and melt on top of the focused
//! window.
//!
//! ## Quick Start
//!
//! ```ignore
//! use snowfall::prelude::*;
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), SnowError> {
//!     let store = SettingsStore::open("snowfall.json");
//!     SnowApp::new(store, Arc::new(NullWindowProvider)).run()
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Surfaces
//!
//! A [`SurfaceController`] owns everything one overlay needs: the particle
//! buffer ([`gpu::ParticleStore`]), the compute and render stages, a
//! [`FrameClock`], pointer state and a [`WindowRectTracker`]. Controllers never
//! share particle state; only the [`gpu::GpuContext`] device is shared.
//!
//! ### Window interaction
//!
//! A [`WindowProvider`] reports the focused window in global coordinates. The
//! tracker polls it at most twice a second on a worker thread and converts the
//! answer into the surface's local space (see [`geometry`]). Flakes that land
//! on the window's top edge stop and fade out at the configured melting speed.
//!
//! ### Settings
//!
//! [`Settings`] are loaded from a JSON file, can start from a [`Preset`], and
//! are reloaded when the file changes. Each frame reads one snapshot.
//!
//! ## Testing without a GPU
//!
//! [`kernel`] runs the compute shader's arithmetic on the CPU, so simulation
//! behaviour can be checked in plain unit tests.

pub mod app;
pub mod error;
pub mod geometry;
pub mod gpu;
pub mod input;
pub mod kernel;
pub mod particle;
pub mod settings;
pub mod shader;
pub mod shader_utils;
pub mod surface;
pub mod time;
pub mod tracker;
pub mod uniforms;
pub mod window_info;

pub use bytemuck;
pub use glam::Vec2;

pub use app::SnowApp;
pub use error::{GpuError, ProviderError, SettingsError, SnowError};
pub use geometry::{DisplayLayout, MonitorFrame, Rect, SurfaceSpace};
pub use input::PointerState;
pub use particle::Particle;
pub use settings::{DisplayMode, Preset, Settings, SettingsStore, SettingsWatcher, ValueRange};
pub use surface::{FrameStatus, SurfaceController};
pub use time::FrameClock;
pub use tracker::{InlinePoller, ThreadedPoller, WindowPoller, WindowRectTracker};
pub use uniforms::{build_uniforms, FrameInputs, SnowUniforms};
pub use window_info::{select_active_window, NullWindowProvider, WindowInfo, WindowProvider};

/// Common imports.
pub mod prelude {
    pub use crate::app::SnowApp;
    pub use crate::error::SnowError;
    pub use crate::geometry::{Rect, SurfaceSpace};
    pub use crate::settings::{Preset, Settings, SettingsStore, SettingsWatcher};
    pub use crate::surface::{FrameStatus, SurfaceController};
    pub use crate::window_info::{NullWindowProvider, WindowInfo, WindowProvider};
    pub use crate::Vec2;
}
