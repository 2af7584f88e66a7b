//! The per-frame uniform block shared by the compute and render passes.
//!
//! [`build_uniforms`] is the only way a [`SnowUniforms`] value is produced: a
//! pure function of the settings snapshot and the frame's inputs.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::geometry::{Rect, OFF_SURFACE};
use crate::settings::Settings;

/// Uniform block, laid out as WGSL `SnowUniforms` (80 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SnowUniforms {
    pub screen_size: [f32; 2],
    /// Local pointer position, `(-1000, -1000)` when absent.
    pub pointer: [f32; 2],
    /// `(x, y, width, height)` in local space, [`Rect::OFF`] when inactive.
    pub window_rect: [f32; 4],
    pub time: f32,
    pub delta_time: f32,
    pub wind_strength: f32,
    pub min_size: f32,
    pub max_size: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    /// 1 when window interaction is on.
    pub interaction: u32,
    pub particle_count: u32,
    /// Opacity lost per second while resting on a window.
    pub melt_rate: f32,
    pub pad0: f32,
    pub pad1: f32,
}

impl SnowUniforms {
    pub const SIZE: u64 = std::mem::size_of::<SnowUniforms>() as u64;

    pub fn window_rect(&self) -> Rect {
        let [x, y, width, height] = self.window_rect;
        Rect::new(x, y, width, height)
    }

    pub fn interaction_enabled(&self) -> bool {
        self.interaction != 0
    }
}

/// Everything about the current frame that does not come from settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInputs {
    /// Tracked window in local space, [`Rect::OFF`] if none.
    pub window_rect: Rect,
    pub screen_size: Vec2,
    pub pointer: Option<Vec2>,
    pub elapsed: f32,
    pub delta: f32,
    pub particle_count: u32,
}

/// Assemble the uniform block for one frame.
pub fn build_uniforms(settings: &Settings, frame: &FrameInputs) -> SnowUniforms {
    let size = settings.snowflake_size_range.sanitized();
    let speed = settings.snowflake_speed_range.sanitized();
    let interaction = settings.window_interaction;

    let window_rect = if interaction && !frame.window_rect.is_empty() {
        frame.window_rect
    } else {
        Rect::OFF
    };

    SnowUniforms {
        screen_size: frame.screen_size.to_array(),
        pointer: frame
            .pointer
            .map_or([OFF_SURFACE, OFF_SURFACE], |p| p.to_array()),
        window_rect: window_rect.to_array(),
        time: frame.elapsed,
        delta_time: frame.delta,
        wind_strength: settings.wind_strength.max(0.0),
        min_size: size.min,
        max_size: size.max,
        min_speed: speed.min,
        max_speed: speed.max,
        interaction: interaction as u32,
        particle_count: frame.particle_count,
        melt_rate: settings.melt_rate(),
        pad0: 0.0,
        pad1: 0.0,
    }
}
