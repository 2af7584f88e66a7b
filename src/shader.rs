//! WGSL sources for the snow compute and render passes.
//!
//! Tuning constants live here in Rust and are emitted into both shader
//! modules, so the host kernel in [`crate::kernel`] and the GPU share one
//! definition.

use std::f32::consts::TAU;

use crate::shader_utils::RANDOM_WGSL;

const COMMON_WGSL: &str = include_str!("shaders/common.wgsl");
const COMPUTE_WGSL: &str = include_str!("shaders/compute.wgsl");
const RENDER_WGSL: &str = include_str!("shaders/render.wgsl");

/// Invocations per compute workgroup.
pub const WORKGROUP_SIZE: u32 = 256;

/// Height of the band above the top edge that spawned flakes start in.
pub const SPAWN_BAND: f32 = 120.0;
/// Angular frequency of the wind sway, radians per second.
pub const SWAY_FREQUENCY: f32 = 0.8;
/// Horizontal drift at wind strength 1, pixels per second.
pub const WIND_DRIFT: f32 = 40.0;
/// How quickly horizontal velocity follows the wind, per second.
pub const WIND_RESPONSE: f32 = 2.0;
/// Flakes this far above a window's top edge already count as landed.
pub const LANDING_MARGIN: f32 = 12.0;
pub const POINTER_RADIUS: f32 = 80.0;
/// Pointer push at zero distance, pixels per second.
pub const POINTER_PUSH: f32 = 160.0;
/// Height of the band above the bottom edge in which flakes fade out.
pub const FADE_BAND: f32 = 100.0;
pub const SNOW_TINT: [f32; 3] = [0.95, 0.97, 1.0];

/// Compute entry point that scatters every slot over the surface.
pub const INIT_ENTRY: &str = "init_particles";
/// Compute entry point that advances every slot by one frame.
pub const UPDATE_ENTRY: &str = "update_particles";
pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

fn constants_wgsl() -> String {
    format!(
        r#"const WORKGROUP_SIZE: u32 = {workgroup}u;
const TAU: f32 = {tau:?};
const SPAWN_BAND: f32 = {spawn:?};
const SWAY_FREQUENCY: f32 = {sway:?};
const WIND_DRIFT: f32 = {drift:?};
const WIND_RESPONSE: f32 = {response:?};
const LANDING_MARGIN: f32 = {landing:?};
const POINTER_RADIUS: f32 = {radius:?};
const POINTER_PUSH: f32 = {push:?};
const FADE_BAND: f32 = {fade:?};
const SNOW_TINT: vec3<f32> = vec3<f32>({r:?}, {g:?}, {b:?});
"#,
        workgroup = WORKGROUP_SIZE,
        tau = TAU,
        spawn = SPAWN_BAND,
        sway = SWAY_FREQUENCY,
        drift = WIND_DRIFT,
        response = WIND_RESPONSE,
        landing = LANDING_MARGIN,
        radius = POINTER_RADIUS,
        push = POINTER_PUSH,
        fade = FADE_BAND,
        r = SNOW_TINT[0],
        g = SNOW_TINT[1],
        b = SNOW_TINT[2],
    )
}

/// Full source of the compute module (`init_particles`, `update_particles`).
pub fn compute_shader_source() -> String {
    format!(
        "{}\n{}\n{}\n{}",
        constants_wgsl(),
        COMMON_WGSL,
        RANDOM_WGSL,
        COMPUTE_WGSL
    )
}

/// Full source of the render module (`vs_main`, `fs_main`).
pub fn render_shader_source() -> String {
    format!("{}\n{}\n{}", constants_wgsl(), COMMON_WGSL, RENDER_WGSL)
}
