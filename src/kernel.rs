//! Host-side twin of the compute shader.
//!
//! Every function here performs the same f32 arithmetic as its WGSL
//! counterpart in `shaders/compute.wgsl`, in the same order, using the
//! constants from [`crate::shader`]. It exists so simulation behaviour can be
//! tested without a GPU and GPU readbacks can be checked against a reference.
//! Transcendentals (`sin`) may differ from the GPU in the last few ulps.

use crate::particle::Particle;
use crate::shader::{
    LANDING_MARGIN, POINTER_PUSH, POINTER_RADIUS, SPAWN_BAND, SWAY_FREQUENCY, WIND_DRIFT,
    WIND_RESPONSE,
};
use crate::shader_utils::{hash2, rand, rand_range};
use crate::uniforms::SnowUniforms;
use std::f32::consts::TAU;

/// Fresh particle from `seed`.
///
/// `full_surface` scatters it anywhere from the spawn band to the bottom edge
/// (initial fill); otherwise it starts just above the top edge.
pub fn spawn(seed: u32, full_surface: bool, u: &SnowUniforms) -> Particle {
    let size = rand_range(seed.wrapping_add(1), u.min_size, u.max_size);
    let x = rand(seed.wrapping_add(2)) * u.screen_size[0];
    let y = if full_surface {
        rand_range(seed.wrapping_add(3), -SPAWN_BAND, u.screen_size[1])
    } else {
        -(size + 1.0 + rand(seed.wrapping_add(3)) * SPAWN_BAND)
    };
    let speed = rand_range(seed.wrapping_add(4), u.min_speed, u.max_speed);

    Particle {
        position: [x, y],
        velocity: [0.0, speed],
        size,
        opacity: 1.0,
        phase: rand(seed.wrapping_add(5)),
        seed,
    }
}

/// What `init_particles` writes into slot `index`.
pub fn init_particle(index: u32, u: &SnowUniforms) -> Particle {
    spawn(hash2(index, u.time.to_bits()), true, u)
}

/// Replacement for a particle that fell off the bottom or melted away.
pub fn respawn(index: u32, p: &Particle, u: &SnowUniforms) -> Particle {
    spawn(hash2(index ^ p.seed, u.time.to_bits()), false, u)
}

/// True when `p` rests on (or is inside) the window footprint in `u`.
pub fn on_window(p: &Particle, u: &SnowUniforms) -> bool {
    let [rx, ry, rw, rh] = u.window_rect;
    if u.interaction == 0 || rw <= 0.0 || rh <= 0.0 {
        return false;
    }
    let [x, y] = p.position;
    let over_x = x + p.size >= rx && x - p.size <= rx + rw;
    let over_y = y + p.size >= ry - LANDING_MARGIN && y <= ry + rh;
    over_x && over_y
}

/// What `update_particles` does to slot `index`.
pub fn step(index: u32, particle: Particle, u: &SnowUniforms) -> Particle {
    let mut p = particle;
    let dt = u.delta_time;
    let [width, height] = u.screen_size;

    if p.position[1] >= height {
        return respawn(index, &p, u);
    }

    let sway = 0.6 + 0.4 * (u.time * SWAY_FREQUENCY + p.phase * TAU).sin();
    let drift_vx = u.wind_strength * WIND_DRIFT * sway;
    p.velocity[0] += (drift_vx - p.velocity[0]) * (WIND_RESPONSE * dt).min(1.0);

    let away = [p.position[0] - u.pointer[0], p.position[1] - u.pointer[1]];
    let dist = (away[0] * away[0] + away[1] * away[1]).sqrt();
    if dist > 0.0 && dist < POINTER_RADIUS {
        p.position[0] += away[0] / dist * POINTER_PUSH * (1.0 - dist / POINTER_RADIUS) * dt;
    }

    if on_window(&p, u) {
        p.opacity -= u.melt_rate * dt;
        if p.opacity <= 0.0 {
            p = respawn(index, &p, u);
        }
        return p;
    }

    p.position[0] += p.velocity[0] * dt;
    p.position[1] += p.velocity[1] * dt;

    if p.position[0] < -p.size {
        p.position[0] = width + p.size;
    } else if p.position[0] > width + p.size {
        p.position[0] = -p.size;
    }

    if p.position[1] >= height {
        p = respawn(index, &p, u);
    }
    p
}

/// Initialize `u.particle_count` slots.
pub fn init_all(u: &SnowUniforms) -> Vec<Particle> {
    (0..u.particle_count).map(|i| init_particle(i, u)).collect()
}

/// Step the first `u.particle_count` slots; the rest are left alone.
pub fn step_all(particles: &mut [Particle], u: &SnowUniforms) {
    for (index, p) in particles
        .iter_mut()
        .enumerate()
        .take(u.particle_count as usize)
    {
        *p = step(index as u32, *p, u);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::settings::{Settings, ValueRange};
    use crate::uniforms::{build_uniforms, FrameInputs};
    use glam::Vec2;
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    fn settings(wind: f32, interaction: bool) -> Settings {
        let mut settings = Settings::default();
        settings.wind_strength = wind;
        settings.window_interaction = interaction;
        settings
    }

    fn uniforms(settings: &Settings, window: Rect, time: f32) -> SnowUniforms {
        build_uniforms(
            settings,
            &FrameInputs {
                window_rect: window,
                screen_size: Vec2::new(1920.0, 1080.0),
                pointer: None,
                elapsed: time,
                delta: DT,
                particle_count: 2000,
            },
        )
    }

    fn flake(x: f32, y: f32, speed: f32) -> Particle {
        Particle {
            position: [x, y],
            velocity: [0.0, speed],
            size: 5.0,
            opacity: 1.0,
            phase: 0.3,
            seed: 7,
        }
    }

    fn respawned(p: &Particle) -> bool {
        p.position[1] < 0.0 && p.opacity == 1.0
    }

    #[test]
    fn test_init_values_in_range() {
        let u = uniforms(&Settings::default(), Rect::OFF, 0.0);
        let particles = init_all(&u);
        assert_eq!(particles.len(), 2000);

        for p in &particles {
            assert!((0.0..1920.0).contains(&p.position[0]));
            assert!((-SPAWN_BAND..1080.0).contains(&p.position[1]));
            assert!((u.min_size..=u.max_size).contains(&p.size));
            assert!((u.min_speed..=u.max_speed).contains(&p.velocity[1]));
            assert_eq!(p.velocity[0], 0.0);
            assert_eq!(p.opacity, 1.0);
            assert!((0.0..1.0).contains(&p.phase));
        }
    }

    #[test]
    fn test_init_is_deterministic() {
        let u = uniforms(&Settings::default(), Rect::OFF, 0.0);
        assert_eq!(init_all(&u), init_all(&u));
        assert_ne!(init_particle(0, &u), init_particle(1, &u));
    }

    #[test]
    fn test_fall_without_interaction_is_exact() {
        let window = Rect::new(0.0, 0.0, 1920.0, 1080.0);
        let u = uniforms(&settings(0.0, false), window, 3.0);
        let before = flake(300.0, 400.0, 150.0);
        let after = step(0, before, &u);

        assert_eq!(after.position[1], before.position[1] + before.velocity[1] * DT);
        assert_eq!(after.opacity, 1.0);
    }

    #[test]
    fn test_interaction_flag_gates_melting() {
        // Rect set, flag cleared: still no melting.
        let mut u = uniforms(&settings(0.0, true), Rect::new(100.0, 100.0, 400.0, 300.0), 1.0);
        u.interaction = 0;
        let p = step(0, flake(300.0, 90.0, 120.0), &u);
        assert_eq!(p.opacity, 1.0);
        assert!(p.position[1] > 90.0);
    }

    #[test]
    fn test_bottom_edge_respawns_on_top() {
        let u = uniforms(&Settings::default(), Rect::OFF, 5.0);
        let p = step(3, flake(200.0, 1080.0, 100.0), &u);
        assert!(respawned(&p));
        assert!(p.position[1] <= -(p.size + 1.0));
        assert!((0.0..1920.0).contains(&p.position[0]));
    }

    #[test]
    fn test_scenario_steady_fall() {
        let mut s = settings(0.0, false);
        s.snowflake_speed_range = ValueRange::new(120.0, 120.0);
        let mut p = flake(960.0, 0.0, 120.0);

        for frame in 0..60 {
            let u = uniforms(&s, Rect::OFF, frame as f32 * DT);
            p = step(0, p, &u);
        }
        assert!((p.position[1] - 120.0).abs() < 0.01, "y = {}", p.position[1]);
        assert_eq!(p.position[0], 960.0);

        // Near the bottom: gone within two frames.
        let mut p = flake(960.0, 1079.0, 120.0);
        let mut frames = 0;
        while !respawned(&p) {
            let u = uniforms(&s, Rect::OFF, 10.0 + frames as f32 * DT);
            p = step(0, p, &u);
            frames += 1;
            assert!(frames <= 2);
        }
    }

    /// Drops a flake onto a window's top edge and expects it to melt away
    /// within the melt-law frame limit.
    fn assert_melts_on_window_top(s: &Settings) {
        let window = Rect::new(100.0, 100.0, 400.0, 300.0);
        let limit = (1.0 / (s.melt_rate() * DT)).ceil() as usize + 1;

        let mut p = flake(300.0, 90.0, 120.0);
        let mut last_opacity = p.opacity;
        for frame in 0..limit {
            let u = uniforms(s, window, frame as f32 * DT);
            p = step(0, p, &u);
            if respawned(&p) && frame > 0 {
                return;
            }
            assert!(p.opacity < last_opacity);
            assert!(p.position[1] <= window.y + LANDING_MARGIN);
            last_opacity = p.opacity;
        }
        panic!("flake did not melt within {} frames", limit);
    }

    #[test]
    fn test_scenario_melts_on_window_top() {
        assert_melts_on_window_top(&settings(0.0, true));
    }

    #[test]
    fn test_zero_melting_speed_still_recycles() {
        let mut s = settings(0.0, true);
        s.melting_speed = 0.0;
        assert_melts_on_window_top(&s);
    }

    #[test]
    fn test_no_melting_when_interaction_disabled() {
        let s = settings(1.0, false);
        let window = Rect::new(100.0, 100.0, 400.0, 300.0);
        let mut p = flake(300.0, 90.0, 60.0);
        for frame in 0..300 {
            let u = uniforms(&s, window, frame as f32 * DT);
            p = step(0, p, &u);
            assert_eq!(p.opacity, 1.0);
        }
    }

    #[test]
    fn test_wind_pushes_right() {
        let s = settings(1.0, false);
        let mut p = flake(500.0, 100.0, 30.0);
        for frame in 0..120 {
            let u = uniforms(&s, Rect::OFF, frame as f32 * DT);
            p = step(0, p, &u);
        }
        assert!(p.velocity[0] > 0.2 * WIND_DRIFT * 0.5);
        assert!(p.velocity[0] <= WIND_DRIFT);
        assert!(p.position[0] > 500.0);
    }

    #[test]
    fn test_calm_air_keeps_x() {
        let u = uniforms(&settings(0.0, false), Rect::OFF, 2.0);
        let p = step(0, flake(777.0, 10.0, 50.0), &u);
        assert_eq!(p.position[0], 777.0);
        assert_eq!(p.velocity[0], 0.0);
    }

    #[test]
    fn test_pointer_pushes_sideways_only() {
        let s = settings(0.0, false);
        let mut u = uniforms(&s, Rect::OFF, 1.0);
        u.pointer = [480.0, 300.0];

        let before = flake(500.0, 300.0, 60.0);
        let after = step(0, before, &u);
        assert!(after.position[0] > before.position[0]);
        assert_eq!(after.position[1], before.position[1] + before.velocity[1] * DT);

        // Out of range: untouched.
        u.pointer = [100.0, 300.0];
        assert_eq!(step(0, before, &u).position[0], 500.0);
    }

    #[test]
    fn test_horizontal_wrap() {
        let mut u = uniforms(&settings(0.0, false), Rect::OFF, 0.0);
        u.wind_strength = 0.0;

        let mut right = flake(1920.0 + 4.9, 100.0, 0.0);
        right.velocity[0] = 60.0;
        // Relaxes toward zero but still moves right past the edge.
        let wrapped = step(0, right, &u);
        assert_eq!(wrapped.position[0], -wrapped.size);

        let mut left = flake(-4.9, 100.0, 0.0);
        left.velocity[0] = -60.0;
        let wrapped = step(0, left, &u);
        assert_eq!(wrapped.position[0], 1920.0 + wrapped.size);
    }

    #[test]
    fn test_step_all_respects_particle_count() {
        let mut u = uniforms(&Settings::default(), Rect::OFF, 1.0);
        u.particle_count = 2;
        let untouched = flake(1.0, 1.0, 10.0);
        let mut particles = vec![untouched; 4];
        step_all(&mut particles, &u);
        assert_ne!(particles[0], untouched);
        assert_ne!(particles[1], untouched);
        assert_eq!(particles[2], untouched);
        assert_eq!(particles[3], untouched);
    }

    proptest! {
        #[test]
        fn prop_below_bottom_always_respawns(
            x in -50.0f32..1970.0,
            y in 1080.0f32..5000.0,
            seed in any::<u32>(),
            index in 0u32..100_000,
            time in 0.0f32..10_000.0,
        ) {
            let u = uniforms(&Settings::default(), Rect::new(0.0, 0.0, 1920.0, 1080.0), time);
            let mut p = flake(x, y, 100.0);
            p.seed = seed;
            p.opacity = 0.4;
            let after = step(index, p, &u);
            prop_assert!(after.position[1] < 0.0);
            prop_assert_eq!(after.opacity, 1.0);
        }

        #[test]
        fn prop_opacity_never_increases_while_melting(
            x in 120.0f32..480.0,
            y in 90.0f32..390.0,
            opacity in 0.05f32..1.0,
        ) {
            let u = uniforms(&settings(0.0, true), Rect::new(100.0, 100.0, 400.0, 300.0), 4.0);
            let mut p = flake(x, y, 100.0);
            p.opacity = opacity;
            let after = step(0, p, &u);
            prop_assert!(after.opacity < opacity || respawned(&after));
        }
    }
}
