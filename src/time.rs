//! Per-surface frame clock.
//!
//! Provides elapsed time, delta time, frame counting and FPS for one overlay
//! surface. Delta is clamped to [`MAX_DELTA`] so a stalled frame (sleep, debugger,
//! display reconfiguration) never teleports particles.
//!
//! # Example
//!
//! ```
//! use snowfall::time::FrameClock;
//!
//! let mut clock = FrameClock::new();
//! let (elapsed, delta) = clock.update();
//! assert!(elapsed >= 0.0);
//! assert!(delta <= snowfall::time::MAX_DELTA);
//! ```

use std::time::{Duration, Instant};

/// Largest delta a single frame may report, in seconds.
pub const MAX_DELTA: f32 = 0.1;

/// Frame timing for one surface.
#[derive(Debug)]
pub struct FrameClock {
    /// When the clock was created.
    start: Instant,
    /// When the last frame occurred.
    last_frame: Instant,
    /// Total elapsed time in seconds, excluding paused spans.
    elapsed_secs: f32,
    /// Clamped time since last frame in seconds.
    delta_secs: f32,
    /// Total frames since start.
    frame_count: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
    paused: bool,
    /// Accumulated time spent paused.
    pause_elapsed: Duration,
}

impl FrameClock {
    /// Create a clock starting now.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Create a clock starting at `now`.
    pub fn starting_at(now: Instant) -> Self {
        Self {
            start: now,
            last_frame: now,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
            paused: false,
            pause_elapsed: Duration::ZERO,
        }
    }

    /// Advance to the current instant. Call once per frame.
    ///
    /// Returns `(elapsed_time, delta_time)`.
    pub fn update(&mut self) -> (f32, f32) {
        self.update_at(Instant::now())
    }

    /// Advance to `now`.
    pub fn update_at(&mut self, now: Instant) -> (f32, f32) {
        if self.paused {
            self.delta_secs = 0.0;
            return (self.elapsed_secs, self.delta_secs);
        }

        let raw_delta = now.saturating_duration_since(self.last_frame).as_secs_f32();
        self.delta_secs = raw_delta.min(MAX_DELTA);
        self.last_frame = now;

        let running = now
            .saturating_duration_since(self.start)
            .saturating_sub(self.pause_elapsed);
        self.elapsed_secs = running.as_secs_f32();

        self.frame_count += 1;

        let fps_elapsed = now.saturating_duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        (self.elapsed_secs, self.delta_secs)
    }

    /// Elapsed running time in seconds.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    /// Clamped delta of the last frame in seconds.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Stop time. While paused `delta()` is 0 and `elapsed()` holds.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume after [`pause`](Self::pause); the paused span is not counted.
    pub fn resume(&mut self) {
        self.resume_at(Instant::now());
    }

    pub fn resume_at(&mut self, now: Instant) {
        if self.paused {
            self.pause_elapsed += now.saturating_duration_since(self.last_frame);
            self.last_frame = now;
            self.paused = false;
        }
    }

    /// Pause or resume to match `paused`.
    pub fn set_paused(&mut self, paused: bool) {
        match (self.paused, paused) {
            (false, true) => self.pause(),
            (true, false) => self.resume(),
            _ => {}
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_new() {
        let clock = FrameClock::new();
        assert_eq!(clock.frame(), 0);
        assert!(!clock.is_paused());
        assert_eq!(clock.elapsed(), 0.0);
    }

    #[test]
    fn test_delta_between_frames() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);

        let (elapsed, delta) = clock.update_at(start + Duration::from_millis(16));
        assert!((delta - 0.016).abs() < 1e-4);
        assert!((elapsed - 0.016).abs() < 1e-4);
        assert_eq!(clock.frame(), 1);

        let (elapsed, delta) = clock.update_at(start + Duration::from_millis(32));
        assert!((delta - 0.016).abs() < 1e-4);
        assert!((elapsed - 0.032).abs() < 1e-4);
    }

    #[test]
    fn test_delta_clamped_after_stall() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);
        let (elapsed, delta) = clock.update_at(start + Duration::from_secs(3));
        assert_eq!(delta, MAX_DELTA);
        // Elapsed time keeps wall-clock pace.
        assert!((elapsed - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_pause_freezes_time() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);
        clock.update_at(start + Duration::from_millis(100));

        clock.pause();
        assert!(clock.is_paused());
        let elapsed_before = clock.elapsed();
        clock.update_at(start + Duration::from_millis(500));
        assert_eq!(clock.elapsed(), elapsed_before);
        assert_eq!(clock.delta(), 0.0);
    }

    #[test]
    fn test_resume_skips_paused_span() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);
        clock.update_at(start + Duration::from_millis(100));
        clock.pause();
        clock.resume_at(start + Duration::from_secs(10));

        let (elapsed, delta) = clock.update_at(start + Duration::from_millis(10_050));
        assert!((delta - 0.05).abs() < 1e-4);
        assert!((elapsed - 0.15).abs() < 1e-3);
    }

    #[test]
    fn test_fps_estimate() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);
        for i in 1..=30 {
            clock.update_at(start + Duration::from_millis(i * 20));
        }
        // 25 frames in the first 500 ms.
        assert!((clock.fps() - 50.0).abs() < 1.0);
    }
}
