//! Pointer tracking for one overlay surface.
//!
//! Overlay windows ignore clicks, so the only input that matters is where the
//! cursor is. [`PointerState`] follows `CursorMoved`/`CursorLeft` events and
//! hands the simulation a local position, or `None` once the cursor leaves.

use glam::Vec2;
use winit::event::WindowEvent;

/// Pointer position in local surface pixels, if the cursor is over the surface.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    position: Option<Vec2>,
}

impl PointerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current position, or `None` when the cursor is elsewhere.
    #[inline]
    pub fn position(&self) -> Option<Vec2> {
        self.position
    }

    pub fn set(&mut self, position: Option<Vec2>) {
        self.position = position;
    }

    /// Update from a window event. Returns `true` if the event was consumed.
    pub fn handle_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.position = Some(Vec2::new(position.x as f32, position.y as f32));
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.position = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;
    use winit::event::DeviceId;

    fn device() -> DeviceId {
        // SAFETY: the id never reaches a platform backend.
        unsafe { DeviceId::dummy() }
    }

    #[test]
    fn test_starts_absent() {
        assert_eq!(PointerState::new().position(), None);
    }

    #[test]
    fn test_cursor_events() {
        let mut pointer = PointerState::new();
        let moved = WindowEvent::CursorMoved {
            device_id: device(),
            position: PhysicalPosition::new(400.0, 300.0),
        };
        assert!(pointer.handle_event(&moved));
        assert_eq!(pointer.position(), Some(Vec2::new(400.0, 300.0)));

        let left = WindowEvent::CursorLeft { device_id: device() };
        assert!(pointer.handle_event(&left));
        assert_eq!(pointer.position(), None);

        assert!(!pointer.handle_event(&WindowEvent::Focused(true)));
    }

    #[test]
    fn test_set_and_clear() {
        let mut pointer = PointerState::new();
        pointer.set(Some(Vec2::new(10.0, 20.0)));
        assert_eq!(pointer.position(), Some(Vec2::new(10.0, 20.0)));
        pointer.set(None);
        assert_eq!(pointer.position(), None);
    }
}
