//! Display layout and coordinate conversion.
//!
//! Three coordinate conventions meet here:
//!
//! | Space | Origin | Y axis | Used by |
//! |-------|--------|--------|---------|
//! | display frame | bottom-left of the union box | up | [`SurfaceSpace::origin`] |
//! | window frame | top-left of the union box | down | [`crate::WindowProvider`] rects |
//! | local | top-left of one surface | down | particles, uniforms |
//!
//! The *global* space is the union bounding box of every display. A window
//! rectangle reported by a provider is converted into one surface's local space
//! with [`SurfaceSpace::global_to_local`]:
//!
//! ```text
//! local_x = global_x - origin_x
//! local_y = global_y - (global_height - (origin_y + surface_height))
//! ```

use glam::Vec2;

/// Sentinel coordinate used for "nothing here" (no pointer, no window).
pub const OFF_SURFACE: f32 = -1000.0;

/// Axis-aligned rectangle, `origin` at its top-left corner in whatever space
/// the caller is working in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// The off-surface sentinel rectangle: far outside any surface, zero-sized.
    pub const OFF: Rect = Rect {
        x: OFF_SURFACE,
        y: OFF_SURFACE,
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    #[inline]
    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    /// Zero or negative area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// True when both rectangles share a region of positive area.
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.x < other.max_x()
            && other.x < self.max_x()
            && self.y < other.max_y()
            && other.y < self.max_y()
    }

    /// True when `other` lies entirely inside this rectangle.
    pub fn contains(&self, other: &Rect) -> bool {
        !self.is_empty()
            && self.x <= other.x
            && self.y <= other.y
            && self.max_x() >= other.max_x()
            && self.max_y() >= other.max_y()
    }

    /// Packs the rectangle as `(x, y, width, height)` for the uniform block.
    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.width, self.height]
    }
}

/// One display's placement inside the global union box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSpace {
    /// Bottom-left corner of the display in the display frame.
    pub origin: Vec2,
    /// Display size in pixels.
    pub size: Vec2,
    /// Size of the union bounding box of all displays.
    pub global_size: Vec2,
}

impl SurfaceSpace {
    /// A single display that is the whole global space.
    pub fn standalone(size: Vec2) -> Self {
        Self {
            origin: Vec2::ZERO,
            size,
            global_size: size,
        }
    }

    /// Distance from the union's top edge to this surface's top edge.
    #[inline]
    fn top_offset(&self) -> f32 {
        self.global_size.y - (self.origin.y + self.size.y)
    }

    pub fn global_to_local(&self, point: Vec2) -> Vec2 {
        Vec2::new(point.x - self.origin.x, point.y - self.top_offset())
    }

    pub fn local_to_global(&self, point: Vec2) -> Vec2 {
        Vec2::new(point.x + self.origin.x, point.y + self.top_offset())
    }

    /// Converts a window-frame rectangle into this surface's local space.
    pub fn rect_to_local(&self, rect: Rect) -> Rect {
        let origin = self.global_to_local(rect.origin());
        Rect::new(origin.x, origin.y, rect.width, rect.height)
    }

    pub fn rect_to_global(&self, rect: Rect) -> Rect {
        let origin = self.local_to_global(rect.origin());
        Rect::new(origin.x, origin.y, rect.width, rect.height)
    }

    /// The surface itself in local space.
    pub fn local_bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.size.x, self.size.y)
    }
}

/// A physical display as reported by the windowing layer: top-left desktop
/// position, Y down.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorFrame {
    pub name: String,
    pub position: (i32, i32),
    pub size: (u32, u32),
}

/// All displays, placed inside their union bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayLayout {
    monitors: Vec<MonitorFrame>,
    spaces: Vec<SurfaceSpace>,
    global_size: Vec2,
}

impl DisplayLayout {
    pub fn new(monitors: Vec<MonitorFrame>) -> Self {
        if monitors.is_empty() {
            return Self {
                monitors,
                spaces: Vec::new(),
                global_size: Vec2::ZERO,
            };
        }

        let min_x = monitors.iter().map(|m| m.position.0).min().unwrap_or(0);
        let min_y = monitors.iter().map(|m| m.position.1).min().unwrap_or(0);
        let max_x = monitors
            .iter()
            .map(|m| m.position.0 + m.size.0 as i32)
            .max()
            .unwrap_or(0);
        let max_y = monitors
            .iter()
            .map(|m| m.position.1 + m.size.1 as i32)
            .max()
            .unwrap_or(0);

        let global_size = Vec2::new((max_x - min_x) as f32, (max_y - min_y) as f32);

        // Flip each monitor into the bottom-left display frame.
        let spaces = monitors
            .iter()
            .map(|m| SurfaceSpace {
                origin: Vec2::new(
                    (m.position.0 - min_x) as f32,
                    (max_y - (m.position.1 + m.size.1 as i32)) as f32,
                ),
                size: Vec2::new(m.size.0 as f32, m.size.1 as f32),
                global_size,
            })
            .collect();

        Self {
            monitors,
            spaces,
            global_size,
        }
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    pub fn global_size(&self) -> Vec2 {
        self.global_size
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MonitorFrame, &SurfaceSpace)> {
        self.monitors.iter().zip(self.spaces.iter())
    }

    pub fn space_of(&self, name: &str) -> Option<SurfaceSpace> {
        self.iter()
            .find(|(monitor, _)| monitor.name == name)
            .map(|(_, space)| *space)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn monitor(name: &str, x: i32, y: i32, w: u32, h: u32) -> MonitorFrame {
        MonitorFrame {
            name: name.to_string(),
            position: (x, y),
            size: (w, h),
        }
    }

    #[test]
    fn test_rect_intersects() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(a.intersects(&Rect::new(50.0, 50.0, 100.0, 100.0)));
        assert!(!a.intersects(&Rect::new(100.0, 0.0, 10.0, 10.0)));
        assert!(!a.intersects(&Rect::new(-20.0, -20.0, 10.0, 10.0)));
        assert!(!a.intersects(&Rect::OFF));
    }

    #[test]
    fn test_rect_contains() {
        let screen = Rect::new(0.0, 0.0, 1920.0, 1080.0);
        assert!(Rect::new(-4.0, -30.0, 1930.0, 1120.0).contains(&screen));
        assert!(screen.contains(&screen));
        assert!(!Rect::new(0.0, 25.0, 1920.0, 1055.0).contains(&screen));
        assert!(!Rect::OFF.contains(&screen));
    }

    #[test]
    fn test_off_rect_is_empty() {
        assert!(Rect::OFF.is_empty());
        assert_eq!(Rect::OFF.to_array(), [-1000.0, -1000.0, 0.0, 0.0]);
    }

    #[test]
    fn test_standalone_surface_is_identity() {
        let space = SurfaceSpace::standalone(Vec2::new(1920.0, 1080.0));
        let p = Vec2::new(300.0, 200.0);
        assert_eq!(space.global_to_local(p), p);
    }

    #[test]
    fn test_lower_display_shifts_y() {
        // Display 1080 px tall sitting under a 1440 px union: its top edge is
        // 360 px below the union top.
        let space = SurfaceSpace {
            origin: Vec2::new(2560.0, 0.0),
            size: Vec2::new(1920.0, 1080.0),
            global_size: Vec2::new(4480.0, 1440.0),
        };
        let local = space.global_to_local(Vec2::new(2660.0, 460.0));
        assert_eq!(local, Vec2::new(100.0, 100.0));
    }

    #[test]
    fn test_layout_side_by_side() {
        let layout = DisplayLayout::new(vec![
            monitor("main", 0, 0, 2560, 1440),
            monitor("side", 2560, 360, 1920, 1080),
        ]);

        assert_eq!(layout.len(), 2);
        assert_eq!(layout.global_size(), Vec2::new(4480.0, 1440.0));

        let main = layout.space_of("main").unwrap();
        assert_eq!(main.origin, Vec2::new(0.0, 0.0));

        // Side display bottom is flush with the union bottom.
        let side = layout.space_of("side").unwrap();
        assert_eq!(side.origin, Vec2::new(2560.0, 0.0));
        assert_eq!(side.global_to_local(Vec2::new(2560.0, 360.0)), Vec2::ZERO);
    }

    #[test]
    fn test_layout_negative_desktop_origin() {
        let layout = DisplayLayout::new(vec![
            monitor("left", -1920, 0, 1920, 1080),
            monitor("main", 0, 0, 1920, 1080),
        ]);
        assert_eq!(layout.global_size(), Vec2::new(3840.0, 1080.0));
        assert_eq!(layout.space_of("left").unwrap().origin, Vec2::ZERO);
        assert_eq!(
            layout.space_of("main").unwrap().origin,
            Vec2::new(1920.0, 0.0)
        );
    }

    #[test]
    fn test_empty_layout() {
        let layout = DisplayLayout::new(Vec::new());
        assert!(layout.is_empty());
        assert_eq!(layout.global_size(), Vec2::ZERO);
    }

    proptest! {
        #[test]
        fn prop_round_trip_identity_space(
            x in -4000.0f32..4000.0,
            y in -4000.0f32..4000.0,
            w in 0.0f32..3000.0,
            h in 0.0f32..3000.0,
        ) {
            let space = SurfaceSpace::standalone(Vec2::new(1920.0, 1080.0));
            let rect = Rect::new(x, y, w, h);
            prop_assert_eq!(space.rect_to_global(space.rect_to_local(rect)), rect);
        }

        #[test]
        fn prop_round_trip_offset_space(
            ox in 0u32..4000,
            oy in 0u32..2000,
            x in -4000i32..4000,
            y in -4000i32..4000,
        ) {
            // Integer pixel inputs keep the f32 arithmetic exact.
            let space = SurfaceSpace {
                origin: Vec2::new(ox as f32, oy as f32),
                size: Vec2::new(1920.0, 1080.0),
                global_size: Vec2::new(ox as f32 + 1920.0, oy as f32 + 1080.0 + 400.0),
            };
            let point = Vec2::new(x as f32, y as f32);
            prop_assert_eq!(space.local_to_global(space.global_to_local(point)), point);
        }
    }
}
