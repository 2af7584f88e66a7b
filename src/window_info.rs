//! Active-window discovery.
//!
//! The OS-specific part (enumerating windows, asking for the frontmost
//! process) lives behind [`WindowProvider`]. Picking the one window snow should
//! melt on is platform independent and lives in [`select_active_window`].

use crate::error::ProviderError;
use crate::geometry::Rect;

/// Layer of ordinary application windows. Menus, HUDs and overlays sit above.
pub const BASE_LAYER: i32 = 0;

/// Windows at or below this width or height are tooltips, popovers and the like.
pub const MIN_WINDOW_EXTENT: f32 = 150.0;

/// Windows at or below this alpha are treated as see-through.
pub const MIN_WINDOW_ALPHA: f32 = 0.9;

/// One entry of a window enumeration, in provider order (front to back).
#[derive(Debug, Clone, PartialEq)]
pub struct WindowInfo {
    pub owner_pid: u32,
    pub owner_name: Option<String>,
    pub layer: i32,
    /// Bounds in the window frame (union top-left origin, Y down).
    pub bounds: Rect,
    pub alpha: f32,
    pub on_screen: bool,
}

impl WindowInfo {
    fn qualifies(&self, frontmost_pid: u32) -> bool {
        self.owner_pid == frontmost_pid
            && self.layer == BASE_LAYER
            && self.bounds.width > MIN_WINDOW_EXTENT
            && self.bounds.height > MIN_WINDOW_EXTENT
            && self.alpha > MIN_WINDOW_ALPHA
            && self.on_screen
    }
}

/// Source of OS window geometry.
///
/// Implementations must be cheap to share between threads; the tracker may
/// call them from a worker thread.
pub trait WindowProvider: Send + Sync {
    /// Process id of the application that owns keyboard focus.
    fn frontmost_pid(&self) -> Option<u32>;

    /// Visible windows, front to back.
    fn windows(&self) -> Result<Vec<WindowInfo>, ProviderError>;

    /// Whether a launcher/overview surface currently covers the desktop.
    fn is_overview_visible(&self) -> bool;

    /// The focused window's rectangle, or `None` when there isn't a
    /// qualifying one. Provider errors count as "none".
    fn active_window_rect(&self) -> Option<Rect> {
        if self.is_overview_visible() {
            return None;
        }
        let pid = self.frontmost_pid()?;
        match self.windows() {
            Ok(windows) => select_active_window(&windows, pid),
            Err(e) => {
                tracing::debug!("window enumeration failed: {}", e);
                None
            }
        }
    }
}

/// First window (in provider order) owned by `frontmost_pid` that is on the
/// base layer, large, opaque and on screen.
pub fn select_active_window(windows: &[WindowInfo], frontmost_pid: u32) -> Option<Rect> {
    windows
        .iter()
        .find(|w| w.qualifies(frontmost_pid))
        .map(|w| w.bounds)
}

/// Provider for platforms without a window-enumeration backend.
///
/// Reports no focused application, so snow never melts.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullWindowProvider;

impl WindowProvider for NullWindowProvider {
    fn frontmost_pid(&self) -> Option<u32> {
        None
    }

    fn windows(&self) -> Result<Vec<WindowInfo>, ProviderError> {
        Err(ProviderError::Unavailable(
            "no window enumeration backend on this platform".into(),
        ))
    }

    fn is_overview_visible(&self) -> bool {
        false
    }
}
