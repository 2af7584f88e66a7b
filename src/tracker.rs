//! Rate-limited tracking of the focused window rectangle.
//!
//! [`WindowRectTracker`] asks its [`WindowPoller`] for the active window at most
//! once per [`WINDOW_POLL_INTERVAL`], converts the answer into the surface's
//! local space, and caches it. The cache only changes when a poll finishes, so
//! between polls the simulation always sees the last verified rectangle.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, warn};

use crate::geometry::{Rect, SurfaceSpace};
use crate::window_info::WindowProvider;

/// How often the active window is re-queried, independent of frame rate.
pub const WINDOW_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Runs active-window queries on behalf of a tracker.
pub trait WindowPoller: Send {
    /// Start a query. Returns `false` if the previous one is still running,
    /// in which case nothing is started.
    fn request(&mut self) -> bool;

    /// Result of the last finished query, once. `Some(None)` means the query
    /// finished and found no qualifying window.
    fn try_take(&mut self) -> Option<Option<Rect>>;
}

/// Calls the provider on the caller's thread.
///
/// Only suitable for providers that answer well within a frame.
pub struct InlinePoller {
    provider: Arc<dyn WindowProvider>,
    result: Option<Option<Rect>>,
}

impl InlinePoller {
    pub fn new(provider: Arc<dyn WindowProvider>) -> Self {
        Self {
            provider,
            result: None,
        }
    }
}

impl WindowPoller for InlinePoller {
    fn request(&mut self) -> bool {
        self.result = Some(self.provider.active_window_rect());
        true
    }

    fn try_take(&mut self) -> Option<Option<Rect>> {
        self.result.take()
    }
}

/// Calls the provider on a dedicated worker thread.
///
/// At most one query is in flight. Dropping the poller closes the request
/// channel; the worker exits once any query it is running returns. Drop never
/// waits for that query, so a hung provider cannot stall the caller.
pub struct ThreadedPoller {
    requests: Option<Sender<()>>,
    results: Receiver<Option<Rect>>,
    in_flight: bool,
    worker: Option<JoinHandle<()>>,
}

impl ThreadedPoller {
    pub fn spawn(provider: Arc<dyn WindowProvider>) -> std::io::Result<Self> {
        let (request_tx, request_rx) = bounded::<()>(1);
        let (result_tx, result_rx) = bounded::<Option<Rect>>(1);

        let worker = std::thread::Builder::new()
            .name("snowfall-window-poll".into())
            .spawn(move || {
                for () in request_rx.iter() {
                    let rect = provider.active_window_rect();
                    if result_tx.send(rect).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            requests: Some(request_tx),
            results: result_rx,
            in_flight: false,
            worker: Some(worker),
        })
    }
}

impl WindowPoller for ThreadedPoller {
    fn request(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        let Some(requests) = &self.requests else {
            return false;
        };
        match requests.try_send(()) {
            Ok(()) => {
                self.in_flight = true;
                true
            }
            Err(TrySendError::Full(())) => false,
            Err(TrySendError::Disconnected(())) => {
                warn!("window poll worker exited; window interaction disabled for this surface");
                self.requests = None;
                false
            }
        }
    }

    fn try_take(&mut self) -> Option<Option<Rect>> {
        let rect = self.results.try_recv().ok()?;
        self.in_flight = false;
        Some(rect)
    }
}

impl Drop for ThreadedPoller {
    fn drop(&mut self) {
        self.requests.take();
        let Some(worker) = self.worker.take() else {
            return;
        };
        if worker.is_finished() {
            if worker.join().is_err() {
                warn!("window poll worker panicked");
            }
        } else {
            // Detached; it sees the closed channel after the current query.
            debug!("window poll still running at teardown, detaching worker");
        }
    }
}

/// A verified window rectangle in both spaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedWindow {
    pub global: Rect,
    pub local: Rect,
}

/// Per-surface cache of the focused window rectangle.
pub struct WindowRectTracker {
    poller: Box<dyn WindowPoller>,
    interval: Duration,
    last_poll: Option<Instant>,
    cached: Option<TrackedWindow>,
}

impl WindowRectTracker {
    pub fn new(poller: Box<dyn WindowPoller>) -> Self {
        Self {
            poller,
            interval: WINDOW_POLL_INTERVAL,
            last_poll: None,
            cached: None,
        }
    }

    /// Tracker that polls `provider` on a worker thread, falling back to
    /// inline polling if the thread cannot be spawned.
    pub fn threaded(provider: Arc<dyn WindowProvider>) -> Self {
        match ThreadedPoller::spawn(Arc::clone(&provider)) {
            Ok(poller) => Self::new(Box::new(poller)),
            Err(e) => {
                warn!("failed to spawn window poll thread ({}), polling inline", e);
                Self::new(Box::new(InlinePoller::new(provider)))
            }
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Cached window, if the last finished poll accepted one.
    pub fn tracked(&self) -> Option<TrackedWindow> {
        self.cached
    }

    /// Cached rectangle in local space, or [`Rect::OFF`].
    pub fn local_rect(&self) -> Rect {
        self.cached.map_or(Rect::OFF, |w| w.local)
    }

    /// Collects a finished poll and starts a new one if the interval elapsed.
    ///
    /// Never waits on the provider. Returns `true` when a new poll was due.
    pub fn refresh_if_due(&mut self, now: Instant, interaction: bool, space: &SurfaceSpace) -> bool {
        if let Some(outcome) = self.poller.try_take() {
            self.apply(outcome, interaction, space);
        }

        let due = self
            .last_poll
            .map_or(true, |last| now.saturating_duration_since(last) >= self.interval);
        if !due {
            return false;
        }
        self.last_poll = Some(now);

        if !interaction {
            self.cached = None;
            return true;
        }

        if self.poller.request() {
            if let Some(outcome) = self.poller.try_take() {
                self.apply(outcome, interaction, space);
            }
        } else {
            debug!("previous window poll still running, keeping cached rect");
        }
        true
    }

    fn apply(&mut self, outcome: Option<Rect>, interaction: bool, space: &SurfaceSpace) {
        self.cached = match outcome {
            Some(global) if interaction => {
                let local = space.rect_to_local(global);
                if local.intersects(&space.local_bounds()) {
                    Some(TrackedWindow { global, local })
                } else {
                    None
                }
            }
            _ => None,
        };
        debug!(window = ?self.cached, "window poll applied");
    }
}
