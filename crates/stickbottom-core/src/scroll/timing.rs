//! L4 Atomic Layer: Time sources and frame arithmetic
//!
//! The engine never reads the system time directly. Everything goes through a
//! [`Clock`] so hosts and tests can drive animations deterministically.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Length of one frame at 60 fps; spring steps are scaled by it
pub const SIXTY_FPS_INTERVAL: Duration = Duration::from_micros(16_667);

/// Delay used to sequence follow-up checks after scroll and resize events
pub const FOLLOW_UP_DELAY: Duration = Duration::from_millis(1);

/// Source of the current time
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
///
/// Clones share the same time, so a test can keep one handle while the
/// engine owns another.
#[derive(Clone)]
pub struct ManualClock {
    origin: Instant,
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        let origin = Instant::now();
        Self {
            origin,
            now: Rc::new(Cell::new(origin)),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Jump to an absolute instant; moving backwards is ignored
    pub fn set(&self, instant: Instant) {
        if instant > self.now.get() {
            self.now.set(instant);
        }
    }

    /// Time elapsed since the clock was created
    pub fn elapsed(&self) -> Duration {
        self.now.get() - self.origin
    }

    /// Instant `offset` after the clock was created
    pub fn at(&self, offset: Duration) -> Instant {
        self.origin + offset
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("elapsed", &self.elapsed())
            .finish()
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// Number of 60 fps frames between `last` and `now`
///
/// Returns 0 when there is no previous tick, so the first step of an
/// animation never moves the offset.
#[inline]
pub fn frames_between(last: Option<Instant>, now: Instant) -> f64 {
    match last {
        Some(last) => {
            now.saturating_duration_since(last).as_secs_f64() / SIXTY_FPS_INTERVAL.as_secs_f64()
        }
        None => 0.0,
    }
}
