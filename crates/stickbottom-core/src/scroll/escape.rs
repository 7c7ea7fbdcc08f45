//! L4 Atomic Layer: Telling user scrolling apart from programmatic scrolling
//!
//! Pure decision functions. The engine gathers the inputs when a scroll
//! notification's follow-up check runs and applies the verdict.

/// Snapshot taken when a scroll notification arrives
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollObservation {
    /// Offset reported by the notification
    pub scroll_top: f64,
    /// Offset to compare against when inferring direction
    pub last_scroll_top: f64,
    /// Offset the engine wrote last, consumed by this notification
    pub ignore_scroll_to_top: Option<f64>,
}

impl ScrollObservation {
    /// Build an observation from the raw notification values.
    ///
    /// Scroll events may coalesce or arrive out of order while an animation
    /// writes offsets; when the last programmatic write is further down than
    /// the reported offset, direction is inferred against that write.
    pub fn new(scroll_top: f64, last_scroll_top: Option<f64>, ignore_scroll_to_top: Option<f64>) -> Self {
        let mut last = last_scroll_top.unwrap_or(scroll_top);
        if let Some(ignore) = ignore_scroll_to_top {
            if ignore > scroll_top {
                last = ignore;
            }
        }
        Self {
            scroll_top,
            last_scroll_top: last,
            ignore_scroll_to_top,
        }
    }

    pub fn is_scrolling_up(&self) -> bool {
        self.scroll_top < self.last_scroll_top
    }

    pub fn is_scrolling_down(&self) -> bool {
        self.scroll_top > self.last_scroll_top
    }

    /// The offset is exactly what the engine wrote
    pub fn is_echo(&self) -> bool {
        self.ignore_scroll_to_top == Some(self.scroll_top)
    }
}

/// Engine state consulted alongside an observation
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EscapeContext {
    /// A content resize is still settling
    pub resizing: bool,
    /// The running animation refuses to be escaped
    pub ignore_escapes: bool,
    /// The user is dragging a text selection over the surface
    pub selecting: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// Caused by a resize or by the engine's own write
    Discard,
    /// Undo the user's scroll by restoring this offset
    Revert(f64),
    /// The user left the bottom
    Escape,
    /// Not an escape; `release` clears the escaped flag
    Follow { release: bool },
}

/// Classify a scroll notification
pub fn classify(observation: &ScrollObservation, context: &EscapeContext) -> Verdict {
    if context.resizing || observation.is_echo() {
        return Verdict::Discard;
    }
    if context.ignore_escapes {
        return Verdict::Revert(observation.last_scroll_top);
    }
    if context.selecting || observation.is_scrolling_up() {
        return Verdict::Escape;
    }
    Verdict::Follow {
        release: observation.is_scrolling_down(),
    }
}

/// Whether an upward wheel gesture escapes before any scroll notification
///
/// Browsers may cancel wheel scrolling when an animation writes the offset in
/// between, so an upward wheel over an overflowing surface escapes at once.
pub fn wheel_escapes(delta_y: f64, overflowing: bool, ignore_escapes: bool) -> bool {
    delta_y < 0.0 && overflowing && !ignore_escapes
}
