//! L4 Atomic Layer: Options for a scroll-to-bottom request

use std::time::Duration;

use tokio::sync::oneshot;

use super::behavior::AnimationRequest;

/// How long to wait before moving
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollWait {
    /// Join whatever animation is running instead of replacing it, then
    /// start after a minimal 1 ms delay
    Join,
    /// Replace the running animation and start after the given delay
    Delay(Duration),
}

impl ScrollWait {
    pub fn delay(&self) -> Duration {
        match self {
            ScrollWait::Join => Duration::from_millis(1),
            ScrollWait::Delay(delay) => *delay,
        }
    }
}

/// How long to keep holding the bottom after reaching it
#[derive(Debug)]
pub enum HoldDuration {
    /// Measured from the end of the wait
    Fixed(Duration),
    /// Until the sender fires or is dropped
    Until(oneshot::Receiver<()>),
}

impl From<Duration> for HoldDuration {
    fn from(duration: Duration) -> Self {
        HoldDuration::Fixed(duration)
    }
}

impl From<oneshot::Receiver<()>> for HoldDuration {
    fn from(rx: oneshot::Receiver<()>) -> Self {
        HoldDuration::Until(rx)
    }
}

/// Options for [`StickToBottom::scroll_to_bottom`](super::StickToBottom::scroll_to_bottom)
#[derive(Debug, Default)]
pub struct ScrollOptions {
    pub animation: Option<AnimationRequest>,
    pub wait: Option<ScrollWait>,
    /// Undo user scrolls while this animation runs
    pub ignore_escapes: bool,
    /// Do not re-pin; only animate if already at the bottom
    pub preserve_scroll_position: bool,
    pub duration: Option<HoldDuration>,
}

impl ScrollOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn animation(mut self, animation: impl Into<AnimationRequest>) -> Self {
        self.animation = Some(animation.into());
        self
    }

    pub fn wait(mut self, wait: ScrollWait) -> Self {
        self.wait = Some(wait);
        self
    }

    pub fn ignore_escapes(mut self, ignore: bool) -> Self {
        self.ignore_escapes = ignore;
        self
    }

    pub fn preserve_scroll_position(mut self, preserve: bool) -> Self {
        self.preserve_scroll_position = preserve;
        self
    }

    pub fn duration(mut self, duration: impl Into<HoldDuration>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    /// Whether this request joins a running animation
    pub fn joins(&self) -> bool {
        matches!(self.wait, Some(ScrollWait::Join))
    }
}

impl From<AnimationRequest> for ScrollOptions {
    fn from(animation: AnimationRequest) -> Self {
        Self::new().animation(animation)
    }
}
