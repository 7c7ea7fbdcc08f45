//! Headless surfaces for tests, replays and hosts without a layout engine
//!
//! [`HeadlessSurface`] behaves like a browser scroll container: offsets are
//! rounded to whole pixels and clamped to `[0, scroll_height - client_height]`,
//! and shrinking content pulls the offset back in range.

use std::cell::Cell;
use std::rc::Rc;

use super::geometry::{ContentSurface, ScrollSurface};

/// Content box with a settable height
#[derive(Debug)]
pub struct HeadlessContent {
    height: Cell<f64>,
    connected: Cell<bool>,
}

impl HeadlessContent {
    pub fn new(height: f64) -> Self {
        Self {
            height: Cell::new(height.max(0.0)),
            connected: Cell::new(true),
        }
    }

    pub fn set_height(&self, height: f64) {
        self.height.set(height.max(0.0));
    }

    /// Grow (or shrink, for negative `delta`) the content
    pub fn grow(&self, delta: f64) {
        self.set_height(self.height.get() + delta);
    }

    /// Remove the content from the tree
    pub fn detach(&self) {
        self.connected.set(false);
    }
}

impl ContentSurface for HeadlessContent {
    fn height(&self) -> f64 {
        self.height.get()
    }

    fn is_connected(&self) -> bool {
        self.connected.get()
    }
}

/// Scroll container with pixel rounding
#[derive(Debug)]
pub struct HeadlessSurface {
    offset: Cell<f64>,
    client_height: Cell<f64>,
    scroll_height: Cell<f64>,
    content: Option<Rc<HeadlessContent>>,
    notified_offset: Cell<f64>,
}

impl HeadlessSurface {
    /// Surface with a fixed scroll height
    pub fn new(client_height: f64, scroll_height: f64) -> Self {
        Self {
            offset: Cell::new(0.0),
            client_height: Cell::new(client_height.max(0.0)),
            scroll_height: Cell::new(scroll_height.max(0.0)),
            content: None,
            notified_offset: Cell::new(0.0),
        }
    }

    /// Surface whose scroll height follows `content`
    pub fn with_content(client_height: f64, content: Rc<HeadlessContent>) -> Self {
        Self {
            content: Some(content),
            ..Self::new(client_height, 0.0)
        }
    }

    pub fn set_client_height(&self, height: f64) {
        self.client_height.set(height.max(0.0));
    }

    /// Only meaningful for surfaces built with [`HeadlessSurface::new`]
    pub fn set_scroll_height(&self, height: f64) {
        self.scroll_height.set(height.max(0.0));
    }

    /// Largest offset the surface accepts
    pub fn max_offset(&self) -> f64 {
        (self.scroll_height() - self.client_height()).max(0.0)
    }

    /// Move the offset the way a user would (wheel, drag, keyboard)
    pub fn user_scroll_by(&self, delta: f64) {
        self.set_scroll_top(self.scroll_top() + delta);
    }

    /// True once per offset change; hosts use it to decide when to emit a
    /// scroll notification.
    pub fn take_scroll_event(&self) -> bool {
        let current = self.scroll_top();
        if current != self.notified_offset.get() {
            self.notified_offset.set(current);
            true
        } else {
            false
        }
    }
}

impl ScrollSurface for HeadlessSurface {
    fn scroll_top(&self) -> f64 {
        self.offset.get().min(self.max_offset())
    }

    fn set_scroll_top(&self, value: f64) {
        let value = if value.is_finite() { value } else { 0.0 };
        self.offset.set(value.round().clamp(0.0, self.max_offset()));
    }

    fn scroll_height(&self) -> f64 {
        match &self.content {
            Some(content) => content.height().max(self.client_height()),
            None => self.scroll_height.get().max(self.client_height()),
        }
    }

    fn client_height(&self) -> f64 {
        self.client_height.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_round_and_clamp() {
        let surface = HeadlessSurface::new(100.0, 400.0);
        surface.set_scroll_top(10.4);
        assert_eq!(surface.scroll_top(), 10.0);
        surface.set_scroll_top(10.6);
        assert_eq!(surface.scroll_top(), 11.0);
        surface.set_scroll_top(1_000.0);
        assert_eq!(surface.scroll_top(), 300.0);
        surface.set_scroll_top(-5.0);
        assert_eq!(surface.scroll_top(), 0.0);
    }

    #[test]
    fn test_scroll_height_follows_content() {
        let content = Rc::new(HeadlessContent::new(50.0));
        let surface = HeadlessSurface::with_content(100.0, content.clone());
        assert_eq!(surface.scroll_height(), 100.0);

        content.grow(250.0);
        surface.set_scroll_top(500.0);
        assert_eq!(surface.scroll_top(), 200.0);

        content.grow(-100.0);
        assert_eq!(surface.scroll_top(), 100.0);
    }

    #[test]
    fn test_viewport_and_scroll_height_changes_reclamp() {
        let surface = HeadlessSurface::new(100.0, 400.0);
        surface.set_scroll_top(300.0);

        surface.set_client_height(200.0);
        assert_eq!(surface.max_offset(), 200.0);
        assert_eq!(surface.scroll_top(), 200.0);

        surface.set_scroll_height(600.0);
        assert_eq!(surface.max_offset(), 400.0);
        surface.set_scroll_top(1_000.0);
        assert_eq!(surface.scroll_top(), 400.0);

        surface.set_client_height(-10.0);
        assert_eq!(surface.client_height(), 0.0);
        assert_eq!(surface.max_offset(), 600.0);
    }

    #[test]
    fn test_take_scroll_event_reports_changes_once() {
        let surface = HeadlessSurface::new(100.0, 400.0);
        assert!(!surface.take_scroll_event());
        surface.user_scroll_by(30.0);
        assert!(surface.take_scroll_event());
        assert!(!surface.take_scroll_event());
    }
}
