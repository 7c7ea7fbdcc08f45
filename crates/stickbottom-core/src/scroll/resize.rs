//! L4 Atomic Layer: Content resize observation
//!
//! Turns raw content heights into signed deltas. Hosts either push heights
//! from their own resize notifications or let the engine poll the content
//! surface once per frame.

use super::geometry::ContentSurface;

/// One observed content size change
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeObservation {
    pub height: f64,
    /// `height - previous`, zero for the first observation
    pub delta: f64,
    /// First observation since the monitor was (re)connected
    pub initial: bool,
}

#[derive(Debug, Clone)]
pub struct ResizeMonitor {
    previous_height: Option<f64>,
    connected: bool,
}

impl ResizeMonitor {
    pub fn new() -> Self {
        Self {
            previous_height: None,
            connected: true,
        }
    }

    /// Record a new height. Returns `None` once disconnected.
    pub fn observe(&mut self, height: f64) -> Option<ResizeObservation> {
        if !self.connected {
            return None;
        }
        let observation = ResizeObservation {
            height,
            delta: height - self.previous_height.unwrap_or(height),
            initial: self.previous_height.is_none(),
        };
        self.previous_height = Some(height);
        Some(observation)
    }

    /// Read the content height and observe it if it changed.
    ///
    /// A detached surface disconnects the monitor.
    pub fn poll(&mut self, content: &dyn ContentSurface) -> Option<ResizeObservation> {
        if !self.connected {
            return None;
        }
        if !content.is_connected() {
            tracing::debug!("Content surface detached, disconnecting resize monitor");
            self.disconnect();
            return None;
        }
        let height = content.height();
        if self.previous_height == Some(height) {
            return None;
        }
        self.observe(height)
    }

    /// Stop reporting observations
    pub fn disconnect(&mut self) {
        self.connected = false;
        self.previous_height = None;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn previous_height(&self) -> Option<f64> {
        self.previous_height
    }
}

impl Default for ResizeMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scroll::headless::HeadlessContent;

    #[test]
    fn test_first_observation_is_initial() {
        let mut monitor = ResizeMonitor::new();
        let first = monitor.observe(400.0).unwrap();
        assert!(first.initial);
        assert_eq!(first.delta, 0.0);

        let grown = monitor.observe(460.0).unwrap();
        assert!(!grown.initial);
        assert_eq!(grown.delta, 60.0);

        let shrunk = monitor.observe(420.0).unwrap();
        assert_eq!(shrunk.delta, -40.0);
    }

    #[test]
    fn test_poll_only_reports_changes() {
        let content = HeadlessContent::new(100.0);
        let mut monitor = ResizeMonitor::new();
        assert!(monitor.poll(&content).is_some());
        assert!(monitor.poll(&content).is_none());

        content.grow(25.0);
        assert_eq!(monitor.poll(&content).map(|o| o.delta), Some(25.0));
    }

    #[test]
    fn test_detached_content_disconnects() {
        let content = HeadlessContent::new(100.0);
        let mut monitor = ResizeMonitor::new();
        monitor.poll(&content);

        content.detach();
        content.grow(50.0);
        assert!(monitor.poll(&content).is_none());
        assert!(!monitor.is_connected());
        assert!(monitor.observe(300.0).is_none());
    }
}
