//! L4 Atomic Layer: Settlement of scroll requests
//!
//! Every `scroll_to_bottom` call gets a [`ScrollHandle`]. Requests folded
//! into one animation share its completion, so all of their handles settle
//! together.

use tokio::sync::watch;

/// Observes the outcome of a scroll request
///
/// Settles with `true` once the view reached and held the bottom, `false`
/// when stickiness was lost first or the engine was disposed.
#[derive(Debug, Clone)]
pub struct ScrollHandle {
    rx: watch::Receiver<Option<bool>>,
}

impl ScrollHandle {
    /// Outcome, if already settled
    pub fn result(&self) -> Option<bool> {
        *self.rx.borrow()
    }

    pub fn is_settled(&self) -> bool {
        self.result().is_some()
    }

    /// Wait for the outcome. A dropped engine counts as `false`.
    pub async fn settled(mut self) -> bool {
        let outcome = match self.rx.wait_for(Option::is_some).await {
            Ok(outcome) => *outcome,
            Err(_) => None,
        };
        outcome.unwrap_or(false)
    }
}

/// Sending side of one or more merged requests
#[derive(Debug)]
pub(crate) struct Completion {
    primary: watch::Sender<Option<bool>>,
    merged: Vec<watch::Sender<Option<bool>>>,
}

impl Completion {
    pub(crate) fn new() -> (Self, ScrollHandle) {
        let (primary, rx) = watch::channel(None);
        (
            Self {
                primary,
                merged: Vec::new(),
            },
            ScrollHandle { rx },
        )
    }

    /// Another handle on the same outcome
    pub(crate) fn subscribe(&self) -> ScrollHandle {
        ScrollHandle {
            rx: self.primary.subscribe(),
        }
    }

    /// Fold `other` in; both settle together from now on
    pub(crate) fn absorb(&mut self, other: Completion) {
        self.merged.push(other.primary);
        self.merged.extend(other.merged);
    }

    /// Number of requests waiting on this completion
    pub(crate) fn waiters(&self) -> usize {
        1 + self.merged.len()
    }

    pub(crate) fn settle(self, outcome: bool) {
        self.primary.send_replace(Some(outcome));
        for tx in self.merged {
            tx.send_replace(Some(outcome));
        }
    }
}
