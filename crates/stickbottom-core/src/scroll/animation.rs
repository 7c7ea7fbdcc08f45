//! L3 Molecular Layer: Spring scroll animator
//!
//! Each scroll request becomes an [`AnimationRun`] stepped once per animation
//! frame. The target may keep moving while a run is in flight (streamed
//! content), so every step re-reads it instead of interpolating towards a
//! fixed end point.
//!
//! Several runs can be queued at once (a joining request with different
//! parameters waits behind the current one), but only the run that claimed
//! [`ScrollState::animation`](super::ScrollState) writes offsets.

use std::time::{Duration, Instant};

use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, trace};

use super::behavior::ResolvedBehavior;
use super::completion::Completion;
use super::engine::{ActiveAnimation, FrameTask, RunId, StickToBottom};
use super::options::{HoldDuration, ScrollOptions};
use super::timing::frames_between;

/// When a run stops holding the bottom
#[derive(Debug)]
pub(crate) enum Hold {
    /// `None` is a deadline past the end of the clock; it never elapses
    Until(Option<Instant>),
    Signal {
        rx: oneshot::Receiver<()>,
        settled_at: Option<Instant>,
    },
}

impl Hold {
    pub(crate) fn new(duration: Option<HoldDuration>, wait_until: Option<Instant>) -> Self {
        match duration {
            None => Hold::Until(wait_until),
            Some(HoldDuration::Fixed(duration)) => {
                Hold::Until(wait_until.and_then(|start| start.checked_add(duration)))
            }
            Some(HoldDuration::Until(rx)) => Hold::Signal {
                rx,
                settled_at: None,
            },
        }
    }

    fn is_holding(&mut self, now: Instant) -> bool {
        match self {
            Hold::Until(deadline) => deadline.map_or(true, |deadline| now < deadline),
            Hold::Signal { rx, settled_at } => {
                if settled_at.is_none() {
                    if let Err(TryRecvError::Empty) = rx.try_recv() {
                        return true;
                    }
                    *settled_at = Some(now);
                }
                false
            }
        }
    }

    /// Hold time left at `now`, `None` when it is over or unbounded
    fn remaining(&self, now: Instant) -> Option<Duration> {
        let end = match self {
            Hold::Until(deadline) => (*deadline)?,
            Hold::Signal { settled_at, .. } => (*settled_at)?,
        };
        let remaining = end.saturating_duration_since(now);
        (!remaining.is_zero()).then_some(remaining)
    }
}

#[derive(Debug)]
pub(crate) struct AnimationRun {
    pub(crate) id: RunId,
    pub(crate) behavior: ResolvedBehavior,
    pub(crate) ignore_escapes: bool,
    /// `None` when the delay runs past the end of the clock
    pub(crate) wait_until: Option<Instant>,
    pub(crate) hold: Hold,
    /// Target the run is heading for; refreshed while holding
    pub(crate) start_target: f64,
    pub(crate) completion: Completion,
}

impl AnimationRun {
    fn claim(&self) -> ActiveAnimation {
        ActiveAnimation {
            run: self.id,
            behavior: self.behavior.clone(),
            ignore_escapes: self.ignore_escapes,
            handle: self.completion.subscribe(),
        }
    }
}

/// Result of one frame of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Step {
    Continue,
    Done(bool),
    Abandoned,
    /// The target moved while holding; restart with the resize preset
    Chain { remaining: Option<Duration> },
}

impl StickToBottom {
    /// Step run `id` for the current frame. Runs superseded since the frame
    /// was requested are gone and the call does nothing.
    pub(crate) fn advance_run(&mut self, id: RunId) {
        let Some(index) = self.runs.iter().position(|run| run.id == id) else {
            return;
        };
        let mut run = self.runs.remove(index);

        match self.step(&mut run) {
            Step::Continue => {
                let index = index.min(self.runs.len());
                self.runs.insert(index, run);
                self.scheduler.request_frame(FrameTask::Step(id));
            }
            Step::Done(at_bottom) => {
                debug!(run = id, at_bottom, "Scroll animation finished");
                run.completion.settle(at_bottom);
                self.scheduler.request_frame(FrameTask::ResetIntegration);
            }
            Step::Abandoned => {
                debug!(run = id, "Scroll animation abandoned, no longer at bottom");
                run.completion.settle(false);
                self.scheduler.request_frame(FrameTask::ResetIntegration);
            }
            Step::Chain { remaining } => {
                debug!(run = id, ?remaining, "Target moved while holding, chaining resize animation");
                let mut options = ScrollOptions::new().ignore_escapes(run.ignore_escapes);
                options.animation = self.config.resize;
                options.duration = remaining.map(HoldDuration::Fixed);
                self.start_animation(options, run.completion);
            }
        }
    }

    fn step(&mut self, run: &mut AnimationRun) -> Step {
        if !self.state.is_at_bottom {
            self.release_animation(run.id);
            return Step::Abandoned;
        }

        let now = self.clock.now();
        let scroll_top = self.scroll_top();
        let tick_delta = frames_between(self.state.last_tick, now);

        let owns = match &self.state.animation {
            Some(active) => active.run == run.id,
            None => {
                self.state.animation = Some(run.claim());
                true
            }
        };
        if owns {
            self.state.last_tick = Some(now);
        }

        let waiting = run.wait_until.map_or(true, |wait_until| now < wait_until);
        if self.is_selecting() || waiting {
            return Step::Continue;
        }

        let target = self.calculated_target_scroll_top();
        if scroll_top < run.start_target.min(target) {
            if owns {
                match &run.behavior {
                    ResolvedBehavior::Instant => self.set_scroll_top(target),
                    ResolvedBehavior::Spring(params) => {
                        let difference = target - scroll_top;
                        self.state.velocity = (params.damping * self.state.velocity
                            + params.stiffness * difference)
                            / params.mass;
                        self.state.accumulated += self.state.velocity * tick_delta;
                        self.set_scroll_top(scroll_top + self.state.accumulated);

                        // Sub-pixel motion keeps accumulating until the
                        // surface actually moves
                        if self.scroll_top() != scroll_top {
                            self.state.accumulated = 0.0;
                        }
                        trace!(
                            run = run.id,
                            offset = self.scroll_top(),
                            target,
                            velocity = self.state.velocity,
                            "Spring step"
                        );
                    }
                }
            }
            return Step::Continue;
        }

        if run.hold.is_holding(now) {
            run.start_target = target;
            return Step::Continue;
        }

        self.release_animation(run.id);
        if self.scroll_top() < self.calculated_target_scroll_top() {
            return Step::Chain {
                remaining: run.hold.remaining(now),
            };
        }
        Step::Done(self.state.is_at_bottom)
    }

    fn release_animation(&mut self, id: RunId) {
        if self.state.animation.as_ref().is_some_and(|active| active.run == id) {
            self.state.animation = None;
        }
    }
}
