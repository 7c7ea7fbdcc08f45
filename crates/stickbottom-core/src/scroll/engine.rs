//! L3 Molecular Layer: Stickiness state machine
//!
//! [`StickToBottom`] owns the scroll state record, turns scroll, wheel and
//! resize notifications into stickiness transitions, and issues animation
//! runs. It is single-threaded and never blocks: hosts push notifications in
//! and pump the frame and timer queues.
//!
//! # Driving the engine
//!
//! ```ignore
//! let mut engine = StickToBottom::new(EngineConfig::default());
//! engine.attach_scroll_surface(Some(scroll_surface));
//! engine.attach_content_surface(Some(content_surface));
//!
//! let handle = engine.scroll_to_bottom(ScrollOptions::default());
//! loop {
//!     engine.run_due_timers();
//!     if engine.needs_frame() {
//!         engine.on_animation_frame();
//!     }
//!     // forward scroll/wheel/resize notifications from the platform
//! }
//! ```

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::animation::{AnimationRun, Hold};
use super::behavior::{BehaviorResolver, ResolvedBehavior};
use super::completion::{Completion, ScrollHandle};
use super::escape::{classify, wheel_escapes, EscapeContext, ScrollObservation, Verdict};
use super::geometry::{
    accessor_for, ContentSurface, GeometryAccessor, ScrollMode, ScrollSurface, TargetContext,
};
use super::options::{ScrollOptions, ScrollWait};
use super::resize::{ResizeMonitor, ResizeObservation};
use super::scheduler::Scheduler;
use super::timing::{Clock, SystemClock, FOLLOW_UP_DELAY};
use crate::config::EngineConfig;

pub(crate) type RunId = u64;

type TargetResolver = Box<dyn Fn(f64, &TargetContext<'_>) -> f64>;
type SelectionProbe = Box<dyn Fn() -> bool>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum FrameTask {
    Step(RunId),
    ClearTargetCache,
    /// Drop integration state unless an animation claimed the engine since
    ResetIntegration,
    /// Schedule the reset of `resize_difference` after the frame
    ArmResizeReset(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum TimerTask {
    ScrollCheck(ScrollObservation),
    ResetResize(f64),
}

/// The animation currently writing offsets
#[derive(Debug, Clone)]
pub struct ActiveAnimation {
    pub behavior: ResolvedBehavior,
    pub ignore_escapes: bool,
    /// Settles together with the run
    pub handle: ScrollHandle,
    pub(crate) run: RunId,
}

/// Mutable state of one engine
#[derive(Debug, Clone, Default)]
pub struct ScrollState {
    /// Offset seen by the previous scroll notification
    pub last_scroll_top: Option<f64>,
    /// Offset of the last programmatic write, consumed by the next notification
    pub ignore_scroll_to_top: Option<f64>,
    /// Signed delta of the latest content resize, zero once it settled
    pub resize_difference: f64,
    pub animation: Option<ActiveAnimation>,
    pub last_tick: Option<std::time::Instant>,
    pub velocity: f64,
    pub accumulated: f64,
    pub escaped_from_lock: bool,
    pub is_at_bottom: bool,
    /// Near-bottom flag as of the last scroll or resize notification
    pub is_near_bottom: bool,
}

impl ScrollState {
    pub fn reset_integration(&mut self) {
        self.last_tick = None;
        self.velocity = 0.0;
        self.accumulated = 0.0;
    }
}

/// A wheel gesture delivered by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    pub delta_y: f64,
    /// The nearest scrollable ancestor of the wheel target is the bound
    /// scroll surface
    pub over_scroll_surface: bool,
}

/// Builder for [`StickToBottom`]
pub struct StickToBottomBuilder {
    config: EngineConfig,
    clock: Rc<dyn Clock>,
    target_resolver: Option<TargetResolver>,
    selection_probe: Option<SelectionProbe>,
    viewport: Option<Rc<dyn ScrollSurface>>,
}

impl StickToBottomBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            clock: Rc::new(SystemClock),
            target_resolver: None,
            selection_probe: None,
            viewport: None,
        }
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Rc::new(clock);
        self
    }

    /// Replace the natural bottom with a custom target. The result is
    /// clamped to `[0, natural]`.
    pub fn target_scroll_top<F>(mut self, resolver: F) -> Self
    where
        F: Fn(f64, &TargetContext<'_>) -> f64 + 'static,
    {
        self.target_resolver = Some(Box::new(resolver));
        self
    }

    /// Report whether the user is dragging a text selection over the
    /// scroll surface
    pub fn selection_probe<F>(mut self, probe: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        self.selection_probe = Some(Box::new(probe));
        self
    }

    /// Surface scrolled in [`ScrollMode::Document`]
    pub fn document_viewport(mut self, viewport: Rc<dyn ScrollSurface>) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn build(self) -> StickToBottom {
        let state = ScrollState {
            is_at_bottom: self.config.initial.starts_at_bottom(),
            ..ScrollState::default()
        };
        StickToBottom {
            geometry: accessor_for(self.config.scroll_mode, self.viewport),
            content: None,
            resize_monitor: ResizeMonitor::new(),
            resolver: BehaviorResolver::new(),
            target_resolver: self.target_resolver,
            target_cache: None,
            selection_probe: self.selection_probe,
            clock: self.clock,
            scheduler: Scheduler::new(),
            runs: Vec::new(),
            next_run_id: 0,
            state,
            disposed: false,
            config: self.config,
        }
    }
}

/// Keeps a scroll surface pinned to its bottom edge
pub struct StickToBottom {
    pub(crate) config: EngineConfig,
    geometry: Box<dyn GeometryAccessor>,
    content: Option<Rc<dyn ContentSurface>>,
    resize_monitor: ResizeMonitor,
    resolver: BehaviorResolver,
    target_resolver: Option<TargetResolver>,
    /// `(natural target, calculated target)` until the next frame
    target_cache: Option<(f64, f64)>,
    selection_probe: Option<SelectionProbe>,
    pub(crate) clock: Rc<dyn Clock>,
    pub(crate) scheduler: Scheduler<FrameTask, TimerTask>,
    pub(crate) runs: Vec<AnimationRun>,
    next_run_id: RunId,
    pub(crate) state: ScrollState,
    disposed: bool,
}

impl StickToBottom {
    pub fn new(config: EngineConfig) -> Self {
        StickToBottomBuilder::new(config).build()
    }

    pub fn builder(config: EngineConfig) -> StickToBottomBuilder {
        StickToBottomBuilder::new(config)
    }


    /// Bind the scroll container. Ignored in document mode.
    pub fn attach_scroll_surface(&mut self, surface: Option<Rc<dyn ScrollSurface>>) {
        self.geometry.attach(surface);
        self.target_cache = None;
    }

    /// Bind the content surface. Resize tracking restarts, so the next
    /// observation counts as the initial one.
    pub fn attach_content_surface(&mut self, content: Option<Rc<dyn ContentSurface>>) {
        self.content = content;
        self.resize_monitor = ResizeMonitor::new();
        self.target_cache = None;
    }

    pub fn scroll_mode(&self) -> ScrollMode {
        self.geometry.mode()
    }


    pub fn scroll_top(&self) -> f64 {
        self.geometry.offset()
    }

    /// Write an offset and remember where it landed so the resulting
    /// scroll notification is not mistaken for the user
    pub fn set_scroll_top(&mut self, value: f64) {
        if let Some(landed) = self.geometry.set_offset(value) {
            self.state.ignore_scroll_to_top = Some(landed);
        }
    }

    /// Natural bottom, one pixel short of the end to absorb sub-pixel layout
    pub fn target_scroll_top(&self) -> f64 {
        if self.geometry.surface().is_none() || self.content.is_none() {
            return 0.0;
        }
        let dimensions = self.geometry.dimensions();
        (dimensions.scrollable_height - 1.0 - dimensions.viewport_height).max(0.0)
    }

    pub fn calculated_target_scroll_top(&mut self) -> f64 {
        let target = self.target_scroll_top();
        let Some(resolver) = self.target_resolver.as_ref() else {
            return target;
        };
        let (Some(scroll_surface), Some(content_surface)) =
            (self.geometry.surface(), self.content.as_ref())
        else {
            return target;
        };
        if let Some((cached_for, calculated)) = self.target_cache {
            if cached_for == target {
                return calculated;
            }
        }

        let context = TargetContext {
            scroll_surface: &**scroll_surface,
            content_surface: &**content_surface,
        };
        let calculated = resolver(target, &context).min(target).max(0.0);
        self.target_cache = Some((target, calculated));
        self.scheduler.request_frame(FrameTask::ClearTargetCache);
        calculated
    }

    pub fn scroll_difference(&mut self) -> f64 {
        self.calculated_target_scroll_top() - self.scroll_top()
    }

    fn is_near_bottom_now(&mut self) -> bool {
        self.scroll_difference() <= self.config.near_bottom_threshold_px
    }

    pub(crate) fn is_selecting(&self) -> bool {
        self.selection_probe.as_ref().is_some_and(|probe| probe())
    }


    pub fn is_at_bottom(&self) -> bool {
        self.state.is_at_bottom
    }

    pub fn is_near_bottom(&self) -> bool {
        self.state.is_near_bottom
    }

    pub fn escaped_from_lock(&self) -> bool {
        self.state.escaped_from_lock
    }

    pub fn state(&self) -> &ScrollState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ScrollState {
        &mut self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }


    /// Scroll to the bottom and keep following it.
    ///
    /// Accepts [`ScrollOptions`] or a bare [`AnimationRequest`](super::AnimationRequest).
    pub fn scroll_to_bottom(&mut self, options: impl Into<ScrollOptions>) -> ScrollHandle {
        let (completion, handle) = Completion::new();
        if self.disposed {
            completion.settle(false);
        } else {
            self.start_animation(options.into(), completion);
        }
        handle
    }

    /// Release the bottom. A running animation notices on its next frame.
    pub fn stop(&mut self) {
        self.escape("stop");
    }

    pub(crate) fn start_animation(&mut self, options: ScrollOptions, mut completion: Completion) {
        if !options.preserve_scroll_position {
            self.stick("scroll request");
        }

        let joins = options.joins();
        let wait_until = self
            .clock
            .now()
            .checked_add(options.wait.map(|wait| wait.delay()).unwrap_or_default());
        let spring = self.config.spring_request();
        let behavior = self
            .resolver
            .resolve([spring.as_ref(), options.animation.as_ref()]);
        let hold = Hold::new(options.duration, wait_until);
        let start_target = self.calculated_target_scroll_top();

        if !joins {
            self.state.animation = None;
            for run in self.runs.drain(..) {
                completion.absorb(run.completion);
            }
        } else if let Some(run) = self
            .runs
            .iter_mut()
            .find(|run| run.behavior.is_same(&behavior))
        {
            run.completion.absorb(completion);
            debug!(
                run = run.id,
                waiters = run.completion.waiters(),
                "Joined running scroll animation"
            );
            return;
        }

        self.next_run_id += 1;
        let id = self.next_run_id;
        debug!(
            run = id,
            instant = behavior.is_instant(),
            joins,
            start_target,
            "Starting scroll animation"
        );
        self.runs.push(AnimationRun {
            id,
            behavior,
            ignore_escapes: options.ignore_escapes,
            wait_until,
            hold,
            start_target,
            completion,
        });
        self.scheduler.request_frame(FrameTask::Step(id));
    }

    fn stick(&mut self, cause: &str) {
        if !self.state.is_at_bottom || self.state.escaped_from_lock {
            debug!(cause, "Stuck to bottom");
        }
        self.state.escaped_from_lock = false;
        self.state.is_at_bottom = true;
    }

    fn escape(&mut self, cause: &str) {
        if self.state.is_at_bottom || !self.state.escaped_from_lock {
            debug!(cause, "Escaped from bottom lock");
        }
        self.state.escaped_from_lock = true;
        self.state.is_at_bottom = false;
    }


    /// The scroll surface's offset changed
    pub fn on_scroll(&mut self) {
        if self.disposed {
            return;
        }
        let scroll_top = self.scroll_top();
        let ignore = self.state.ignore_scroll_to_top.take();
        let observation = ScrollObservation::new(scroll_top, self.state.last_scroll_top, ignore);
        self.state.last_scroll_top = Some(scroll_top);
        self.state.is_near_bottom = self.is_near_bottom_now();

        // Runs after any resize notification delivered in the same tick
        let due = self.clock.now() + FOLLOW_UP_DELAY;
        self.scheduler
            .set_timeout(due, TimerTask::ScrollCheck(observation));
    }

    fn check_scroll(&mut self, observation: ScrollObservation) {
        let context = EscapeContext {
            resizing: self.state.resize_difference != 0.0,
            ignore_escapes: self
                .state
                .animation
                .as_ref()
                .is_some_and(|animation| animation.ignore_escapes),
            selecting: self.is_selecting(),
        };

        match classify(&observation, &context) {
            Verdict::Discard => {}
            Verdict::Revert(offset) => self.set_scroll_top(offset),
            Verdict::Escape => self.escape("user scroll"),
            Verdict::Follow { release } => {
                if release {
                    self.state.escaped_from_lock = false;
                }
                if !self.state.escaped_from_lock && self.is_near_bottom_now() {
                    self.stick("scrolled near bottom");
                }
            }
        }
    }

    /// A wheel gesture, delivered before the scroll it causes
    pub fn on_wheel(&mut self, event: WheelEvent) {
        if self.disposed || !self.geometry.accepts_wheel(event.over_scroll_surface) {
            return;
        }
        let ignore_escapes = self
            .state
            .animation
            .as_ref()
            .is_some_and(|animation| animation.ignore_escapes);
        let overflowing = self.geometry.dimensions().is_overflowing();
        if wheel_escapes(event.delta_y, overflowing, ignore_escapes) {
            self.escape("wheel");
        }
    }

    /// The content surface now has `height`
    pub fn on_content_resize(&mut self, height: f64) -> Option<ResizeObservation> {
        if self.disposed {
            return None;
        }
        let observation = self.resize_monitor.observe(height)?;
        self.handle_resize(observation);
        Some(observation)
    }

    /// Read the content surface and handle its height if it changed
    pub fn poll_content_resize(&mut self) -> Option<ResizeObservation> {
        if self.disposed {
            return None;
        }
        let content = self.content.clone()?;
        let observation = self.resize_monitor.poll(&*content)?;
        self.handle_resize(observation);
        Some(observation)
    }

    fn handle_resize(&mut self, observation: ResizeObservation) {
        let delta = observation.delta;
        self.state.resize_difference = delta;

        let target = self.target_scroll_top();
        if self.scroll_top() > target {
            self.set_scroll_top(target);
        }
        self.state.is_near_bottom = self.is_near_bottom_now();

        if delta >= 0.0 {
            let source = if observation.initial {
                self.config.initial.request()
            } else {
                self.config.resize.as_ref()
            };
            let spring = self.config.spring_request();
            let behavior = self.resolver.resolve([spring.as_ref(), source]);

            let mut options = ScrollOptions::new()
                .animation(&behavior)
                .wait(ScrollWait::Join)
                .preserve_scroll_position(true);
            if !behavior.is_instant() {
                options = options.duration(self.config.retain_duration());
            }
            let (completion, _) = Completion::new();
            self.start_animation(options, completion);
        } else if self.is_near_bottom_now() {
            self.stick("content shrank");
        }

        // Outlast the scroll notification the resize itself triggers
        self.scheduler.request_frame(FrameTask::ArmResizeReset(delta));
    }


    /// Whether the host should deliver an animation frame
    pub fn needs_frame(&self) -> bool {
        !self.disposed && self.scheduler.has_frame_tasks()
    }

    /// Run every task queued before this frame started
    pub fn on_animation_frame(&mut self) {
        if self.disposed {
            return;
        }
        for task in self.scheduler.take_frame() {
            match task {
                FrameTask::Step(id) => self.advance_run(id),
                FrameTask::ClearTargetCache => self.target_cache = None,
                FrameTask::ResetIntegration => {
                    if self.state.animation.is_none() {
                        self.state.reset_integration();
                    }
                }
                FrameTask::ArmResizeReset(delta) => {
                    let due = self.clock.now() + FOLLOW_UP_DELAY;
                    self.scheduler.set_timeout(due, TimerTask::ResetResize(delta));
                }
            }
        }
    }

    /// Earliest pending timer
    pub fn next_deadline(&self) -> Option<std::time::Instant> {
        if self.disposed {
            return None;
        }
        self.scheduler.next_deadline()
    }

    /// Run timers due by the engine clock; returns how many ran
    pub fn run_due_timers(&mut self) -> usize {
        let mut ran = 0;
        while !self.disposed {
            let Some(task) = self.scheduler.pop_due(self.clock.now()) else {
                break;
            };
            ran += 1;
            match task {
                TimerTask::ScrollCheck(observation) => self.check_scroll(observation),
                TimerTask::ResetResize(delta) => {
                    if self.state.resize_difference == delta {
                        self.state.resize_difference = 0.0;
                    }
                }
            }
        }
        ran
    }

    /// Tear down: stop observing, drop surfaces and pending work. Pending
    /// handles settle with `false`.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        debug!(pending = self.runs.len(), "Disposing stick-to-bottom engine");
        self.disposed = true;
        self.resize_monitor.disconnect();
        self.geometry.attach(None);
        self.content = None;
        self.target_cache = None;
        self.scheduler.clear();
        self.state.animation = None;
        self.state.reset_integration();
        for run in self.runs.drain(..) {
            run.completion.settle(false);
        }
    }
}

impl fmt::Debug for StickToBottom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StickToBottom")
            .field("mode", &self.geometry.mode())
            .field("scroll_top", &self.scroll_top())
            .field("target_scroll_top", &self.target_scroll_top())
            .field("runs", &self.runs.len())
            .field("state", &self.state)
            .field("disposed", &self.disposed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scroll::behavior::{AnimationRequest, InitialScroll, SpringOverrides};
    use crate::scroll::headless::{HeadlessContent, HeadlessSurface};
    use crate::scroll::timing::ManualClock;
    use std::cell::Cell;
    use std::time::Duration;
    use tokio::sync::oneshot;

    struct Harness {
        clock: ManualClock,
        content: Rc<HeadlessContent>,
        surface: Rc<HeadlessSurface>,
        engine: StickToBottom,
    }

    impl Harness {
        fn new(viewport: f64, content_height: f64) -> Self {
            Self::build(StickToBottom::builder(EngineConfig::default()), viewport, content_height)
        }

        fn build(builder: StickToBottomBuilder, viewport: f64, content_height: f64) -> Self {
            let clock = ManualClock::new();
            let content = Rc::new(HeadlessContent::new(content_height));
            let surface = Rc::new(HeadlessSurface::with_content(viewport, content.clone()));
            let mut engine = builder.clock(clock.clone()).build();
            engine.attach_scroll_surface(Some(surface.clone()));
            engine.attach_content_surface(Some(content.clone()));
            Self {
                clock,
                content,
                surface,
                engine,
            }
        }

        fn deliver_scroll(&mut self) {
            if self.surface.take_scroll_event() {
                self.engine.on_scroll();
            }
        }

        fn frame(&mut self) {
            self.clock.advance(Duration::from_millis(16));
            self.engine.run_due_timers();
            self.engine.on_animation_frame();
            self.deliver_scroll();
        }

        fn frames(&mut self, count: usize) {
            for _ in 0..count {
                self.frame();
            }
        }

        fn settle_timers(&mut self) {
            self.clock.advance(Duration::from_millis(2));
            self.engine.run_due_timers();
        }

        fn user_scroll(&mut self, delta: f64) {
            self.surface.user_scroll_by(delta);
            self.deliver_scroll();
            self.settle_timers();
        }

        /// Jump to the bottom with an instant scroll
        fn pin(&mut self) {
            let handle = self.engine.scroll_to_bottom(AnimationRequest::Instant);
            self.frames(2);
            assert_eq!(handle.result(), Some(true));
        }
    }

    #[test]
    fn test_instant_scroll_lands_one_pixel_short() {
        let mut h = Harness::new(500.0, 1000.0);
        let handle = h.engine.scroll_to_bottom(AnimationRequest::Instant);
        h.frames(2);

        assert_eq!(h.engine.scroll_top(), 499.0);
        assert_eq!(handle.result(), Some(true));
        assert!(h.engine.is_at_bottom());
    }

    #[test]
    fn test_already_at_target_resolves_without_moving() {
        let mut h = Harness::new(500.0, 1000.0);
        h.surface.set_scroll_top(499.0);
        h.surface.take_scroll_event();

        let handle = h.engine.scroll_to_bottom(ScrollOptions::default());
        h.frame();
        assert_eq!(handle.result(), Some(true));
        assert_eq!(h.engine.scroll_top(), 499.0);
    }

    #[test]
    fn test_stop_settles_false_within_a_frame() {
        let mut h = Harness::new(500.0, 1000.0);
        let handle = h.engine.scroll_to_bottom(ScrollOptions::default());
        h.frames(3);
        assert!(!handle.is_settled());

        h.engine.stop();
        assert!(h.engine.escaped_from_lock());
        h.frame();
        assert_eq!(handle.result(), Some(false));
        assert!(h.engine.state().animation.is_none());
    }

    #[test]
    fn test_scrolling_up_escapes_and_down_resticks() {
        let mut h = Harness::new(500.0, 1000.0);
        h.pin();

        h.user_scroll(-40.0);
        assert!(h.engine.escaped_from_lock());
        assert!(!h.engine.is_at_bottom());
        assert!(h.engine.is_near_bottom());

        h.user_scroll(40.0);
        assert!(!h.engine.escaped_from_lock());
        assert!(h.engine.is_at_bottom());
    }

    #[test]
    fn test_scrolling_down_far_from_bottom_only_releases() {
        let mut h = Harness::new(500.0, 1000.0);
        h.pin();
        h.user_scroll(-300.0);
        assert!(h.engine.escaped_from_lock());

        h.user_scroll(100.0);
        assert!(!h.engine.escaped_from_lock());
        assert!(!h.engine.is_at_bottom());
    }

    #[test]
    fn test_ignore_escapes_reverts_user_scroll() {
        let mut h = Harness::new(500.0, 1000.0);
        let handle = h
            .engine
            .scroll_to_bottom(ScrollOptions::new().ignore_escapes(true));
        h.frames(3);
        let before = h.engine.scroll_top();
        assert!(before > 30.0);

        h.user_scroll(-30.0);
        assert_eq!(h.engine.scroll_top(), before);
        assert!(h.engine.is_at_bottom());
        assert!(!h.engine.escaped_from_lock());

        h.frames(300);
        assert_eq!(handle.result(), Some(true));
    }

    #[test]
    fn test_upward_wheel_escapes_when_overflowing() {
        let mut h = Harness::new(500.0, 1000.0);
        h.pin();

        h.engine.on_wheel(WheelEvent {
            delta_y: 10.0,
            over_scroll_surface: true,
        });
        assert!(h.engine.is_at_bottom());

        h.engine.on_wheel(WheelEvent {
            delta_y: -10.0,
            over_scroll_surface: false,
        });
        assert!(h.engine.is_at_bottom());

        h.engine.on_wheel(WheelEvent {
            delta_y: -10.0,
            over_scroll_surface: true,
        });
        assert!(h.engine.escaped_from_lock());
        assert!(!h.engine.is_at_bottom());
    }

    #[test]
    fn test_wheel_ignored_without_overflow() {
        let mut h = Harness::new(500.0, 300.0);
        h.engine.on_wheel(WheelEvent {
            delta_y: -10.0,
            over_scroll_surface: true,
        });
        assert!(h.engine.is_at_bottom());
        assert!(!h.engine.escaped_from_lock());
    }

    #[test]
    fn test_shrink_near_bottom_resticks() {
        let mut h = Harness::new(500.0, 1000.0);
        h.engine.poll_content_resize();
        h.pin();
        h.user_scroll(-50.0);
        assert!(h.engine.escaped_from_lock());

        h.content.grow(-60.0);
        let observation = h.engine.poll_content_resize().unwrap();
        assert_eq!(observation.delta, -60.0);
        assert_eq!(h.engine.scroll_top(), 439.0);
        assert!(!h.engine.escaped_from_lock());
        assert!(h.engine.is_at_bottom());
    }

    #[test]
    fn test_shrink_far_from_bottom_keeps_escape() {
        let mut h = Harness::new(500.0, 2000.0);
        h.engine.poll_content_resize();
        h.pin();
        h.user_scroll(-1000.0);

        h.content.grow(-100.0);
        h.engine.poll_content_resize();
        assert!(h.engine.escaped_from_lock());
        assert!(!h.engine.is_at_bottom());
    }

    #[test]
    fn test_growth_converges_monotonically() {
        let mut h = Harness::new(500.0, 500.0);
        h.engine.poll_content_resize();
        assert_eq!(h.engine.target_scroll_top(), 0.0);

        h.content.set_height(1501.0);
        h.engine.poll_content_resize();
        assert_eq!(h.engine.target_scroll_top(), 1000.0);
        let handle = h
            .engine
            .scroll_to_bottom(ScrollOptions::new().wait(ScrollWait::Join));
        assert_eq!(h.engine.runs.len(), 1);

        let bound = 0.05 * 1000.0 / (1.25 - 0.7);
        let mut previous = h.engine.scroll_difference();
        for _ in 0..200 {
            h.frame();
            let difference = h.engine.scroll_difference();
            assert!(difference <= previous);
            assert!(difference >= 0.0);
            assert!(h.engine.state().velocity <= bound);
            previous = difference;
        }

        assert!((h.engine.scroll_top() - 1000.0).abs() <= 1.0);
        assert_eq!(handle.result(), Some(true));
    }

    #[test]
    fn test_identical_requests_share_one_animation() {
        let mut h = Harness::new(500.0, 1000.0);
        let first = h.engine.scroll_to_bottom(ScrollOptions::default());
        h.frames(2);
        let second = h.engine.scroll_to_bottom(ScrollOptions::default());
        let joined = h
            .engine
            .scroll_to_bottom(ScrollOptions::new().wait(ScrollWait::Join));
        assert_eq!(h.engine.runs.len(), 1);
        assert_eq!(h.engine.runs[0].completion.waiters(), 3);

        h.frames(300);
        assert_eq!(first.result(), Some(true));
        assert_eq!(second.result(), Some(true));
        assert_eq!(joined.result(), Some(true));
    }

    #[test]
    fn test_join_with_other_behavior_queues() {
        let mut h = Harness::new(500.0, 1000.0);
        let first = h.engine.scroll_to_bottom(ScrollOptions::default());
        let other = SpringOverrides {
            damping: Some(0.5),
            ..SpringOverrides::default()
        };
        let second = h
            .engine
            .scroll_to_bottom(ScrollOptions::new().animation(other).wait(ScrollWait::Join));
        assert_eq!(h.engine.runs.len(), 2);

        h.frames(300);
        assert_eq!(first.result(), Some(true));
        assert_eq!(second.result(), Some(true));
        assert!(h.engine.runs.is_empty());
    }

    #[test]
    fn test_preserving_request_while_escaped_settles_false() {
        let mut h = Harness::new(500.0, 1000.0);
        h.engine.stop();
        let handle = h
            .engine
            .scroll_to_bottom(ScrollOptions::new().preserve_scroll_position(true));
        h.frame();
        assert_eq!(handle.result(), Some(false));
        assert_eq!(h.engine.scroll_top(), 0.0);
    }

    #[test]
    fn test_wait_delays_motion() {
        let mut h = Harness::new(500.0, 1000.0);
        let handle = h.engine.scroll_to_bottom(
            ScrollOptions::new()
                .animation(AnimationRequest::Instant)
                .wait(ScrollWait::Delay(Duration::from_millis(100))),
        );
        h.frames(3);
        assert_eq!(h.engine.scroll_top(), 0.0);
        assert!(!handle.is_settled());

        h.frames(7);
        assert_eq!(h.engine.scroll_top(), 499.0);
        assert_eq!(handle.result(), Some(true));
    }

    #[test]
    fn test_unbounded_wait_and_duration_never_elapse() {
        let mut h = Harness::new(500.0, 1000.0);
        let delayed = h.engine.scroll_to_bottom(
            ScrollOptions::new()
                .animation(AnimationRequest::Instant)
                .wait(ScrollWait::Delay(Duration::MAX)),
        );
        h.frames(10);
        assert_eq!(h.engine.scroll_top(), 0.0);
        assert!(!delayed.is_settled());

        let held = h.engine.scroll_to_bottom(
            ScrollOptions::new()
                .animation(AnimationRequest::Instant)
                .duration(Duration::MAX),
        );
        h.frames(10);
        assert_eq!(h.engine.scroll_top(), 499.0);
        assert!(!held.is_settled());

        h.engine.stop();
        h.frame();
        assert_eq!(delayed.result(), Some(false));
        assert_eq!(held.result(), Some(false));
    }

    #[test]
    fn test_signal_hold_follows_target_until_fired() {
        let mut h = Harness::new(500.0, 1000.0);
        let (tx, rx) = oneshot::channel();
        let handle = h.engine.scroll_to_bottom(
            ScrollOptions::new()
                .animation(AnimationRequest::Instant)
                .duration(rx),
        );
        h.frames(10);
        assert_eq!(h.engine.scroll_top(), 499.0);
        assert!(!handle.is_settled());

        h.content.grow(100.0);
        h.frames(2);
        assert_eq!(h.engine.scroll_top(), 599.0);
        assert!(!handle.is_settled());

        tx.send(()).unwrap();
        h.frames(2);
        assert_eq!(handle.result(), Some(true));
    }

    #[test]
    fn test_target_moving_after_hold_chains_resize_animation() {
        let mut h = Harness::new(500.0, 1000.0);
        let handle = h.engine.scroll_to_bottom(AnimationRequest::Instant);
        h.frame();
        assert_eq!(h.engine.scroll_top(), 499.0);

        h.content.grow(100.0);
        h.frame();
        assert!(!handle.is_settled());
        assert_eq!(h.engine.runs.len(), 1);
        assert!(!h.engine.runs[0].behavior.is_instant());

        h.frames(300);
        assert_eq!(h.engine.scroll_top(), 599.0);
        assert_eq!(handle.result(), Some(true));
    }

    #[test]
    fn test_custom_target_is_clamped_and_cached() {
        let calls = Rc::new(Cell::new(0));
        let offset = Rc::new(Cell::new(100.0));
        let builder = {
            let calls = calls.clone();
            let offset = offset.clone();
            StickToBottom::builder(EngineConfig::default()).target_scroll_top(move |target, ctx| {
                calls.set(calls.get() + 1);
                assert_eq!(ctx.scroll_surface.client_height(), 500.0);
                target - offset.get()
            })
        };
        let mut h = Harness::build(builder, 500.0, 1000.0);

        assert_eq!(h.engine.calculated_target_scroll_top(), 399.0);
        assert_eq!(h.engine.calculated_target_scroll_top(), 399.0);
        assert_eq!(calls.get(), 1);

        h.engine.on_animation_frame();
        offset.set(-10_000.0);
        assert_eq!(h.engine.calculated_target_scroll_top(), 499.0);
        assert_eq!(calls.get(), 2);

        h.engine.on_animation_frame();
        offset.set(10_000.0);
        assert_eq!(h.engine.calculated_target_scroll_top(), 0.0);
    }

    #[test]
    fn test_target_is_zero_until_both_surfaces_attach() {
        let mut engine = StickToBottom::new(EngineConfig::default());
        assert_eq!(engine.target_scroll_top(), 0.0);
        engine.attach_scroll_surface(Some(Rc::new(HeadlessSurface::new(500.0, 1000.0))));
        assert_eq!(engine.target_scroll_top(), 0.0);
        engine.attach_content_surface(Some(Rc::new(HeadlessContent::new(1000.0))));
        assert_eq!(engine.target_scroll_top(), 499.0);
    }

    #[test]
    fn test_document_mode_scrolls_viewport() {
        let clock = ManualClock::new();
        let content = Rc::new(HeadlessContent::new(2000.0));
        let viewport = Rc::new(HeadlessSurface::with_content(800.0, content.clone()));
        let config = EngineConfig {
            scroll_mode: ScrollMode::Document,
            ..EngineConfig::default()
        };
        let mut engine = StickToBottom::builder(config)
            .clock(clock.clone())
            .document_viewport(viewport.clone())
            .build();
        engine.attach_scroll_surface(Some(Rc::new(HeadlessSurface::new(10.0, 10.0))));
        engine.attach_content_surface(Some(content));
        assert_eq!(engine.scroll_mode(), ScrollMode::Document);

        let handle = engine.scroll_to_bottom(AnimationRequest::Instant);
        for _ in 0..2 {
            clock.advance(Duration::from_millis(16));
            engine.on_animation_frame();
        }
        assert_eq!(viewport.scroll_top(), 1199.0);
        assert_eq!(handle.result(), Some(true));

        engine.on_wheel(WheelEvent {
            delta_y: -3.0,
            over_scroll_surface: false,
        });
        assert!(engine.escaped_from_lock());
    }

    #[test]
    fn test_selection_pauses_animation_and_escapes() {
        let selecting = Rc::new(Cell::new(true));
        let builder = {
            let selecting = selecting.clone();
            StickToBottom::builder(EngineConfig::default()).selection_probe(move || selecting.get())
        };
        let mut h = Harness::build(builder, 500.0, 1000.0);

        let handle = h.engine.scroll_to_bottom(AnimationRequest::Instant);
        h.frames(3);
        assert_eq!(h.engine.scroll_top(), 0.0);

        selecting.set(false);
        h.frames(2);
        assert_eq!(h.engine.scroll_top(), 499.0);
        assert_eq!(handle.result(), Some(true));

        h.user_scroll(-200.0);
        h.user_scroll(200.0);
        assert!(h.engine.is_at_bottom());

        selecting.set(true);
        h.user_scroll(-1.0);
        h.user_scroll(1.0);
        assert!(h.engine.escaped_from_lock());
        assert!(!h.engine.is_at_bottom());
    }

    #[test]
    fn test_dispose_settles_pending_handles() {
        let mut h = Harness::new(500.0, 1000.0);
        let handle = h.engine.scroll_to_bottom(ScrollOptions::default());
        h.frames(2);

        h.engine.dispose();
        assert_eq!(handle.result(), Some(false));
        assert!(!h.engine.needs_frame());
        assert!(h.engine.is_disposed());

        let late = h.engine.scroll_to_bottom(AnimationRequest::Instant);
        assert_eq!(late.result(), Some(false));
        assert!(h.engine.on_content_resize(2000.0).is_none());
    }

    #[test]
    fn test_initial_false_starts_unpinned() {
        let config = EngineConfig {
            initial: InitialScroll::Enabled(false),
            ..EngineConfig::default()
        };
        let mut h = Harness::build(StickToBottom::builder(config), 500.0, 1000.0);
        assert!(!h.engine.is_at_bottom());

        let observation = h.engine.poll_content_resize().unwrap();
        assert!(observation.initial);
        h.frames(3);
        assert_eq!(h.engine.scroll_top(), 0.0);
        assert!(h.engine.runs.is_empty());
    }

    #[test]
    fn test_initial_observation_scrolls_to_bottom() {
        let config = EngineConfig {
            initial: InitialScroll::Animation(AnimationRequest::Instant),
            ..EngineConfig::default()
        };
        let mut h = Harness::build(StickToBottom::builder(config), 500.0, 1000.0);
        h.engine.poll_content_resize();
        h.frames(3);
        assert_eq!(h.engine.scroll_top(), 499.0);
        assert!(h.engine.runs.is_empty());
    }

    #[test]
    fn test_resize_difference_resets_after_frame_and_timer() {
        let mut h = Harness::new(500.0, 1000.0);
        h.engine.poll_content_resize();
        h.content.grow(100.0);
        h.engine.poll_content_resize();
        assert_eq!(h.engine.state().resize_difference, 100.0);

        h.frame();
        assert_eq!(h.engine.state().resize_difference, 100.0);
        h.frame();
        assert_eq!(h.engine.state().resize_difference, 0.0);
    }

    #[test]
    fn test_scroll_during_resize_is_not_an_escape() {
        let mut h = Harness::new(500.0, 1000.0);
        h.engine.poll_content_resize();
        h.pin();

        h.content.grow(100.0);
        h.engine.poll_content_resize();
        h.user_scroll(-50.0);
        assert!(h.engine.is_at_bottom());
        assert!(!h.engine.escaped_from_lock());
    }

    #[test]
    fn test_programmatic_write_is_not_an_escape() {
        let mut h = Harness::new(500.0, 1000.0);
        h.pin();
        h.engine.set_scroll_top(300.0);
        assert_eq!(h.engine.state().ignore_scroll_to_top, Some(300.0));

        h.deliver_scroll();
        assert_eq!(h.engine.state().ignore_scroll_to_top, None);
        h.settle_timers();
        assert!(h.engine.is_at_bottom());
        assert!(!h.engine.escaped_from_lock());
    }

    #[test]
    fn test_integration_resets_after_animation_ends() {
        let mut h = Harness::new(500.0, 1000.0);
        let handle = h.engine.scroll_to_bottom(ScrollOptions::default());
        h.frames(300);
        assert_eq!(handle.result(), Some(true));
        assert!(h.engine.state().animation.is_none());
        assert_eq!(h.engine.state().last_tick, None);
        assert_eq!(h.engine.state().velocity, 0.0);
        assert!(!h.engine.needs_frame());
    }
}
