use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use stickbottom_core::scroll::{HeadlessContent, HeadlessSurface, ManualClock, ScrollSurface};
use stickbottom_core::{Config, ScrollHandle, StickToBottom, WheelEvent};

use crate::scenario::{Action, Scenario};

/// Engine state after one virtual frame
#[derive(Debug, Serialize)]
struct FrameRow {
    time_ms: u64,
    offset: f64,
    target: f64,
    difference: f64,
    at_bottom: bool,
    near_bottom: bool,
    escaped: bool,
    animating: bool,
}

/// Outcome of one `scroll_to_bottom` step
#[derive(Debug, Serialize)]
struct Settlement {
    step: usize,
    at_ms: u64,
    outcome: Option<bool>,
}

struct Replay {
    clock: ManualClock,
    content: Rc<HeadlessContent>,
    surface: Rc<HeadlessSurface>,
    selecting: Rc<Cell<bool>>,
    engine: StickToBottom,
    requests: Vec<(usize, u64, ScrollHandle)>,
}

impl Replay {
    fn new(config: &Config, scenario: &Scenario) -> Result<Self> {
        let engine_config = scenario.engine.clone().unwrap_or_else(|| config.engine.clone());
        engine_config.validate().context("Invalid engine configuration")?;

        let clock = ManualClock::new();
        let content = Rc::new(HeadlessContent::new(scenario.content));
        let surface = Rc::new(HeadlessSurface::with_content(scenario.viewport, content.clone()));
        surface.set_scroll_top(scenario.offset);
        surface.take_scroll_event();

        let selecting = Rc::new(Cell::new(false));
        let probe = selecting.clone();
        let mut engine = StickToBottom::builder(engine_config)
            .clock(clock.clone())
            .selection_probe(move || probe.get())
            .document_viewport(surface.clone())
            .build();
        engine.attach_scroll_surface(Some(surface.clone()));
        engine.attach_content_surface(Some(content.clone()));

        Ok(Self {
            clock,
            content,
            surface,
            selecting,
            engine,
            requests: Vec::new(),
        })
    }

    /// Forward the offset change, if any, as a scroll notification
    fn deliver_scroll(&mut self) {
        if self.surface.take_scroll_event() {
            self.engine.on_scroll();
        }
    }

    fn apply(&mut self, index: usize, at_ms: u64, action: &Action) {
        debug!(step = index, at_ms, action = action.name(), "Applying step");
        match action {
            Action::ScrollToBottom { .. } => {
                if let Some(options) = action.scroll_options() {
                    let handle = self.engine.scroll_to_bottom(options);
                    self.requests.push((index, at_ms, handle));
                }
            }
            Action::Grow { by } => self.content.grow(*by),
            Action::Shrink { by } => self.content.grow(-*by),
            Action::UserScroll { by } => self.surface.user_scroll_by(*by),
            Action::Wheel { delta_y } => {
                self.engine.on_wheel(WheelEvent {
                    delta_y: *delta_y,
                    over_scroll_surface: true,
                });
                self.surface.user_scroll_by(*delta_y);
            }
            Action::Stop => self.engine.stop(),
            Action::Select { active } => self.selecting.set(*active),
        }
        self.engine.poll_content_resize();
        self.deliver_scroll();
    }

    /// Advance virtual time to `time_ms`: fire timers, apply due steps and
    /// run one animation frame
    fn tick(&mut self, scenario: &Scenario, next_step: &mut usize, time_ms: u64) -> FrameRow {
        self.clock.set(self.clock.at(Duration::from_millis(time_ms)));
        self.engine.run_due_timers();

        while let Some(step) = scenario.steps.get(*next_step).filter(|s| s.at_ms <= time_ms) {
            self.apply(*next_step, step.at_ms, &step.action);
            *next_step += 1;
        }

        if self.engine.needs_frame() {
            self.engine.on_animation_frame();
            self.deliver_scroll();
        }
        self.engine.poll_content_resize();
        self.row(time_ms)
    }

    fn row(&mut self, time_ms: u64) -> FrameRow {
        let state = self.engine.state();
        let (at_bottom, near_bottom, escaped, animating) = (
            state.is_at_bottom,
            state.is_near_bottom,
            state.escaped_from_lock,
            state.animation.is_some(),
        );
        FrameRow {
            time_ms,
            offset: self.engine.scroll_top(),
            target: self.engine.calculated_target_scroll_top(),
            difference: self.engine.scroll_difference(),
            at_bottom,
            near_bottom,
            escaped,
            animating,
        }
    }
}

pub async fn run(config: &Config, path: &Path, json: bool, realtime: bool) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let mut replay = Replay::new(config, &scenario)?;
    let end_ms = scenario.end_ms();
    info!(
        scenario = %path.display(),
        steps = scenario.steps.len(),
        end_ms,
        "Replaying scenario"
    );

    let mut ticker = realtime.then(|| tokio::time::interval(Duration::from_millis(scenario.frame_ms)));
    let mut next_step = 0;
    let mut time_ms = 0;

    while time_ms <= end_ms {
        let row = replay.tick(&scenario, &mut next_step, time_ms);
        if json {
            println!("{}", serde_json::to_string(&row)?);
        } else {
            println!(
                "{:>6}ms  offset {:>8.1}  target {:>8.1}  diff {:>8.1}  {}{}{}{}",
                row.time_ms,
                row.offset,
                row.target,
                row.difference,
                if row.at_bottom { "bottom " } else { "" },
                if row.near_bottom { "near " } else { "" },
                if row.escaped { "escaped " } else { "" },
                if row.animating { "animating" } else { "" },
            );
        }

        if let Some(ticker) = ticker.as_mut() {
            ticker.tick().await;
        }
        time_ms += scenario.frame_ms;
    }

    let settlements: Vec<Settlement> = replay
        .requests
        .iter()
        .map(|(step, at_ms, handle)| Settlement {
            step: *step,
            at_ms: *at_ms,
            outcome: handle.result(),
        })
        .collect();

    if json {
        for settlement in &settlements {
            println!("{}", serde_json::to_string(settlement)?);
        }
    } else if !settlements.is_empty() {
        println!("\nscroll_to_bottom requests:");
        for settlement in &settlements {
            let outcome = match settlement.outcome {
                Some(true) => "reached bottom",
                Some(false) => "lost stickiness",
                None => "pending",
            };
            println!("  step {} at {}ms: {}", settlement.step, settlement.at_ms, outcome);
        }
    }

    replay.engine.dispose();
    Ok(())
}
