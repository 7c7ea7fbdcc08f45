use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use stickbottom_core::scroll::HoldDuration;
use stickbottom_core::{AnimationRequest, EngineConfig, ScrollOptions, ScrollWait};

/// A scripted session replayed against headless surfaces
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Viewport height in pixels
    #[serde(default = "default_viewport")]
    pub viewport: f64,
    /// Initial content height in pixels
    #[serde(default)]
    pub content: f64,
    /// Initial scroll offset
    #[serde(default)]
    pub offset: f64,
    /// Virtual frame interval
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,
    /// Time to keep running after the last step
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Overrides the engine section of the configuration file
    #[serde(default)]
    pub engine: Option<EngineConfig>,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    ScrollToBottom {
        #[serde(default)]
        animation: Option<AnimationRequest>,
        /// `true` joins the running animation, a number delays by that many ms
        #[serde(default)]
        wait: Option<WaitSpec>,
        #[serde(default)]
        ignore_escapes: bool,
        #[serde(default)]
        preserve_scroll_position: bool,
        #[serde(default)]
        duration_ms: Option<u64>,
    },
    Grow {
        by: f64,
    },
    Shrink {
        by: f64,
    },
    UserScroll {
        by: f64,
    },
    Wheel {
        delta_y: f64,
    },
    Stop,
    Select {
        active: bool,
    },
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum WaitSpec {
    Join(bool),
    DelayMs(u64),
}

impl WaitSpec {
    fn to_wait(self) -> Option<ScrollWait> {
        match self {
            WaitSpec::Join(true) => Some(ScrollWait::Join),
            WaitSpec::Join(false) => None,
            WaitSpec::DelayMs(ms) => Some(ScrollWait::Delay(Duration::from_millis(ms))),
        }
    }
}

impl Action {
    /// Options of a `scroll_to_bottom` step
    pub fn scroll_options(&self) -> Option<ScrollOptions> {
        let Action::ScrollToBottom {
            animation,
            wait,
            ignore_escapes,
            preserve_scroll_position,
            duration_ms,
        } = self
        else {
            return None;
        };

        let mut options = ScrollOptions::new()
            .ignore_escapes(*ignore_escapes)
            .preserve_scroll_position(*preserve_scroll_position);
        options.animation = *animation;
        options.wait = wait.and_then(WaitSpec::to_wait);
        options.duration = duration_ms.map(|ms| HoldDuration::Fixed(Duration::from_millis(ms)));
        Some(options)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::ScrollToBottom { .. } => "scroll_to_bottom",
            Action::Grow { .. } => "grow",
            Action::Shrink { .. } => "shrink",
            Action::UserScroll { .. } => "user_scroll",
            Action::Wheel { .. } => "wheel",
            Action::Stop => "stop",
            Action::Select { .. } => "select",
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid scenario {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut scenario: Scenario = toml::from_str(content)?;
        if scenario.frame_ms == 0 {
            anyhow::bail!("frame_ms must be at least 1");
        }
        scenario.steps.sort_by_key(|step| step.at_ms);
        Ok(scenario)
    }

    /// Virtual time at which the replay stops
    pub fn end_ms(&self) -> u64 {
        self.steps.last().map(|step| step.at_ms).unwrap_or(0) + self.settle_ms
    }
}

fn default_viewport() -> f64 {
    500.0
}

fn default_frame_ms() -> u64 {
    16
}

fn default_settle_ms() -> u64 {
    1000
}
