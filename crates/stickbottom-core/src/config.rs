use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::scroll::{AnimationRequest, InitialScroll, ScrollMode, SpringOverrides};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Construction options of a [`StickToBottom`](crate::StickToBottom) engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Spring damping override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damping: Option<f64>,
    /// Spring stiffness override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stiffness: Option<f64>,
    /// Spring mass override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass: Option<f64>,
    /// Animation for content growth after the first observation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resize: Option<AnimationRequest>,
    /// Animation for the first observation: true, false, "instant" or a spring table
    #[serde(default)]
    pub initial: InitialScroll,
    /// "element" or "document"
    #[serde(default)]
    pub scroll_mode: ScrollMode,
    /// Distance from the bottom still counted as near it
    #[serde(default = "default_near_bottom_threshold")]
    pub near_bottom_threshold_px: f64,
    /// How long growth animations keep following the bottom
    #[serde(default = "default_retain_duration")]
    pub retain_duration_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            damping: None,
            stiffness: None,
            mass: None,
            resize: None,
            initial: InitialScroll::default(),
            scroll_mode: ScrollMode::default(),
            near_bottom_threshold_px: default_near_bottom_threshold(),
            retain_duration_ms: default_retain_duration(),
        }
    }
}

impl EngineConfig {
    /// Engine-wide spring overrides as the first resolver source
    pub fn spring_request(&self) -> Option<AnimationRequest> {
        let overrides = SpringOverrides {
            damping: self.damping,
            stiffness: self.stiffness,
            mass: self.mass,
        };
        (!overrides.is_empty()).then_some(AnimationRequest::Spring(overrides))
    }

    pub fn retain_duration(&self) -> Duration {
        Duration::from_millis(self.retain_duration_ms)
    }

    pub fn validate(&self) -> crate::Result<()> {
        let springs = [
            ("damping", self.damping),
            ("stiffness", self.stiffness),
            ("mass", self.mass),
        ];
        let requests = [self.resize.as_ref(), self.initial.request()];
        let requested = requests.into_iter().flatten().flat_map(|request| match request {
            AnimationRequest::Instant => Vec::new(),
            AnimationRequest::Spring(overrides) => vec![
                ("damping", overrides.damping),
                ("stiffness", overrides.stiffness),
                ("mass", overrides.mass),
            ],
        });

        for (name, value) in springs.into_iter().chain(requested) {
            let Some(value) = value else { continue };
            if !value.is_finite() {
                return Err(crate::Error::Config(format!("{} must be finite, got {}", name, value)));
            }
            if name == "mass" && value <= 0.0 {
                return Err(crate::Error::Config(format!("mass must be positive, got {}", value)));
            }
        }

        if self.near_bottom_threshold_px.is_nan() || self.near_bottom_threshold_px < 0.0 {
            return Err(crate::Error::Config(format!(
                "near_bottom_threshold_px must be non-negative, got {}",
                self.near_bottom_threshold_px
            )));
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_near_bottom_threshold() -> f64 {
    70.0
}

fn default_retain_duration() -> u64 {
    350
}

impl Config {
    /// Load configuration from the default path or return defaults
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        let config: Self = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?
        } else {
            Self::default()
        };
        config.engine.validate()?;
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> crate::Result<PathBuf> {
        let config_path = Self::config_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("stickbottom")
            .join("config.toml")
    }
}
