pub mod config;
pub mod context;
pub mod error;
pub mod scroll;

pub use config::{Config, EngineConfig, GeneralConfig};
pub use context::{provide_stick_to_bottom, try_use_stick_to_bottom, use_stick_to_bottom, SharedEngine};
pub use error::{Error, Result};
pub use scroll::{
    AnimationRequest, ScrollHandle, ScrollMode, ScrollOptions, ScrollState, ScrollWait,
    StickToBottom, StickToBottomBuilder, WheelEvent,
};
