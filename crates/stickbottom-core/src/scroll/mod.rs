//! Stick-to-bottom scrolling for chat-style streaming views
//!
//! Keeps a scroll surface pinned to its bottom edge while content grows,
//! lets the user escape by scrolling up, and springs back down when asked.
//!
//! # Architecture
//!
//! ## L4 Atomic Layer
//! - `timing` - Clocks and 60 fps frame arithmetic
//! - `geometry` - Scroll/content surfaces and element vs. document accessors
//! - `behavior` - Animation parameter merging and interning
//! - `escape` - User vs. programmatic scroll classification
//! - `resize` - Content height deltas
//! - `scheduler` - Frame and timer queues
//! - `completion` - Settlement of scroll requests
//! - `options` - Scroll request options
//!
//! ## L3 Molecular Layer
//! - `animation` - Spring animator stepping runs frame by frame
//! - `engine` - Stickiness state machine combining the atoms
//!
//! # Usage
//!
//! ```ignore
//! use stickbottom_core::scroll::{ScrollOptions, StickToBottom};
//! use stickbottom_core::EngineConfig;
//!
//! let mut engine = StickToBottom::new(EngineConfig::default());
//! engine.attach_scroll_surface(Some(scroll_surface));
//! engine.attach_content_surface(Some(content_surface));
//!
//! // Content grew: follow it if pinned
//! engine.on_content_resize(new_height);
//!
//! // Jump back down on demand
//! let handle = engine.scroll_to_bottom(ScrollOptions::default());
//!
//! // Once per animation frame
//! engine.run_due_timers();
//! engine.on_animation_frame();
//! ```

// L4 Atomic Layer
pub mod behavior;
pub mod completion;
pub mod escape;
pub mod geometry;
pub mod options;
pub mod resize;
pub mod scheduler;
pub mod timing;

// L3 Molecular Layer
mod animation;
pub mod engine;

pub mod headless;

// Re-exports for convenient access
pub use behavior::{
    AnimationRequest, BehaviorResolver, InitialScroll, ResolvedBehavior, SpringOverrides,
    SpringParams, DEFAULT_SPRING,
};
pub use completion::ScrollHandle;
pub use engine::{ActiveAnimation, ScrollState, StickToBottom, StickToBottomBuilder, WheelEvent};
pub use geometry::{
    ContentSurface, Dimensions, DocumentGeometry, ElementGeometry, GeometryAccessor, ScrollMode,
    ScrollSurface, TargetContext,
};
pub use headless::{HeadlessContent, HeadlessSurface};
pub use options::{HoldDuration, ScrollOptions, ScrollWait};
pub use resize::{ResizeMonitor, ResizeObservation};
pub use timing::{Clock, ManualClock, SystemClock};
