//! Time subsystem.
//!
//! Provides testable timing utilities without coupling to the runtime:
//! - [`FrameClock`]: per-frame delta time handed to application updates
//! - [`ClockState`]: the time-gated clear-color animation driven by the renderer

mod clock;
mod frame_clock;

pub use clock::{color_at, ClockState, ColorAnimation};
pub use frame_clock::{FrameClock, FrameTime};
