//! Prism engine crate.
//!
//! Owns the GPU device/frame lifecycle and the platform loop that drives it:
//! device + swap chain setup, render targets, a minimal shader pipeline,
//! vertex uploads and the per-frame clear/draw/present cycle.

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod render;
pub mod paint;

mod error;

pub use error::{RenderError, ShaderStage};
