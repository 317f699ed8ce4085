//! Core engine-facing contracts.
//!
//! The interface between the runtime (platform loop) and the application: the
//! scene it wants drawn and the per-frame hooks it gets.

mod app;

pub use app::{App, AppControl};
