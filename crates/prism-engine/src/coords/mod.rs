//! Coordinate types shared by the frame target and renderers.
//!
//! Canonical space is physical pixels of the back buffer:
//! - origin top-left
//! - +X right, +Y down

mod viewport;

pub use viewport::Viewport;
