//! Color model used for clear colors and vertex colors.

pub mod color;

pub use color::Color;
