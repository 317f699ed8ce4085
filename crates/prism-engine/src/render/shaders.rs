//! Built-in WGSL sources for the colored-triangle pipeline.

/// Vertex stage: passes position through and forwards the vertex color.
pub const TRIANGLE_VS: &str = include_str!("shaders/triangle_vs.wgsl");

/// Fragment stage: outputs the interpolated vertex color.
pub const TRIANGLE_FS: &str = include_str!("shaders/triangle_fs.wgsl");

pub const VS_ENTRY: &str = "vs_main";
pub const FS_ENTRY: &str = "fs_main";
