//! GPU rendering subsystem.
//!
//! Resources are created against a [`RenderCtx`](crate::device::RenderCtx)
//! borrowed from an initialized device context, and released by the
//! [`FrameRenderer`] in reverse acquisition order.
//!
//! Convention:
//! - vertex positions are given in clip space (x, y in [-1, 1])
//! - one triangle list, one vertex buffer at slot 0

mod geometry;
mod layout;
mod pipeline;
mod renderer;
pub mod shaders;
mod target;

pub use geometry::{BufferUsage, GeometryBuffer, Vertex};
pub use layout::VertexLayout;
pub use pipeline::{PipelineState, ShaderSource};
pub use renderer::{
    DrawCall, FrameOutcome, FrameRenderer, FrameStats, Lifecycle, ReleaseReport, RendererConfig,
    ResourceKind, Scene,
};
pub use target::FrameTarget;
