//! GPU device + swap chain management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swap chain)
//! - acquiring and presenting back buffers
//! - tearing all of it down in a defined order

mod context;
mod error;
mod frame;
mod init;
mod offscreen;
mod surface;
mod swap_chain;

pub use context::DeviceContext;
pub use error::SurfaceErrorAction;
pub use frame::{BackBuffer, SurfaceFrame};
pub use init::DeviceInit;
pub use offscreen::{read_buffer, OffscreenContext, OffscreenFrame, OffscreenInit};
pub use swap_chain::{RenderCtx, SwapChain};
