use crate::RenderError;

use super::BackBuffer;

/// Renderer-facing view of a device context (device/queue + target description).
///
/// Resources that need a device are created against this borrow, which ties
/// their creation to an initialized context.
#[derive(Clone, Copy)]
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
    /// Configured back-buffer size in physical pixels.
    pub extent: (u32, u32),
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        format: wgpu::TextureFormat,
        sample_count: u32,
        extent: (u32, u32),
    ) -> Self {
        Self {
            device,
            queue,
            format,
            sample_count,
            extent,
        }
    }
}

/// Something that hands out back buffers and presents them.
///
/// Implemented by the windowed [`DeviceContext`](super::DeviceContext) and the
/// headless [`OffscreenContext`](super::OffscreenContext).
pub trait SwapChain {
    type Frame: BackBuffer;

    fn render_ctx(&self) -> RenderCtx<'_>;

    /// Acquires the next back buffer.
    ///
    /// `Ok(None)` means the frame should be skipped (transient surface state).
    fn acquire(&mut self) -> Result<Option<Self::Frame>, RenderError>;

    /// Presents a back buffer after its commands were submitted.
    fn present(&mut self, frame: Self::Frame, sync_interval: u32) -> Result<(), RenderError>;

    /// Reconfigures the back buffers. Zero-area sizes are deferred.
    fn resize(&mut self, width: u32, height: u32);

    /// True once the device reported loss.
    fn is_lost(&self) -> bool;

    /// Releases the swap chain ahead of the device. Idempotent.
    fn shutdown(&mut self);
}
