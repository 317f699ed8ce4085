/// A back buffer acquired for exactly one frame.
pub trait BackBuffer {
    /// View the frame's color pass renders (or resolves) into.
    fn view(&self) -> &wgpu::TextureView;
}

/// Back buffer acquired from a window surface.
///
/// Holding the surface texture prevents acquisition of subsequent frames; it is
/// consumed by [`DeviceContext::present`](super::DeviceContext::present).
pub struct SurfaceFrame {
    pub(super) surface_texture: wgpu::SurfaceTexture,
    pub(super) view: wgpu::TextureView,
}

impl BackBuffer for SurfaceFrame {
    fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}
