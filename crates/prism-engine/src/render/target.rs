use crate::RenderError;
use crate::coords::Viewport;
use crate::device::RenderCtx;

/// Render-target description derived from the swap chain's back buffers.
///
/// Holds the full-extent viewport and, with multisampling, the view of the
/// multisampled color texture that resolves into each back buffer. The view
/// keeps its texture alive on its own. Invalid after a resize until derived
/// again.
pub struct FrameTarget {
    viewport: Viewport,
    extent: (u32, u32),
    format: wgpu::TextureFormat,
    sample_count: u32,
    msaa_view: Option<wgpu::TextureView>,
}

impl FrameTarget {
    /// Derives the target for the context's current back-buffer configuration.
    pub fn derive(ctx: &RenderCtx<'_>) -> Result<Self, RenderError> {
        let (width, height) = ctx.extent;
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidUsage(format!(
                "cannot derive a frame target for a {width}x{height} back buffer"
            )));
        }

        let msaa_view = (ctx.sample_count > 1).then(|| {
            ctx.device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("prism msaa color"),
                    size: wgpu::Extent3d {
                        width,
                        height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: ctx.sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format: ctx.format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        log::debug!("frame target derived: {width}x{height}");

        Ok(Self {
            viewport: Viewport::full(width, height),
            extent: (width, height),
            format: ctx.format,
            sample_count: ctx.sample_count,
            msaa_view,
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn extent(&self) -> (u32, u32) {
        self.extent
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// True when this target was derived for `ctx`'s current configuration.
    pub fn matches(&self, ctx: &RenderCtx<'_>) -> bool {
        self.extent == ctx.extent
            && self.format == ctx.format
            && self.sample_count == ctx.sample_count
    }

    /// Color attachment clearing to `clear` and storing into `back_buffer`.
    ///
    /// With multisampling the pass renders into the multisampled view and
    /// resolves into `back_buffer`.
    pub fn color_attachment<'a>(
        &'a self,
        back_buffer: &'a wgpu::TextureView,
        clear: wgpu::Color,
    ) -> wgpu::RenderPassColorAttachment<'a> {
        let (view, resolve_target) = match self.msaa_view.as_ref() {
            Some(msaa) => (msaa, Some(back_buffer)),
            None => (back_buffer, None),
        };

        wgpu::RenderPassColorAttachment {
            view,
            resolve_target,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(clear),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        }
    }
}
