use std::ops::Range;

use crate::RenderError;
use crate::device::{BackBuffer, SwapChain};
use crate::paint::Color;
use crate::time::{ClockState, ColorAnimation};

use super::{
    BufferUsage, FrameTarget, GeometryBuffer, PipelineState, ShaderSource, Vertex, VertexLayout,
};

/// Everything built once after the device is ready.
#[derive(Debug, Clone)]
pub struct Scene {
    pub vertex_shader: ShaderSource,
    pub fragment_shader: ShaderSource,
    pub layout: VertexLayout,
    pub vertices: Vec<Vertex>,
    pub usage: BufferUsage,
}

impl Scene {
    /// Scene using the built-in colored-triangle shaders and [`Vertex::layout`].
    pub fn colored(vertices: Vec<Vertex>, usage: BufferUsage) -> Self {
        Self {
            vertex_shader: ShaderSource::triangle_vertex(),
            fragment_shader: ShaderSource::triangle_fragment(),
            layout: Vertex::layout(),
            vertices,
            usage,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RendererConfig {
    /// Vertical-sync interval passed to every present (0 = no wait).
    pub sync_interval: u32,
    pub animation: ColorAnimation,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            sync_interval: 1,
            animation: ColorAnimation::default(),
        }
    }
}

/// Frame renderer lifecycle.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Lifecycle {
    Uninitialized,
    Ready,
    Rendering,
    Closing,
    Released,
}

/// Draw issued for one frame.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DrawCall {
    pub vertices: Range<u32>,
    pub instances: Range<u32>,
    pub topology: wgpu::PrimitiveTopology,
}

impl DrawCall {
    pub fn vertex_count(&self) -> u32 {
        self.vertices.end - self.vertices.start
    }
}

/// Result of one `render_next_frame` call.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    Presented(DrawCall),
    /// Nothing was drawn this tick (minimized, transient surface state).
    Skipped,
    /// The renderer is closing or released; the loop should stop.
    Closed,
}

/// GPU resources owned by the renderer, in acquisition order.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResourceKind {
    DeviceContext,
    FrameTarget,
    Pipeline,
    Geometry,
}

/// Which resources a `release` call actually released, in release order.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ReleaseReport {
    pub released: Vec<ResourceKind>,
}

impl ReleaseReport {
    pub fn is_empty(&self) -> bool {
        self.released.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    pub frames_presented: u64,
    pub frames_skipped: u64,
    pub last_draw: Option<DrawCall>,
    pub last_clear: Option<Color>,
}

/// Drives one frame at a time: clear, bind, draw, present.
///
/// Owns the swap chain (device context) and every resource created against
/// it. Release happens in reverse acquisition order: geometry, pipeline,
/// frame target, then the device context. Dropping the renderer releases
/// anything still held.
pub struct FrameRenderer<C: SwapChain> {
    state: Lifecycle,
    config: RendererConfig,
    clock: ClockState,

    swap_chain: Option<C>,
    target: Option<FrameTarget>,
    pipeline: Option<PipelineState>,
    geometry: Option<GeometryBuffer>,

    pending_resize: Option<(u32, u32)>,
    stats: FrameStats,
}

impl<C: SwapChain> FrameRenderer<C> {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            state: Lifecycle::Uninitialized,
            config,
            clock: ClockState::new(config.animation),
            swap_chain: None,
            target: None,
            pipeline: None,
            geometry: None,
            pending_resize: None,
            stats: FrameStats::default(),
        }
    }

    /// Takes ownership of `swap_chain` and builds the frame target, pipeline
    /// and geometry for `scene`.
    ///
    /// On failure everything built so far is released, the swap chain is shut
    /// down and the renderer stays `Uninitialized`.
    pub fn initialize(&mut self, mut swap_chain: C, scene: &Scene) -> Result<(), RenderError> {
        if self.state != Lifecycle::Uninitialized {
            return Err(RenderError::InvalidUsage(format!(
                "initialize called while {:?}",
                self.state
            )));
        }

        let built = build_resources(&swap_chain, scene);
        let (target, pipeline, geometry) = match built {
            Ok(resources) => resources,
            Err(err) => {
                log::error!("renderer initialization failed: {err}");
                swap_chain.shutdown();
                return Err(err);
            }
        };

        self.swap_chain = Some(swap_chain);
        self.target = Some(target);
        self.pipeline = Some(pipeline);
        self.geometry = Some(geometry);
        self.clock = ClockState::new(self.config.animation);
        self.transition(Lifecycle::Ready);
        Ok(())
    }

    /// Records a new back-buffer size; applied before the next frame.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        if matches!(self.state, Lifecycle::Ready | Lifecycle::Rendering) {
            self.pending_resize = Some((width, height));
        }
    }

    /// Moves to `Closing`; takes effect between frames.
    pub fn on_close_requested(&mut self) {
        if !matches!(self.state, Lifecycle::Closing | Lifecycle::Released) {
            self.transition(Lifecycle::Closing);
        }
    }

    /// Overwrites the dynamic geometry buffer with `vertices`.
    pub fn update_geometry(&mut self, vertices: &[Vertex]) -> Result<(), RenderError> {
        let (Some(chain), Some(geometry)) = (self.swap_chain.as_ref(), self.geometry.as_mut())
        else {
            return Err(RenderError::InvalidUsage(
                "no geometry buffer to rewrite".into(),
            ));
        };
        geometry.rewrite(chain.render_ctx().queue, vertices)
    }

    /// Produces exactly one frame.
    ///
    /// Any error is fatal: the renderer moves to `Closing` and the caller is
    /// expected to [`release`](Self::release).
    pub fn render_next_frame(&mut self) -> Result<FrameOutcome, RenderError> {
        match self.state {
            Lifecycle::Uninitialized => {
                return Err(RenderError::InvalidUsage(
                    "render_next_frame called before initialize".into(),
                ));
            }
            Lifecycle::Closing | Lifecycle::Released => return Ok(FrameOutcome::Closed),
            Lifecycle::Ready => self.transition(Lifecycle::Rendering),
            Lifecycle::Rendering => {}
        }

        match self.produce_frame() {
            Ok(outcome) => {
                match &outcome {
                    FrameOutcome::Presented(draw) => {
                        self.stats.frames_presented += 1;
                        self.stats.last_draw = Some(draw.clone());
                    }
                    FrameOutcome::Skipped => self.stats.frames_skipped += 1,
                    FrameOutcome::Closed => {}
                }
                Ok(outcome)
            }
            Err(err) => {
                log::error!("fatal render error: {err}");
                self.transition(Lifecycle::Closing);
                Err(err)
            }
        }
    }

    fn produce_frame(&mut self) -> Result<FrameOutcome, RenderError> {
        let Some(chain) = self.swap_chain.as_mut() else {
            return Err(RenderError::InvalidUsage("device context missing".into()));
        };
        if chain.is_lost() {
            return Err(RenderError::DeviceLost("device reported loss".into()));
        }

        if let Some((width, height)) = self.pending_resize.take() {
            chain.resize(width, height);
            self.target = if width == 0 || height == 0 {
                None
            } else {
                Some(FrameTarget::derive(&chain.render_ctx())?)
            };
        }

        self.clock.advance();
        let clear = self.clock.color();

        let Some(target) = self.target.as_ref() else {
            return Ok(FrameOutcome::Skipped);
        };
        let (Some(pipeline), Some(geometry)) = (self.pipeline.as_ref(), self.geometry.as_ref())
        else {
            return Err(RenderError::InvalidUsage("pipeline or geometry missing".into()));
        };

        let Some(frame) = chain.acquire()? else {
            return Ok(FrameOutcome::Skipped);
        };

        let draw = {
            let ctx = chain.render_ctx();
            let mut encoder = ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("prism frame encoder"),
                });
            let draw = record_frame(&mut encoder, target, pipeline, geometry, frame.view(), clear);
            ctx.queue.submit(std::iter::once(encoder.finish()));
            draw
        };

        chain.present(frame, self.config.sync_interval)?;
        self.stats.last_clear = Some(clear);
        Ok(FrameOutcome::Presented(draw))
    }

    /// Releases geometry, pipeline, frame target and device context, in that
    /// order. Missing resources are skipped. Idempotent.
    pub fn release(&mut self) -> ReleaseReport {
        if self.state == Lifecycle::Released {
            return ReleaseReport::default();
        }
        if self.state != Lifecycle::Closing {
            self.transition(Lifecycle::Closing);
        }

        let mut report = ReleaseReport::default();
        if self.geometry.take().is_some() {
            report.released.push(ResourceKind::Geometry);
        }
        if self.pipeline.take().is_some() {
            report.released.push(ResourceKind::Pipeline);
        }
        if self.target.take().is_some() {
            report.released.push(ResourceKind::FrameTarget);
        }
        if let Some(mut chain) = self.swap_chain.take() {
            chain.shutdown();
            drop(chain);
            report.released.push(ResourceKind::DeviceContext);
        }
        self.pending_resize = None;

        self.transition(Lifecycle::Released);
        log::info!(
            "renderer released {:?} after {} frames",
            report.released,
            self.stats.frames_presented
        );
        report
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn clock(&self) -> &ClockState {
        &self.clock
    }

    pub fn swap_chain(&self) -> Option<&C> {
        self.swap_chain.as_ref()
    }

    pub fn frame_target(&self) -> Option<&FrameTarget> {
        self.target.as_ref()
    }

    pub fn pipeline(&self) -> Option<&PipelineState> {
        self.pipeline.as_ref()
    }

    pub fn geometry(&self) -> Option<&GeometryBuffer> {
        self.geometry.as_ref()
    }

    fn transition(&mut self, next: Lifecycle) {
        log::debug!("renderer {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

impl<C: SwapChain> Drop for FrameRenderer<C> {
    fn drop(&mut self) {
        if self.state != Lifecycle::Released {
            self.release();
        }
    }
}

fn build_resources<C: SwapChain>(
    swap_chain: &C,
    scene: &Scene,
) -> Result<(FrameTarget, PipelineState, GeometryBuffer), RenderError> {
    let vertex_size = std::mem::size_of::<Vertex>() as u64;
    if scene.layout.array_stride != vertex_size {
        return Err(RenderError::LayoutMismatch(format!(
            "layout stride is {} bytes, vertices are {vertex_size}",
            scene.layout.array_stride
        )));
    }

    let ctx = swap_chain.render_ctx();
    let target = FrameTarget::derive(&ctx)?;
    let pipeline = PipelineState::build(
        &ctx,
        &scene.vertex_shader,
        &scene.fragment_shader,
        &scene.layout,
    )?;
    let geometry = GeometryBuffer::upload(&ctx, &scene.vertices, scene.usage)?;
    Ok((target, pipeline, geometry))
}

/// Clear, bind pipeline + geometry, draw the full vertex range as one instance.
fn record_frame(
    encoder: &mut wgpu::CommandEncoder,
    target: &FrameTarget,
    pipeline: &PipelineState,
    geometry: &GeometryBuffer,
    back_buffer: &wgpu::TextureView,
    clear: Color,
) -> DrawCall {
    let draw = DrawCall {
        vertices: 0..geometry.vertex_count(),
        instances: 0..1,
        topology: pipeline.topology(),
    };

    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("prism frame pass"),
        color_attachments: &[Some(target.color_attachment(back_buffer, clear.to_wgpu()))],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });

    target.viewport().apply(&mut pass);
    pipeline.bind(&mut pass);
    geometry.bind(&mut pass, 0);
    pass.draw(draw.vertices.clone(), draw.instances.clone());

    draw
}
