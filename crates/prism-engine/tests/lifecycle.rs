mod common;

use std::cell::Cell;
use std::rc::Rc;

use prism_engine::RenderError;
use prism_engine::ShaderStage;
use prism_engine::device::{OffscreenContext, OffscreenFrame, OffscreenInit, RenderCtx, SwapChain};
use prism_engine::render::{
    BufferUsage, DrawCall, FrameOutcome, FrameRenderer, Lifecycle, PipelineState, RendererConfig,
    ResourceKind, Scene, ShaderSource, Vertex, VertexLayout,
};

/// Offscreen swap chain whose device loss is switched from the test.
struct LosableChain {
    inner: OffscreenContext,
    lost: Rc<Cell<bool>>,
    fail_acquire: Rc<Cell<bool>>,
}

impl SwapChain for LosableChain {
    type Frame = OffscreenFrame;

    fn render_ctx(&self) -> RenderCtx<'_> {
        self.inner.render_ctx()
    }

    fn acquire(&mut self) -> Result<Option<OffscreenFrame>, RenderError> {
        if self.fail_acquire.get() {
            return Err(RenderError::DeviceLost("back buffer acquisition failed".into()));
        }
        self.inner.acquire()
    }

    fn present(&mut self, frame: OffscreenFrame, sync_interval: u32) -> Result<(), RenderError> {
        self.inner.present(frame, sync_interval)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.inner.resize(width, height);
    }

    fn is_lost(&self) -> bool {
        self.lost.get() || self.inner.is_lost()
    }

    fn shutdown(&mut self) {
        self.inner.shutdown();
    }
}

struct LossSwitches {
    lost: Rc<Cell<bool>>,
    fail_acquire: Rc<Cell<bool>>,
}

fn losable_renderer(test_name: &str) -> Option<(FrameRenderer<LosableChain>, LossSwitches)> {
    let inner = common::offscreen(test_name, OffscreenInit::default())?;
    let switches = LossSwitches {
        lost: Rc::new(Cell::new(false)),
        fail_acquire: Rc::new(Cell::new(false)),
    };
    let chain = LosableChain {
        inner,
        lost: Rc::clone(&switches.lost),
        fail_acquire: Rc::clone(&switches.fail_acquire),
    };

    let mut renderer = FrameRenderer::new(RendererConfig::default());
    renderer
        .initialize(chain, &Scene::colored(common::triangle(), BufferUsage::Static))
        .expect("renderer initializes");
    Some((renderer, switches))
}

const ALL_RESOURCES: [ResourceKind; 4] = [
    ResourceKind::Geometry,
    ResourceKind::Pipeline,
    ResourceKind::FrameTarget,
    ResourceKind::DeviceContext,
];

fn renderer_with(
    test_name: &str,
    init: OffscreenInit,
    scene: &Scene,
) -> Option<FrameRenderer<OffscreenContext>> {
    let ctx = common::offscreen(test_name, init)?;
    let mut renderer = FrameRenderer::new(RendererConfig::default());
    renderer.initialize(ctx, scene).expect("renderer initializes");
    Some(renderer)
}

// ── drawing ──────────────────────────────────────────────────────────────

#[test]
fn static_triangle_issues_one_full_draw() {
    let scene = Scene::colored(common::triangle(), BufferUsage::Static);
    let Some(mut renderer) = renderer_with(module_path!(), OffscreenInit::default(), &scene) else {
        return;
    };
    assert_eq!(renderer.state(), Lifecycle::Ready);

    let outcome = renderer.render_next_frame().expect("frame renders");
    assert_eq!(
        outcome,
        FrameOutcome::Presented(DrawCall {
            vertices: 0..3,
            instances: 0..1,
            topology: wgpu::PrimitiveTopology::TriangleList,
        })
    );
    assert_eq!(renderer.state(), Lifecycle::Rendering);
    assert_eq!(renderer.swap_chain().map(|c| c.presents()), Some(1));
}

#[test]
fn frame_clears_and_draws_triangle() {
    let scene = Scene::colored(common::triangle(), BufferUsage::Static);
    let Some(mut renderer) = renderer_with(module_path!(), OffscreenInit::default(), &scene) else {
        return;
    };

    renderer.render_next_frame().expect("frame renders");
    let clear = renderer.stats().last_clear.expect("presented frame records its clear color");
    let pixels = renderer
        .swap_chain()
        .expect("context alive")
        .read_pixels()
        .expect("readback");

    common::assert_near(common::pixel(&pixels, 64, 0, 0), common::to_rgba8(clear));
    assert_ne!(common::pixel(&pixels, 64, 32, 32), common::to_rgba8(clear));
}

#[test]
fn multisampled_target_resolves_into_back_buffer() {
    let init = OffscreenInit {
        sample_count: 4,
        ..OffscreenInit::default()
    };
    let scene = Scene::colored(common::triangle(), BufferUsage::Static);
    let Some(mut renderer) = renderer_with(module_path!(), init, &scene) else {
        return;
    };
    assert!(renderer.frame_target().is_some_and(|t| t.sample_count() == 4));

    renderer.render_next_frame().expect("frame renders");
    let clear = renderer.stats().last_clear.expect("clear recorded");
    let pixels = renderer.swap_chain().expect("context").read_pixels().expect("readback");

    common::assert_near(common::pixel(&pixels, 64, 0, 0), common::to_rgba8(clear));
    assert_ne!(common::pixel(&pixels, 64, 32, 32), common::to_rgba8(clear));
}

#[test]
fn viewport_covers_back_buffer() {
    let init = OffscreenInit {
        width: 96,
        height: 40,
        ..OffscreenInit::default()
    };
    let scene = Scene::colored(common::triangle(), BufferUsage::Static);
    let Some(renderer) = renderer_with(module_path!(), init, &scene) else {
        return;
    };

    let target = renderer.frame_target().expect("target derived");
    let vp = target.viewport();
    assert_eq!((vp.x, vp.y), (0.0, 0.0));
    assert_eq!((vp.width, vp.height), (96.0, 40.0));
    assert_eq!(target.extent(), (96, 40));
}

// ── resize ───────────────────────────────────────────────────────────────

#[test]
fn resize_rederives_target_before_next_frame() {
    let scene = Scene::colored(common::triangle(), BufferUsage::Static);
    let Some(mut renderer) = renderer_with(module_path!(), OffscreenInit::default(), &scene) else {
        return;
    };

    renderer.on_resize(32, 16);
    assert_eq!(renderer.frame_target().map(|t| t.extent()), Some((64, 64)));

    assert!(matches!(renderer.render_next_frame(), Ok(FrameOutcome::Presented(_))));
    let target = renderer.frame_target().expect("target");
    assert_eq!(target.extent(), (32, 16));
    assert_eq!(target.viewport().width, 32.0);
    assert!(target.matches(&renderer.swap_chain().expect("context").render_ctx()));
}

#[test]
fn zero_size_skips_until_restored() {
    let scene = Scene::colored(common::triangle(), BufferUsage::Static);
    let Some(mut renderer) = renderer_with(module_path!(), OffscreenInit::default(), &scene) else {
        return;
    };

    renderer.on_resize(0, 0);
    assert_eq!(renderer.render_next_frame().unwrap(), FrameOutcome::Skipped);
    assert_eq!(renderer.render_next_frame().unwrap(), FrameOutcome::Skipped);
    assert_eq!(renderer.stats().frames_skipped, 2);

    renderer.on_resize(48, 48);
    assert!(matches!(renderer.render_next_frame(), Ok(FrameOutcome::Presented(_))));
    assert_eq!(renderer.stats().frames_presented, 1);
}

// ── device loss ──────────────────────────────────────────────────────────

#[test]
fn device_loss_is_fatal_and_moves_to_closing() {
    let Some((mut renderer, switches)) = losable_renderer(module_path!()) else {
        return;
    };
    assert!(matches!(renderer.render_next_frame(), Ok(FrameOutcome::Presented(_))));

    switches.lost.set(true);
    let err = renderer.render_next_frame().unwrap_err();
    assert!(matches!(err, RenderError::DeviceLost(_)), "{err}");
    assert_eq!(renderer.state(), Lifecycle::Closing);
    assert_eq!(renderer.stats().frames_presented, 1);

    assert_eq!(renderer.render_next_frame().unwrap(), FrameOutcome::Closed);
    assert_eq!(renderer.release().released, ALL_RESOURCES.to_vec());
}

#[test]
fn failed_acquisition_is_fatal() {
    let Some((mut renderer, switches)) = losable_renderer(module_path!()) else {
        return;
    };

    switches.fail_acquire.set(true);
    assert!(matches!(
        renderer.render_next_frame(),
        Err(RenderError::DeviceLost(_))
    ));
    assert_eq!(renderer.state(), Lifecycle::Closing);
    assert_eq!(renderer.stats().frames_presented, 0);
    assert_eq!(renderer.release().released, ALL_RESOURCES.to_vec());
}

// ── pipeline linkage ─────────────────────────────────────────────────────

#[test]
fn fragment_input_missing_from_vertex_outputs_is_an_error() {
    let Some(ctx) = common::offscreen(module_path!(), OffscreenInit::default()) else {
        return;
    };
    let fragment = ShaderSource::new(
        "@fragment fn fs_main(@location(3) c: vec4<f32>) -> @location(0) vec4<f32> { return c; }",
        "fs_main",
    );

    let result = PipelineState::build(
        &ctx.render_ctx(),
        &ShaderSource::triangle_vertex(),
        &fragment,
        &Vertex::layout(),
    );
    assert!(matches!(
        result,
        Err(RenderError::ShaderCompile {
            stage: ShaderStage::Fragment,
            ..
        })
    ));
}

#[test]
fn fragment_output_incompatible_with_target_is_an_error() {
    let Some(ctx) = common::offscreen(module_path!(), OffscreenInit::default()) else {
        return;
    };
    let fragment = ShaderSource::new(
        "@fragment fn fs_main() -> @location(0) vec4<u32> { return vec4<u32>(1u); }",
        "fs_main",
    );

    let result = PipelineState::build(
        &ctx.render_ctx(),
        &ShaderSource::triangle_vertex(),
        &fragment,
        &Vertex::layout(),
    );
    let Err(RenderError::ShaderCompile { diagnostics, .. }) = result else {
        panic!("expected a shader compile error");
    };
    assert!(!diagnostics.is_empty());
}

#[test]
fn unlinked_stages_fail_initialize_without_panicking() {
    let Some(ctx) = common::offscreen(module_path!(), OffscreenInit::default()) else {
        return;
    };
    let mut scene = Scene::colored(common::triangle(), BufferUsage::Static);
    scene.fragment_shader = ShaderSource::new(
        "@fragment fn fs_main(@location(3) c: vec4<f32>) -> @location(0) vec4<f32> { return c; }",
        "fs_main",
    );

    let mut renderer = FrameRenderer::new(RendererConfig::default());
    assert!(renderer.initialize(ctx, &scene).is_err());
    assert_eq!(renderer.state(), Lifecycle::Uninitialized);
    assert!(renderer.pipeline().is_none());
}

// ── failures during initialize ───────────────────────────────────────────

#[test]
fn broken_shader_fails_initialize() {
    let Some(ctx) = common::offscreen(module_path!(), OffscreenInit::default()) else {
        return;
    };
    let mut scene = Scene::colored(common::triangle(), BufferUsage::Static);
    scene.fragment_shader = ShaderSource::new("@fragment fn fs_main( {", "fs_main");

    let mut renderer = FrameRenderer::new(RendererConfig::default());
    let err = renderer.initialize(ctx, &scene).unwrap_err();
    assert!(matches!(err, RenderError::ShaderCompile { .. }), "{err}");
    assert_eq!(renderer.state(), Lifecycle::Uninitialized);
    assert!(renderer.swap_chain().is_none());
    assert!(renderer.release().is_empty());
}

#[test]
fn mismatched_layout_fails_initialize() {
    let Some(ctx) = common::offscreen(module_path!(), OffscreenInit::default()) else {
        return;
    };
    let mut scene = Scene::colored(common::triangle(), BufferUsage::Static);
    scene.layout = VertexLayout::new(
        28,
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4].to_vec(),
    );

    let mut renderer = FrameRenderer::new(RendererConfig::default());
    let err = renderer.initialize(ctx, &scene).unwrap_err();
    assert!(matches!(err, RenderError::LayoutMismatch(_)), "{err}");
    assert!(renderer.pipeline().is_none());
}

#[test]
fn empty_geometry_fails_initialize() {
    let Some(ctx) = common::offscreen(module_path!(), OffscreenInit::default()) else {
        return;
    };
    let scene = Scene::colored(Vec::new(), BufferUsage::Static);

    let mut renderer = FrameRenderer::new(RendererConfig::default());
    let err = renderer.initialize(ctx, &scene).unwrap_err();
    assert!(matches!(err, RenderError::InvalidUsage(_)), "{err}");
}

#[test]
fn initialize_twice_is_invalid() {
    let scene = Scene::colored(common::triangle(), BufferUsage::Static);
    let Some(mut renderer) = renderer_with(module_path!(), OffscreenInit::default(), &scene) else {
        return;
    };
    let Some(second) = common::offscreen(module_path!(), OffscreenInit::default()) else {
        return;
    };

    let err = renderer.initialize(second, &scene).unwrap_err();
    assert!(matches!(err, RenderError::InvalidUsage(_)));
    assert_eq!(renderer.state(), Lifecycle::Ready);
}

// ── teardown ─────────────────────────────────────────────────────────────

#[test]
fn ten_frames_then_close_releases_everything_in_order() {
    let scene = Scene::colored(common::triangle(), BufferUsage::Static);
    let Some(mut renderer) = renderer_with(module_path!(), OffscreenInit::default(), &scene) else {
        return;
    };

    for _ in 0..10 {
        assert!(matches!(renderer.render_next_frame(), Ok(FrameOutcome::Presented(_))));
    }
    assert_eq!(renderer.stats().frames_presented, 10);

    renderer.on_close_requested();
    assert_eq!(renderer.state(), Lifecycle::Closing);
    assert_eq!(renderer.render_next_frame().unwrap(), FrameOutcome::Closed);
    assert_eq!(renderer.stats().frames_presented, 10);

    let report = renderer.release();
    assert_eq!(report.released, ALL_RESOURCES.to_vec());
    assert_eq!(renderer.state(), Lifecycle::Released);
    assert!(renderer.swap_chain().is_none());
    assert!(renderer.geometry().is_none());

    assert!(renderer.release().is_empty());
}

#[test]
fn release_without_close_still_tears_down() {
    let scene = Scene::colored(common::triangle(), BufferUsage::Static);
    let Some(mut renderer) = renderer_with(module_path!(), OffscreenInit::default(), &scene) else {
        return;
    };
    renderer.render_next_frame().expect("frame renders");

    assert_eq!(renderer.release().released.len(), 4);
    assert_eq!(renderer.render_next_frame().unwrap(), FrameOutcome::Closed);
}

#[test]
fn dropping_an_active_renderer_is_safe() {
    let scene = Scene::colored(common::triangle(), BufferUsage::Dynamic);
    let Some(mut renderer) = renderer_with(module_path!(), OffscreenInit::default(), &scene) else {
        return;
    };
    renderer.render_next_frame().expect("frame renders");
    drop(renderer);
}
