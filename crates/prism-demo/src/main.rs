use std::str::FromStr;

use anyhow::{Context, Result, ensure};
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use prism_engine::core::{App, AppControl};
use prism_engine::device::{OffscreenContext, OffscreenInit};
use prism_engine::logging::{LoggingConfig, init_logging};
use prism_engine::paint::Color;
use prism_engine::render::{BufferUsage, FrameOutcome, FrameRenderer, Scene, Vertex};
use prism_engine::time::{FrameClock, FrameTime};
use prism_engine::window::{Runtime, RuntimeConfig};

/// Radians per second when the triangle spins.
const SPIN_RATE: f32 = 0.8;

struct TriangleApp {
    base: [Vertex; 3],
    usage: BufferUsage,
}

impl TriangleApp {
    fn new(usage: BufferUsage) -> Self {
        Self {
            base: [
                Vertex::new([0.0, 0.5, 0.0], Color::RED),
                Vertex::new([-0.5, -0.5, 0.0], Color::GREEN),
                Vertex::new([0.5, -0.5, 0.0], Color::BLUE),
            ],
            usage,
        }
    }
}

impl App for TriangleApp {
    fn scene(&mut self) -> Scene {
        Scene::colored(self.base.to_vec(), self.usage)
    }

    fn update(&mut self, time: &FrameTime) -> Option<Vec<Vertex>> {
        if self.usage != BufferUsage::Dynamic {
            return None;
        }

        let (sin, cos) = (time.elapsed.as_secs_f32() * SPIN_RATE).sin_cos();
        let spun = self
            .base
            .iter()
            .map(|v| {
                let [x, y, z] = v.position;
                Vertex {
                    position: [x * cos - y * sin, x * sin + y * cos, z],
                    color: v.color,
                }
            })
            .collect();
        Some(spun)
    }

    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::KeyQ) =>
            {
                AppControl::Exit
            }
            _ => AppControl::Continue,
        }
    }
}

fn env_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid {name}={raw:?}")),
        Err(_) => Ok(None),
    }
}

fn env_flag(name: &str) -> Result<bool> {
    Ok(env_var::<u8>(name)?.is_some_and(|v| v != 0))
}

/// Renders `frames` frames into an offscreen target, then closes and releases.
fn run_headless(frames: u32, config: &RuntimeConfig, mut app: TriangleApp) -> Result<()> {
    let ctx = pollster::block_on(OffscreenContext::new(OffscreenInit {
        sample_count: config.device.sample_count,
        ..OffscreenInit::default()
    }))
    .context("failed to create offscreen device")?;

    let mut renderer = FrameRenderer::new(config.renderer);
    renderer
        .initialize(ctx, &app.scene())
        .context("failed to initialize renderer")?;

    let mut clock = FrameClock::new();
    for _ in 0..frames {
        if let Some(vertices) = app.update(&clock.tick()) {
            renderer.update_geometry(&vertices)?;
        }
        renderer.render_next_frame()?;
    }

    renderer.on_close_requested();
    ensure!(
        renderer.render_next_frame()? == FrameOutcome::Closed,
        "renderer kept drawing after close"
    );

    let presented = renderer.stats().frames_presented;
    let report = renderer.release();
    log::info!("headless run: {presented} frames presented, released {:?}", report.released);
    Ok(())
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let mut config = RuntimeConfig {
        title: "prism triangle".to_string(),
        ..RuntimeConfig::default()
    };

    if let Some(samples) = env_var::<u32>("PRISM_SAMPLES")? {
        config.device.sample_count = samples;
    }
    if let Some(interval) = env_var::<u32>("PRISM_VSYNC")? {
        config.device.sync_interval = interval;
        config.renderer.sync_interval = interval;
    }
    config.fullscreen = env_flag("PRISM_FULLSCREEN")?;

    let usage = if env_flag("PRISM_DYNAMIC")? {
        BufferUsage::Dynamic
    } else {
        BufferUsage::Static
    };
    let app = TriangleApp::new(usage);

    match env_var::<u32>("PRISM_HEADLESS_FRAMES")? {
        Some(frames) => run_headless(frames, &config, app),
        None => Runtime::run(config, app),
    }
}
