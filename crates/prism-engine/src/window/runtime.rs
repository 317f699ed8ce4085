use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Fullscreen, Window, WindowId};

use crate::RenderError;
use crate::core::{App, AppControl};
use crate::device::{DeviceContext, DeviceInit};
use crate::render::{FrameOutcome, FrameRenderer, Lifecycle, RendererConfig};
use crate::time::FrameClock;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Start in borderless fullscreen on the current monitor.
    pub fullscreen: bool,
    pub device: DeviceInit,
    pub renderer: RendererConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "prism".to_string(),
            initial_size: LogicalSize::new(800.0, 600.0),
            fullscreen: false,
            device: DeviceInit::default(),
            renderer: RendererConfig::default(),
        }
    }
}

/// Entry point for the runtime.
///
/// Events are drained in `window_event`; once the queue is empty
/// (`about_to_wait`) exactly one frame is produced. Close requests take effect
/// between frames.
pub struct Runtime;

impl Runtime {
    pub fn run<A>(config: RuntimeConfig, app: A) -> Result<()>
    where
        A: 'static + App,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut state = AppState::new(config, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    renderer: FrameRenderer<DeviceContext<'this>>,
}

struct AppState<A>
where
    A: App + 'static,
{
    config: RuntimeConfig,
    app: A,

    entry: Option<WindowEntry>,
    fatal: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: App + 'static,
{
    fn new(config: RuntimeConfig, app: A) -> Self {
        Self {
            config,
            app,
            entry: None,
            fatal: None,
        }
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size)
            .with_fullscreen(self.config.fullscreen.then_some(Fullscreen::Borderless(None)));

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let id = window.id();
        let device_init = self.config.device.clone();
        let renderer_config = self.config.renderer;
        let scene = self.app.scene();

        let entry = WindowEntry::try_new(FrameClock::default(), window, |window| {
            pollster::block_on(DeviceContext::initialize(window, device_init)).and_then(|ctx| {
                let mut renderer = FrameRenderer::new(renderer_config);
                renderer.initialize(ctx, &scene).map(|()| renderer)
            })
        })
        .context("failed to initialize renderer")?;

        log::info!("window {id:?} ready");
        self.entry = Some(entry);
        Ok(())
    }

    fn request_close(&mut self) {
        if let Some(entry) = self.entry.as_mut() {
            entry.with_renderer_mut(|r| r.on_close_requested());
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.fatal.get_or_insert(err);
        self.shutdown(event_loop);
    }

    /// Releases the renderer (and with it the device context) before the
    /// window is dropped, then stops the loop.
    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut entry) = self.entry.take() {
            let (report, presented, skipped) = entry.with_renderer_mut(|r| {
                let report = r.release();
                (report, r.stats().frames_presented, r.stats().frames_skipped)
            });
            log::info!(
                "shutdown: {presented} frames presented, {skipped} skipped, released {:?}",
                report.released
            );
        }
        event_loop.exit();
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: App + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }

        if let Err(e) = self.create_window_entry(event_loop) {
            self.fail(event_loop, e.context("failed to create initial window"));
        }
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.app.on_window_event(&event) == AppControl::Exit {
            self.request_close();
            return;
        }

        let Some(entry) = self.entry.as_mut() else {
            return;
        };

        match &event {
            WindowEvent::CloseRequested => {
                entry.with_renderer_mut(|r| r.on_close_requested());
            }

            WindowEvent::Resized(size) => {
                entry.with_renderer_mut(|r| r.on_resize(size.width, size.height));
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let size = entry.with_window(|w| w.inner_size());
                entry.with_renderer_mut(|r| r.on_resize(size.width, size.height));
            }

            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && !event.repeat =>
            {
                match event.physical_key {
                    PhysicalKey::Code(KeyCode::F11) => entry.with_window(|w| toggle_fullscreen(w)),
                    PhysicalKey::Code(KeyCode::Escape) => entry.with_window(|w| {
                        if w.fullscreen().is_some() {
                            w.set_fullscreen(None);
                        }
                    }),
                    _ => {}
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Poll);

        let app = &mut self.app;
        let Some(entry) = self.entry.as_mut() else {
            return;
        };

        let result = entry.with_mut(|fields| -> Result<FrameOutcome, RenderError> {
            if matches!(
                fields.renderer.state(),
                Lifecycle::Closing | Lifecycle::Released
            ) {
                return Ok(FrameOutcome::Closed);
            }

            let time = fields.clock.tick();
            if let Some(vertices) = app.update(&time) {
                fields.renderer.update_geometry(&vertices)?;
            }
            fields.renderer.render_next_frame()
        });

        match result {
            Ok(FrameOutcome::Closed) => self.shutdown(event_loop),
            Ok(FrameOutcome::Presented(_) | FrameOutcome::Skipped) => {}
            Err(err) => self.fail(event_loop, anyhow::Error::new(err).context("frame failed")),
        }
    }

    fn exiting(&mut self, event_loop: &ActiveEventLoop) {
        self.shutdown(event_loop);
    }
}

fn toggle_fullscreen(window: &Window) {
    let next = match window.fullscreen() {
        Some(_) => None,
        None => Some(Fullscreen::Borderless(None)),
    };
    log::debug!("fullscreen -> {}", next.is_some());
    window.set_fullscreen(next);
}
