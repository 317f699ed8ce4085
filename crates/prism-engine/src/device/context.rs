use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::RenderError;

use super::surface::{
    choose_alpha_mode, choose_surface_format, map_surface_error, present_mode_for,
};
use super::{DeviceInit, RenderCtx, SurfaceErrorAction, SurfaceFrame, SwapChain};

/// Owns wgpu core objects and the swap chain bound to a window.
///
/// This type is the low-level rendering context:
/// - creates and stores Instance/Adapter/Device/Queue
/// - creates and configures the Surface (swap chain)
/// - acquires and presents back buffers
///
/// Fields drop in declaration order: swap chain first, then queue and device,
/// then adapter and instance.
pub struct DeviceContext<'w> {
    /// Window the swap chain presents into.
    ///
    /// Surface lifetime is tied to the window; the window must outlive the context.
    window: &'w Window,

    /// Swap chain. `None` once [`shutdown`](Self::shutdown) ran.
    surface: Option<wgpu::Surface<'w>>,

    /// Command queue.
    queue: wgpu::Queue,

    /// Logical device.
    device: wgpu::Device,

    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// wgpu instance used to create the adapter and surface.
    instance: wgpu::Instance,

    /// Active surface configuration.
    config: wgpu::SurfaceConfiguration,

    /// Current drawable size in physical pixels.
    size: PhysicalSize<u32>,

    sample_count: u32,
    sync_interval: u32,

    /// Set by the device-lost callback.
    lost: Arc<AtomicBool>,
}

impl<'w> DeviceContext<'w> {
    /// Creates the device, its queue and a swap chain bound to `window`.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu. Every failure maps
    /// to [`RenderError::DeviceCreation`]; retrying with the same parameters
    /// will not help.
    pub async fn initialize(window: &'w Window, init: DeviceInit) -> Result<Self, RenderError> {
        let size = match init.size {
            Some((w, h)) => PhysicalSize::new(w, h),
            None => window.inner_size(),
        };
        if size.width == 0 || size.height == 0 {
            return Err(RenderError::DeviceCreation("window has zero size".into()));
        }
        if init.sample_count == 0 {
            return Err(RenderError::DeviceCreation("sample count must be at least 1".into()));
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::DeviceCreation(format!("failed to create surface: {e}")))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::DeviceCreation(format!("no compatible GPU adapter: {e}")))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("prism device"),
                required_features: init.required_features,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| {
                RenderError::DeviceCreation(format!("failed to create device/queue: {e}"))
            })?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&surface_caps, init.format, init.prefer_srgb)
            .ok_or_else(|| RenderError::DeviceCreation("no supported surface formats".into()))?;
        if let Some(requested) = init.format.filter(|f| *f != format) {
            log::warn!("surface format {requested:?} unsupported; using {format:?}");
        }

        let format_features = adapter.get_texture_format_features(format);
        if !format_features
            .flags
            .sample_count_supported(init.sample_count)
        {
            return Err(RenderError::DeviceCreation(format!(
                "{}x multisampling is not supported for {format:?}",
                init.sample_count
            )));
        }

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: present_mode_for(init.sync_interval),
            alpha_mode: choose_alpha_mode(&surface_caps),
            view_formats: vec![],
            desired_maximum_frame_latency: init.back_buffer_count.max(1),
        };

        surface.configure(&device, &config);

        let lost = Arc::new(AtomicBool::new(false));
        let lost_flag = Arc::clone(&lost);
        device.set_device_lost_callback(move |reason, message| {
            log::error!("device lost ({reason:?}): {message}");
            lost_flag.store(true, Ordering::Release);
        });

        let info = adapter.get_info();
        log::info!(
            "device ready: {} ({:?}), {:?} {}x{}, {}x MSAA",
            info.name,
            info.backend,
            format,
            size.width,
            size.height,
            init.sample_count
        );

        Ok(Self {
            window,
            surface: Some(surface),
            queue,
            device,
            adapter,
            instance,
            config,
            size,
            sample_count: init.sample_count,
            sync_interval: init.sync_interval,
            lost,
        })
    }

    /// Returns the window this context presents into.
    pub fn window(&self) -> &'w Window {
        self.window
    }

    /// Returns the active surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Returns the current drawable size (physical pixels).
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Returns the configured back-buffer count.
    pub fn back_buffer_count(&self) -> u32 {
        self.config.desired_maximum_frame_latency
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    /// Reconfigures the swap chain after a resize.
    ///
    /// wgpu does not support configuring a surface with a 0x0 size; in that case,
    /// only internal state is updated and configuration is deferred. The caller
    /// must re-derive its frame target before the next frame.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = PhysicalSize::new(width, height);
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        if let Some(surface) = self.surface.as_ref() {
            surface.configure(&self.device, &self.config);
        }
        log::debug!("swap chain resized to {width}x{height}");
    }

    /// Acquires the current back buffer.
    pub fn acquire(&mut self) -> Result<Option<SurfaceFrame>, RenderError> {
        let Some(surface) = self.surface.as_ref() else {
            return Err(RenderError::DeviceLost("swap chain already released".into()));
        };
        if self.size.width == 0 || self.size.height == 0 {
            return Ok(None);
        }

        match surface.get_current_texture() {
            Ok(surface_texture) => {
                let view = surface_texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(Some(SurfaceFrame {
                    surface_texture,
                    view,
                }))
            }
            Err(err) => match map_surface_error(&err) {
                SurfaceErrorAction::Reconfigure => {
                    log::warn!("surface {err}; reconfiguring");
                    surface.configure(&self.device, &self.config);
                    Ok(None)
                }
                SurfaceErrorAction::SkipFrame => {
                    log::debug!("surface {err}; skipping frame");
                    Ok(None)
                }
                SurfaceErrorAction::Fatal => Err(RenderError::DeviceLost(format!(
                    "back buffer acquisition failed: {err}"
                ))),
            },
        }
    }

    /// Presents a back buffer whose commands were already submitted.
    ///
    /// `sync_interval` 0 presents without waiting for vertical sync. A changed
    /// interval reconfigures the swap chain for the following frames.
    pub fn present(&mut self, frame: SurfaceFrame, sync_interval: u32) -> Result<(), RenderError> {
        if self.lost.load(Ordering::Acquire) {
            return Err(RenderError::DeviceLost("device lost before present".into()));
        }

        self.window.pre_present_notify();
        let SurfaceFrame {
            surface_texture,
            view,
        } = frame;
        drop(view);
        surface_texture.present();

        if sync_interval != self.sync_interval {
            self.sync_interval = sync_interval;
            self.config.present_mode = present_mode_for(sync_interval);
            if let Some(surface) = self.surface.as_ref() {
                if self.size.width > 0 && self.size.height > 0 {
                    surface.configure(&self.device, &self.config);
                }
            }
            log::debug!("sync interval set to {sync_interval}");
        }

        Ok(())
    }

    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    /// Leaves full-screen state, then releases the swap chain. Idempotent.
    ///
    /// The device, queue, adapter and instance are released when the context
    /// drops, after the swap chain.
    pub fn shutdown(&mut self) {
        let Some(surface) = self.surface.take() else {
            return;
        };

        if self.window.fullscreen().is_some() {
            log::debug!("leaving fullscreen before releasing swap chain");
            self.window.set_fullscreen(None);
        }

        drop(surface);
        log::debug!("swap chain released");
    }
}

impl<'w> SwapChain for DeviceContext<'w> {
    type Frame = SurfaceFrame;

    fn render_ctx(&self) -> RenderCtx<'_> {
        RenderCtx::new(
            &self.device,
            &self.queue,
            self.config.format,
            self.sample_count,
            (self.config.width, self.config.height),
        )
    }

    fn acquire(&mut self) -> Result<Option<SurfaceFrame>, RenderError> {
        DeviceContext::acquire(self)
    }

    fn present(&mut self, frame: SurfaceFrame, sync_interval: u32) -> Result<(), RenderError> {
        DeviceContext::present(self, frame, sync_interval)
    }

    fn resize(&mut self, width: u32, height: u32) {
        DeviceContext::resize(self, width, height);
    }

    fn is_lost(&self) -> bool {
        DeviceContext::is_lost(self)
    }

    fn shutdown(&mut self) {
        DeviceContext::shutdown(self);
    }
}

impl Drop for DeviceContext<'_> {
    fn drop(&mut self) {
        self.shutdown();
        log::debug!("device context released");
    }
}
