use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::RenderError;

use super::{BackBuffer, RenderCtx, SwapChain};

/// Bytes-per-row alignment for texture → buffer copies.
const ROW_ALIGN: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

/// How long a readback may wait for the GPU before giving up.
const READBACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialization parameters for [`OffscreenContext`].
#[derive(Debug, Clone)]
pub struct OffscreenInit {
    pub width: u32,
    pub height: u32,
    /// Must be a 4-byte-per-pixel format for [`OffscreenContext::read_pixels`].
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
    pub power_preference: wgpu::PowerPreference,
}

impl Default for OffscreenInit {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            format: wgpu::TextureFormat::Rgba8Unorm,
            sample_count: 1,
            power_preference: wgpu::PowerPreference::LowPower,
        }
    }
}

/// Back buffer handed out by [`OffscreenContext`].
pub struct OffscreenFrame {
    view: wgpu::TextureView,
}

impl BackBuffer for OffscreenFrame {
    fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

/// Headless swap chain: renders into a single texture instead of a window.
///
/// Used for tests and windowless runs. Every frame targets the same texture;
/// "present" only counts frames.
pub struct OffscreenContext {
    texture: Option<wgpu::Texture>,
    queue: wgpu::Queue,
    device: wgpu::Device,
    adapter: wgpu::Adapter,
    instance: wgpu::Instance,

    format: wgpu::TextureFormat,
    sample_count: u32,
    extent: (u32, u32),
    presents: u64,
}

impl OffscreenContext {
    /// Creates a device without a surface plus the target texture.
    pub async fn new(init: OffscreenInit) -> Result<Self, RenderError> {
        if init.width == 0 || init.height == 0 {
            return Err(RenderError::DeviceCreation("offscreen target has zero size".into()));
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::DeviceCreation(format!("no compatible GPU adapter: {e}")))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("prism offscreen device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| {
                RenderError::DeviceCreation(format!("failed to create device/queue: {e}"))
            })?;

        let features = adapter.get_texture_format_features(init.format);
        if !features.flags.sample_count_supported(init.sample_count) {
            return Err(RenderError::DeviceCreation(format!(
                "{}x multisampling is not supported for {:?}",
                init.sample_count, init.format
            )));
        }

        let texture = create_target(&device, init.format, init.width, init.height);
        log::debug!(
            "offscreen context ready: {:?} {}x{}",
            init.format,
            init.width,
            init.height
        );

        Ok(Self {
            texture: Some(texture),
            queue,
            device,
            adapter,
            instance,
            format: init.format,
            sample_count: init.sample_count,
            extent: (init.width, init.height),
            presents: 0,
        })
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

    /// Number of frames presented so far.
    pub fn presents(&self) -> u64 {
        self.presents
    }

    /// Reads the target back as tightly packed rows of 4-byte pixels.
    pub fn read_pixels(&self) -> Result<Vec<u8>, RenderError> {
        let Some(texture) = self.texture.as_ref() else {
            return Err(RenderError::InvalidUsage("offscreen target already released".into()));
        };

        let (width, height) = self.extent;
        let unpadded = width * 4;
        let padded = unpadded.div_ceil(ROW_ALIGN) * ROW_ALIGN;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("prism offscreen readback"),
            size: u64::from(padded) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("prism readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let bytes = map_read(&self.device, &staging)?;
        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        for row in bytes.chunks(padded as usize) {
            pixels.extend_from_slice(&row[..unpadded as usize]);
        }
        Ok(pixels)
    }
}

impl SwapChain for OffscreenContext {
    type Frame = OffscreenFrame;

    fn render_ctx(&self) -> RenderCtx<'_> {
        RenderCtx::new(
            &self.device,
            &self.queue,
            self.format,
            self.sample_count,
            self.extent,
        )
    }

    fn acquire(&mut self) -> Result<Option<OffscreenFrame>, RenderError> {
        let Some(texture) = self.texture.as_ref() else {
            return Err(RenderError::DeviceLost("offscreen target already released".into()));
        };
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Some(OffscreenFrame { view }))
    }

    fn present(&mut self, frame: OffscreenFrame, _sync_interval: u32) -> Result<(), RenderError> {
        drop(frame);
        self.presents += 1;
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || self.texture.is_none() {
            return;
        }
        self.texture = Some(create_target(&self.device, self.format, width, height));
        self.extent = (width, height);
    }

    fn is_lost(&self) -> bool {
        false
    }

    fn shutdown(&mut self) {
        if self.texture.take().is_some() {
            log::debug!("offscreen target released");
        }
    }
}

/// Copies `size` bytes of `buffer` into host memory.
///
/// `buffer` needs `COPY_SRC` usage.
pub fn read_buffer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    buffer: &wgpu::Buffer,
    size: u64,
) -> Result<Vec<u8>, RenderError> {
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("prism buffer readback"),
        size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("prism buffer readback encoder"),
    });
    encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
    queue.submit(std::iter::once(encoder.finish()));

    map_read(device, &staging)
}

fn map_read(device: &wgpu::Device, staging: &wgpu::Buffer) -> Result<Vec<u8>, RenderError> {
    let slice = staging.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |res| {
        let _ = tx.send(res);
    });

    let started = Instant::now();
    loop {
        let _ = device.poll(wgpu::PollType::Poll);
        match rx.try_recv() {
            Ok(Ok(())) => break,
            Ok(Err(e)) => return Err(RenderError::DeviceLost(format!("readback failed: {e}"))),
            Err(mpsc::TryRecvError::Disconnected) => {
                return Err(RenderError::DeviceLost("readback callback dropped".into()));
            }
            Err(mpsc::TryRecvError::Empty) => {
                if started.elapsed() > READBACK_TIMEOUT {
                    return Err(RenderError::DeviceLost("readback timed out".into()));
                }
                std::thread::sleep(Duration::from_millis(1));
            }
        }
    }

    let bytes = slice.get_mapped_range().to_vec();
    staging.unmap();
    Ok(bytes)
}

fn create_target(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("prism offscreen target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}
