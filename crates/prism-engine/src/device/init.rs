/// Initialization parameters for the device context.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct DeviceInit {
    /// Back-buffer size override in physical pixels.
    ///
    /// `None` uses the window's current inner size.
    pub size: Option<(u32, u32)>,

    /// Multisample count for the color target (1 disables MSAA).
    pub sample_count: u32,

    /// Requested pixel format. Falls back to `prefer_srgb` selection when the
    /// surface does not support it.
    pub format: Option<wgpu::TextureFormat>,

    /// Prefer an sRGB surface format when no explicit format is requested.
    pub prefer_srgb: bool,

    /// Configured back-buffer count (surface frame latency hint).
    pub back_buffer_count: u32,

    /// Initial vertical-sync interval: 0 = no wait, >= 1 = wait for vsync.
    pub sync_interval: u32,

    /// Adapter selection preference.
    pub power_preference: wgpu::PowerPreference,

    /// Required wgpu features.
    ///
    /// Favor an empty set for portability unless a feature is strictly necessary.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,
}

impl Default for DeviceInit {
    fn default() -> Self {
        Self {
            size: None,
            sample_count: 1,
            format: None,
            prefer_srgb: true,
            back_buffer_count: 1,
            sync_interval: 1,
            power_preference: wgpu::PowerPreference::HighPerformance,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
        }
    }
}
