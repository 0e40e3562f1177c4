//! wgpu Context
//!
//! [`GpuContext`] holds the device, queue and the color format of the
//! targets the renderer draws into. The surface itself belongs to the view
//! layer; the renderer only receives texture views to draw into.

use crate::errors::{PrismError, Result};
use crate::renderer::settings::RendererSettings;

pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Format of the color targets passed to `draw_frame`.
    pub color_format: wgpu::TextureFormat,
    pub depth_format: wgpu::TextureFormat,
    pub clear_color: wgpu::Color,
}

impl GpuContext {
    /// Wraps a device created by the caller.
    #[must_use]
    pub fn from_device(
        device: wgpu::Device,
        queue: wgpu::Queue,
        color_format: wgpu::TextureFormat,
        settings: &RendererSettings,
    ) -> Self {
        Self {
            device,
            queue,
            color_format,
            depth_format: settings.depth_format,
            clear_color: settings.clear_color,
        }
    }

    /// Requests an adapter and device without a surface.
    pub async fn new_headless(
        settings: &RendererSettings,
        color_format: wgpu::TextureFormat,
    ) -> Result<Self> {
        let instance = wgpu::Instance::default();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: settings.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| PrismError::AdapterRequestFailed(e.to_string()))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Prism Device"),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        Ok(Self::from_device(device, queue, color_format, settings))
    }

    pub fn create_depth_texture(&self, width: u32, height: u32) -> wgpu::TextureView {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.depth_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }
}
