//! Renderer Settings
//!
//! [`RendererSettings`] is a plain value consumed by [`Renderer::new`] and
//! [`Renderer::init`]. Most fields can also be changed later through
//! [`Renderer::settings_mut`]; GPU-side fields
//! (`power_preference`, `depth_format`) only take effect on the next `init`.
//!
//! ```rust,ignore
//! use prism::renderer::RendererSettings;
//!
//! let settings = RendererSettings {
//!     autoenables_default_lighting: true,
//!     backface_culling: true,
//!     ..Default::default()
//! };
//! ```
//!
//! [`Renderer::new`]: crate::renderer::Renderer::new
//! [`Renderer::init`]: crate::renderer::Renderer::init
//! [`Renderer::settings_mut`]: crate::renderer::Renderer::settings_mut

use glam::Vec3;

/// Global renderer configuration.
///
/// | Field                          | Description                                    | Default           |
/// |--------------------------------|------------------------------------------------|-------------------|
/// | `autoenables_default_lighting` | Add an omni light when the scene has none      | `false`           |
/// | `default_camera_distance`      | Standoff distance of the fallback camera       | `15.0`            |
/// | `default_light_position`       | World position of the fallback omni light      | `(0, 10, 10)`     |
/// | `clear_color`                  | Framebuffer clear color                        | Black (0,0,0,1)   |
/// | `depth_format`                 | Depth attachment format                        | `Depth32Float`    |
/// | `backface_culling`             | Cull back faces when drawing                   | `false`           |
/// | `power_preference`             | GPU adapter selection strategy                 | `HighPerformance` |
#[derive(Debug, Clone)]
pub struct RendererSettings {
    // === Scene Defaults ===
    /// Synthesize a white omni light when the scene carries no light other
    /// than ambient ones.
    pub autoenables_default_lighting: bool,

    /// Distance from the origin of the camera used when the scene has none.
    pub default_camera_distance: f32,

    /// Position of the synthesized omni light.
    pub default_light_position: Vec3,

    // === Drawing ===
    /// Background clear color for the render target.
    pub clear_color: wgpu::Color,

    /// Depth buffer texture format.
    pub depth_format: wgpu::TextureFormat,

    /// Cull back faces of every scene draw, custom programs included.
    pub backface_culling: bool,

    // === GPU ===
    /// GPU adapter selection preference.
    pub power_preference: wgpu::PowerPreference,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            autoenables_default_lighting: false,
            default_camera_distance: 15.0,
            default_light_position: Vec3::new(0.0, 10.0, 10.0),
            clear_color: wgpu::Color {
                r: 0.0,
                g: 0.0,
                b: 0.0,
                a: 1.0,
            },
            depth_format: wgpu::TextureFormat::Depth32Float,
            backface_culling: false,
            power_preference: wgpu::PowerPreference::HighPerformance,
        }
    }
}

impl RendererSettings {
    #[inline]
    #[must_use]
    pub fn cull_mode(&self) -> Option<wgpu::Face> {
        self.backface_culling.then_some(wgpu::Face::Back)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn culling_is_off_by_default() {
        assert_eq!(RendererSettings::default().cull_mode(), None);
    }

    #[test]
    fn culling_flag_selects_back_faces() {
        let settings = RendererSettings {
            backface_culling: true,
            ..Default::default()
        };
        assert_eq!(settings.cull_mode(), Some(wgpu::Face::Back));
    }
}
