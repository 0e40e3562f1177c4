use std::sync::Arc;

use bitflags::bitflags;
use glam::Vec4;

use crate::resources::uniforms::MaterialUniforms;

/// Number of named texture slots a material can bind.
pub const TEXTURE_SLOT_COUNT: usize = 8;

/// Named texture slots, in binding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum TextureSlot {
    Emission = 0,
    Ambient = 1,
    Diffuse = 2,
    Specular = 3,
    Reflective = 4,
    Transparent = 5,
    Multiply = 6,
    Normal = 7,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; TEXTURE_SLOT_COUNT] = [
        Self::Emission,
        Self::Ambient,
        Self::Diffuse,
        Self::Specular,
        Self::Reflective,
        Self::Transparent,
        Self::Multiply,
        Self::Normal,
    ];

    /// Name used for the slot's texture binding in generated shaders.
    #[must_use]
    pub fn binding_name(self) -> &'static str {
        match self {
            Self::Emission => "t_emission",
            Self::Ambient => "t_ambient",
            Self::Diffuse => "t_diffuse",
            Self::Specular => "t_specular",
            Self::Reflective => "t_reflective",
            Self::Transparent => "t_transparent",
            Self::Multiply => "t_multiply",
            Self::Normal => "t_normal",
        }
    }

    #[inline]
    #[must_use]
    pub fn flag(self) -> TextureSlots {
        TextureSlots::from_bits_truncate(1 << self as u32)
    }
}

bitflags! {
    /// Mask of texture slots that carry a real texture.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextureSlots: u32 {
        const EMISSION    = 1 << 0;
        const AMBIENT     = 1 << 1;
        const DIFFUSE     = 1 << 2;
        const SPECULAR    = 1 << 3;
        const REFLECTIVE  = 1 << 4;
        const TRANSPARENT = 1 << 5;
        const MULTIPLY    = 1 << 6;
        const NORMAL      = 1 << 7;
    }
}

/// Blinn-Phong material parameters for one geometry element.
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub emission: Vec4,
    pub shininess: f32,
    textures: [Option<Arc<wgpu::TextureView>>; TEXTURE_SLOT_COUNT],
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            ambient: Vec4::ONE,
            diffuse: Vec4::ONE,
            specular: Vec4::new(0.0, 0.0, 0.0, 1.0),
            emission: Vec4::new(0.0, 0.0, 0.0, 1.0),
            shininess: 1.0,
            textures: Default::default(),
        }
    }
}

impl Material {
    #[must_use]
    pub fn new(diffuse: Vec4) -> Self {
        Self {
            diffuse,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    #[must_use]
    pub fn with_ambient(mut self, ambient: Vec4) -> Self {
        self.ambient = ambient;
        self
    }

    #[must_use]
    pub fn with_specular(mut self, specular: Vec4, shininess: f32) -> Self {
        self.specular = specular;
        self.shininess = shininess;
        self
    }

    #[must_use]
    pub fn with_emission(mut self, emission: Vec4) -> Self {
        self.emission = emission;
        self
    }

    #[must_use]
    pub fn with_texture(mut self, slot: TextureSlot, view: Arc<wgpu::TextureView>) -> Self {
        self.textures[slot as usize] = Some(view);
        self
    }

    pub fn set_texture(&mut self, slot: TextureSlot, view: Option<Arc<wgpu::TextureView>>) {
        self.textures[slot as usize] = view;
    }

    #[must_use]
    pub fn texture(&self, slot: TextureSlot) -> Option<&Arc<wgpu::TextureView>> {
        self.textures[slot as usize].as_ref()
    }

    /// Slots that hold a texture.
    #[must_use]
    pub fn texture_slots(&self) -> TextureSlots {
        TextureSlot::ALL
            .iter()
            .filter(|slot| self.textures[**slot as usize].is_some())
            .fold(TextureSlots::empty(), |acc, slot| acc | slot.flag())
    }

    /// GPU parameter block for this material.
    #[must_use]
    pub fn uniforms(&self) -> MaterialUniforms {
        MaterialUniforms {
            ambient: self.ambient,
            diffuse: self.diffuse,
            specular: self.specular,
            emission: self.emission,
            shininess: self.shininess,
            texture_flags: self.texture_slots().bits(),
            ..Default::default()
        }
    }
}
