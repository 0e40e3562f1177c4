//! Shader Code Generator
//!
//! Builds the template context for a light configuration and renders the
//! vertex and fragment templates into WGSL.

use serde::Serialize;

use super::shader_manager::ShaderTemplates;
use crate::errors::{PrismError, Result};
use crate::renderer::lights::LightCounts;
use crate::resources::material::TextureSlot;
use crate::resources::uniforms::{GlobalUniforms, MaterialUniforms, SkinUniforms, WgslStruct};
use crate::scene::MAX_SKINNING_JOINTS;

pub const VERTEX_TEMPLATE: &str = "scene_vertex";
pub const FRAGMENT_TEMPLATE: &str = "scene_fragment";

/// First varying location used by the per-light vectors.
pub const FIRST_LIGHT_LOCATION: u32 = 4;

/// Directional + omni + spot lights one program can handle; bounded by the
/// 16 inter-stage locations wgpu guarantees.
pub const MAX_LIGHT_VECTORS: u32 = 11;

#[derive(Debug, Serialize)]
struct TextureSlotContext {
    name: &'static str,
    binding: u32,
    flag: u32,
    flag_name: String,
}

#[derive(Debug, Serialize)]
struct ShaderContext {
    num_ambient_lights: u32,
    num_directional_lights: u32,
    num_omni_lights: u32,
    num_spot_lights: u32,
    num_ies_lights: u32,
    num_probe_lights: u32,
    num_light_vectors: u32,
    first_light_location: u32,
    max_skinning_joints: usize,
    globals_struct: String,
    material_struct: String,
    skin_struct: String,
    texture_slots: Vec<TextureSlotContext>,
}

impl ShaderContext {
    fn new(counts: &LightCounts) -> Self {
        Self {
            num_ambient_lights: counts.ambient,
            num_directional_lights: counts.directional,
            num_omni_lights: counts.omni,
            num_spot_lights: counts.spot,
            num_ies_lights: counts.ies,
            num_probe_lights: counts.probe,
            num_light_vectors: counts.num_light_vectors(),
            first_light_location: FIRST_LIGHT_LOCATION,
            max_skinning_joints: MAX_SKINNING_JOINTS,
            globals_struct: GlobalUniforms::wgsl_struct_def("Globals"),
            material_struct: MaterialUniforms::wgsl_struct_def("Material"),
            skin_struct: SkinUniforms::wgsl_struct_def("Skin"),
            texture_slots: TextureSlot::ALL
                .iter()
                .enumerate()
                .map(|(i, slot)| TextureSlotContext {
                    name: slot.binding_name(),
                    binding: 2 + i as u32,
                    flag: slot.flag().bits(),
                    flag_name: format!("FLAG_{}", slot.binding_name().to_uppercase()),
                })
                .collect(),
        }
    }
}

/// WGSL for both stages of one light configuration.
#[derive(Debug, Clone)]
pub struct GeneratedSources {
    pub vertex: String,
    pub fragment: String,
}

pub struct ShaderGenerator;

impl ShaderGenerator {
    pub fn generate(templates: &ShaderTemplates, counts: &LightCounts) -> Result<GeneratedSources> {
        if counts.num_light_vectors() > MAX_LIGHT_VECTORS {
            return Err(PrismError::config(format!(
                "{} directional/omni/spot lights exceed the limit of {MAX_LIGHT_VECTORS}",
                counts.num_light_vectors()
            )));
        }
        let ctx = ShaderContext::new(counts);
        let header = format!("// === Auto-generated shader for {counts:?} ===\n");
        Ok(GeneratedSources {
            vertex: header.clone() + &templates.render(VERTEX_TEMPLATE, &ctx)?,
            fragment: header + &templates.render(FRAGMENT_TEMPLATE, &ctx)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(counts: LightCounts) -> GeneratedSources {
        ShaderGenerator::generate(&ShaderTemplates::new().unwrap(), &counts).unwrap()
    }

    #[test]
    fn counts_become_constants() {
        let sources = generate(LightCounts {
            omni: 2,
            spot: 1,
            ..Default::default()
        });
        assert!(sources.fragment.contains("const NUM_OMNI_LIGHTS: i32 = 2;"));
        assert!(sources.fragment.contains("const NUM_SPOT_LIGHTS: i32 = 1;"));
        assert!(sources.vertex.contains("const NUM_LIGHT_VECTORS: i32 = 3;"));
    }

    #[test]
    fn empty_types_declare_no_array() {
        let sources = generate(LightCounts {
            directional: 1,
            ..Default::default()
        });
        assert!(sources.vertex.contains("directional: array<DirectionalLight, 1>"));
        assert!(!sources.vertex.contains("omni: array"));
        assert!(!sources.vertex.contains("ambient: array"));
    }

    #[test]
    fn zero_light_vectors_emit_no_varyings() {
        let sources = generate(LightCounts::default());
        assert!(!sources.vertex.contains("light_0"));
        assert!(!sources.fragment.contains("light_0"));
    }

    #[test]
    fn one_varying_per_light_vector() {
        let sources = generate(LightCounts {
            directional: 1,
            omni: 1,
            spot: 1,
            ..Default::default()
        });
        assert!(sources.vertex.contains("@location(4) light_0: vec3<f32>"));
        assert!(sources.vertex.contains("@location(6) light_2: vec3<f32>"));
        assert!(!sources.vertex.contains("light_3"));
    }

    #[test]
    fn too_many_light_vectors_rejected() {
        let result = ShaderGenerator::generate(
            &ShaderTemplates::new().unwrap(),
            &LightCounts {
                omni: MAX_LIGHT_VECTORS + 1,
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(PrismError::Configuration(_))));
    }
}
