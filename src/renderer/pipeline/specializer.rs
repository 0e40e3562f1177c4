//! Light-specialized program cache.
//!
//! A program variant is generated, compiled and linked the first time a
//! light configuration is seen, then kept for the specializer's lifetime.
//! Steady-state frames hit the `current` fast path without hashing.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use xxhash_rust::xxh3::xxh3_128;

use super::compiler::{self, ProgramReflection};
use super::shader_gen::ShaderGenerator;
use super::shader_manager::ShaderTemplates;
use crate::errors::{Result, ShaderStage};
use crate::renderer::lights::LightCounts;
use crate::resources::material::{TEXTURE_SLOT_COUNT, TextureSlot};
use crate::resources::program::CustomProgram;

/// What a [`CompiledProgram`] was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKey {
    Lights(LightCounts),
    Custom(u64),
}

/// A linked program, ready to be turned into GPU pipelines.
#[derive(Debug)]
pub struct CompiledProgram {
    pub key: ProgramKey,
    pub vertex_source: String,
    /// Same text as `vertex_source` for single-module programs.
    pub fragment_source: String,
    /// xxh3-128 over both sources.
    pub source_hash: u128,
    pub reflection: ProgramReflection,
    /// Binding names of the material texture slots, in slot order.
    pub texture_slots: [&'static str; TEXTURE_SLOT_COUNT],
}

impl CompiledProgram {
    #[inline]
    #[must_use]
    pub fn is_single_module(&self) -> bool {
        matches!(self.key, ProgramKey::Custom(_))
    }
}

fn texture_slot_names() -> [&'static str; TEXTURE_SLOT_COUNT] {
    TextureSlot::ALL.map(TextureSlot::binding_name)
}

fn hash_sources(vertex: &str, fragment: &str) -> u128 {
    let mut bytes = Vec::with_capacity(vertex.len() + fragment.len() + 1);
    bytes.extend_from_slice(vertex.as_bytes());
    bytes.push(0);
    bytes.extend_from_slice(fragment.as_bytes());
    xxh3_128(&bytes)
}

pub struct ShaderSpecializer {
    templates: ShaderTemplates,
    variants: FxHashMap<LightCounts, Arc<CompiledProgram>>,
    current: Option<(LightCounts, Arc<CompiledProgram>)>,
    custom: FxHashMap<u64, Arc<CompiledProgram>>,
    compile_count: usize,
}

impl ShaderSpecializer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            templates: ShaderTemplates::new()?,
            variants: FxHashMap::default(),
            current: None,
            custom: FxHashMap::default(),
            compile_count: 0,
        })
    }

    /// Program for `counts`, compiling it on first use.
    ///
    /// Compile and link failures are returned as is; the previously current
    /// program is not used as a fallback.
    pub fn get_program(&mut self, counts: LightCounts) -> Result<Arc<CompiledProgram>> {
        if let Some((current_counts, program)) = &self.current
            && *current_counts == counts
        {
            return Ok(program.clone());
        }

        let program = match self.variants.get(&counts) {
            Some(program) => program.clone(),
            None => {
                let program = Arc::new(self.compile_variant(counts)?);
                self.variants.insert(counts, program.clone());
                program
            }
        };
        self.current = Some((counts, program.clone()));
        Ok(program)
    }

    /// Compiled form of a geometry's custom program, cached by program id.
    pub fn get_custom_program(&mut self, custom: &CustomProgram) -> Result<Arc<CompiledProgram>> {
        if let Some(program) = self.custom.get(&custom.id()) {
            return Ok(program.clone());
        }

        log::info!("Compiling custom program '{}'", custom.label);
        let source = custom.source();
        let (_, reflection) = compiler::compile_combined(source)?;
        self.compile_count += 1;

        let program = Arc::new(CompiledProgram {
            key: ProgramKey::Custom(custom.id()),
            vertex_source: source.to_string(),
            fragment_source: source.to_string(),
            source_hash: xxh3_128(source.as_bytes()),
            reflection,
            texture_slots: texture_slot_names(),
        });
        self.custom.insert(custom.id(), program.clone());
        Ok(program)
    }

    fn compile_variant(&mut self, counts: LightCounts) -> Result<CompiledProgram> {
        log::info!("Compiling program variant for {counts:?}");
        let sources = ShaderGenerator::generate(&self.templates, &counts)?;

        let vertex = compiler::compile_stage(ShaderStage::Vertex, &sources.vertex)?;
        let fragment = compiler::compile_stage(ShaderStage::Fragment, &sources.fragment)?;
        let reflection = compiler::link(
            (&vertex, &sources.vertex),
            (&fragment, &sources.fragment),
        )?;
        self.compile_count += 1;

        Ok(CompiledProgram {
            key: ProgramKey::Lights(counts),
            source_hash: hash_sources(&sources.vertex, &sources.fragment),
            vertex_source: sources.vertex,
            fragment_source: sources.fragment,
            reflection,
            texture_slots: texture_slot_names(),
        })
    }

    /// The program returned by the last successful [`get_program`](Self::get_program).
    #[must_use]
    pub fn current(&self) -> Option<&Arc<CompiledProgram>> {
        self.current.as_ref().map(|(_, program)| program)
    }

    /// Number of programs compiled so far.
    #[inline]
    #[must_use]
    pub fn compile_count(&self) -> usize {
        self.compile_count
    }

    #[inline]
    #[must_use]
    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }
}
