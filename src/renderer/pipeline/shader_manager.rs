//! Shader Template Manager
//!
//! Holds the minijinja environment that renders the WGSL templates embedded
//! under `shaders/`, plus the GPU-side `ShaderModule` cache.
//!
//! Template syntax:
//!
//! | Construct | Meaning |
//! |-----------|---------|
//! | `{$ ... $}` | block statement (`if`, `for`, `include`, `set`) |
//! | `{{ ... }}` | expression |
//! | `$$ ...`    | line statement |
//!
//! `{$ include "name" $}` resolves to `chunks/name.wgsl`.

use std::borrow::Cow;

use minijinja::{Environment, Error, ErrorKind, syntax::SyntaxConfig};
use rust_embed::RustEmbed;
use rustc_hash::FxHashMap;
use serde::Serialize;
use xxhash_rust::xxh3::xxh3_128;

use crate::errors::Result;

#[derive(RustEmbed)]
#[folder = "src/renderer/pipeline/shaders"]
struct ShaderAssets;

/// Template environment for generated shaders.
pub struct ShaderTemplates {
    env: Environment<'static>,
}

impl ShaderTemplates {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();

        let syntax = SyntaxConfig::builder()
            .block_delimiters("{$", "$}")
            .variable_delimiters("{{", "}}")
            .line_statement_prefix("$$")
            .build()?;

        env.set_syntax(syntax);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(minijinja::UndefinedBehavior::SemiStrict);
        env.set_loader(shader_loader);
        env.set_path_join_callback(|name, _parent| format!("chunks/{name}").into());

        Ok(Self { env })
    }

    /// Renders `template_name` with `ctx`.
    pub fn render<S: Serialize>(&self, template_name: &str, ctx: &S) -> Result<String> {
        let template = self.env.get_template(template_name)?;
        Ok(template.render(ctx)?)
    }
}

fn shader_loader(name: &str) -> std::result::Result<Option<String>, Error> {
    let filename = if std::path::Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wgsl"))
    {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}.wgsl"))
    };

    match ShaderAssets::get(&filename) {
        Some(file) => std::str::from_utf8(file.data.as_ref())
            .map(|source| Some(source.to_string()))
            .map_err(|e| {
                Error::new(
                    ErrorKind::TemplateNotFound,
                    format!("shader '{filename}' is not UTF-8: {e}"),
                )
            }),
        None => Ok(None),
    }
}

// ─── ShaderManager ────────────────────────────────────────────────────────────

/// GPU shader module cache.
///
/// Deduplicates `wgpu::ShaderModule`s by the xxh3-128 hash of their final
/// WGSL source. Modules of a replaced program are dropped with
/// [`ShaderManager::release`].
#[derive(Default)]
pub struct ShaderManager {
    module_cache: FxHashMap<u128, wgpu::ShaderModule>,
}

impl ShaderManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the module for `source`, creating it on first use.
    pub fn get_or_create(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        source: &str,
    ) -> (&wgpu::ShaderModule, u128) {
        let hash = xxh3_128(source.as_bytes());

        let module = self.module_cache.entry(hash).or_insert_with(|| {
            log::debug!("Creating shader module '{label}' ({hash:032x})");
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.to_owned().into()),
            })
        });

        (module, hash)
    }

    /// Drops the module created from the source hashing to `hash`.
    pub fn release(&mut self, hash: u128) -> bool {
        self.module_cache.remove(&hash).is_some()
    }

    #[must_use]
    pub fn module_count(&self) -> usize {
        self.module_cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_are_embedded() {
        assert!(ShaderAssets::get("scene_vertex.wgsl").is_some());
        assert!(ShaderAssets::get("chunks/lights.wgsl").is_some());
    }

    #[test]
    fn missing_template_is_an_error() {
        let templates = ShaderTemplates::new().unwrap();
        let ctx = empty_ctx();
        assert!(templates.render("does_not_exist", &ctx).is_err());
    }

    fn empty_ctx() -> std::collections::BTreeMap<&'static str, u32> {
        std::collections::BTreeMap::new()
    }
}
