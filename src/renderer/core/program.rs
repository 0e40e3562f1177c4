//! GPU side of compiled programs.
//!
//! Only the current shared program lives on the GPU; replacing it releases
//! the previous program's modules and pipelines. Custom programs stay
//! resident for as long as some geometry draws with them.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::renderer::core::geometry_state::vertex_buffer_layout;
use crate::renderer::core::layouts::BindGroupLayouts;
use crate::renderer::pipeline::{
    CompiledProgram, FRAGMENT_ENTRY, ProgramKey, ShaderManager, VERTEX_ENTRY,
};

/// Pipeline variants differ in topology, strip index format and culling.
type PipelineKey = (
    wgpu::PrimitiveTopology,
    Option<wgpu::IndexFormat>,
    Option<wgpu::Face>,
);

/// Fixed state every scene pipeline is built with.
#[derive(Debug, Clone, Copy)]
pub struct PipelineTargets {
    pub color_format: wgpu::TextureFormat,
    pub depth_format: wgpu::TextureFormat,
    pub cull_mode: Option<wgpu::Face>,
}

pub struct GpuProgram {
    pub program: Arc<CompiledProgram>,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    module_hashes: Vec<u128>,
    pipelines: FxHashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl GpuProgram {
    fn new(
        device: &wgpu::Device,
        shader_manager: &mut ShaderManager,
        program: Arc<CompiledProgram>,
    ) -> Self {
        let label = format!("{:?}", program.key);
        let (vertex, vertex_hash) =
            shader_manager.get_or_create(device, &label, &program.vertex_source);
        let vertex = vertex.clone();

        let (fragment, module_hashes) = if program.is_single_module() {
            (vertex.clone(), vec![vertex_hash])
        } else {
            let (fragment, fragment_hash) =
                shader_manager.get_or_create(device, &label, &program.fragment_source);
            (fragment.clone(), vec![vertex_hash, fragment_hash])
        };

        Self {
            program,
            vertex,
            fragment,
            module_hashes,
            pipelines: FxHashMap::default(),
        }
    }

    /// Pipeline for one element topology, built on first use.
    pub fn pipeline(
        &mut self,
        device: &wgpu::Device,
        layouts: &BindGroupLayouts,
        targets: PipelineTargets,
        topology: wgpu::PrimitiveTopology,
        index_format: wgpu::IndexFormat,
    ) -> &wgpu::RenderPipeline {
        let strip_index_format = topology.is_strip().then_some(index_format);
        let key = (topology, strip_index_format, targets.cull_mode);

        self.pipelines.entry(key).or_insert_with(|| {
            log::debug!("Creating pipeline {topology:?} for {:?}", self.program.key);
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Scene Pipeline"),
                layout: Some(&layouts.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &self.vertex,
                    entry_point: Some(VERTEX_ENTRY),
                    buffers: &[vertex_buffer_layout()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &self.fragment,
                    entry_point: Some(FRAGMENT_ENTRY),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: targets.color_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    strip_index_format,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: targets.cull_mode,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: targets.depth_format,
                    depth_write_enabled: Some(true),
                    depth_compare: Some(wgpu::CompareFunction::Less),
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        })
    }
}

/// Resident GPU programs.
#[derive(Default)]
pub struct GpuPrograms {
    shared: Option<GpuProgram>,
    custom: FxHashMap<u64, GpuProgram>,
    /// Bumped whenever the shared program is replaced.
    generation: u64,
}

impl GpuPrograms {
    /// Makes `program` the resident shared program.
    ///
    /// Returns `true` when the previous one was replaced.
    pub fn ensure_shared(
        &mut self,
        device: &wgpu::Device,
        shader_manager: &mut ShaderManager,
        program: &Arc<CompiledProgram>,
    ) -> bool {
        if let Some(shared) = &self.shared
            && Arc::ptr_eq(&shared.program, program)
        {
            return false;
        }

        if let Some(old) = self.shared.take() {
            log::info!("Replacing program {:?} with {:?}", old.program.key, program.key);
            release_modules(shader_manager, &old, self.custom.values());
        }
        self.shared = Some(GpuProgram::new(device, shader_manager, program.clone()));
        self.generation += 1;
        true
    }

    pub fn ensure_custom(
        &mut self,
        device: &wgpu::Device,
        shader_manager: &mut ShaderManager,
        program: &Arc<CompiledProgram>,
    ) {
        if let ProgramKey::Custom(id) = program.key {
            self.custom
                .entry(id)
                .or_insert_with(|| GpuProgram::new(device, shader_manager, program.clone()));
        }
    }

    /// Drops custom programs no geometry drew with this frame.
    pub fn retain_custom(&mut self, shader_manager: &mut ShaderManager, live: &FxHashSet<u64>) {
        let dead: Vec<u64> = self
            .custom
            .keys()
            .filter(|id| !live.contains(id))
            .copied()
            .collect();
        for id in dead {
            if let Some(program) = self.custom.remove(&id) {
                let others = self.shared.iter().chain(self.custom.values());
                release_modules(shader_manager, &program, others);
            }
        }
    }

    /// Program to draw `compiled` with.
    pub fn get_mut(&mut self, compiled: &CompiledProgram) -> Option<&mut GpuProgram> {
        match compiled.key {
            ProgramKey::Custom(id) => self.custom.get_mut(&id),
            ProgramKey::Lights(_) => self.shared.as_mut(),
        }
    }

    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

fn release_modules<'a>(
    shader_manager: &mut ShaderManager,
    program: &GpuProgram,
    others: impl Iterator<Item = &'a GpuProgram>,
) {
    let still_used: FxHashSet<u128> = others
        .flat_map(|p| p.module_hashes.iter().copied())
        .collect();
    for hash in &program.module_hashes {
        if !still_used.contains(hash) {
            shader_manager.release(*hash);
        }
    }
}
