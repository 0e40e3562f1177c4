//! GPU half of the frame draw loop.
//!
//! [`GpuState::draw`] uploads a [`FramePlan`] and records one render pass:
//! clear, then every draw item's elements in plan order.

use rustc_hash::{FxHashMap, FxHashSet};
use wgpu::util::DeviceExt;

use crate::errors::Result;
use crate::renderer::core::context::GpuContext;
use crate::renderer::core::geometry_state::{GeometryCache, GeometryKey};
use crate::renderer::core::layouts::BindGroupLayouts;
use crate::renderer::core::program::{GpuPrograms, PipelineTargets};
use crate::renderer::core::texture::FallbackTexture;
use crate::renderer::frame::FramePlan;
use crate::renderer::pipeline::{ProgramKey, ShaderManager};
use crate::renderer::settings::RendererSettings;
use crate::resources::uniforms::{GlobalUniforms, SkinUniforms};
use crate::scene::{NodeKey, Scene};

/// Render target handed to [`GpuState::draw`].
pub struct DrawTarget<'a> {
    pub view: &'a wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

struct SkinBinding {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Frame-scoped buffers: globals, lights, bone palettes and depth.
struct FrameResources {
    globals: wgpu::Buffer,
    lights: wgpu::Buffer,
    lights_size: u64,
    bind_group: wgpu::BindGroup,
    skins: FxHashMap<NodeKey, SkinBinding>,
    depth: Option<(u32, u32, wgpu::TextureView)>,
}

impl FrameResources {
    fn new(device: &wgpu::Device, layouts: &BindGroupLayouts) -> Self {
        let globals = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Global Uniforms"),
            size: std::mem::size_of::<GlobalUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let lights_size = 16;
        let lights = Self::create_lights_buffer(device, lights_size);
        let bind_group = Self::create_bind_group(device, layouts, &globals, &lights);
        Self {
            globals,
            lights,
            lights_size,
            bind_group,
            skins: FxHashMap::default(),
            depth: None,
        }
    }

    fn create_lights_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Light Uniforms"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layouts: &BindGroupLayouts,
        globals: &wgpu::Buffer,
        lights: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &layouts.frame,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lights.as_entire_binding(),
                },
            ],
        })
    }

    fn upload(&mut self, ctx: &GpuContext, layouts: &BindGroupLayouts, plan: &FramePlan) {
        ctx.queue
            .write_buffer(&self.globals, 0, bytemuck::bytes_of(&plan.globals));

        // The block's size is fixed by the light counts; the buffer follows it.
        let light_bytes = plan.light_block.to_bytes();
        let size = light_bytes.len() as u64;
        if size != self.lights_size {
            self.lights = Self::create_lights_buffer(&ctx.device, size);
            self.lights_size = size;
            self.bind_group =
                Self::create_bind_group(&ctx.device, layouts, &self.globals, &self.lights);
        }
        ctx.queue.write_buffer(&self.lights, 0, &light_bytes);

        let live: FxHashSet<NodeKey> = plan.items.iter().map(|item| item.node).collect();
        self.skins.retain(|node, _| live.contains(node));

        for item in &plan.items {
            match self.skins.get(&item.node) {
                Some(binding) => {
                    ctx.queue
                        .write_buffer(&binding.buffer, 0, bytemuck::bytes_of(&*item.skin));
                }
                None => {
                    let binding = create_skin_binding(&ctx.device, layouts, &item.skin);
                    self.skins.insert(item.node, binding);
                }
            }
        }
    }

    fn depth_view(&mut self, ctx: &GpuContext, width: u32, height: u32) -> &wgpu::TextureView {
        let stale = !matches!(&self.depth, Some((w, h, _)) if *w == width && *h == height);
        if stale {
            self.depth = None;
        }
        let (_, _, view) = self
            .depth
            .get_or_insert_with(|| (width, height, ctx.create_depth_texture(width, height)));
        view
    }
}

fn create_skin_binding(
    device: &wgpu::Device,
    layouts: &BindGroupLayouts,
    skin: &SkinUniforms,
) -> SkinBinding {
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Skin Uniforms"),
        contents: bytemuck::bytes_of(skin),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Skin Bind Group"),
        layout: &layouts.skin,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    });
    SkinBinding { buffer, bind_group }
}

/// Everything the renderer keeps on the GPU.
pub struct GpuState {
    pub ctx: GpuContext,
    layouts: BindGroupLayouts,
    fallback: FallbackTexture,
    shader_manager: ShaderManager,
    programs: GpuPrograms,
    geometries: GeometryCache,
    frame: FrameResources,
    cull_mode: Option<wgpu::Face>,
}

impl GpuState {
    #[must_use]
    pub fn new(ctx: GpuContext, settings: &RendererSettings) -> Self {
        let layouts = BindGroupLayouts::new(&ctx.device);
        let fallback = FallbackTexture::new(&ctx.device, &ctx.queue);
        let frame = FrameResources::new(&ctx.device, &layouts);
        Self {
            ctx,
            layouts,
            fallback,
            shader_manager: ShaderManager::new(),
            programs: GpuPrograms::default(),
            geometries: GeometryCache::default(),
            frame,
            cull_mode: settings.cull_mode(),
        }
    }

    pub fn apply_settings(&mut self, settings: &RendererSettings) {
        self.ctx.clear_color = settings.clear_color;
        self.cull_mode = settings.cull_mode();
    }

    /// Uploads `plan` and draws it into `target`.
    pub fn draw(&mut self, scene: &Scene, plan: &FramePlan, target: &DrawTarget) -> Result<()> {
        let device = &self.ctx.device;

        if self
            .programs
            .ensure_shared(device, &mut self.shader_manager, &plan.program)
        {
            log::debug!("Shared program replaced; material bindings will be rebuilt");
        }

        let mut live_geometry = FxHashSet::default();
        let mut live_custom = FxHashSet::default();
        let mut geometry_keys: Vec<GeometryKey> = Vec::with_capacity(plan.items.len());
        for item in &plan.items {
            if let ProgramKey::Custom(id) = item.program.key {
                self.programs
                    .ensure_custom(device, &mut self.shader_manager, &item.program);
                live_custom.insert(id);
            }
            let skin = scene
                .node(item.node)
                .and_then(|node| node.skinner.as_ref())
                .filter(|skinner| skinner.num_skinning_joints() > 0)
                .map(|skinner| (item.node, skinner));
            let key = self.geometries.ensure(
                device,
                &self.layouts,
                &self.fallback,
                &item.geometry,
                skin,
                self.programs.generation(),
            )?;
            live_geometry.insert(key);
            geometry_keys.push(key);
        }
        self.geometries.retain(&live_geometry);
        self.programs
            .retain_custom(&mut self.shader_manager, &live_custom);

        self.frame.upload(&self.ctx, &self.layouts, plan);

        let targets = PipelineTargets {
            color_format: self.ctx.color_format,
            depth_format: self.ctx.depth_format,
            cull_mode: self.cull_mode,
        };

        // Pipelines are created before the pass borrows them.
        for (item, key) in plan.items.iter().zip(&geometry_keys) {
            let (Some(program), Some(gpu_geometry)) = (
                self.programs.get_mut(&item.program),
                self.geometries.get(key),
            ) else {
                continue;
            };
            for element in &gpu_geometry.elements {
                program.pipeline(
                    &self.ctx.device,
                    &self.layouts,
                    targets,
                    element.topology,
                    element.index_format,
                );
            }
        }

        let depth_view = self.frame.depth_view(&self.ctx, target.width, target.height).clone();
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let vp = plan.camera.viewport;
            let x = vp.x.clamp(0.0, target.width as f32);
            let y = vp.y.clamp(0.0, target.height as f32);
            pass.set_viewport(
                x,
                y,
                vp.width.min(target.width as f32 - x).max(1.0),
                vp.height.min(target.height as f32 - y).max(1.0),
                0.0,
                1.0,
            );
            pass.set_bind_group(0, &self.frame.bind_group, &[]);

            for (item, key) in plan.items.iter().zip(&geometry_keys) {
                let (Some(gpu_geometry), Some(skin)) =
                    (self.geometries.get(key), self.frame.skins.get(&item.node))
                else {
                    continue;
                };
                let Some(program) = self.programs.get_mut(&item.program) else {
                    continue;
                };

                pass.set_bind_group(2, &skin.bind_group, &[]);
                pass.set_vertex_buffer(0, gpu_geometry.vertex_buffer.slice(..));

                for draw in &item.elements {
                    let Some(element) = gpu_geometry.elements.get(draw.element_index) else {
                        continue;
                    };
                    if element.index_count == 0 {
                        continue;
                    }
                    let pipeline = program.pipeline(
                        &self.ctx.device,
                        &self.layouts,
                        targets,
                        element.topology,
                        element.index_format,
                    );
                    pass.set_pipeline(pipeline);
                    self.ctx.queue.write_buffer(
                        &element.material_buffer,
                        0,
                        bytemuck::bytes_of(&draw.material),
                    );
                    pass.set_bind_group(1, &element.material_bind_group, &[]);
                    pass.set_index_buffer(element.index_buffer.slice(..), element.index_format);
                    pass.draw_indexed(0..element.index_count, 0, 0..1);
                }
            }
        }

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    #[must_use]
    pub fn cached_geometry_count(&self) -> usize {
        self.geometries.len()
    }

    #[must_use]
    pub fn shader_module_count(&self) -> usize {
        self.shader_manager.module_count()
    }
}
