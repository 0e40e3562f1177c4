//! CPU half of the frame draw loop.
//!
//! [`build_frame_plan`] turns the scene into everything the GPU half needs:
//! camera uniforms, the light block, the program to use, and one
//! [`DrawItem`] per visible geometry node with its bone palette and
//! per-element material blocks. No GPU object is touched here.

use std::sync::Arc;

use glam::{Affine3A, Mat4, Vec3};
use smallvec::SmallVec;

use crate::errors::{PrismError, Result};
use crate::renderer::lights::{LightBlock, LightBuckets, LightCounts};
use crate::renderer::pipeline::{CompiledProgram, ShaderSpecializer};
use crate::renderer::render_list::build_draw_list;
use crate::renderer::skinning::pack_bone_matrices;
use crate::resources::geometry::Geometry;
use crate::resources::uniforms::{GlobalUniforms, MaterialUniforms, SkinUniforms};
use crate::scene::{Frustum, NodeKey, Scene, Viewport};

/// Camera state resolved for one frame.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedCamera {
    /// `None` when the renderer's own default camera is used.
    pub node: Option<NodeKey>,
    pub world_transform: Affine3A,
    pub view: Mat4,
    pub projection: Mat4,
    pub viewport: Viewport,
}

impl ResolvedCamera {
    #[inline]
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.world_transform.translation.into()
    }

    #[must_use]
    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(self.view_projection())
    }

    /// World point to `(pixel x, pixel y, depth)`; y grows downwards.
    #[must_use]
    pub fn project(&self, world: Vec3) -> Vec3 {
        let ndc = self.view_projection().project_point3(world);
        let vp = self.viewport;
        Vec3::new(
            vp.x + (ndc.x + 1.0) * 0.5 * vp.width,
            vp.y + (1.0 - ndc.y) * 0.5 * vp.height,
            ndc.z,
        )
    }

    /// Inverse of [`project`](Self::project).
    #[must_use]
    pub fn unproject(&self, screen: Vec3) -> Vec3 {
        let vp = self.viewport;
        let ndc = Vec3::new(
            (screen.x - vp.x) / vp.width * 2.0 - 1.0,
            1.0 - (screen.y - vp.y) / vp.height * 2.0,
            screen.z,
        );
        self.view_projection().inverse().project_point3(ndc)
    }

    #[must_use]
    pub fn global_uniforms(&self, scene_time: f64) -> GlobalUniforms {
        GlobalUniforms {
            view: self.view,
            view_projection: self.view_projection(),
            camera_position: self.position(),
            scene_time: scene_time as f32,
        }
    }
}

/// Draw parameters of one geometry element.
#[derive(Debug, Clone, Copy)]
pub struct ElementDraw {
    pub element_index: usize,
    pub material: MaterialUniforms,
}

/// One geometry node to draw.
#[derive(Debug)]
pub struct DrawItem {
    pub node: NodeKey,
    pub geometry: Arc<Geometry>,
    pub program: Arc<CompiledProgram>,
    pub skin: Box<SkinUniforms>,
    pub elements: SmallVec<[ElementDraw; 4]>,
}

/// Everything needed to submit one frame.
#[derive(Debug)]
pub struct FramePlan {
    pub camera: ResolvedCamera,
    pub globals: GlobalUniforms,
    pub light_counts: LightCounts,
    /// Light counts differ from the previous frame's.
    pub lights_changed: bool,
    pub light_block: LightBlock,
    pub program: Arc<CompiledProgram>,
    pub items: Vec<DrawItem>,
}

/// Builds the frame plan for `scene`.
///
/// Fails on shader compile/link errors and on geometries with no elements;
/// nothing is drawn for a failed frame.
pub fn build_frame_plan(
    scene: &Scene,
    camera: ResolvedCamera,
    buckets: &LightBuckets,
    lights_changed: bool,
    specializer: &mut ShaderSpecializer,
    scene_time: f64,
) -> Result<FramePlan> {
    let light_counts = buckets.counts();
    if lights_changed {
        log::debug!("Light counts changed: {light_counts:?}");
    }
    let program = specializer.get_program(light_counts)?;

    let mut items = Vec::new();
    for key in build_draw_list(scene) {
        let Some(node) = scene.node(key) else {
            continue;
        };
        if node.hidden {
            continue;
        }
        let Some(geometry) = &node.geometry else {
            continue;
        };
        if geometry.elements().is_empty() {
            return Err(PrismError::config(format!(
                "geometry '{}' on node '{}' has no elements",
                geometry.name, node.name
            )));
        }

        let item_program = match &geometry.program {
            Some(custom) => specializer.get_custom_program(custom)?,
            None => program.clone(),
        };

        let elements = geometry
            .materials()
            .iter()
            .enumerate()
            .map(|(element_index, material)| ElementDraw {
                element_index,
                material: material.uniforms(),
            })
            .collect();

        items.push(DrawItem {
            node: key,
            geometry: geometry.clone(),
            program: item_program,
            skin: pack_bone_matrices(scene, node),
            elements,
        });
    }

    Ok(FramePlan {
        globals: camera.global_uniforms(scene_time),
        camera,
        light_counts,
        lights_changed,
        light_block: buckets.pack(),
        program,
        items,
    })
}
