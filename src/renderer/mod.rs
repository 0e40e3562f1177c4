//! Rendering System
//!
//! [`Renderer`] is the single context object tying the pieces together.
//! Each frame runs in two halves:
//!
//! 1. **Prepare** (CPU only): resolve the camera, classify lights, get the
//!    specialized program and build a [`FramePlan`]
//!    ([`Renderer::prepare_frame`]).
//! 2. **Draw** (GPU): upload the plan and record the scene pass
//!    ([`Renderer::draw_frame`]).
//!
//! Queries ([`Renderer::hit_test`], [`Renderer::ray_test`],
//! [`Renderer::project_point`], frustum tests) only need the CPU half and
//! work before a GPU context is attached.
//!
//! # Submodules
//!
//! - [`settings`]: renderer configuration
//! - [`lights`]: light classification and packing
//! - [`render_list`]: draw ordering
//! - [`skinning`]: bone palettes and CPU skinning
//! - [`pipeline`]: shader generation, compilation and the variant cache
//! - [`frame`]: per-frame CPU plan
//! - [`core`]: wgpu state and draw submission

pub mod core;
pub mod frame;
pub mod lights;
pub mod pipeline;
pub mod render_list;
pub mod settings;
pub mod skinning;

use glam::{Affine3A, Quat, Vec2, Vec3};

use crate::errors::{PrismError, Result};
use crate::hit_test::{HitTestOptions, HitTestResult, Ray, hit_test_scene};
use crate::scene::{Camera, NodeKey, Scene, Viewport};

pub use self::core::{DrawTarget, GpuContext, GpuState};
pub use self::frame::{DrawItem, FramePlan, ResolvedCamera, build_frame_plan};
pub use self::lights::{LightBlock, LightBuckets, LightClassifier, LightCounts};
pub use self::pipeline::{CompiledProgram, ShaderSpecializer};
pub use self::settings::RendererSettings;

/// Camera used when the scene has none.
#[derive(Debug, Clone)]
struct DefaultCamera {
    camera: Camera,
    world_transform: Affine3A,
    target: Vec3,
}

impl DefaultCamera {
    fn new(distance: f32) -> Self {
        Self {
            camera: Camera::default(),
            world_transform: Affine3A::from_translation(Vec3::new(0.0, 0.0, distance)),
            target: Vec3::ZERO,
        }
    }
}

pub struct Renderer {
    settings: RendererSettings,
    scene: Option<Scene>,

    // === Per-frame state ===
    classifier: LightClassifier,
    specializer: ShaderSpecializer,
    viewport: Viewport,

    // === Point of view ===
    point_of_view: Option<NodeKey>,
    default_camera: DefaultCamera,
    using_default_camera: bool,

    // === Time ===
    scene_time: f64,
    pub is_playing: bool,

    gpu: Option<GpuState>,
}

impl Renderer {
    /// Creates a renderer without a GPU context.
    ///
    /// Fails only if the embedded shader templates cannot be loaded.
    pub fn new(settings: RendererSettings) -> Result<Self> {
        Ok(Self {
            default_camera: DefaultCamera::new(settings.default_camera_distance),
            settings,
            scene: None,
            classifier: LightClassifier::new(),
            specializer: ShaderSpecializer::new()?,
            viewport: Viewport::new(1.0, 1.0),
            point_of_view: None,
            using_default_camera: false,
            scene_time: 0.0,
            is_playing: false,
            gpu: None,
        })
    }

    /// Requests a headless device and attaches it.
    pub async fn init(&mut self, color_format: wgpu::TextureFormat) -> Result<()> {
        let ctx = GpuContext::new_headless(&self.settings, color_format).await?;
        self.attach_context(ctx);
        Ok(())
    }

    /// Attaches a context created by the view layer.
    pub fn attach_context(&mut self, ctx: GpuContext) {
        self.gpu = Some(GpuState::new(ctx, &self.settings));
    }

    #[must_use]
    pub fn gpu(&self) -> Option<&GpuState> {
        self.gpu.as_ref()
    }

    // ========================================================================
    // Scene & settings
    // ========================================================================

    /// Replaces the scene. The point of view is reset.
    pub fn set_scene(&mut self, scene: Scene) {
        self.scene = Some(scene);
        self.point_of_view = None;
        self.using_default_camera = false;
    }

    #[must_use]
    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }

    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RendererSettings {
        &mut self.settings
    }

    #[must_use]
    pub fn specializer(&self) -> &ShaderSpecializer {
        &self.specializer
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    // ========================================================================
    // Point of view
    // ========================================================================

    /// The camera node frames are drawn from; `None` while the default
    /// camera is in use or no camera has been resolved yet.
    #[must_use]
    pub fn point_of_view(&self) -> Option<NodeKey> {
        if self.using_default_camera {
            None
        } else {
            self.point_of_view
        }
    }

    pub fn set_point_of_view(&mut self, node: Option<NodeKey>) {
        self.point_of_view = node;
        self.using_default_camera = false;
    }

    /// Draws from the default camera, placed to look at its target with the
    /// current point of view's orientation.
    pub fn switch_to_default_camera(&mut self) {
        let rotation = self
            .point_of_view
            .and_then(|key| self.scene.as_ref()?.node(key))
            .map_or(Quat::IDENTITY, |node| {
                let (_, rotation, _) = node.world_transform.to_scale_rotation_translation();
                rotation
            });
        let forward = rotation * Vec3::NEG_Z;
        let position = self.default_camera.target - forward * self.settings.default_camera_distance;
        self.default_camera.world_transform =
            Affine3A::from_rotation_translation(rotation, position);
        self.using_default_camera = true;
    }

    /// Camera for this frame; remembers the first camera node found when no
    /// point of view is set.
    pub fn resolve_camera(&mut self, viewport: Viewport) -> ResolvedCamera {
        if !self.using_default_camera
            && let Some(scene) = self.scene.as_mut()
        {
            if self.point_of_view.is_none() {
                self.point_of_view = scene.find_first(|node| node.camera.is_some());
            }
            if let Some(key) = self.point_of_view
                && let Some(resolved) = resolve_node_camera(scene, key, viewport)
            {
                return resolved;
            }
        }

        let default = &mut self.default_camera;
        ResolvedCamera {
            node: None,
            world_transform: default.world_transform,
            view: Camera::view_matrix(&default.world_transform),
            projection: default.camera.projection_matrix(viewport),
            viewport,
        }
    }

    // ========================================================================
    // Frames
    // ========================================================================

    /// CPU half of a frame. `Ok(None)` when no scene is attached.
    pub fn prepare_frame(&mut self, viewport: Viewport) -> Result<Option<FramePlan>> {
        if self.scene.is_none() {
            log::error!("{}", PrismError::MissingContext("no scene attached"));
            return Ok(None);
        }
        self.viewport = viewport;
        let camera = self.resolve_camera(viewport);

        let Some(scene) = self.scene.as_ref() else {
            return Ok(None);
        };
        let buckets = self.classifier.classify(scene, &self.settings);
        let lights_changed = self.classifier.counts_changed(buckets.counts());

        build_frame_plan(
            scene,
            camera,
            &buckets,
            lights_changed,
            &mut self.specializer,
            self.scene_time,
        )
        .map(Some)
    }

    /// Prepares and draws a frame into `target`.
    ///
    /// Without a GPU context or scene this logs an error and does nothing.
    pub fn draw_frame(&mut self, viewport: Viewport, target: &DrawTarget) -> Result<()> {
        if self.gpu.is_none() {
            log::error!("{}", PrismError::MissingContext("no GPU context attached"));
            return Ok(());
        }
        let Some(plan) = self.prepare_frame(viewport)? else {
            return Ok(());
        };
        let (Some(gpu), Some(scene)) = (self.gpu.as_mut(), self.scene.as_ref()) else {
            return Ok(());
        };
        gpu.apply_settings(&self.settings);
        gpu.draw(scene, &plan, target)
    }

    /// Sets the scene time and draws.
    pub fn render_at_time(
        &mut self,
        time: f64,
        viewport: Viewport,
        target: &DrawTarget,
    ) -> Result<()> {
        self.scene_time = time;
        self.draw_frame(viewport, target)
    }

    #[must_use]
    pub fn scene_time(&self) -> f64 {
        self.scene_time
    }

    pub fn set_scene_time(&mut self, time: f64) {
        self.scene_time = time;
    }

    /// When the view should request the next frame: now while playing,
    /// never while idle.
    #[must_use]
    pub fn next_frame_time(&self) -> f64 {
        if self.is_playing {
            self.scene_time
        } else {
            f64::INFINITY
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// World point to `(pixel x, pixel y, depth)` through the current camera.
    pub fn project_point(&mut self, world: Vec3) -> Vec3 {
        self.resolve_camera(self.viewport).project(world)
    }

    /// Inverse of [`project_point`](Self::project_point).
    pub fn unproject_point(&mut self, screen: Vec3) -> Vec3 {
        self.resolve_camera(self.viewport).unproject(screen)
    }

    /// Hit test along the ray under a viewport point.
    pub fn hit_test(&mut self, point: Vec2, options: &HitTestOptions) -> Result<Vec<HitTestResult>> {
        if self.scene.is_none() {
            log::error!("{}", PrismError::MissingContext("no scene attached"));
            return Ok(Vec::new());
        }
        let camera = self.resolve_camera(self.viewport);
        let near = camera.unproject(point.extend(0.0));
        let far = camera.unproject(point.extend(1.0));
        let Some(scene) = self.scene.as_ref() else {
            return Ok(Vec::new());
        };
        hit_test_scene(scene, &Ray::between(near, far), f32::INFINITY, options)
    }

    /// Hit test along the segment `origin..destination`.
    pub fn ray_test(
        &self,
        origin: Vec3,
        destination: Vec3,
        options: &HitTestOptions,
    ) -> Result<Vec<HitTestResult>> {
        let Some(scene) = self.scene.as_ref() else {
            log::error!("{}", PrismError::MissingContext("no scene attached"));
            return Ok(Vec::new());
        };
        hit_test_scene(scene, &Ray::between(origin, destination), 1.0, options)
    }

    /// Whether `node`'s bounds intersect the frustum of `point_of_view`.
    ///
    /// Nodes without geometry are tested as a point at their origin.
    pub fn is_node_inside_frustum(&mut self, node: NodeKey, point_of_view: NodeKey) -> bool {
        let viewport = self.viewport;
        let Some(scene) = self.scene.as_mut() else {
            return false;
        };
        let Some(camera) = resolve_node_camera(scene, point_of_view, viewport) else {
            return false;
        };
        let frustum = camera.frustum();
        scene
            .node(node)
            .is_some_and(|n| node_intersects(&frustum, n))
    }

    /// Geometry nodes whose bounds intersect the frustum of `point_of_view`.
    pub fn nodes_inside_frustum(&mut self, point_of_view: NodeKey) -> Vec<NodeKey> {
        let viewport = self.viewport;
        let Some(scene) = self.scene.as_mut() else {
            return Vec::new();
        };
        let Some(camera) = resolve_node_camera(scene, point_of_view, viewport) else {
            return Vec::new();
        };
        let frustum = camera.frustum();
        render_list::build_draw_list(scene)
            .into_iter()
            .filter(|key| scene.node(*key).is_some_and(|n| node_intersects(&frustum, n)))
            .collect()
    }
}

fn resolve_node_camera(scene: &mut Scene, key: NodeKey, viewport: Viewport) -> Option<ResolvedCamera> {
    let node = scene.node_mut(key)?;
    let world_transform = node.world_transform;
    let camera = node.camera.as_mut()?;
    Some(ResolvedCamera {
        node: Some(key),
        world_transform,
        view: Camera::view_matrix(&world_transform),
        projection: camera.projection_matrix(viewport),
        viewport,
    })
}

fn node_intersects(frustum: &crate::scene::Frustum, node: &crate::scene::SceneNode) -> bool {
    match node.geometry.as_ref().and_then(|g| g.bounding_sphere()) {
        Some(sphere) => {
            let world = sphere.transform(&node.world_transform);
            frustum.intersects_sphere(world.center, world.radius)
        }
        None => frustum.intersects_sphere(node.world_transform.translation.into(), 0.0),
    }
}
