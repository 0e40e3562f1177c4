use std::sync::Arc;

use glam::Affine3A;

use crate::resources::geometry::Geometry;
use crate::scene::NodeKey;
use crate::scene::camera::Camera;
use crate::scene::light::Light;
use crate::scene::skinner::Skinner;

/// A node of the presentation tree.
///
/// Transforms are already resolved to world space by whoever owns the
/// authoring graph; the renderer only reads them. Attachments are optional:
/// a node without geometry is a pass-through container.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,

    // === Hierarchy ===
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,

    // === Spatial ===
    pub world_transform: Affine3A,

    // === Attachments ===
    pub geometry: Option<Arc<Geometry>>,
    pub light: Option<Light>,
    pub camera: Option<Camera>,
    pub skinner: Option<Skinner>,

    // === Drawing & queries ===
    /// Explicit draw-order override; lower values draw first.
    pub rendering_order: i32,
    /// Matched against hit-test category masks.
    pub category_bit_mask: u32,
    pub hidden: bool,
}

impl Default for SceneNode {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneNode {
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: String::new(),
            parent: None,
            children: Vec::new(),
            world_transform: Affine3A::IDENTITY,
            geometry: None,
            light: None,
            camera: None,
            skinner: None,
            rendering_order: 0,
            category_bit_mask: 1,
            hidden: false,
        }
    }

    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::new()
        }
    }

    #[must_use]
    pub fn with_transform(mut self, world_transform: Affine3A) -> Self {
        self.world_transform = world_transform;
        self
    }

    #[must_use]
    pub fn with_geometry(mut self, geometry: Arc<Geometry>) -> Self {
        self.geometry = Some(geometry);
        self
    }

    #[must_use]
    pub fn with_light(mut self, light: Light) -> Self {
        self.light = Some(light);
        self
    }

    #[must_use]
    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = Some(camera);
        self
    }

    #[must_use]
    pub fn with_skinner(mut self, skinner: Skinner) -> Self {
        self.skinner = Some(skinner);
        self
    }

    #[must_use]
    pub fn with_rendering_order(mut self, order: i32) -> Self {
        self.rendering_order = order;
        self
    }

    #[must_use]
    pub fn with_category_bit_mask(mut self, mask: u32) -> Self {
        self.category_bit_mask = mask;
        self
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }
}
