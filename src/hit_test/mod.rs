//! Ray queries against world-space triangle data.
//!
//! Rays come from a screen point (through the inverse view-projection) or
//! from explicit world endpoints. Skinned nodes are tested against their
//! blended vertex positions so results match what is drawn. No occlusion is
//! performed: every accepted triangle of every candidate node is reported
//! unless the search mode says otherwise.

mod engine;
mod ray;

use glam::{Affine3A, Vec3};

use crate::scene::NodeKey;

pub use engine::{hit_test_node, hit_test_scene};
pub use ray::{Ray, TriangleHit};

/// How many results a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Every accepted triangle, in draw-list order.
    #[default]
    All,
    /// The first accepted triangle.
    Any,
    /// The triangle nearest the ray origin.
    Closest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitTestOptions {
    /// Reject triangles facing away from the ray.
    pub backface_culling: bool,
    /// Nodes whose `category_bit_mask` shares no bit with this are skipped.
    pub category_bit_mask: u32,
    pub search_mode: SearchMode,
    pub ignore_hidden_nodes: bool,
}

impl Default for HitTestOptions {
    fn default() -> Self {
        Self {
            backface_culling: true,
            category_bit_mask: u32::MAX,
            search_mode: SearchMode::All,
            ignore_hidden_nodes: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HitTestResult {
    pub node: NodeKey,
    /// Index of the geometry element that was hit.
    pub geometry_index: usize,
    /// Triangle index within that element.
    pub face_index: usize,
    pub world_coordinates: Vec3,
    pub local_coordinates: Vec3,
    /// Unit normal from the triangle's winding.
    pub world_normal: Vec3,
    /// `world_normal` through the inverse model transform; not renormalized,
    /// so only exact for transforms without non-uniform scale.
    pub local_normal: Vec3,
    pub model_transform: Affine3A,
    /// Bone the hit is attributed to. Not computed; always `None`.
    pub bone_node: Option<NodeKey>,
}
