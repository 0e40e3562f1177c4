use glam::Mat4;

use crate::errors::{PrismError, Result};
use crate::resources::geometry::GeometrySource;
use crate::resources::uniforms::MAX_BONES;
use crate::scene::NodeKey;

/// Upper bound on weights per vertex.
pub const MAX_SKINNING_JOINTS: usize = 4;

/// Skeletal deformation data for one node.
///
/// Bones are keys into the owning scene; `inverse_bind[i]` pairs with
/// `bones[i]`. Bone index slots holding a negative value are unused.
#[derive(Debug, Clone)]
pub struct Skinner {
    bones: Vec<NodeKey>,
    inverse_bind: Vec<Mat4>,
    bone_indices: GeometrySource,
    bone_weights: GeometrySource,
    num_skinning_joints: usize,
}

impl Skinner {
    pub fn new(
        bones: Vec<NodeKey>,
        inverse_bind: Vec<Mat4>,
        bone_indices: GeometrySource,
        bone_weights: GeometrySource,
        num_skinning_joints: usize,
    ) -> Result<Self> {
        if bones.len() != inverse_bind.len() {
            return Err(PrismError::config(format!(
                "skinner has {} bones but {} inverse bind matrices",
                bones.len(),
                inverse_bind.len()
            )));
        }
        if bones.len() > MAX_BONES {
            return Err(PrismError::config(format!(
                "skinner has {} bones (limit {MAX_BONES})",
                bones.len()
            )));
        }
        if num_skinning_joints > MAX_SKINNING_JOINTS {
            return Err(PrismError::config(format!(
                "{num_skinning_joints} joints per vertex (limit {MAX_SKINNING_JOINTS})"
            )));
        }
        if bone_indices.vector_count() != bone_weights.vector_count()
            || bone_indices.components_per_vector() != bone_weights.components_per_vector()
        {
            return Err(PrismError::config(
                "bone index and bone weight sources differ in layout",
            ));
        }
        if num_skinning_joints > bone_indices.components_per_vector() {
            return Err(PrismError::config(format!(
                "{num_skinning_joints} joints per vertex but bone sources carry {}",
                bone_indices.components_per_vector()
            )));
        }
        Ok(Self {
            bones,
            inverse_bind,
            bone_indices,
            bone_weights,
            num_skinning_joints,
        })
    }

    #[inline]
    #[must_use]
    pub fn bones(&self) -> &[NodeKey] {
        &self.bones
    }

    #[inline]
    #[must_use]
    pub fn inverse_bind(&self) -> &[Mat4] {
        &self.inverse_bind
    }

    #[inline]
    #[must_use]
    pub fn bone_indices(&self) -> &GeometrySource {
        &self.bone_indices
    }

    #[inline]
    #[must_use]
    pub fn bone_weights(&self) -> &GeometrySource {
        &self.bone_weights
    }

    #[inline]
    #[must_use]
    pub fn num_skinning_joints(&self) -> usize {
        self.num_skinning_joints
    }

    /// `(bone, weight)` pairs influencing `vertex`, skipping unused slots.
    pub fn influences(&self, vertex: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        let indices = self.bone_indices.vector_at_or(vertex, [-1.0; 4]);
        let weights = self.bone_weights.vector_at(vertex);
        let slots = self.num_skinning_joints;
        indices
            .zip(weights)
            .into_iter()
            .flat_map(move |(indices, weights)| {
                (0..slots).filter_map(move |slot| {
                    let bone = indices[slot];
                    (bone >= 0.0).then_some((bone as usize, weights[slot]))
                })
            })
    }
}
