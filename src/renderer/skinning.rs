//! Skeletal deformation.
//!
//! The GPU path uploads a bone palette ([`pack_bone_matrices`]); the CPU
//! path ([`blended_vertex`]) reproduces the vertex stage's result so hit
//! tests agree with what is drawn.

use glam::{Mat4, Vec3};

use crate::errors::{PrismError, Result};
use crate::resources::geometry::{Geometry, Semantic};
use crate::resources::uniforms::SkinUniforms;
use crate::scene::{Scene, SceneNode, Skinner};

/// Per-bone `bone_world * inverse_bind`.
///
/// A bone whose node is gone contributes its inverse bind matrix alone.
#[must_use]
pub fn joint_matrices(scene: &Scene, skinner: &Skinner) -> Vec<Mat4> {
    skinner
        .bones()
        .iter()
        .zip(skinner.inverse_bind())
        .map(|(bone, inverse_bind)| {
            let world = scene.node(*bone).map_or_else(
                || {
                    log::warn!("Skinner references a removed bone node; using identity");
                    Mat4::IDENTITY
                },
                |n| Mat4::from(n.world_transform),
            );
            world * *inverse_bind
        })
        .collect()
}

/// Bone palette for `node`.
///
/// Rigid nodes (no skinner, or zero joints per vertex) get a single entry
/// holding their own world transform and `num_joints == 0`.
#[must_use]
pub fn pack_bone_matrices(scene: &Scene, node: &SceneNode) -> Box<SkinUniforms> {
    let mut skin = Box::<SkinUniforms>::default();
    match &node.skinner {
        Some(skinner) if skinner.num_skinning_joints() > 0 => {
            skin.num_joints = skinner.num_skinning_joints() as i32;
            for (bone, joint) in joint_matrices(scene, skinner).iter().enumerate() {
                skin.set_joint(bone, joint);
            }
        }
        _ => {
            skin.num_joints = 0;
            skin.set_joint(0, &Mat4::from(node.world_transform));
        }
    }
    skin
}

/// World position of `vertex` blended over its bone influences.
///
/// Weights are used as given; they are not renormalized.
pub fn blended_vertex(joints: &[Mat4], skinner: &Skinner, vertex: usize, rest: Vec3) -> Result<Vec3> {
    let mut out = Vec3::ZERO;
    for (bone, weight) in skinner.influences(vertex) {
        let joint = joints.get(bone).ok_or_else(|| {
            PrismError::config(format!(
                "vertex {vertex} references bone {bone} of {}",
                joints.len()
            ))
        })?;
        out += weight * joint.transform_point3(rest);
    }
    Ok(out)
}

/// World-space positions of every vertex of `geometry` as drawn on `node`.
pub fn world_positions(scene: &Scene, node: &SceneNode, geometry: &Geometry) -> Result<Vec<Vec3>> {
    let Some(source) = geometry.source(Semantic::Vertex) else {
        log::warn!("Geometry '{}' has no vertex source", geometry.name);
        return Ok(Vec::new());
    };
    let rest = (0..source.vector_count()).filter_map(|i| source.vec3_at(i));

    match &node.skinner {
        Some(skinner) if skinner.num_skinning_joints() > 0 => {
            let joints = joint_matrices(scene, skinner);
            rest.enumerate()
                .map(|(i, p)| blended_vertex(&joints, skinner, i, p))
                .collect()
        }
        _ => Ok(rest.map(|p| node.world_transform.transform_point3(p)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::geometry::GeometrySource;
    use glam::{Affine3A, Vec4};

    #[test]
    fn rigid_node_packs_world_transform() {
        let scene = Scene::new();
        let world = Affine3A::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let node = SceneNode::new().with_transform(world);
        let skin = pack_bone_matrices(&scene, &node);
        assert_eq!(skin.num_joints, 0);
        assert_eq!(skin.joint(0), Mat4::from(world));
    }

    #[test]
    fn zero_joint_skinner_is_rigid() {
        let scene = Scene::new();
        let skinner = Skinner::new(
            Vec::new(),
            Vec::new(),
            GeometrySource::from_vec4(Semantic::BoneIndices, &[]),
            GeometrySource::from_vec4(Semantic::BoneWeights, &[]),
            0,
        )
        .unwrap();
        let world = Affine3A::from_scale(Vec3::splat(2.0));
        let node = SceneNode::new().with_transform(world).with_skinner(skinner);
        let skin = pack_bone_matrices(&scene, &node);
        assert_eq!(skin.num_joints, 0);
        assert_eq!(skin.joint(0), Mat4::from(world));
    }

    #[test]
    fn blend_is_weighted_sum() {
        let mut scene = Scene::new();
        let b0 = scene.add_to_root(
            SceneNode::new().with_transform(Affine3A::from_translation(Vec3::X)),
        );
        let b1 = scene.add_to_root(
            SceneNode::new().with_transform(Affine3A::from_translation(Vec3::Y)),
        );
        let skinner = Skinner::new(
            vec![b0, b1],
            vec![Mat4::IDENTITY; 2],
            GeometrySource::from_vec4(Semantic::BoneIndices, &[Vec4::new(0.0, -1.0, 1.0, 0.0)]),
            GeometrySource::from_vec4(Semantic::BoneWeights, &[Vec4::new(0.5, 0.9, 0.5, 0.0)]),
            3,
        )
        .unwrap();
        let joints = joint_matrices(&scene, &skinner);
        let p = blended_vertex(&joints, &skinner, 0, Vec3::ZERO).unwrap();
        assert!((p - Vec3::new(0.5, 0.5, 0.0)).length() < 1e-5);
    }
}
