//! Skinning Tests
//!
//! Tests for:
//! - Bone palette packing for rigid and skinned nodes
//! - CPU blending against bind-pose-corrected bone transforms
//! - Skinner validation

use glam::{Affine3A, Mat4, Vec3, Vec4};

use prism::errors::PrismError;
use prism::renderer::skinning::{joint_matrices, pack_bone_matrices, world_positions};
use prism::resources::{Geometry, GeometryElement, GeometrySource, Material, PrimitiveType, Semantic};
use prism::scene::{Scene, SceneNode, Skinner};

const EPSILON: f32 = 1e-4;

fn approx_vec(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

fn bone_sources(indices: &[Vec4], weights: &[Vec4]) -> (GeometrySource, GeometrySource) {
    (
        GeometrySource::from_vec4(Semantic::BoneIndices, indices),
        GeometrySource::from_vec4(Semantic::BoneWeights, weights),
    )
}

#[test]
fn rigid_node_uploads_its_world_transform() {
    let scene = Scene::new();
    let world = Affine3A::from_translation(Vec3::new(0.0, 5.0, 0.0));
    let skin = pack_bone_matrices(&scene, &SceneNode::new().with_transform(world));
    assert_eq!(skin.num_joints, 0);
    assert_eq!(skin.joint(0), Mat4::from(world));
}

#[test]
fn palette_holds_bone_world_times_inverse_bind() {
    let mut scene = Scene::new();
    let bone = scene.add_to_root(
        SceneNode::named("bone").with_transform(Affine3A::from_translation(Vec3::new(0.0, 2.0, 0.0))),
    );
    let inverse_bind = Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0));
    let (indices, weights) = bone_sources(&[Vec4::ZERO], &[Vec4::X]);
    let skinner = Skinner::new(vec![bone], vec![inverse_bind], indices, weights, 1).unwrap();

    let joints = joint_matrices(&scene, &skinner);
    assert_eq!(joints.len(), 1);
    assert!(approx_vec(
        joints[0].transform_point3(Vec3::ZERO),
        Vec3::new(0.0, 1.0, 0.0)
    ));

    let node = SceneNode::new().with_skinner(skinner);
    let skin = pack_bone_matrices(&scene, &node);
    assert_eq!(skin.num_joints, 1);
    assert_eq!(skin.joint(0), joints[0]);
}

#[test]
fn blended_positions_follow_bones() {
    let mut scene = Scene::new();
    let left = scene.add_to_root(
        SceneNode::named("left").with_transform(Affine3A::from_translation(Vec3::new(-2.0, 0.0, 0.0))),
    );
    let right = scene.add_to_root(
        SceneNode::named("right").with_transform(Affine3A::from_translation(Vec3::new(2.0, 0.0, 0.0))),
    );
    let (indices, weights) = bone_sources(
        &[
            Vec4::new(0.0, -1.0, 0.0, 0.0),
            Vec4::new(0.0, 1.0, 0.0, 0.0),
            Vec4::new(1.0, -1.0, 0.0, 0.0),
        ],
        &[
            Vec4::new(1.0, 0.7, 0.0, 0.0),
            Vec4::new(0.5, 0.5, 0.0, 0.0),
            Vec4::new(1.0, 0.0, 0.0, 0.0),
        ],
    );
    let skinner = Skinner::new(
        vec![left, right],
        vec![Mat4::IDENTITY; 2],
        indices,
        weights,
        2,
    )
    .unwrap();
    let geometry = Geometry::with_element(
        vec![GeometrySource::from_vec3(Semantic::Vertex, &[Vec3::ZERO, Vec3::Y, Vec3::Z])],
        GeometryElement::from_u8(&[0, 1, 2], PrimitiveType::Triangles),
        Material::default(),
    );
    // The node transform is ignored for skinned vertices.
    let node = SceneNode::new()
        .with_skinner(skinner)
        .with_transform(Affine3A::from_translation(Vec3::splat(100.0)));

    let positions = world_positions(&scene, &node, &geometry).unwrap();
    // Negative slot skipped without consuming its weight.
    assert!(approx_vec(positions[0], Vec3::new(-2.0, 0.0, 0.0)));
    assert!(approx_vec(positions[1], Vec3::new(0.0, 1.0, 0.0)));
    assert!(approx_vec(positions[2], Vec3::new(2.0, 0.0, 1.0)));
}

#[test]
fn mismatched_bone_sources_are_rejected() {
    let mut scene = Scene::new();
    let bone = scene.add_to_root(SceneNode::new());
    let indices = GeometrySource::from_vec4(Semantic::BoneIndices, &[Vec4::ZERO, Vec4::ZERO]);
    let weights = GeometrySource::from_vec4(Semantic::BoneWeights, &[Vec4::X]);
    assert!(matches!(
        Skinner::new(vec![bone], vec![Mat4::IDENTITY], indices, weights, 1),
        Err(PrismError::Configuration(_))
    ));
}

#[test]
fn too_many_joints_per_vertex_is_rejected() {
    let (indices, weights) = bone_sources(&[Vec4::ZERO], &[Vec4::X]);
    assert!(Skinner::new(Vec::new(), Vec::new(), indices, weights, 5).is_err());
}
