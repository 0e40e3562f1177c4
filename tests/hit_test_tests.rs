//! Hit Test Tests
//!
//! Tests for:
//! - Segment ray tests against a unit triangle (front, outside, behind)
//! - Back-face culling option
//! - Skinned geometry tested at its blended positions
//! - Screen-space hit tests through the resolved camera
//! - Search modes

use std::sync::Arc;

use glam::{Affine3A, Mat4, Vec2, Vec3, Vec4};

use prism::hit_test::{HitTestOptions, SearchMode};
use prism::renderer::{Renderer, RendererSettings};
use prism::resources::{Geometry, GeometryElement, GeometrySource, Material, PrimitiveType, Semantic};
use prism::scene::{Camera, Scene, SceneNode, Skinner, Viewport};

const EPSILON: f32 = 1e-4;

fn approx_vec(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

fn unit_triangle() -> Arc<Geometry> {
    Arc::new(
        Geometry::with_element(
            vec![GeometrySource::from_vec3(
                Semantic::Vertex,
                &[Vec3::ZERO, Vec3::X, Vec3::Y],
            )],
            GeometryElement::from_u16(&[0, 1, 2], PrimitiveType::Triangles),
            Material::default(),
        )
        .with_name("triangle"),
    )
}

fn renderer_with(scene: Scene) -> Renderer {
    let mut renderer = Renderer::new(RendererSettings::default()).unwrap();
    renderer.set_scene(scene);
    renderer
}

// ============================================================================
// Ray tests
// ============================================================================

#[test]
fn ray_at_triangle_reports_one_hit() {
    let mut scene = Scene::new();
    let node = scene.add_to_root(SceneNode::named("tri").with_geometry(unit_triangle()));
    let renderer = renderer_with(scene);

    let hits = renderer
        .ray_test(
            Vec3::new(0.25, 0.25, 1.0),
            Vec3::new(0.25, 0.25, -1.0),
            &HitTestOptions::default(),
        )
        .unwrap();
    assert_eq!(hits.len(), 1);
    let hit = &hits[0];
    assert_eq!(hit.node, node);
    assert_eq!((hit.geometry_index, hit.face_index), (0, 0));
    assert!(approx_vec(hit.world_coordinates, Vec3::new(0.25, 0.25, 0.0)));
    assert!(approx_vec(hit.world_normal, Vec3::Z));
    assert!(hit.bone_node.is_none());
}

#[test]
fn ray_outside_triangle_misses() {
    let mut scene = Scene::new();
    scene.add_to_root(SceneNode::new().with_geometry(unit_triangle()));
    let renderer = renderer_with(scene);

    let hits = renderer
        .ray_test(
            Vec3::new(2.0, 2.0, 1.0),
            Vec3::new(2.0, 2.0, -1.0),
            &HitTestOptions::default(),
        )
        .unwrap();
    assert!(hits.is_empty());
}

#[test]
fn back_faces_are_culled_unless_disabled() {
    let mut scene = Scene::new();
    scene.add_to_root(SceneNode::new().with_geometry(unit_triangle()));
    let renderer = renderer_with(scene);
    let (from, to) = (Vec3::new(0.25, 0.25, -1.0), Vec3::new(0.25, 0.25, 1.0));

    assert!(renderer.ray_test(from, to, &HitTestOptions::default()).unwrap().is_empty());

    let options = HitTestOptions {
        backface_culling: false,
        ..Default::default()
    };
    let hits = renderer.ray_test(from, to, &options).unwrap();
    assert_eq!(hits.len(), 1);
    // Normal follows the winding, not the ray.
    assert!(approx_vec(hits[0].world_normal, Vec3::Z));
}

#[test]
fn ray_test_stops_at_destination() {
    let mut scene = Scene::new();
    scene.add_to_root(SceneNode::new().with_geometry(unit_triangle()));
    let renderer = renderer_with(scene);

    let hits = renderer
        .ray_test(
            Vec3::new(0.25, 0.25, 2.0),
            Vec3::new(0.25, 0.25, 1.0),
            &HitTestOptions::default(),
        )
        .unwrap();
    assert!(hits.is_empty());
}

#[test]
fn local_coordinates_undo_the_model_transform() {
    let mut scene = Scene::new();
    let world = Affine3A::from_translation(Vec3::new(10.0, 0.0, 0.0));
    scene.add_to_root(SceneNode::new().with_geometry(unit_triangle()).with_transform(world));
    let renderer = renderer_with(scene);

    let hits = renderer
        .ray_test(
            Vec3::new(10.25, 0.5, 1.0),
            Vec3::new(10.25, 0.5, -1.0),
            &HitTestOptions::default(),
        )
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert!(approx_vec(hits[0].local_coordinates, Vec3::new(0.25, 0.5, 0.0)));
    assert_eq!(hits[0].model_transform, world);
}

#[test]
fn skinned_geometry_is_hit_where_it_is_drawn() {
    let mut scene = Scene::new();
    let bone = scene.add_to_root(
        SceneNode::named("bone").with_transform(Affine3A::from_translation(Vec3::new(0.0, 0.0, -5.0))),
    );
    let skinner = Skinner::new(
        vec![bone],
        vec![Mat4::IDENTITY],
        GeometrySource::from_vec4(Semantic::BoneIndices, &[Vec4::ZERO; 3]),
        GeometrySource::from_vec4(Semantic::BoneWeights, &[Vec4::X; 3]),
        1,
    )
    .unwrap();
    scene.add_to_root(
        SceneNode::named("skinned")
            .with_geometry(unit_triangle())
            .with_skinner(skinner),
    );
    let renderer = renderer_with(scene);

    let hits = renderer
        .ray_test(
            Vec3::new(0.25, 0.25, 1.0),
            Vec3::new(0.25, 0.25, -10.0),
            &HitTestOptions::default(),
        )
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert!(approx_vec(hits[0].world_coordinates, Vec3::new(0.25, 0.25, -5.0)));
}

#[test]
fn any_returns_a_single_hit() {
    let mut scene = Scene::new();
    for z in [0.0, -1.0, -2.0] {
        scene.add_to_root(
            SceneNode::new()
                .with_geometry(unit_triangle())
                .with_transform(Affine3A::from_translation(Vec3::new(0.0, 0.0, z))),
        );
    }
    let renderer = renderer_with(scene);
    let (from, to) = (Vec3::new(0.25, 0.25, 1.0), Vec3::new(0.25, 0.25, -5.0));

    assert_eq!(renderer.ray_test(from, to, &HitTestOptions::default()).unwrap().len(), 3);

    let options = HitTestOptions {
        search_mode: SearchMode::Any,
        ..Default::default()
    };
    assert_eq!(renderer.ray_test(from, to, &options).unwrap().len(), 1);
}

#[test]
fn polygon_elements_are_fans() {
    let quad = Geometry::with_element(
        vec![GeometrySource::from_vec3(
            Semantic::Vertex,
            &[Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
        )],
        GeometryElement::from_u8(&[0, 1, 2, 3], PrimitiveType::Polygon),
        Material::default(),
    );
    let mut scene = Scene::new();
    scene.add_to_root(SceneNode::new().with_geometry(Arc::new(quad)));
    let renderer = renderer_with(scene);

    let hits = renderer
        .ray_test(
            Vec3::new(0.2, 0.8, 1.0),
            Vec3::new(0.2, 0.8, -1.0),
            &HitTestOptions::default(),
        )
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].face_index, 1);
}

// ============================================================================
// Screen-space hit tests
// ============================================================================

#[test]
fn screen_center_hits_triangle_in_front_of_camera() {
    let mut scene = Scene::new();
    scene.add_to_root(
        SceneNode::named("cam")
            .with_camera(Camera::default())
            .with_transform(Affine3A::from_translation(Vec3::new(0.0, 0.0, 5.0))),
    );
    // Triangle centred on the view axis.
    scene.add_to_root(
        SceneNode::named("tri")
            .with_geometry(unit_triangle())
            .with_transform(Affine3A::from_translation(Vec3::new(-0.25, -0.25, 0.0))),
    );
    let mut renderer = renderer_with(scene);
    renderer.set_viewport(Viewport::new(200.0, 100.0));

    let hits = renderer
        .hit_test(Vec2::new(100.0, 50.0), &HitTestOptions::default())
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert!(approx_vec(hits[0].world_coordinates, Vec3::ZERO));

    let corner = renderer
        .hit_test(Vec2::new(0.0, 0.0), &HitTestOptions::default())
        .unwrap();
    assert!(corner.is_empty());
}

#[test]
fn hit_test_without_scene_is_empty() {
    let mut renderer = Renderer::new(RendererSettings::default()).unwrap();
    let hits = renderer
        .hit_test(Vec2::new(1.0, 1.0), &HitTestOptions::default())
        .unwrap();
    assert!(hits.is_empty());
}
