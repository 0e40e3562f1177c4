use crate::errors::{PrismError, Result};
use crate::hit_test::{HitTestOptions, HitTestResult, Ray, SearchMode};
use crate::renderer::render_list::build_draw_list;
use crate::renderer::skinning::world_positions;
use crate::scene::{NodeKey, Scene, SceneNode};

/// Hits on a single node, in element then face order.
///
/// `max_t` bounds the ray parameter (segment queries pass `1.0`). Line and
/// point elements are skipped with a warning.
pub fn hit_test_node(
    scene: &Scene,
    key: NodeKey,
    node: &SceneNode,
    ray: &Ray,
    max_t: f32,
    options: &HitTestOptions,
) -> Result<Vec<HitTestResult>> {
    let Some(geometry) = &node.geometry else {
        return Ok(Vec::new());
    };

    let positions = world_positions(scene, node, geometry)?;
    let model = node.world_transform;
    let inverse_model = model.inverse();
    let mut hits = Vec::new();

    for (element_index, element) in geometry.elements().iter().enumerate() {
        if !element.primitive_type().is_triangular() {
            let unsupported = PrismError::Unsupported(format!(
                "hit test against {:?} element {element_index} of '{}'",
                element.primitive_type(),
                node.name
            ));
            log::warn!("{unsupported}; skipping");
            continue;
        }

        for face_index in 0..element.primitive_count() {
            let Some(triangle) = element.triangle_at(face_index) else {
                continue;
            };
            let [a, b, c] = triangle.map(|i| positions.get(i as usize).copied());
            let (Some(v0), Some(v1), Some(v2)) = (a, b, c) else {
                return Err(PrismError::config(format!(
                    "face {face_index} of element {element_index} on '{}' indexes past {} vertices",
                    node.name,
                    positions.len()
                )));
            };

            let Some(hit) = ray.intersect_triangle(v0, v1, v2, options.backface_culling) else {
                continue;
            };
            if hit.t > max_t {
                continue;
            }

            let world_coordinates = ray.at(hit.t);
            let world_normal = (v1 - v0).cross(v2 - v0).normalize_or_zero();
            hits.push(HitTestResult {
                node: key,
                geometry_index: element_index,
                face_index,
                world_coordinates,
                local_coordinates: inverse_model.transform_point3(world_coordinates),
                world_normal,
                local_normal: inverse_model.transform_vector3(world_normal),
                model_transform: model,
                bone_node: None,
            });
            if options.search_mode == SearchMode::Any {
                return Ok(hits);
            }
        }
    }
    Ok(hits)
}

/// Hits across the scene's draw list, filtered and reduced per `options`.
pub fn hit_test_scene(
    scene: &Scene,
    ray: &Ray,
    max_t: f32,
    options: &HitTestOptions,
) -> Result<Vec<HitTestResult>> {
    let mut hits = Vec::new();

    for key in build_draw_list(scene) {
        let Some(node) = scene.node(key) else {
            continue;
        };
        if options.ignore_hidden_nodes && node.hidden {
            continue;
        }
        if node.category_bit_mask & options.category_bit_mask == 0 {
            continue;
        }

        hits.extend(hit_test_node(scene, key, node, ray, max_t, options)?);
        if options.search_mode == SearchMode::Any && !hits.is_empty() {
            hits.truncate(1);
            return Ok(hits);
        }
    }

    if options.search_mode == SearchMode::Closest {
        let distance = |hit: &HitTestResult| hit.world_coordinates.distance_squared(ray.origin);
        let closest = hits
            .into_iter()
            .min_by(|a, b| distance(a).total_cmp(&distance(b)));
        return Ok(closest.into_iter().collect());
    }
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{Geometry, GeometryElement, GeometrySource, Material, PrimitiveType, Semantic};
    use glam::{Affine3A, Vec3};
    use std::sync::Arc;

    fn triangle_node(name: &str, z: f32, primitive_type: PrimitiveType) -> SceneNode {
        let geometry = Geometry::with_element(
            vec![GeometrySource::from_vec3(
                Semantic::Vertex,
                &[Vec3::ZERO, Vec3::X, Vec3::Y],
            )],
            GeometryElement::from_u16(&[0, 1, 2], primitive_type),
            Material::default(),
        );
        SceneNode::named(name)
            .with_geometry(Arc::new(geometry))
            .with_transform(Affine3A::from_translation(Vec3::new(0.0, 0.0, z)))
    }

    fn down_ray() -> Ray {
        Ray::new(Vec3::new(0.25, 0.25, 10.0), Vec3::NEG_Z)
    }

    #[test]
    fn closest_picks_nearest_node() {
        let mut scene = Scene::new();
        scene.add_to_root(triangle_node("low", 0.0, PrimitiveType::Triangles));
        let high = scene.add_to_root(triangle_node("high", 2.0, PrimitiveType::Triangles));

        let all = hit_test_scene(&scene, &down_ray(), f32::INFINITY, &HitTestOptions::default())
            .unwrap();
        assert_eq!(all.len(), 2);

        let options = HitTestOptions {
            search_mode: SearchMode::Closest,
            ..Default::default()
        };
        let closest = hit_test_scene(&scene, &down_ray(), f32::INFINITY, &options).unwrap();
        assert_eq!(closest.len(), 1);
        assert_eq!(closest[0].node, high);
        assert!((closest[0].local_coordinates - Vec3::new(0.25, 0.25, 0.0)).length() < 1e-5);
    }

    #[test]
    fn mask_and_hidden_filters() {
        let mut scene = Scene::new();
        scene.add_to_root(triangle_node("a", 0.0, PrimitiveType::Triangles).with_category_bit_mask(2));
        let mut hidden = triangle_node("b", 1.0, PrimitiveType::Triangles);
        hidden.hidden = true;
        scene.add_to_root(hidden);

        let options = HitTestOptions {
            category_bit_mask: 1,
            ..Default::default()
        };
        assert!(hit_test_scene(&scene, &down_ray(), f32::INFINITY, &options).unwrap().is_empty());

        let options = HitTestOptions {
            ignore_hidden_nodes: false,
            category_bit_mask: 1,
            ..Default::default()
        };
        assert_eq!(hit_test_scene(&scene, &down_ray(), f32::INFINITY, &options).unwrap().len(), 1);
    }

    #[test]
    fn line_elements_are_skipped() {
        let mut scene = Scene::new();
        scene.add_to_root(triangle_node("line", 0.0, PrimitiveType::Line));
        let hits =
            hit_test_scene(&scene, &down_ray(), f32::INFINITY, &HitTestOptions::default()).unwrap();
        assert!(hits.is_empty());
    }
}
