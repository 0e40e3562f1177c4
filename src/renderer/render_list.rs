use crate::scene::{NodeKey, Scene};

/// Geometry-bearing nodes, breadth-first, stably sorted by `rendering_order`.
///
/// Hidden nodes are kept: drawing skips them, while hit tests decide per
/// query whether to consider them.
#[must_use]
pub fn build_draw_list(scene: &Scene) -> Vec<NodeKey> {
    let mut list: Vec<(i32, NodeKey)> = scene
        .bfs()
        .filter(|(_, node)| node.geometry.is_some())
        .map(|(key, node)| (node.rendering_order, key))
        .collect();
    // `sort_by_key` is stable: equal orders keep traversal order.
    list.sort_by_key(|(order, _)| *order);
    list.into_iter().map(|(_, key)| key).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Geometry;
    use crate::scene::SceneNode;
    use std::sync::Arc;

    #[test]
    fn containers_are_skipped_and_ties_keep_order() {
        let geometry = Arc::new(Geometry::new(Vec::new(), Vec::new(), Vec::new()).unwrap());
        let mut scene = Scene::new();
        let group = scene.add_to_root(SceneNode::named("group"));
        let a = scene
            .add_node(group, SceneNode::named("a").with_geometry(geometry.clone()))
            .unwrap();
        let b = scene.add_to_root(SceneNode::named("b").with_geometry(geometry.clone()));
        let c = scene.add_to_root(
            SceneNode::named("c")
                .with_geometry(geometry)
                .with_rendering_order(-3),
        );

        // bfs: group, b, c, a
        assert_eq!(build_draw_list(&scene), vec![c, b, a]);
    }
}
