use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use slotmap::SlotMap;

use crate::scene::NodeKey;
use crate::scene::node::SceneNode;

static NEXT_SCENE_ID: AtomicU32 = AtomicU32::new(1);

/// Presentation tree: an arena of nodes under a single root.
///
/// Nodes reference each other (parent, children, skinner bones) by
/// [`NodeKey`], never by pointer.
pub struct Scene {
    pub id: u32,
    nodes: SlotMap<NodeKey, SceneNode>,
    root: NodeKey,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(SceneNode::named("root"));
        Self {
            id: NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed),
            nodes,
            root,
        }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Inserts `node` as the last child of `parent`.
    ///
    /// Returns `None` when `parent` is not part of this scene.
    pub fn add_node(&mut self, parent: NodeKey, mut node: SceneNode) -> Option<NodeKey> {
        if !self.nodes.contains_key(parent) {
            return None;
        }
        node.parent = Some(parent);
        node.children.clear();
        let key = self.nodes.insert(node);
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(key);
        }
        Some(key)
    }

    /// Inserts `node` under the root.
    pub fn add_to_root(&mut self, node: SceneNode) -> NodeKey {
        let key = self.nodes.insert(SceneNode {
            parent: Some(self.root),
            children: Vec::new(),
            ..node
        });
        if let Some(root) = self.nodes.get_mut(self.root) {
            root.children.push(key);
        }
        key
    }

    /// Removes `key` and its whole subtree. The root cannot be removed.
    pub fn remove_node(&mut self, key: NodeKey) -> Option<SceneNode> {
        if key == self.root {
            return None;
        }
        let removed = self.nodes.remove(key)?;
        if let Some(parent) = removed.parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|c| *c != key);
        }
        let mut pending: Vec<NodeKey> = removed.children.clone();
        while let Some(child) = pending.pop() {
            if let Some(node) = self.nodes.remove(child) {
                pending.extend(node.children);
            }
        }
        Some(removed)
    }

    #[inline]
    #[must_use]
    pub fn node(&self, key: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    #[inline]
    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut SceneNode> {
        self.nodes.get_mut(key)
    }

    #[must_use]
    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.nodes.get(key).map_or(&[][..], SceneNode::children)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Breadth-first traversal from the root, children in insertion order.
    #[must_use]
    pub fn bfs(&self) -> Bfs<'_> {
        Bfs {
            scene: self,
            queue: VecDeque::from([self.root]),
        }
    }

    /// First node, breadth-first, matching `predicate`.
    pub fn find_first(&self, mut predicate: impl FnMut(&SceneNode) -> bool) -> Option<NodeKey> {
        self.bfs()
            .find(|(_, node)| predicate(node))
            .map(|(key, _)| key)
    }
}

/// Iterator returned by [`Scene::bfs`].
pub struct Bfs<'a> {
    scene: &'a Scene,
    queue: VecDeque<NodeKey>,
}

impl<'a> Iterator for Bfs<'a> {
    type Item = (NodeKey, &'a SceneNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(key) = self.queue.pop_front() {
            if let Some(node) = self.scene.nodes.get(key) {
                self.queue.extend(node.children.iter().copied());
                return Some((key, node));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bfs_visits_levels_in_order() {
        let mut scene = Scene::new();
        let a = scene.add_to_root(SceneNode::named("a"));
        let b = scene.add_to_root(SceneNode::named("b"));
        scene.add_node(a, SceneNode::named("a1")).unwrap();
        scene.add_node(b, SceneNode::named("b1")).unwrap();

        let names: Vec<_> = scene.bfs().map(|(_, n)| n.name.as_str()).collect();
        assert_eq!(names, ["root", "a", "b", "a1", "b1"]);
    }

    #[test]
    fn remove_drops_subtree() {
        let mut scene = Scene::new();
        let a = scene.add_to_root(SceneNode::named("a"));
        let a1 = scene.add_node(a, SceneNode::named("a1")).unwrap();
        scene.remove_node(a);
        assert!(scene.node(a1).is_none());
        assert!(scene.children(scene.root()).is_empty());
        assert_eq!(scene.len(), 1);
    }
}
