//! Light classification and the light parameter block.
//!
//! [`LightClassifier::classify`] buckets every light of the scene by type in
//! breadth-first order. [`LightCounts`] is the key that selects a shader
//! variant, and [`LightBlock`] is the matching GPU payload.
//!
//! # Block layout
//!
//! ```text
//! header: vec4<u32>            x = light vectors, y = total lights
//! ambient[n]     color
//! directional[n] color, direction (w = 0)
//! omni[n]        color, position  (w = 1)
//! probe[n]       color
//! spot[n]        color, position (w = cos inner), direction (w = cos outer)
//! ies[n]         color
//! ```
//!
//! Types with a zero count contribute no field at all.

use glam::{Affine3A, Vec3, Vec4};
use serde::Serialize;

use crate::renderer::settings::RendererSettings;
use crate::scene::{Light, LightType, NodeKey, Scene};

/// Number of lights per type; the shader variant key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct LightCounts {
    pub ambient: u32,
    pub directional: u32,
    pub omni: u32,
    pub spot: u32,
    pub ies: u32,
    pub probe: u32,
}

impl LightCounts {
    #[must_use]
    pub fn get(&self, light_type: LightType) -> u32 {
        match light_type {
            LightType::Ambient => self.ambient,
            LightType::Directional => self.directional,
            LightType::Omni => self.omni,
            LightType::Spot => self.spot,
            LightType::Ies => self.ies,
            LightType::Probe => self.probe,
        }
    }

    /// Lights that need an interpolated light vector.
    #[inline]
    #[must_use]
    pub fn num_light_vectors(&self) -> u32 {
        self.directional + self.omni + self.spot
    }

    #[inline]
    #[must_use]
    pub fn total(&self) -> u32 {
        self.ambient + self.directional + self.omni + self.spot + self.ies + self.probe
    }
}

/// A light together with the node that carries it.
#[derive(Debug, Clone)]
pub struct LitNode {
    /// `None` for the synthesized default light.
    pub node: Option<NodeKey>,
    pub light: Light,
    pub world_transform: Affine3A,
}

impl LitNode {
    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.world_transform.translation.into()
    }

    /// World-space direction the light shines along (local -Z).
    #[inline]
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        self.world_transform
            .transform_vector3(Vec3::NEG_Z)
            .normalize_or_zero()
    }
}

/// Lights grouped by type, each bucket in traversal order.
#[derive(Debug, Clone, Default)]
pub struct LightBuckets {
    buckets: [Vec<LitNode>; LightType::COUNT],
}

impl LightBuckets {
    #[inline]
    #[must_use]
    pub fn get(&self, light_type: LightType) -> &[LitNode] {
        &self.buckets[light_type.index()]
    }

    pub fn push(&mut self, lit: LitNode) {
        self.buckets[lit.light.light_type.index()].push(lit);
    }

    #[must_use]
    pub fn counts(&self) -> LightCounts {
        let n = |t: LightType| self.get(t).len() as u32;
        LightCounts {
            ambient: n(LightType::Ambient),
            directional: n(LightType::Directional),
            omni: n(LightType::Omni),
            spot: n(LightType::Spot),
            ies: n(LightType::Ies),
            probe: n(LightType::Probe),
        }
    }

    #[must_use]
    pub fn has_non_ambient(&self) -> bool {
        LightType::ALL
            .iter()
            .filter(|t| **t != LightType::Ambient)
            .any(|t| !self.get(*t).is_empty())
    }

    /// Packs the light parameter block for these buckets.
    #[must_use]
    pub fn pack(&self) -> LightBlock {
        let counts = self.counts();
        let mut entries: Vec<Vec4> = Vec::with_capacity(counts.total() as usize * 3);

        for lit in self.get(LightType::Ambient) {
            entries.push(lit.light.radiance());
        }
        for lit in self.get(LightType::Directional) {
            entries.push(lit.light.radiance());
            entries.push(lit.direction().extend(0.0));
        }
        for lit in self.get(LightType::Omni) {
            entries.push(lit.light.radiance());
            entries.push(lit.position().extend(1.0));
        }
        for lit in self.get(LightType::Probe) {
            entries.push(lit.light.radiance());
        }
        for lit in self.get(LightType::Spot) {
            let cone = lit.light.cone;
            entries.push(lit.light.radiance());
            entries.push(lit.position().extend(cone.inner_angle.cos()));
            entries.push(lit.direction().extend(cone.outer_angle.cos()));
        }
        for lit in self.get(LightType::Ies) {
            entries.push(lit.light.radiance());
        }

        LightBlock {
            header: [counts.num_light_vectors(), counts.total(), 0, 0],
            entries,
        }
    }
}

/// CPU image of the light uniform buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct LightBlock {
    pub header: [u32; 4],
    pub entries: Vec<Vec4>,
}

impl LightBlock {
    /// Bytes ready for `queue.write_buffer`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(16 + self.entries.len() * 16);
        bytes.extend_from_slice(bytemuck::cast_slice(&self.header));
        bytes.extend_from_slice(bytemuck::cast_slice(&self.entries));
        bytes
    }

    #[inline]
    #[must_use]
    pub fn byte_len(&self) -> u64 {
        16 + self.entries.len() as u64 * 16
    }
}

/// Walks the scene and tracks light counts between frames.
#[derive(Debug, Default)]
pub struct LightClassifier {
    cached_counts: Option<LightCounts>,
}

impl LightClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Buckets every light breadth-first, adding the default omni light when
    /// enabled and the scene has nothing but ambient light.
    #[must_use]
    pub fn classify(&self, scene: &Scene, settings: &RendererSettings) -> LightBuckets {
        let mut buckets = LightBuckets::default();
        for (key, node) in scene.bfs() {
            if let Some(light) = &node.light {
                buckets.push(LitNode {
                    node: Some(key),
                    light: light.clone(),
                    world_transform: node.world_transform,
                });
            }
        }

        if settings.autoenables_default_lighting && !buckets.has_non_ambient() {
            log::debug!("No scene lights; adding default omni light");
            buckets.push(default_light(settings));
        }
        buckets
    }

    /// Compares `counts` with the previous call's, then remembers them.
    pub fn counts_changed(&mut self, counts: LightCounts) -> bool {
        let changed = self.cached_counts != Some(counts);
        self.cached_counts = Some(counts);
        changed
    }

    #[inline]
    #[must_use]
    pub fn cached_counts(&self) -> Option<LightCounts> {
        self.cached_counts
    }
}

fn default_light(settings: &RendererSettings) -> LitNode {
    LitNode {
        node: None,
        light: Light::omni(Vec3::ONE),
        world_transform: Affine3A::from_translation(settings.default_light_position),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneNode;

    fn settings(auto: bool) -> RendererSettings {
        RendererSettings {
            autoenables_default_lighting: auto,
            ..Default::default()
        }
    }

    #[test]
    fn empty_scene_gets_default_light() {
        let scene = Scene::new();
        let mut classifier = LightClassifier::new();
        let buckets = classifier.classify(&scene, &settings(true));

        let omni = buckets.get(LightType::Omni);
        assert_eq!(omni.len(), 1);
        assert!(omni[0].node.is_none());
        assert_eq!(omni[0].position(), Vec3::new(0.0, 10.0, 10.0));

        assert!(classifier.counts_changed(buckets.counts()));
        assert!(!classifier.counts_changed(buckets.counts()));
    }

    #[test]
    fn ambient_only_scene_still_gets_default_light() {
        let mut scene = Scene::new();
        scene.add_to_root(SceneNode::new().with_light(Light::ambient(Vec3::splat(0.2))));
        let buckets = LightClassifier::new().classify(&scene, &settings(true));
        assert_eq!(buckets.counts().ambient, 1);
        assert_eq!(buckets.counts().omni, 1);
    }

    #[test]
    fn no_default_light_when_disabled() {
        let buckets = LightClassifier::new().classify(&Scene::new(), &settings(false));
        assert_eq!(buckets.counts(), LightCounts::default());
    }

    #[test]
    fn block_follows_type_order() {
        let mut scene = Scene::new();
        scene.add_to_root(
            SceneNode::new()
                .with_light(Light::omni(Vec3::X))
                .with_transform(Affine3A::from_translation(Vec3::new(1.0, 2.0, 3.0))),
        );
        scene.add_to_root(SceneNode::new().with_light(Light::ambient(Vec3::Y)));
        scene.add_to_root(SceneNode::new().with_light(Light::directional(Vec3::Z)));

        let block = LightClassifier::new()
            .classify(&scene, &settings(false))
            .pack();
        assert_eq!(block.header, [2, 3, 0, 0]);
        assert_eq!(
            block.entries,
            vec![
                Vec4::new(0.0, 1.0, 0.0, 1.0),
                Vec4::new(0.0, 0.0, 1.0, 1.0),
                Vec4::new(0.0, 0.0, -1.0, 0.0),
                Vec4::new(1.0, 0.0, 0.0, 1.0),
                Vec4::new(1.0, 2.0, 3.0, 1.0),
            ]
        );
        assert_eq!(block.to_bytes().len() as u64, block.byte_len());
    }
}
