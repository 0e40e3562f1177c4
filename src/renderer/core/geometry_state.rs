//! Per-geometry GPU state.
//!
//! Each geometry gets one interleaved vertex buffer and one index buffer per
//! element, cached by geometry id. An entry is rebuilt when the geometry's
//! version moves (its sources or materials were edited) or when the shared
//! program was replaced (material bind groups are re-bound).

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use wgpu::util::DeviceExt;

use crate::errors::{PrismError, Result};
use crate::renderer::core::layouts::BindGroupLayouts;
use crate::renderer::core::texture::FallbackTexture;
use crate::resources::geometry::{Geometry, GeometryElement, IndexWidth, PrimitiveType, Semantic};
use crate::resources::material::{Material, TextureSlot};
use crate::resources::GeometrySource;
use crate::scene::{NodeKey, Skinner};

/// Floats per interleaved vertex: position 3, normal 3, uv 2, bone indices 4,
/// bone weights 4.
pub const VERTEX_FLOATS: usize = 16;
pub const VERTEX_STRIDE: u64 = (VERTEX_FLOATS * 4) as u64;

pub const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x3,
    2 => Float32x2,
    3 => Float32x4,
    4 => Float32x4,
];

#[must_use]
pub fn vertex_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: VERTEX_STRIDE,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

/// Interleaves the geometry's sources into the fixed vertex layout.
///
/// Missing sources fall back to zero, except bone indices which default to
/// `-1` (unused). Bone data comes from the skinner's sources when given.
#[must_use]
pub fn interleave_vertices(
    geometry: &Geometry,
    bone_sources: Option<(&GeometrySource, &GeometrySource)>,
) -> Vec<f32> {
    let count = geometry.vertex_count();
    let position = geometry.source(Semantic::Vertex);
    let normal = geometry.source(Semantic::Normal);
    let uv = geometry.source(Semantic::Texcoord);
    let (bone_indices, bone_weights) = match bone_sources {
        Some((indices, weights)) => (Some(indices), Some(weights)),
        None => (
            geometry.source(Semantic::BoneIndices),
            geometry.source(Semantic::BoneWeights),
        ),
    };

    let read = |source: Option<&GeometrySource>, i: usize, fill: [f32; 4]| {
        source.and_then(|s| s.vector_at_or(i, fill)).unwrap_or(fill)
    };

    let mut out = Vec::with_capacity(count * VERTEX_FLOATS);
    for i in 0..count {
        out.extend_from_slice(&read(position, i, [0.0; 4])[..3]);
        out.extend_from_slice(&read(normal, i, [0.0; 4])[..3]);
        out.extend_from_slice(&read(uv, i, [0.0; 4])[..2]);
        out.extend_from_slice(&read(bone_indices, i, [-1.0; 4]));
        out.extend_from_slice(&read(bone_weights, i, [0.0; 4]));
    }
    out
}

/// Index data in a width wgpu accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexData {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexData {
    #[must_use]
    pub fn format(&self) -> wgpu::IndexFormat {
        match self {
            Self::U16(_) => wgpu::IndexFormat::Uint16,
            Self::U32(_) => wgpu::IndexFormat::Uint32,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes padded to the 4-byte alignment buffer writes require.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = match self {
            Self::U16(v) => bytemuck::cast_slice(v).to_vec(),
            Self::U32(v) => bytemuck::cast_slice(v).to_vec(),
        };
        bytes.resize(bytes.len().next_multiple_of(4), 0);
        bytes
    }
}

/// Maps an element topology onto a wgpu topology.
///
/// Polygons are drawn as triangle lists after [`element_indices`] expands
/// the fan.
#[must_use]
pub fn topology(primitive_type: PrimitiveType) -> wgpu::PrimitiveTopology {
    match primitive_type {
        PrimitiveType::Triangles | PrimitiveType::Polygon => wgpu::PrimitiveTopology::TriangleList,
        PrimitiveType::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        PrimitiveType::Line => wgpu::PrimitiveTopology::LineList,
        PrimitiveType::Point => wgpu::PrimitiveTopology::PointList,
    }
}

/// Converts an element's indices for upload: 8-bit indices are widened to
/// 16 bits and polygon fans become triangle lists. Every index must address
/// an existing vertex.
pub fn element_indices(element: &GeometryElement, vertex_count: usize) -> Result<IndexData> {
    let indices: Vec<u32> = match element.primitive_type() {
        PrimitiveType::Polygon => (0..element.primitive_count())
            .filter_map(|i| element.triangle_at(i))
            .flatten()
            .collect(),
        _ => element.indices().collect(),
    };

    if let Some(bad) = indices.iter().find(|i| **i as usize >= vertex_count) {
        return Err(PrismError::config(format!(
            "index {bad} out of range for {vertex_count} vertices"
        )));
    }

    Ok(match element.index_width() {
        IndexWidth::U8 | IndexWidth::U16 => {
            IndexData::U16(indices.into_iter().map(|i| i as u16).collect())
        }
        IndexWidth::U32 => IndexData::U32(indices),
    })
}

/// GPU side of one element.
pub struct GpuElement {
    pub index_buffer: wgpu::Buffer,
    pub index_format: wgpu::IndexFormat,
    pub index_count: u32,
    pub topology: wgpu::PrimitiveTopology,
    pub material_buffer: wgpu::Buffer,
    pub material_bind_group: wgpu::BindGroup,
}

pub struct GpuGeometry {
    pub vertex_buffer: wgpu::Buffer,
    pub elements: Vec<GpuElement>,
    version: u64,
    program_generation: u64,
}

/// Cache key: skinned nodes carry their own bone streams, so they get an
/// entry of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryKey {
    pub geometry: u64,
    pub skinned_node: Option<NodeKey>,
}

#[derive(Default)]
pub struct GeometryCache {
    entries: FxHashMap<GeometryKey, GpuGeometry>,
}

impl GeometryCache {
    /// Makes sure `geometry` has current GPU state.
    pub fn ensure(
        &mut self,
        device: &wgpu::Device,
        layouts: &BindGroupLayouts,
        fallback: &FallbackTexture,
        geometry: &Arc<Geometry>,
        skin: Option<(NodeKey, &Skinner)>,
        program_generation: u64,
    ) -> Result<GeometryKey> {
        let key = GeometryKey {
            geometry: geometry.id(),
            skinned_node: skin.map(|(node, _)| node),
        };
        if let Some(entry) = self.entries.get(&key)
            && entry.version == geometry.version()
            && entry.program_generation == program_generation
        {
            return Ok(key);
        }

        log::debug!(
            "Building GPU state for geometry '{}' (id {})",
            geometry.name,
            geometry.id()
        );

        let bone_sources = skin.map(|(_, skinner)| (skinner.bone_indices(), skinner.bone_weights()));
        let vertices = interleave_vertices(geometry, bone_sources);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Geometry Vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let elements = geometry
            .elements()
            .iter()
            .zip(geometry.materials())
            .map(|(element, material)| {
                let indices = element_indices(element, geometry.vertex_count())?;
                let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Geometry Indices"),
                    contents: &indices.to_bytes(),
                    usage: wgpu::BufferUsages::INDEX,
                });
                let (material_buffer, material_bind_group) =
                    create_material_binding(device, layouts, fallback, material);
                Ok(GpuElement {
                    index_buffer,
                    index_format: indices.format(),
                    index_count: indices.len() as u32,
                    topology: topology(element.primitive_type()),
                    material_buffer,
                    material_bind_group,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.entries.insert(
            key,
            GpuGeometry {
                vertex_buffer,
                elements,
                version: geometry.version(),
                program_generation,
            },
        );
        Ok(key)
    }

    #[must_use]
    pub fn get(&self, key: &GeometryKey) -> Option<&GpuGeometry> {
        self.entries.get(key)
    }

    /// Drops entries not drawn in the last frame.
    pub fn retain(&mut self, live: &FxHashSet<GeometryKey>) {
        self.entries.retain(|key, _| live.contains(key));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn create_material_binding(
    device: &wgpu::Device,
    layouts: &BindGroupLayouts,
    fallback: &FallbackTexture,
    material: &Material,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Material Uniforms"),
        contents: bytemuck::bytes_of(&material.uniforms()),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let views: Vec<&wgpu::TextureView> = TextureSlot::ALL
        .iter()
        .map(|slot| material.texture(*slot).map_or(&fallback.view, |v| v.as_ref()))
        .collect();

    let mut entries = vec![
        wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        },
        wgpu::BindGroupEntry {
            binding: 1,
            resource: wgpu::BindingResource::Sampler(&fallback.sampler),
        },
    ];
    entries.extend(views.iter().enumerate().map(|(i, view)| wgpu::BindGroupEntry {
        binding: 2 + i as u32,
        resource: wgpu::BindingResource::TextureView(view),
    }));

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Material Bind Group"),
        layout: &layouts.material,
        entries: &entries,
    });
    (buffer, bind_group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn triangle(element: GeometryElement) -> Geometry {
        Geometry::with_element(
            vec![GeometrySource::from_vec3(
                Semantic::Vertex,
                &[Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::ONE],
            )],
            element,
            Material::default(),
        )
    }

    #[test]
    fn u8_indices_widen_to_u16() {
        let element = GeometryElement::from_u8(&[0, 1, 2], PrimitiveType::Triangles);
        let data = element_indices(&element, 3).unwrap();
        assert_eq!(data, IndexData::U16(vec![0, 1, 2]));
        assert_eq!(data.format(), wgpu::IndexFormat::Uint16);
        // 6 bytes padded to 8
        assert_eq!(data.to_bytes().len(), 8);
    }

    #[test]
    fn polygon_expands_to_list() {
        let element = GeometryElement::from_u32(&[0, 1, 2, 3], PrimitiveType::Polygon);
        let data = element_indices(&element, 4).unwrap();
        assert_eq!(data, IndexData::U32(vec![0, 1, 2, 0, 2, 3]));
        assert_eq!(topology(PrimitiveType::Polygon), wgpu::PrimitiveTopology::TriangleList);
    }

    #[test]
    fn out_of_range_index_is_configuration_error() {
        let element = GeometryElement::from_u16(&[0, 1, 7], PrimitiveType::Triangles);
        assert!(matches!(
            element_indices(&element, 3),
            Err(PrismError::Configuration(_))
        ));
    }

    #[test]
    fn interleaved_layout_defaults() {
        let geometry = triangle(GeometryElement::from_u8(&[0, 1, 2], PrimitiveType::Triangles));
        let data = interleave_vertices(&geometry, None);
        assert_eq!(data.len(), 4 * VERTEX_FLOATS);
        let second = &data[VERTEX_FLOATS..2 * VERTEX_FLOATS];
        assert_eq!(&second[..3], &[1.0, 0.0, 0.0]);
        assert_eq!(&second[8..12], &[-1.0; 4]);
        assert_eq!(&second[12..], &[0.0; 4]);
    }
}
