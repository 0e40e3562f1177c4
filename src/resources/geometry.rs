//! Geometry data consumed by the renderer.
//!
//! A [`Geometry`] is a set of vertex [`GeometrySource`]s addressed by
//! [`Semantic`], plus one or more [`GeometryElement`]s (primitive groups).
//! Each element index-aligns with a [`Material`] slot.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Affine3A, Vec3, Vec4};

use crate::errors::{PrismError, Result};
use crate::resources::material::Material;
use crate::resources::program::CustomProgram;
use crate::resources::version_tracker::{Tracked, next_version};

static NEXT_GEOMETRY_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// Sources
// ============================================================================

/// Meaning of a vertex source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semantic {
    Vertex,
    Normal,
    Texcoord,
    BoneIndices,
    BoneWeights,
}

/// A strided float array with a fixed number of components per vector.
///
/// `offset` and `stride` are expressed in floats, so several sources can
/// share one interleaved array.
#[derive(Debug, Clone)]
pub struct GeometrySource {
    pub semantic: Semantic,
    data: Arc<[f32]>,
    vector_count: usize,
    components_per_vector: usize,
    offset: usize,
    stride: usize,
}

impl GeometrySource {
    /// Tightly packed source: `data.len()` must be a multiple of `components`.
    pub fn new(semantic: Semantic, data: Vec<f32>, components: usize) -> Result<Self> {
        if components == 0 || components > 4 {
            return Err(PrismError::config(format!(
                "{semantic:?} source: {components} components per vector (expected 1..=4)"
            )));
        }
        if data.len() % components != 0 {
            return Err(PrismError::config(format!(
                "{semantic:?} source: {} floats is not a multiple of {components}",
                data.len()
            )));
        }
        let vector_count = data.len() / components;
        Ok(Self {
            semantic,
            data: data.into(),
            vector_count,
            components_per_vector: components,
            offset: 0,
            stride: components,
        })
    }

    /// Interleaved source reading `components` floats every `stride` floats,
    /// starting at `offset`.
    pub fn interleaved(
        semantic: Semantic,
        data: Arc<[f32]>,
        components: usize,
        offset: usize,
        stride: usize,
        vector_count: usize,
    ) -> Result<Self> {
        if components == 0 || components > 4 || stride < components {
            return Err(PrismError::config(format!(
                "{semantic:?} source: invalid layout (components {components}, stride {stride})"
            )));
        }
        if vector_count > 0 && offset + (vector_count - 1) * stride + components > data.len() {
            return Err(PrismError::config(format!(
                "{semantic:?} source: {vector_count} vectors overrun a {}-float buffer",
                data.len()
            )));
        }
        Ok(Self {
            semantic,
            data,
            vector_count,
            components_per_vector: components,
            offset,
            stride,
        })
    }

    /// Convenience constructor for a packed `Vec3` source.
    #[must_use]
    pub fn from_vec3(semantic: Semantic, vectors: &[Vec3]) -> Self {
        let data: Vec<f32> = vectors.iter().flat_map(|v| v.to_array()).collect();
        Self {
            semantic,
            data: data.into(),
            vector_count: vectors.len(),
            components_per_vector: 3,
            offset: 0,
            stride: 3,
        }
    }

    /// Convenience constructor for a packed `Vec4` source.
    #[must_use]
    pub fn from_vec4(semantic: Semantic, vectors: &[Vec4]) -> Self {
        let data: Vec<f32> = vectors.iter().flat_map(|v| v.to_array()).collect();
        Self {
            semantic,
            data: data.into(),
            vector_count: vectors.len(),
            components_per_vector: 4,
            offset: 0,
            stride: 4,
        }
    }

    #[inline]
    #[must_use]
    pub fn vector_count(&self) -> usize {
        self.vector_count
    }

    #[inline]
    #[must_use]
    pub fn components_per_vector(&self) -> usize {
        self.components_per_vector
    }

    #[inline]
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Reads vector `i`, padding missing components with `fill`.
    #[must_use]
    pub fn vector_at_or(&self, i: usize, fill: [f32; 4]) -> Option<[f32; 4]> {
        if i >= self.vector_count {
            return None;
        }
        let start = self.offset + i * self.stride;
        let mut out = fill;
        out[..self.components_per_vector]
            .copy_from_slice(&self.data[start..start + self.components_per_vector]);
        Some(out)
    }

    /// Reads vector `i` with zero padding.
    #[inline]
    #[must_use]
    pub fn vector_at(&self, i: usize) -> Option<[f32; 4]> {
        self.vector_at_or(i, [0.0; 4])
    }

    /// Reads vector `i` as a point.
    #[inline]
    #[must_use]
    pub fn vec3_at(&self, i: usize) -> Option<Vec3> {
        self.vector_at(i).map(|v| Vec3::new(v[0], v[1], v[2]))
    }
}

// ============================================================================
// Elements
// ============================================================================

/// Primitive topology of a geometry element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Triangles,
    TriangleStrip,
    Line,
    Point,
    /// Convex polygon drawn as a triangle fan around the first index.
    Polygon,
}

impl PrimitiveType {
    /// Whether the topology produces filled triangles.
    #[inline]
    #[must_use]
    pub fn is_triangular(self) -> bool {
        matches!(self, Self::Triangles | Self::TriangleStrip | Self::Polygon)
    }
}

/// Maps the raw topology tag used by asset loaders.
impl TryFrom<u32> for PrimitiveType {
    type Error = PrismError;

    fn try_from(tag: u32) -> Result<Self> {
        match tag {
            0 => Ok(Self::Triangles),
            1 => Ok(Self::TriangleStrip),
            2 => Ok(Self::Line),
            3 => Ok(Self::Point),
            4 => Ok(Self::Polygon),
            other => Err(PrismError::config(format!("unsupported primitive type: {other}"))),
        }
    }
}

/// Width of one index in an element buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexWidth {
    U8,
    U16,
    U32,
}

impl IndexWidth {
    #[inline]
    #[must_use]
    pub fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

impl TryFrom<usize> for IndexWidth {
    type Error = PrismError;

    fn try_from(bytes_per_index: usize) -> Result<Self> {
        match bytes_per_index {
            1 => Ok(Self::U8),
            2 => Ok(Self::U16),
            4 => Ok(Self::U32),
            other => Err(PrismError::config(format!("unsupported index size: {other}"))),
        }
    }
}

/// One primitive group: raw little-endian index data plus its topology.
#[derive(Debug, Clone)]
pub struct GeometryElement {
    data: Vec<u8>,
    primitive_type: PrimitiveType,
    index_width: IndexWidth,
}

impl GeometryElement {
    /// Builds an element from raw index bytes.
    pub fn from_bytes(
        data: Vec<u8>,
        primitive_type: PrimitiveType,
        bytes_per_index: usize,
    ) -> Result<Self> {
        let index_width = IndexWidth::try_from(bytes_per_index)?;
        if data.len() % bytes_per_index != 0 {
            return Err(PrismError::config(format!(
                "index data of {} bytes is not a multiple of the index size {bytes_per_index}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            primitive_type,
            index_width,
        })
    }

    #[must_use]
    pub fn from_u8(indices: &[u8], primitive_type: PrimitiveType) -> Self {
        Self {
            data: indices.to_vec(),
            primitive_type,
            index_width: IndexWidth::U8,
        }
    }

    #[must_use]
    pub fn from_u16(indices: &[u16], primitive_type: PrimitiveType) -> Self {
        Self {
            data: bytemuck::cast_slice(indices).to_vec(),
            primitive_type,
            index_width: IndexWidth::U16,
        }
    }

    #[must_use]
    pub fn from_u32(indices: &[u32], primitive_type: PrimitiveType) -> Self {
        Self {
            data: bytemuck::cast_slice(indices).to_vec(),
            primitive_type,
            index_width: IndexWidth::U32,
        }
    }

    #[inline]
    #[must_use]
    pub fn primitive_type(&self) -> PrimitiveType {
        self.primitive_type
    }

    #[inline]
    #[must_use]
    pub fn index_width(&self) -> IndexWidth {
        self.index_width
    }

    #[inline]
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.data.len() / self.index_width.bytes()
    }

    /// Decodes index `i`.
    #[must_use]
    pub fn index_at(&self, i: usize) -> Option<u32> {
        let w = self.index_width.bytes();
        let bytes = self.data.get(i * w..(i + 1) * w)?;
        Some(match self.index_width {
            IndexWidth::U8 => u32::from(bytes[0]),
            IndexWidth::U16 => u32::from(u16::from_le_bytes([bytes[0], bytes[1]])),
            IndexWidth::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        })
    }

    /// Iterates all decoded indices.
    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.index_count()).filter_map(|i| self.index_at(i))
    }

    /// Number of primitives (triangles, lines or points) in the element.
    #[must_use]
    pub fn primitive_count(&self) -> usize {
        let n = self.index_count();
        match self.primitive_type {
            PrimitiveType::Triangles => n / 3,
            PrimitiveType::TriangleStrip | PrimitiveType::Polygon => n.saturating_sub(2),
            PrimitiveType::Line => n / 2,
            PrimitiveType::Point => n,
        }
    }

    /// Vertex indices of triangle `i`, wound consistently with the first one.
    ///
    /// Returns `None` for non-triangular topologies.
    #[must_use]
    pub fn triangle_at(&self, i: usize) -> Option<[u32; 3]> {
        match self.primitive_type {
            PrimitiveType::Triangles => Some([
                self.index_at(i * 3)?,
                self.index_at(i * 3 + 1)?,
                self.index_at(i * 3 + 2)?,
            ]),
            PrimitiveType::TriangleStrip => {
                let (a, b, c) = (self.index_at(i)?, self.index_at(i + 1)?, self.index_at(i + 2)?);
                // odd strip triangles flip winding
                Some(if i % 2 == 0 { [a, b, c] } else { [b, a, c] })
            }
            PrimitiveType::Polygon => Some([
                self.index_at(0)?,
                self.index_at(i + 1)?,
                self.index_at(i + 2)?,
            ]),
            PrimitiveType::Line | PrimitiveType::Point => None,
        }
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Bounding sphere in the geometry's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    /// Transforms the sphere, scaling the radius by the largest axis scale.
    #[must_use]
    pub fn transform(&self, matrix: &Affine3A) -> Self {
        let center = matrix.transform_point3(self.center);
        let scale = matrix
            .matrix3
            .x_axis
            .length()
            .max(matrix.matrix3.y_axis.length())
            .max(matrix.matrix3.z_axis.length());
        Self {
            center,
            radius: self.radius * scale,
        }
    }
}

/// Renderable geometry: vertex sources, primitive groups and their materials.
#[derive(Debug)]
pub struct Geometry {
    id: u64,
    pub name: String,
    sources: Vec<GeometrySource>,
    elements: Vec<GeometryElement>,
    materials: Vec<Material>,
    /// Program used instead of the renderer's shared specialized program.
    pub program: Option<Arc<CustomProgram>>,
    version: u64,
}

impl Geometry {
    /// Creates a geometry. `elements` and `materials` must have equal length.
    pub fn new(
        sources: Vec<GeometrySource>,
        elements: Vec<GeometryElement>,
        materials: Vec<Material>,
    ) -> Result<Self> {
        if elements.len() != materials.len() {
            return Err(PrismError::config(format!(
                "{} geometry elements but {} materials",
                elements.len(),
                materials.len()
            )));
        }
        Ok(Self {
            id: NEXT_GEOMETRY_ID.fetch_add(1, Ordering::Relaxed),
            name: String::new(),
            sources,
            elements,
            materials,
            program: None,
            version: next_version(),
        })
    }

    /// Single-element geometry with one material.
    #[must_use]
    pub fn with_element(
        sources: Vec<GeometrySource>,
        element: GeometryElement,
        material: Material,
    ) -> Self {
        Self {
            id: NEXT_GEOMETRY_ID.fetch_add(1, Ordering::Relaxed),
            name: String::new(),
            sources,
            elements: vec![element],
            materials: vec![material],
            program: None,
            version: next_version(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    #[must_use]
    pub fn with_program(mut self, program: Arc<CustomProgram>) -> Self {
        self.program = Some(program);
        self
    }

    /// Stable identity used to key GPU-side state.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Changes whenever sources, elements or materials are edited.
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Forces GPU-side state to be rebuilt on the next draw.
    pub fn mark_dirty(&mut self) {
        self.version = next_version();
    }

    #[inline]
    #[must_use]
    pub fn sources(&self) -> &[GeometrySource] {
        &self.sources
    }

    /// Mutable access to the sources; marks the geometry dirty.
    pub fn sources_mut(&mut self) -> Tracked<'_, Vec<GeometrySource>> {
        Tracked::new(&mut self.sources, &mut self.version)
    }

    #[inline]
    #[must_use]
    pub fn elements(&self) -> &[GeometryElement] {
        &self.elements
    }

    #[inline]
    #[must_use]
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Mutable access to the materials; marks the geometry dirty.
    ///
    /// Handed out as a slice: there is always one material per element.
    pub fn materials_mut(&mut self) -> Tracked<'_, [Material]> {
        Tracked::new(self.materials.as_mut_slice(), &mut self.version)
    }

    /// First source carrying `semantic`.
    #[must_use]
    pub fn source(&self, semantic: Semantic) -> Option<&GeometrySource> {
        self.sources.iter().find(|s| s.semantic == semantic)
    }

    /// Number of vertices, taken from the position source.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.source(Semantic::Vertex)
            .map_or(0, GeometrySource::vector_count)
    }

    /// Bounding sphere of the position source, centred on its bounding box.
    #[must_use]
    pub fn bounding_sphere(&self) -> Option<BoundingSphere> {
        let source = self.source(Semantic::Vertex)?;
        let count = source.vector_count();
        if count == 0 {
            return None;
        }
        let points: Vec<Vec3> = (0..count).filter_map(|i| source.vec3_at(i)).collect();
        let (min, max) = points.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(min, max), p| (min.min(*p), max.max(*p)),
        );
        let center = (min + max) * 0.5;
        let radius = points
            .iter()
            .map(|p| p.distance(center))
            .fold(0.0_f32, f32::max);
        Some(BoundingSphere { center, radius })
    }
}

impl Clone for Geometry {
    /// Clones receive a fresh identity so edits to the copy never alias the
    /// original's GPU state.
    fn clone(&self) -> Self {
        Self {
            id: NEXT_GEOMETRY_ID.fetch_add(1, Ordering::Relaxed),
            name: self.name.clone(),
            sources: self.sources.clone(),
            elements: self.elements.clone(),
            materials: self.materials.clone(),
            program: self.program.clone(),
            version: next_version(),
        }
    }
}
