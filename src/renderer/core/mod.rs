//! wgpu-backed half of the renderer.
//!
//! - [`GpuContext`]: device, queue and target formats
//! - [`GpuState`]: layouts, programs, geometry buffers and frame encoding

pub mod context;
pub mod draw;
pub mod geometry_state;
pub mod layouts;
pub mod program;
pub mod texture;

pub use context::GpuContext;
pub use draw::{DrawTarget, GpuState};
pub use geometry_state::{GeometryCache, GeometryKey, IndexData, element_indices, interleave_vertices};
