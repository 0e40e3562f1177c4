pub mod geometry;
pub mod material;
pub mod program;
pub mod uniforms;
pub mod version_tracker;

pub use geometry::{
    BoundingSphere, Geometry, GeometryElement, GeometrySource, IndexWidth, PrimitiveType, Semantic,
};
pub use material::{Material, TEXTURE_SLOT_COUNT, TextureSlot, TextureSlots};
pub use program::CustomProgram;
pub use uniforms::{GlobalUniforms, MaterialUniforms, SkinUniforms, WgslStruct};
pub use version_tracker::Tracked;
