//! Shader program generation.
//!
//! - [`shader_manager`]: template environment and GPU module cache
//! - [`shader_gen`]: light configuration -> WGSL
//! - [`compiler`]: naga-backed compile, link and reflection
//! - [`specializer`]: variant cache keyed by light counts

pub mod compiler;
pub mod shader_gen;
pub mod shader_manager;
pub mod specializer;

pub use compiler::{FRAGMENT_ENTRY, ProgramReflection, ReflectedBinding, VERTEX_ENTRY};
pub use shader_gen::{MAX_LIGHT_VECTORS, ShaderGenerator};
pub use shader_manager::{ShaderManager, ShaderTemplates};
pub use specializer::{CompiledProgram, ProgramKey, ShaderSpecializer};
