#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Scene-graph renderer.
//!
//! Draws a presentation tree of nodes (geometry, lights, cameras, skinners)
//! with a shading program specialized to the scene's light configuration,
//! and answers ray hit tests against the same world-space geometry.

pub mod errors;
pub mod hit_test;
pub mod renderer;
pub mod resources;
pub mod scene;

pub use errors::{PrismError, Result};
pub use hit_test::{HitTestOptions, HitTestResult, SearchMode};
pub use renderer::{DrawTarget, GpuContext, Renderer, RendererSettings};
pub use resources::{
    CustomProgram, Geometry, GeometryElement, GeometrySource, Material, PrimitiveType, Semantic,
    TextureSlot,
};
pub use scene::{Camera, Light, LightType, NodeKey, Scene, SceneNode, Skinner, Viewport};
