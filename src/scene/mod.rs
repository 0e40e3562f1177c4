//! Presentation tree consumed by the renderer.
//!
//! - [`Scene`]: node arena with a single root
//! - [`SceneNode`]: resolved world transform plus optional attachments
//! - [`Light`], [`Camera`], [`Skinner`]: attachment data

pub mod camera;
pub mod light;
pub mod node;
pub mod scene;
pub mod skinner;

pub use camera::{Camera, Frustum, Projection, Viewport};
pub use light::{Light, LightType, SpotCone};
pub use node::SceneNode;
pub use scene::Scene;
pub use skinner::{MAX_SKINNING_JOINTS, Skinner};

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeKey;
}
