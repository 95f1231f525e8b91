//! # Scene Graph
//!
//! Spatial layer on top of the ECS: transforms, the parent/child graph,
//! depth-bucketed world matrix propagation, model blueprints and renderer
//! extraction.

mod blueprint;
mod extract;
mod hierarchy;
mod propagator;
mod transform;

pub use blueprint::{MeshCollection, Model, ModelNode, SubMesh};
pub use extract::InstanceData;
pub use hierarchy::{Children, Hierarchy};
pub use propagator::TransformPropagator;
pub use transform::{quat_from_euler_degrees, Transform, TransformHandle};
