//! # ARBOR Core Runtime
//!
//! Entity/component runtime with a parent/child scene graph:
//! - Sparse/dense component pools registered at runtime
//! - Entity id allocation with recycling
//! - Cycle-safe reparenting over an intrusive sibling list
//! - Depth-bucketed world transform propagation, parents before children
//!
//! ## Frame Rules
//!
//! 1. **Mutate through handles** - transform writes go through
//!    [`TransformHandle`], which schedules propagation on drop
//! 2. **Update, then post-update** - [`World::update`] recomputes world
//!    matrices, [`World::post_update`] resets the dirty buckets
//! 3. **Read after update** - world matrices are valid for entities that
//!    are not pending
//!
//! ## Example
//!
//! ```rust,ignore
//! use arbor_core::{Transform, World};
//! use glam::Vec3;
//!
//! let mut world = World::new();
//! let root = world.create_entity_3d(None, Transform::IDENTITY, Some("root"))?;
//! let child = world.create_entity_3d(Some(root), Transform::from_position(Vec3::X), None)?;
//!
//! world.update(1.0 / 60.0)?;
//! world.post_update();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod scene;

pub use config::WorldConfig;
pub use ecs::{
    AnyPool, Camera, Component, ComponentPool, Components, Drawable3D, EntityAllocator, EntityId,
    EntitySet, Light, LightKind, Name, System, Systems, View, ViewSet, World,
};
pub use error::{EcsError, EcsResult};
pub use scene::{
    quat_from_euler_degrees, Children, Hierarchy, InstanceData, MeshCollection, Model, ModelNode,
    SubMesh, Transform, TransformHandle, TransformPropagator,
};
