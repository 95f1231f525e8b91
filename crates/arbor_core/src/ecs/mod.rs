//! # Entity Component System
//!
//! Sparse-set ECS with runtime component registration.
//!
//! ## Design Philosophy
//!
//! - One sparse/dense pool per component type, owned by a type-keyed registry
//! - Entity ids are plain indices, recycled after destruction
//! - Multi-component queries are driven by the smallest pool
//! - Single-threaded; the `World` is the only owner of component memory

mod bitset;
mod component;
mod entity;
mod registry;
mod storage;
mod view;
mod world;

pub use bitset::EntitySet;
pub use component::{Camera, Component, Drawable3D, Light, LightKind, Name};
pub use entity::{EntityAllocator, EntityId};
pub use registry::{Components, System, Systems};
pub use storage::{AnyPool, ComponentPool};
pub use view::{View, ViewSet};
pub use world::World;
