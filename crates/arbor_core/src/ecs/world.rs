//! # ECS World
//!
//! The front door of the runtime: owns the entity allocator, every
//! component pool and every system instance.
//!
//! Hierarchy, transform and blueprint operations are implemented on
//! `World` in the `scene` module.

use std::any::TypeId;

use tracing::debug;

use super::component::{Camera, Component, Drawable3D, Light, Name};
use super::entity::{EntityAllocator, EntityId};
use super::registry::{Components, System, Systems};
use super::view::{View, ViewSet};
use crate::config::WorldConfig;
use crate::error::{EcsError, EcsResult};
use crate::scene::{Hierarchy, Transform, TransformPropagator};

/// The ECS World - single owner of all entity and component state.
///
/// # Example
///
/// ```rust,ignore
/// let mut world = World::new();
///
/// let root = world.create_entity_3d(None, Transform::IDENTITY, Some("root"))?;
/// world.get_transform_ref(root)?.set_position(Vec3::new(5.0, 0.0, 0.0));
///
/// world.update(1.0 / 60.0)?;
/// world.post_update();
/// ```
pub struct World {
    pub(crate) allocator: EntityAllocator,
    pub(crate) components: Components,
    pub(crate) systems: Systems,
    config: WorldConfig,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates a world with the default configuration: default components
    /// and the transform propagator pre-registered.
    #[must_use]
    pub fn new() -> Self {
        Self::build(WorldConfig::default())
    }

    /// Creates a world from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the configuration fails
    /// validation.
    pub fn with_config(config: WorldConfig) -> EcsResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: WorldConfig) -> Self {
        let mut components = Components::with_capacity(config.entity_capacity);
        let mut systems = Systems::new();

        if config.register_defaults {
            // Both registries are fresh.
            components.insert::<Transform>();
            components.insert::<Hierarchy>();
            components.insert::<Light>();
            components.insert::<Drawable3D>();
            components.insert::<Name>();
            components.insert::<Camera>();
            systems.insert(TransformPropagator::with_buckets(
                config.depth_buckets,
                config.entity_capacity,
            ));
        }

        debug!(
            capacity = config.entity_capacity,
            defaults = config.register_defaults,
            "world created"
        );

        Self {
            allocator: EntityAllocator::with_capacity(config.entity_capacity),
            components,
            systems,
            config,
        }
    }

    /// The configuration this world was built with.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers a component type.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::AlreadyRegistered`] on duplicate registration.
    pub fn register_component<T: Component>(&mut self) -> EcsResult<()> {
        self.components.register::<T>()
    }

    /// Registers a system instance. Systems update in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::AlreadyRegistered`] on duplicate registration.
    pub fn register_system<S: System>(&mut self, system: S) -> EcsResult<()> {
        self.systems.register(system)
    }

    /// Borrows the registered instance of `S`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TypeNotRegistered`] if `S` is not registered.
    pub fn get_system<S: System>(&self) -> EcsResult<&S> {
        self.systems.get::<S>()
    }

    /// Borrows the registered instance of `S` mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TypeNotRegistered`] if `S` is not registered.
    pub fn get_system_mut<S: System>(&mut self) -> EcsResult<&mut S> {
        self.systems.get_mut::<S>()
    }

    /// The component registry, for read access to whole pools.
    #[must_use]
    pub const fn components(&self) -> &Components {
        &self.components
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Creates a bare entity with no components.
    pub fn create_entity(&mut self) -> EntityId {
        self.allocator.create()
    }

    /// Checks whether `entity` is alive.
    #[inline]
    #[must_use]
    pub fn exists(&self, entity: EntityId) -> bool {
        self.allocator.exists(entity)
    }

    /// Number of alive entities.
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }

    /// Iterates every alive entity in ascending id order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.allocator.alive()
    }

    pub(crate) fn ensure_exists(&self, entity: EntityId) -> EcsResult<()> {
        if self.exists(entity) {
            Ok(())
        } else {
            Err(EcsError::EntityNotFound(entity))
        }
    }

    /// Parent/sibling links are only rewritten by the graph operations.
    fn ensure_unprotected<T: Component>() -> EcsResult<()> {
        if TypeId::of::<T>() == TypeId::of::<Hierarchy>() {
            return Err(EcsError::ProtectedComponent {
                type_name: std::any::type_name::<T>(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Attaches `value` to `entity`.
    ///
    /// Hierarchy records are attached by [`World::create_entity_3d`] only.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`], [`EcsError::TypeNotRegistered`],
    /// [`EcsError::DuplicateComponent`] or, for `Hierarchy`,
    /// [`EcsError::ProtectedComponent`].
    pub fn add_component<T: Component>(&mut self, entity: EntityId, value: T) -> EcsResult<()> {
        Self::ensure_unprotected::<T>()?;
        self.ensure_exists(entity)?;
        self.components.add(entity, value)
    }

    /// Gets `entity`'s `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::TypeNotRegistered`] or [`EcsError::ComponentNotFound`].
    pub fn get_component<T: Component>(&self, entity: EntityId) -> EcsResult<&T> {
        self.components.get(entity)
    }

    /// Gets `entity`'s `T` mutably.
    ///
    /// Use [`World::get_transform_ref`] for transforms so the change is
    /// scheduled for propagation, and [`World::reparent_entity`] for links.
    ///
    /// # Errors
    ///
    /// [`EcsError::TypeNotRegistered`], [`EcsError::ComponentNotFound`] or,
    /// for `Hierarchy`, [`EcsError::ProtectedComponent`].
    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> EcsResult<&mut T> {
        Self::ensure_unprotected::<T>()?;
        self.components.get_mut(entity)
    }

    /// Detaches and returns `entity`'s `T`.
    ///
    /// A `Hierarchy` cannot be detached; use [`World::destroy_entity`] to
    /// take an entity out of the tree.
    ///
    /// # Errors
    ///
    /// [`EcsError::TypeNotRegistered`], [`EcsError::ComponentNotFound`] or,
    /// for `Hierarchy`, [`EcsError::ProtectedComponent`].
    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> EcsResult<T> {
        Self::ensure_unprotected::<T>()?;
        self.components.remove(entity)
    }

    /// Checks whether `entity` has a `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TypeNotRegistered`] if `T` has no pool.
    pub fn has_component<T: Component>(&self, entity: EntityId) -> EcsResult<bool> {
        self.components.has::<T>(entity)
    }

    /// Builds a read-only view over every entity owning all of `Q`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TypeNotRegistered`] if any type in `Q` has no pool.
    pub fn view<Q: ViewSet>(&self) -> EcsResult<View<'_, Q>> {
        View::new(&self.components)
    }

    /// First entity whose [`Name`] equals `name`, in dense order.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.view::<(Name,)>()
            .ok()?
            .find(|(_, (candidate,))| candidate.as_str() == name)
            .map(|(entity, _)| entity)
    }

    // =========================================================================
    // Frame tick
    // =========================================================================

    /// Runs every system's `update` in registration order.
    ///
    /// # Returns
    ///
    /// The changed-entity lists of all systems, concatenated in order. With
    /// the default set this is the propagator's recomputed entities.
    ///
    /// # Errors
    ///
    /// Returns the first system error.
    pub fn update(&mut self, delta_time: f32) -> EcsResult<Vec<EntityId>> {
        self.systems.update_all(&mut self.components, delta_time)
    }

    /// Runs every system's `post_update`. Must precede the next frame's
    /// mutations.
    pub fn post_update(&mut self) {
        self.systems.post_update_all();
    }
}
