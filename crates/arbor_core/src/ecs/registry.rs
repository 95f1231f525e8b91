//! # Type Registry
//!
//! Runtime type maps from a component or system type to its single
//! instance. Each map keys a `Vec` slot by `TypeId`; generic accessors
//! resolve the slot and downcast back to the concrete type.
//!
//! Pools are stored in a `Vec` rather than directly in the map so that two
//! distinct pools can be borrowed mutably at once via `split_at_mut`.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use tracing::debug;

use super::component::Component;
use super::entity::EntityId;
use super::storage::{AnyPool, ComponentPool};
use crate::error::{EcsError, EcsResult};

// =============================================================================
// Component pools
// =============================================================================

/// One [`ComponentPool`] per registered component type.
#[derive(Default)]
pub struct Components {
    index: HashMap<TypeId, usize>,
    pools: Vec<Box<dyn AnyPool>>,
    /// Sparse capacity handed to newly registered pools.
    capacity: usize,
}

impl Components {
    /// Creates an empty registry whose pools pre-size their sparse arrays
    /// to `capacity` entities.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            index: HashMap::new(),
            pools: Vec::new(),
            capacity,
        }
    }

    /// Creates the pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::AlreadyRegistered`] if `T` already has a pool.
    pub fn register<T: Component>(&mut self) -> EcsResult<()> {
        let type_id = TypeId::of::<T>();
        if self.index.contains_key(&type_id) {
            return Err(EcsError::AlreadyRegistered {
                type_name: std::any::type_name::<T>(),
            });
        }

        self.insert::<T>();
        Ok(())
    }

    /// Adds the pool for `T` without the duplicate check. Only for
    /// registries known not to hold `T` yet.
    pub(crate) fn insert<T: Component>(&mut self) {
        self.index.insert(TypeId::of::<T>(), self.pools.len());
        self.pools
            .push(Box::new(ComponentPool::<T>::with_capacity(self.capacity)));
        debug!(component = std::any::type_name::<T>(), "registered component");
    }

    /// Checks whether `T` has a pool.
    #[inline]
    #[must_use]
    pub fn is_registered<T: Component>(&self) -> bool {
        self.index.contains_key(&TypeId::of::<T>())
    }

    /// Fails unless `T` has a pool.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TypeNotRegistered`] if `T` has no pool.
    #[inline]
    pub fn require<T: Component>(&self) -> EcsResult<()> {
        self.slot::<T>().map(|_| ())
    }

    /// Number of registered component types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Returns true if no component type is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    #[inline]
    fn slot<T: Component>(&self) -> EcsResult<usize> {
        self.index
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or_else(EcsError::not_registered::<T>)
    }

    /// Borrows the pool for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TypeNotRegistered`] if `T` has no pool.
    pub fn pool<T: Component>(&self) -> EcsResult<&ComponentPool<T>> {
        let slot = self.slot::<T>()?;
        downcast_ref(self.pools[slot].as_any())
    }

    /// Borrows the pool for `T` mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TypeNotRegistered`] if `T` has no pool.
    pub fn pool_mut<T: Component>(&mut self) -> EcsResult<&mut ComponentPool<T>> {
        let slot = self.slot::<T>()?;
        downcast_mut(self.pools[slot].as_any_mut())
    }

    /// Borrows the pools for two distinct types mutably at once.
    ///
    /// # Errors
    ///
    /// - [`EcsError::TypeNotRegistered`] if either type has no pool
    /// - [`EcsError::AliasedPools`] if `A` and `B` are the same type
    pub fn pool_pair_mut<A: Component, B: Component>(
        &mut self,
    ) -> EcsResult<(&mut ComponentPool<A>, &mut ComponentPool<B>)> {
        let a = self.slot::<A>()?;
        let b = self.slot::<B>()?;

        let (first, second) = match a.cmp(&b) {
            std::cmp::Ordering::Less => {
                let (left, right) = self.pools.split_at_mut(b);
                (&mut left[a], &mut right[0])
            }
            std::cmp::Ordering::Greater => {
                let (left, right) = self.pools.split_at_mut(a);
                (&mut right[0], &mut left[b])
            }
            std::cmp::Ordering::Equal => {
                return Err(EcsError::AliasedPools {
                    type_name: std::any::type_name::<A>(),
                })
            }
        };

        Ok((
            downcast_mut(first.as_any_mut())?,
            downcast_mut(second.as_any_mut())?,
        ))
    }

    /// Attaches `value` to `entity` in `T`'s pool.
    ///
    /// # Errors
    ///
    /// [`EcsError::TypeNotRegistered`] or [`EcsError::DuplicateComponent`].
    pub fn add<T: Component>(&mut self, entity: EntityId, value: T) -> EcsResult<()> {
        self.pool_mut::<T>()?.add(entity, value)
    }

    /// Gets `entity`'s `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::TypeNotRegistered`] or [`EcsError::ComponentNotFound`].
    pub fn get<T: Component>(&self, entity: EntityId) -> EcsResult<&T> {
        self.pool::<T>()?.get(entity)
    }

    /// Gets `entity`'s `T` mutably.
    ///
    /// # Errors
    ///
    /// [`EcsError::TypeNotRegistered`] or [`EcsError::ComponentNotFound`].
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> EcsResult<&mut T> {
        self.pool_mut::<T>()?.get_mut(entity)
    }

    /// Detaches and returns `entity`'s `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::TypeNotRegistered`] or [`EcsError::ComponentNotFound`].
    pub fn remove<T: Component>(&mut self, entity: EntityId) -> EcsResult<T> {
        self.pool_mut::<T>()?.remove(entity)
    }

    /// Checks whether `entity` has a `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TypeNotRegistered`] if `T` has no pool.
    pub fn has<T: Component>(&self, entity: EntityId) -> EcsResult<bool> {
        Ok(self.pool::<T>()?.has(entity))
    }

    /// Purges `entity` from every pool.
    ///
    /// # Returns
    ///
    /// Number of components removed.
    pub fn purge(&mut self, entity: EntityId) -> usize {
        self.pools
            .iter_mut()
            .map(|pool| usize::from(pool.on_entity_destroyed(entity)))
            .sum()
    }

    /// Names of every registered component type, in registration order.
    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.pools.iter().map(|pool| pool.type_name())
    }
}

fn downcast_ref<T: Component>(pool: &dyn Any) -> EcsResult<&ComponentPool<T>> {
    pool.downcast_ref::<ComponentPool<T>>()
        .ok_or_else(EcsError::not_registered::<T>)
}

fn downcast_mut<T: Component>(pool: &mut dyn Any) -> EcsResult<&mut ComponentPool<T>> {
    pool.downcast_mut::<ComponentPool<T>>()
        .ok_or_else(EcsError::not_registered::<T>)
}

// =============================================================================
// Systems
// =============================================================================

/// Per-frame logic that runs over the component pools.
///
/// `update` runs once per frame, followed later by `post_update` once all
/// systems have updated.
pub trait System: 'static {
    /// Advances the system by one frame.
    ///
    /// # Returns
    ///
    /// Entities the system changed this pass, in processing order.
    ///
    /// # Errors
    ///
    /// Implementation-defined; usually a missing pool.
    fn update(&mut self, components: &mut Components, delta_time: f32)
        -> EcsResult<Vec<EntityId>>;

    /// Resets per-frame state. Called after every system has updated.
    fn post_update(&mut self) {}
}

/// Object-safe face of a [`System`].
trait AnySystem {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn run(&mut self, components: &mut Components, delta_time: f32) -> EcsResult<Vec<EntityId>>;
    fn finish(&mut self);
}

impl<S: System> AnySystem for S {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn run(&mut self, components: &mut Components, delta_time: f32) -> EcsResult<Vec<EntityId>> {
        self.update(components, delta_time)
    }

    fn finish(&mut self) {
        self.post_update();
    }
}

/// One instance per registered system type, run in registration order.
#[derive(Default)]
pub struct Systems {
    index: HashMap<TypeId, usize>,
    systems: Vec<Box<dyn AnySystem>>,
}

impl Systems {
    /// Creates an empty system registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `system` as the single instance of `S`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::AlreadyRegistered`] if `S` is already present.
    pub fn register<S: System>(&mut self, system: S) -> EcsResult<()> {
        let type_id = TypeId::of::<S>();
        if self.index.contains_key(&type_id) {
            return Err(EcsError::AlreadyRegistered {
                type_name: std::any::type_name::<S>(),
            });
        }

        self.insert(system);
        Ok(())
    }

    /// Adds `system` without the duplicate check. Only for registries
    /// known not to hold `S` yet.
    pub(crate) fn insert<S: System>(&mut self, system: S) {
        self.index.insert(TypeId::of::<S>(), self.systems.len());
        self.systems.push(Box::new(system));
        debug!(system = std::any::type_name::<S>(), "registered system");
    }

    /// Checks whether `S` is registered.
    #[must_use]
    pub fn is_registered<S: System>(&self) -> bool {
        self.index.contains_key(&TypeId::of::<S>())
    }

    /// Fails unless `S` is registered.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TypeNotRegistered`] if `S` is not registered.
    pub fn require<S: System>(&self) -> EcsResult<()> {
        if self.is_registered::<S>() {
            Ok(())
        } else {
            Err(EcsError::not_registered::<S>())
        }
    }

    /// Number of registered systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Returns true if no system is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Borrows the instance of `S`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TypeNotRegistered`] if `S` is not registered.
    pub fn get<S: System>(&self) -> EcsResult<&S> {
        self.index
            .get(&TypeId::of::<S>())
            .and_then(|&slot| self.systems[slot].as_any().downcast_ref::<S>())
            .ok_or_else(EcsError::not_registered::<S>)
    }

    /// Borrows the instance of `S` mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TypeNotRegistered`] if `S` is not registered.
    pub fn get_mut<S: System>(&mut self) -> EcsResult<&mut S> {
        let slot = self
            .index
            .get(&TypeId::of::<S>())
            .copied()
            .ok_or_else(EcsError::not_registered::<S>)?;
        self.systems[slot]
            .as_any_mut()
            .downcast_mut::<S>()
            .ok_or_else(EcsError::not_registered::<S>)
    }

    /// Runs `update` on every system in registration order.
    ///
    /// # Returns
    ///
    /// The changed-entity lists of every system, concatenated in order.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first system error.
    pub fn update_all(
        &mut self,
        components: &mut Components,
        delta_time: f32,
    ) -> EcsResult<Vec<EntityId>> {
        let mut changed = Vec::new();
        for system in &mut self.systems {
            changed.extend(system.run(components, delta_time)?);
        }
        Ok(changed)
    }

    /// Runs `post_update` on every system in registration order.
    pub fn post_update_all(&mut self) {
        for system in &mut self.systems {
            system.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Speed(f32);
    impl Component for Speed {}

    #[derive(Debug, PartialEq)]
    struct Tag;
    impl Component for Tag {}

    #[derive(Default)]
    struct Counter {
        ticks: u32,
        resets: u32,
    }

    impl System for Counter {
        fn update(&mut self, components: &mut Components, _dt: f32) -> EcsResult<Vec<EntityId>> {
            self.ticks += 1;
            Ok(components.pool::<Speed>()?.entities().to_vec())
        }

        fn post_update(&mut self) {
            self.resets += 1;
        }
    }

    #[test]
    fn test_register_twice_fails() {
        let mut components = Components::default();
        components.register::<Speed>().unwrap();
        assert!(matches!(
            components.register::<Speed>(),
            Err(EcsError::AlreadyRegistered { .. })
        ));
        assert_eq!(components.len(), 1);
    }

    #[test]
    fn test_unregistered_access_fails() {
        let mut components = Components::default();
        let e = EntityId::new(0);
        assert!(matches!(
            components.add(e, Speed(1.0)),
            Err(EcsError::TypeNotRegistered { .. })
        ));
        assert!(matches!(components.has::<Speed>(e), Err(EcsError::TypeNotRegistered { .. })));
        assert!(matches!(components.get::<Speed>(e), Err(EcsError::TypeNotRegistered { .. })));
    }

    #[test]
    fn test_typed_forwarding() {
        let mut components = Components::with_capacity(8);
        components.register::<Speed>().unwrap();
        let e = EntityId::new(2);

        components.add(e, Speed(3.0)).unwrap();
        assert_eq!(components.has::<Speed>(e), Ok(true));
        components.get_mut::<Speed>(e).unwrap().0 = 4.0;
        assert_eq!(components.get::<Speed>(e), Ok(&Speed(4.0)));
        assert_eq!(components.remove::<Speed>(e), Ok(Speed(4.0)));
        assert_eq!(components.has::<Speed>(e), Ok(false));
    }

    #[test]
    fn test_purge_touches_every_pool() {
        let mut components = Components::default();
        components.register::<Speed>().unwrap();
        components.register::<Tag>().unwrap();
        let e = EntityId::new(1);
        components.add(e, Speed(1.0)).unwrap();
        components.add(e, Tag).unwrap();

        assert_eq!(components.purge(e), 2);
        assert_eq!(components.purge(e), 0);
    }

    #[test]
    fn test_pool_pair_mut_both_orders() {
        let mut components = Components::default();
        components.register::<Speed>().unwrap();
        components.register::<Tag>().unwrap();
        let e = EntityId::new(0);

        {
            let (speeds, tags) = components.pool_pair_mut::<Speed, Tag>().unwrap();
            speeds.add(e, Speed(1.0)).unwrap();
            tags.add(e, Tag).unwrap();
        }
        let (tags, speeds) = components.pool_pair_mut::<Tag, Speed>().unwrap();
        assert!(tags.has(e));
        assert_eq!(speeds.get(e), Ok(&Speed(1.0)));

        assert!(matches!(
            components.pool_pair_mut::<Speed, Speed>(),
            Err(EcsError::AliasedPools { .. })
        ));
    }

    #[test]
    fn test_type_names_in_registration_order() {
        let mut components = Components::default();
        components.register::<Tag>().unwrap();
        components.register::<Speed>().unwrap();
        let names: Vec<_> = components.type_names().collect();
        assert!(names[0].ends_with("Tag"));
        assert!(names[1].ends_with("Speed"));
    }

    #[test]
    fn test_systems_run_and_reset() {
        let mut components = Components::default();
        components.register::<Speed>().unwrap();
        components.add(EntityId::new(5), Speed(0.0)).unwrap();

        let mut systems = Systems::new();
        systems.register(Counter::default()).unwrap();
        assert!(matches!(
            systems.register(Counter::default()),
            Err(EcsError::AlreadyRegistered { .. })
        ));

        let changed = systems.update_all(&mut components, 0.016).unwrap();
        assert_eq!(changed, vec![EntityId::new(5)]);
        systems.post_update_all();

        let counter = systems.get::<Counter>().unwrap();
        assert_eq!((counter.ticks, counter.resets), (1, 1));
    }

    #[test]
    fn test_system_error_propagates() {
        let mut components = Components::default();
        let mut systems = Systems::new();
        systems.register(Counter::default()).unwrap();

        assert!(matches!(
            systems.update_all(&mut components, 0.0),
            Err(EcsError::TypeNotRegistered { .. })
        ));
    }
}
