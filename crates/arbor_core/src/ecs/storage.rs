//! # Component Storage
//!
//! Sparse/dense component pools. One pool per registered component type.
//!
//! The storage uses a sparse set strategy:
//! - `dense`: contiguous component values, no gaps
//! - `dense_to_entity`: owner of each dense slot
//! - `sparse`: indexed by raw entity id, holds the dense index or `NONE`
//!
//! Add, remove, lookup and membership are O(1). Iteration walks the dense
//! array linearly. Removal swaps the last element into the hole, so dense
//! order is not meaningful after removals.

use std::any::Any;

use super::component::Component;
use super::entity::EntityId;
use crate::error::{EcsError, EcsResult};

/// Sparse slot value meaning "no component".
const NONE: u32 = u32::MAX;

/// Sparse/dense storage for a single component type.
///
/// # Type Parameters
///
/// * `T` - The component type to store
///
/// # Example
///
/// ```rust,ignore
/// let mut pool: ComponentPool<Name> = ComponentPool::new();
/// pool.add(entity, Name::new("root"))?;
/// assert!(pool.has(entity));
/// ```
#[derive(Debug)]
pub struct ComponentPool<T> {
    dense: Vec<T>,
    dense_to_entity: Vec<EntityId>,
    sparse: Vec<u32>,
}

impl<T: Component> Default for ComponentPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> ComponentPool<T> {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dense: Vec::new(),
            dense_to_entity: Vec::new(),
            sparse: Vec::new(),
        }
    }

    /// Creates an empty pool whose sparse array covers `capacity` ids.
    ///
    /// Dense storage is not reserved; most pools hold far fewer
    /// components than there are entities.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            dense: Vec::new(),
            dense_to_entity: Vec::new(),
            sparse: vec![NONE; capacity],
        }
    }

    #[inline]
    fn slot(&self, entity: EntityId) -> Option<usize> {
        match self.sparse.get(entity.index()) {
            Some(&slot) if slot != NONE => Some(slot as usize),
            _ => None,
        }
    }

    /// Attaches `value` to `entity`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::DuplicateComponent`] if the entity already has one
    /// - [`EcsError::EntityNotFound`] if `entity` is the null sentinel
    pub fn add(&mut self, entity: EntityId, value: T) -> EcsResult<()> {
        if entity.is_null() {
            return Err(EcsError::EntityNotFound(entity));
        }
        if self.has(entity) {
            return Err(EcsError::DuplicateComponent {
                entity,
                type_name: std::any::type_name::<T>(),
            });
        }

        let index = entity.index();
        if index >= self.sparse.len() {
            let new_len = (index + 1).max(self.sparse.len() * 2);
            self.sparse.resize(new_len, NONE);
        }

        // Dense length is bounded by the number of distinct ids, all < u32::MAX.
        #[allow(clippy::cast_possible_truncation)]
        let slot = self.dense.len() as u32;
        self.sparse[index] = slot;
        self.dense.push(value);
        self.dense_to_entity.push(entity);
        Ok(())
    }

    /// Gets the component of `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotFound`] if absent.
    #[inline]
    pub fn get(&self, entity: EntityId) -> EcsResult<&T> {
        self.try_get(entity).ok_or_else(|| EcsError::missing::<T>(entity))
    }

    /// Gets the component of `entity` mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotFound`] if absent.
    #[inline]
    pub fn get_mut(&mut self, entity: EntityId) -> EcsResult<&mut T> {
        self.try_get_mut(entity)
            .ok_or_else(|| EcsError::missing::<T>(entity))
    }

    /// Gets the component of `entity`, or `None` if absent.
    #[inline]
    #[must_use]
    pub fn try_get(&self, entity: EntityId) -> Option<&T> {
        self.slot(entity).map(|slot| &self.dense[slot])
    }

    /// Gets the component of `entity` mutably, or `None` if absent.
    #[inline]
    pub fn try_get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.slot(entity).map(|slot| &mut self.dense[slot])
    }

    /// Detaches and returns the component of `entity`.
    ///
    /// The last dense element moves into the vacated slot and its sparse
    /// entry is repointed; no other element moves.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotFound`] if absent.
    pub fn remove(&mut self, entity: EntityId) -> EcsResult<T> {
        let slot = self
            .slot(entity)
            .ok_or_else(|| EcsError::missing::<T>(entity))?;

        let value = self.dense.swap_remove(slot);
        self.dense_to_entity.swap_remove(slot);
        self.sparse[entity.index()] = NONE;

        if let Some(&moved) = self.dense_to_entity.get(slot) {
            #[allow(clippy::cast_possible_truncation)]
            {
                self.sparse[moved.index()] = slot as u32;
            }
        }
        Ok(value)
    }

    /// Checks whether `entity` has a component here. Never fails.
    #[inline]
    #[must_use]
    pub fn has(&self, entity: EntityId) -> bool {
        self.slot(entity).is_some()
    }

    /// Number of stored components.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Returns true if no component is stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Owner of dense slot `index`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IndexOutOfRange`] if `index >= len()`.
    #[inline]
    pub fn dense_to_entity(&self, index: usize) -> EcsResult<EntityId> {
        self.dense_to_entity
            .get(index)
            .copied()
            .ok_or(EcsError::IndexOutOfRange {
                index,
                len: self.dense_to_entity.len(),
            })
    }

    /// Owners of every dense slot, in dense order.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.dense_to_entity
    }

    /// All components, in dense order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.dense
    }

    /// All components mutably, in dense order.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.dense
    }

    /// Iterates `(owner, component)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.dense_to_entity.iter().copied().zip(self.dense.iter())
    }

    /// Iterates `(owner, component)` pairs mutably in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.dense_to_entity
            .iter()
            .copied()
            .zip(self.dense.iter_mut())
    }

    /// Purges `entity` if present.
    ///
    /// # Returns
    ///
    /// `true` if a component was removed.
    pub fn on_entity_destroyed(&mut self, entity: EntityId) -> bool {
        self.has(entity) && self.remove(entity).is_ok()
    }

    /// Removes every component, keeping the allocations.
    pub fn clear(&mut self) {
        self.dense.clear();
        self.dense_to_entity.clear();
        self.sparse.fill(NONE);
    }
}

// =============================================================================
// Type erasure
// =============================================================================

/// Object-safe face of a [`ComponentPool`], used by the registry to hold
/// pools of different types side by side.
pub trait AnyPool: Any {
    /// Upcast for downcasting back to the concrete pool.
    fn as_any(&self) -> &dyn Any;
    /// Mutable upcast for downcasting back to the concrete pool.
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Purges `entity` if present. Idempotent.
    fn on_entity_destroyed(&mut self, entity: EntityId) -> bool;
    /// Membership check without knowing the component type.
    fn has(&self, entity: EntityId) -> bool;
    /// Number of stored components.
    fn len(&self) -> usize;
    /// Returns true if no component is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Name of the stored component type.
    fn type_name(&self) -> &'static str;
}

impl<T: Component> AnyPool for ComponentPool<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn on_entity_destroyed(&mut self, entity: EntityId) -> bool {
        ComponentPool::on_entity_destroyed(self, entity)
    }

    fn has(&self, entity: EntityId) -> bool {
        ComponentPool::has(self, entity)
    }

    fn len(&self) -> usize {
        ComponentPool::len(self)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}
