//! # Entity Management
//!
//! Entities are plain integer identifiers. They carry no data of their own;
//! meaning comes entirely from the components attached to them.
//!
//! Identifiers are recycled: once an entity is destroyed its id returns to
//! the allocator's free set and may be handed out again by a later creation.

use std::fmt;

use super::bitset::EntitySet;
use crate::error::{EcsError, EcsResult};

/// Unique identifier for an entity.
///
/// A raw 32-bit index into the sparse side of every component pool.
/// `u32::MAX` is reserved as the "no entity" sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// Null/invalid entity ID.
    pub const NULL: Self = Self(u32::MAX);

    /// Creates an entity ID from its raw index.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw 32-bit value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the id as an index into sparse arrays.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Checks if this entity ID is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u32::MAX
    }

    /// Converts the sentinel into `None`.
    #[inline]
    #[must_use]
    pub const fn to_option(self) -> Option<Self> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("#null")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Issues and recycles entity identifiers.
///
/// An id is alive iff it is below the high-water mark and not in the free
/// set. Freed ids are reused LIFO; callers must not rely on any ordering.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    /// High-water mark: every id below it has been issued at least once.
    next: u32,
    /// Stack of ids available for reuse.
    free: Vec<EntityId>,
    /// Membership mirror of `free` for O(1) liveness checks.
    free_set: EntitySet,
}

impl EntityAllocator {
    /// Creates an empty allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allocator with room reserved for `capacity` ids.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            next: 0,
            free: Vec::with_capacity(capacity / 4),
            free_set: EntitySet::with_capacity(capacity),
        }
    }

    /// Issues an entity id, preferring a previously freed one.
    ///
    /// # Panics
    ///
    /// Panics if all `u32::MAX - 1` ids are alive at once.
    pub fn create(&mut self) -> EntityId {
        if let Some(id) = self.free.pop() {
            self.free_set.remove(id);
            return id;
        }

        assert!(self.next < u32::MAX, "entity id space exhausted");
        let id = EntityId(self.next);
        self.next += 1;
        id
    }

    /// Checks whether `id` is currently alive.
    #[inline]
    #[must_use]
    pub fn exists(&self, id: EntityId) -> bool {
        id.0 < self.next && !self.free_set.contains(id)
    }

    /// Returns `id` to the free set.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if `id` is already free or was
    /// never issued.
    pub fn free(&mut self, id: EntityId) -> EcsResult<()> {
        if !self.exists(id) {
            return Err(EcsError::EntityNotFound(id));
        }
        self.free_set.insert(id);
        self.free.push(id);
        Ok(())
    }

    /// Number of currently alive entities.
    #[inline]
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.next as usize - self.free.len()
    }

    /// Iterates every alive id in ascending order.
    pub fn alive(&self) -> impl Iterator<Item = EntityId> + '_ {
        (0..self.next)
            .map(EntityId)
            .filter(|id| !self.free_set.contains(*id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sentinel() {
        assert!(EntityId::NULL.is_null());
        assert_eq!(EntityId::default(), EntityId::NULL);
        assert_eq!(EntityId::NULL.to_option(), None);
        assert_eq!(EntityId::new(3).to_option(), Some(EntityId::new(3)));
        assert_eq!(EntityId::NULL.to_string(), "#null");
    }

    #[test]
    fn test_create_is_sequential_until_free() {
        let mut alloc = EntityAllocator::new();
        let a = alloc.create();
        let b = alloc.create();
        assert_eq!(a, EntityId::new(0));
        assert_eq!(b, EntityId::new(1));
        assert_eq!(alloc.alive_count(), 2);
    }

    #[test]
    fn test_free_and_recycle() {
        let mut alloc = EntityAllocator::with_capacity(16);
        let a = alloc.create();
        let b = alloc.create();

        alloc.free(a).unwrap();
        assert!(!alloc.exists(a));
        assert!(alloc.exists(b));

        let c = alloc.create();
        assert_eq!(c, a);
        assert!(alloc.exists(c));
        assert_eq!(alloc.create(), EntityId::new(2));
    }

    #[test]
    fn test_double_free_is_rejected() {
        let mut alloc = EntityAllocator::new();
        let a = alloc.create();
        alloc.free(a).unwrap();
        assert_eq!(alloc.free(a), Err(EcsError::EntityNotFound(a)));
        assert_eq!(
            alloc.free(EntityId::new(40)),
            Err(EcsError::EntityNotFound(EntityId::new(40)))
        );
    }

    #[test]
    fn test_exists_bounds() {
        let mut alloc = EntityAllocator::new();
        assert!(!alloc.exists(EntityId::new(0)));
        assert!(!alloc.exists(EntityId::NULL));
        let a = alloc.create();
        assert!(alloc.exists(a));
    }

    #[test]
    fn test_alive_iteration_skips_free() {
        let mut alloc = EntityAllocator::new();
        let ids: Vec<_> = (0..5).map(|_| alloc.create()).collect();
        alloc.free(ids[1]).unwrap();
        alloc.free(ids[3]).unwrap();

        let alive: Vec<_> = alloc.alive().collect();
        assert_eq!(alive, vec![ids[0], ids[2], ids[4]]);
    }
}
