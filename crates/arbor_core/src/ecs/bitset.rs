//! # Entity Bitset
//!
//! Growable one-bit-per-entity membership set. Backs the allocator's free
//! set and the propagator's "already scheduled" set.
//!
//! ## Performance
//!
//! - `insert` / `remove` / `contains`: O(1), single bit operation
//! - `clear`: O(n/64) where n = highest id ever inserted

use super::entity::EntityId;

/// Bitset keyed by entity id. 64 entities per word.
#[derive(Clone, Debug, Default)]
pub struct EntitySet {
    /// 1 = member, 0 = absent.
    bits: Vec<u64>,
    /// Cached member count.
    len: usize,
}

impl EntitySet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty set with words reserved for `capacity` entities.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bits: vec![0u64; capacity.div_ceil(64)],
            len: 0,
        }
    }

    /// Adds `entity`, growing the word array if needed.
    ///
    /// # Returns
    ///
    /// `true` if the entity was not already a member.
    #[inline]
    pub fn insert(&mut self, entity: EntityId) -> bool {
        let (word, mask) = Self::locate(entity);
        if word >= self.bits.len() {
            // Double to keep growth amortized.
            let new_len = (word + 1).max(self.bits.len() * 2);
            self.bits.resize(new_len, 0);
        }

        let was_clear = self.bits[word] & mask == 0;
        self.bits[word] |= mask;
        if was_clear {
            self.len += 1;
        }
        was_clear
    }

    /// Removes `entity`.
    ///
    /// # Returns
    ///
    /// `true` if the entity was a member.
    #[inline]
    pub fn remove(&mut self, entity: EntityId) -> bool {
        let (word, mask) = Self::locate(entity);
        match self.bits.get_mut(word) {
            Some(bits) if *bits & mask != 0 => {
                *bits &= !mask;
                self.len -= 1;
                true
            }
            _ => false,
        }
    }

    /// Checks membership. Out-of-range ids are never members.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        let (word, mask) = Self::locate(entity);
        self.bits.get(word).is_some_and(|bits| bits & mask != 0)
    }

    /// Number of members.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the set has no members.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes every member, keeping the allocation.
    pub fn clear(&mut self) {
        if self.len == 0 {
            return;
        }
        self.bits.fill(0);
        self.len = 0;
    }

    #[inline]
    const fn locate(entity: EntityId) -> (usize, u64) {
        let index = entity.index();
        (index / 64, 1u64 << (index % 64))
    }
}
