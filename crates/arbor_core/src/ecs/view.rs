//! # Views
//!
//! Read-only iteration over every entity that owns a given set of
//! components. A view drives its loop from the smallest participating pool
//! and probes the others, so a pass costs O(smallest pool) rather than
//! O(all entities).
//!
//! ```rust,ignore
//! for (entity, (transform, drawable)) in world.view::<(Transform, Drawable3D)>()? {
//!     // ...
//! }
//! ```
//!
//! A view borrows the registry immutably and is single-pass; build a new
//! one for every traversal.

use super::component::Component;
use super::entity::EntityId;
use super::registry::Components;
use super::storage::ComponentPool;
use crate::error::EcsResult;

/// A tuple of component types that can be viewed together.
///
/// Implemented for tuples of one to six [`Component`] types.
pub trait ViewSet {
    /// Borrowed pools, one per component type.
    type Pools<'w>: Copy;
    /// Yielded references, one per component type.
    type Item<'w>;

    /// Resolves every pool in the set.
    ///
    /// # Errors
    ///
    /// Returns `TypeNotRegistered` for the first missing pool.
    fn fetch(components: &Components) -> EcsResult<Self::Pools<'_>>;

    /// Dense entity list of the smallest pool.
    fn driver<'w>(pools: Self::Pools<'w>) -> &'w [EntityId];

    /// Every component of `entity`, or `None` if any is missing.
    fn get<'w>(pools: Self::Pools<'w>, entity: EntityId) -> Option<Self::Item<'w>>;
}

macro_rules! impl_view_set {
    ($($ty:ident : $pool:ident),+) => {
        impl<$($ty: Component),+> ViewSet for ($($ty,)+) {
            type Pools<'w> = ($(&'w ComponentPool<$ty>,)+);
            type Item<'w> = ($(&'w $ty,)+);

            fn fetch(components: &Components) -> EcsResult<Self::Pools<'_>> {
                Ok(($(components.pool::<$ty>()?,)+))
            }

            fn driver<'w>(pools: Self::Pools<'w>) -> &'w [EntityId] {
                let ($($pool,)+) = pools;
                [$($pool.entities()),+]
                    .into_iter()
                    .min_by_key(|entities| entities.len())
                    .unwrap_or(&[])
            }

            fn get<'w>(pools: Self::Pools<'w>, entity: EntityId) -> Option<Self::Item<'w>> {
                let ($($pool,)+) = pools;
                Some(($($pool.try_get(entity)?,)+))
            }
        }
    };
}

impl_view_set!(A: a);
impl_view_set!(A: a, B: b);
impl_view_set!(A: a, B: b, C: c);
impl_view_set!(A: a, B: b, C: c, D: d);
impl_view_set!(A: a, B: b, C: c, D: d, E: e);
impl_view_set!(A: a, B: b, C: c, D: d, E: e, F: f);

/// Lazy intersection of several component pools.
///
/// Yields `(entity, (&A, &B, ...))` for every entity owning all of them,
/// in the dense order of the smallest pool.
pub struct View<'w, Q: ViewSet> {
    pools: Q::Pools<'w>,
    driver: &'w [EntityId],
    cursor: usize,
}

impl<'w, Q: ViewSet> View<'w, Q> {
    /// Builds a view over `components`.
    ///
    /// # Errors
    ///
    /// Returns `TypeNotRegistered` if any viewed type has no pool.
    pub fn new(components: &'w Components) -> EcsResult<Self> {
        let pools = Q::fetch(components)?;
        Ok(Self {
            pools,
            driver: Q::driver(pools),
            cursor: 0,
        })
    }

    /// Size of the pool driving the iteration; an upper bound on the
    /// number of yielded items.
    #[must_use]
    pub fn driver_len(&self) -> usize {
        self.driver.len()
    }
}

impl<'w, Q: ViewSet> Iterator for View<'w, Q> {
    type Item = (EntityId, Q::Item<'w>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&entity) = self.driver.get(self.cursor) {
            self.cursor += 1;
            if let Some(item) = Q::get(self.pools, entity) {
                return Some((entity, item));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.driver.len() - self.cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Pos(i32);
    impl Component for Pos {}

    #[derive(Debug, PartialEq)]
    struct Vel(i32);
    impl Component for Vel {}

    #[derive(Debug, PartialEq)]
    struct Frozen;
    impl Component for Frozen {}

    fn e(raw: u32) -> EntityId {
        EntityId::new(raw)
    }

    fn setup() -> Components {
        let mut components = Components::default();
        components.register::<Pos>().unwrap();
        components.register::<Vel>().unwrap();
        components.register::<Frozen>().unwrap();

        for raw in 0..10 {
            components.add(e(raw), Pos(raw as i32)).unwrap();
        }
        for raw in [2, 4, 6] {
            components.add(e(raw), Vel(raw as i32 * 10)).unwrap();
        }
        components.add(e(4), Frozen).unwrap();
        components
    }

    #[test]
    fn test_single_pool_view() {
        let components = setup();
        let view = View::<(Pos,)>::new(&components).unwrap();
        assert_eq!(view.count(), 10);
    }

    #[test]
    fn test_intersection_yields_only_complete_entities() {
        let components = setup();
        let found: Vec<_> = View::<(Pos, Vel)>::new(&components)
            .unwrap()
            .map(|(entity, (pos, vel))| (entity, pos.0, vel.0))
            .collect();

        assert_eq!(found, vec![(e(2), 2, 20), (e(4), 4, 40), (e(6), 6, 60)]);
    }

    #[test]
    fn test_driver_is_smallest_pool() {
        let components = setup();
        let view = View::<(Pos, Vel, Frozen)>::new(&components).unwrap();
        assert_eq!(view.driver_len(), 1);

        let view = View::<(Vel, Pos)>::new(&components).unwrap();
        assert_eq!(view.driver_len(), 3);
    }

    #[test]
    fn test_three_way_intersection() {
        let components = setup();
        let found: Vec<_> = View::<(Pos, Vel, Frozen)>::new(&components)
            .unwrap()
            .map(|(entity, _)| entity)
            .collect();
        assert_eq!(found, vec![e(4)]);
    }

    #[test]
    fn test_view_of_unregistered_type_fails() {
        #[derive(Debug)]
        struct Unknown;
        impl Component for Unknown {}

        let components = setup();
        assert!(View::<(Pos, Unknown)>::new(&components).is_err());
    }

    #[test]
    fn test_view_reflects_removals() {
        let mut components = setup();
        components.remove::<Vel>(e(2)).unwrap();
        let found: Vec<_> = View::<(Vel, Pos)>::new(&components)
            .unwrap()
            .map(|(entity, _)| entity)
            .collect();
        // Swap-removal moved e(6) into e(2)'s slot.
        assert_eq!(found, vec![e(6), e(4)]);
    }
}
