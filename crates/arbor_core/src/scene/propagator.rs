//! # Transform Propagation
//!
//! Depth-bucketed dirty scheduler that recomputes world matrices top-down.
//!
//! ## Algorithm
//!
//! Dirty entities sit in `buckets[depth]`. A pass walks the buckets in
//! ascending depth. For each entity it composes the parent's world matrix
//! (already final, since the parent is shallower) with the local TRS, then
//! enqueues every direct child one bucket further down. Dirtiness thus
//! cascades without a separate "mark subtree" walk.
//!
//! The bucket vector grows while it is being traversed, so both loops are
//! index-based and re-read the length every step.

use tracing::{debug, trace, warn};

use super::hierarchy::Hierarchy;
use super::transform::Transform;
use crate::ecs::{ComponentPool, Components, EntityId, EntitySet, System};
use crate::error::EcsResult;

/// Per-frame transform propagation system.
///
/// An entity is either clean or pending in exactly one bucket. The
/// registered set mirrors bucket membership and suppresses double enqueues.
#[derive(Debug, Default)]
pub struct TransformPropagator {
    buckets: Vec<Vec<EntityId>>,
    registered: EntitySet,
}

impl TransformPropagator {
    /// Creates an empty propagator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a propagator with `depths` buckets pre-created and room for
    /// `capacity` entity ids in the registered set.
    #[must_use]
    pub fn with_buckets(depths: usize, capacity: usize) -> Self {
        Self {
            buckets: (0..depths).map(|_| Vec::new()).collect(),
            registered: EntitySet::with_capacity(capacity),
        }
    }

    /// Schedules `entity` at its current hierarchy depth.
    ///
    /// Entities without a [`Hierarchy`] are treated as roots.
    ///
    /// # Returns
    ///
    /// `false` if the entity was already pending.
    pub fn enqueue(&mut self, entity: EntityId, hierarchies: &ComponentPool<Hierarchy>) -> bool {
        let depth = hierarchies.try_get(entity).map_or(0, Hierarchy::depth);
        self.enqueue_at(entity, depth)
    }

    /// Schedules `entity` in the bucket for `depth`.
    ///
    /// `depth` must be the entity's current hierarchy depth.
    pub fn enqueue_at(&mut self, entity: EntityId, depth: usize) -> bool {
        if entity.is_null() || !self.registered.insert(entity) {
            return false;
        }
        if depth >= self.buckets.len() {
            self.buckets.resize_with(depth + 1, Vec::new);
        }
        self.buckets[depth].push(entity);
        trace!(%entity, depth, "enqueued for propagation");
        true
    }

    /// Checks whether `entity` is pending.
    #[inline]
    #[must_use]
    pub fn is_pending(&self, entity: EntityId) -> bool {
        self.registered.contains(entity)
    }

    /// Number of pending entities.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> usize {
        self.registered.len()
    }

    /// Number of depth buckets currently allocated.
    #[inline]
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Drops a pending entity, e.g. because it is being destroyed.
    ///
    /// # Returns
    ///
    /// `true` if the entity was pending.
    pub fn forget(&mut self, entity: EntityId, depth: usize) -> bool {
        if !self.registered.remove(entity) {
            return false;
        }
        self.take_from_bucket(entity, depth);
        true
    }

    /// Moves a pending entity whose depth changed from `old_depth` to
    /// `new_depth`. No-op for clean entities.
    pub fn rebucket(&mut self, entity: EntityId, old_depth: usize, new_depth: usize) -> bool {
        if old_depth == new_depth || !self.registered.contains(entity) {
            return false;
        }
        self.take_from_bucket(entity, old_depth);
        if new_depth >= self.buckets.len() {
            self.buckets.resize_with(new_depth + 1, Vec::new);
        }
        self.buckets[new_depth].push(entity);
        true
    }

    fn take_from_bucket(&mut self, entity: EntityId, depth_hint: usize) {
        let hinted = self
            .buckets
            .get(depth_hint)
            .and_then(|bucket| bucket.iter().position(|&e| e == entity))
            .map(|index| (depth_hint, index));

        // Fall back to a full scan if the caller's depth was stale.
        let found = hinted.or_else(|| {
            self.buckets.iter().enumerate().find_map(|(depth, bucket)| {
                bucket
                    .iter()
                    .position(|&e| e == entity)
                    .map(|index| (depth, index))
            })
        });

        if let Some((depth, index)) = found {
            self.buckets[depth].remove(index);
        }
    }

    /// Runs one propagation pass.
    ///
    /// # Returns
    ///
    /// Every recomputed entity, parents always before their children.
    pub fn propagate(
        &mut self,
        transforms: &mut ComponentPool<Transform>,
        hierarchies: &ComponentPool<Hierarchy>,
    ) -> Vec<EntityId> {
        let mut processed = Vec::with_capacity(self.registered.len());
        let mut touched = 0usize;

        let mut depth = 0;
        while depth < self.buckets.len() {
            if !self.buckets[depth].is_empty() {
                touched += 1;
            }

            let mut index = 0;
            while index < self.buckets[depth].len() {
                let entity = self.buckets[depth][index];
                index += 1;

                let node = hierarchies.try_get(entity);
                let parent_world = node
                    .and_then(Hierarchy::parent)
                    .and_then(|parent| transforms.try_get(parent))
                    .map(Transform::world_matrix);

                let Some(transform) = transforms.try_get_mut(entity) else {
                    warn!(%entity, "transform vanished before propagation, skipping");
                    continue;
                };
                let local = transform.local_matrix();
                transform.set_world_matrix(parent_world.map_or(local, |parent| parent * local));
                processed.push(entity);

                let Some(node) = node else {
                    continue;
                };
                let mut cursor = node.first_child;
                while let Some(child) = cursor.to_option() {
                    let Some(child_node) = hierarchies.try_get(child) else {
                        break;
                    };
                    self.enqueue_at(child, child_node.depth);
                    cursor = child_node.next_sibling;
                }
            }
            depth += 1;
        }

        debug!(
            recomputed = processed.len(),
            buckets = touched,
            "transform propagation pass"
        );
        processed
    }

    /// Empties every bucket and the registered set. Idempotent.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.registered.clear();
    }
}

impl System for TransformPropagator {
    fn update(&mut self, components: &mut Components, _delta_time: f32) -> EcsResult<Vec<EntityId>> {
        let (transforms, hierarchies) = components.pool_pair_mut::<Transform, Hierarchy>()?;
        Ok(self.propagate(transforms, hierarchies))
    }

    fn post_update(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};

    fn e(raw: u32) -> EntityId {
        EntityId::new(raw)
    }

    /// Root e(0) with children e(1), e(2); e(3) under e(1).
    fn tree() -> (ComponentPool<Transform>, ComponentPool<Hierarchy>) {
        let mut transforms = ComponentPool::new();
        let mut hierarchies = ComponentPool::new();
        let nodes = [
            (e(0), EntityId::NULL, e(2), EntityId::NULL, EntityId::NULL, 0),
            (e(1), e(0), e(3), EntityId::NULL, e(2), 1),
            (e(2), e(0), EntityId::NULL, e(1), EntityId::NULL, 1),
            (e(3), e(1), EntityId::NULL, EntityId::NULL, EntityId::NULL, 2),
        ];
        for (entity, parent, first_child, next_sibling, prev_sibling, depth) in nodes {
            hierarchies
                .add(
                    entity,
                    Hierarchy {
                        parent,
                        first_child,
                        next_sibling,
                        prev_sibling,
                        depth,
                    },
                )
                .unwrap();
            transforms
                .add(entity, Transform::from_position(Vec3::X * (entity.raw() as f32 + 1.0)))
                .unwrap();
        }
        (transforms, hierarchies)
    }

    #[test]
    fn test_enqueue_is_deduplicated() {
        let mut propagator = TransformPropagator::new();
        assert!(propagator.enqueue_at(e(4), 2));
        assert!(!propagator.enqueue_at(e(4), 2));
        assert!(!propagator.enqueue_at(EntityId::NULL, 0));
        assert_eq!(propagator.pending(), 1);
        assert_eq!(propagator.bucket_count(), 3);
    }

    #[test]
    fn test_enqueue_reads_depth() {
        let (_, hierarchies) = tree();
        let mut propagator = TransformPropagator::new();
        propagator.enqueue(e(3), &hierarchies);
        assert_eq!(propagator.bucket_count(), 3);
    }

    #[test]
    fn test_root_pass_cascades_to_every_descendant() {
        let (mut transforms, hierarchies) = tree();
        let mut propagator = TransformPropagator::with_buckets(1, 8);
        propagator.enqueue(e(0), &hierarchies);

        let order = propagator.propagate(&mut transforms, &hierarchies);
        assert_eq!(order, vec![e(0), e(2), e(1), e(3)]);

        // e(3) = 1 + 2 + 4 along +X.
        let world = transforms.get(e(3)).unwrap().world_position();
        assert!(world.abs_diff_eq(Vec3::new(7.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_child_only_pass_uses_cached_parent() {
        let (mut transforms, hierarchies) = tree();
        let mut propagator = TransformPropagator::new();
        propagator.enqueue(e(0), &hierarchies);
        propagator.propagate(&mut transforms, &hierarchies);
        propagator.clear();

        transforms.get_mut(e(2)).unwrap().position = Vec3::Y;
        propagator.enqueue(e(2), &hierarchies);
        let order = propagator.propagate(&mut transforms, &hierarchies);

        assert_eq!(order, vec![e(2)]);
        let world = transforms.get(e(2)).unwrap().world_matrix();
        let expected = Mat4::from_translation(Vec3::X) * Mat4::from_translation(Vec3::Y);
        assert!(world.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn test_vanished_transform_is_skipped() {
        let (mut transforms, hierarchies) = tree();
        let mut propagator = TransformPropagator::new();
        propagator.enqueue(e(2), &hierarchies);
        transforms.remove(e(2)).unwrap();

        assert!(propagator.propagate(&mut transforms, &hierarchies).is_empty());
    }

    #[test]
    fn test_forget_and_rebucket() {
        let mut propagator = TransformPropagator::new();
        propagator.enqueue_at(e(1), 1);
        propagator.enqueue_at(e(2), 1);

        assert!(propagator.rebucket(e(1), 1, 4));
        assert!(!propagator.rebucket(e(9), 0, 2));
        assert_eq!(propagator.bucket_count(), 5);

        // A stale depth hint still finds the entity.
        assert!(propagator.forget(e(1), 0));
        assert!(!propagator.forget(e(1), 4));
        assert!(!propagator.is_pending(e(1)));
        assert_eq!(propagator.pending(), 1);

        let (mut transforms, hierarchies) = tree();
        assert_eq!(propagator.propagate(&mut transforms, &hierarchies), vec![e(2)]);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut propagator = TransformPropagator::new();
        propagator.enqueue_at(e(0), 0);
        propagator.clear();
        propagator.clear();
        assert_eq!(propagator.pending(), 0);
        assert!(propagator.enqueue_at(e(0), 0));
    }
}
