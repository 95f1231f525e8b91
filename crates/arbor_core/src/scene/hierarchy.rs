//! # Hierarchy Graph
//!
//! Parent/child relation stored inline as a [`Hierarchy`] component: each
//! node knows its parent, its first child and its two siblings, forming an
//! intrusive doubly linked child list per parent.
//!
//! ## Invariants
//!
//! 1. Every child list is a valid doubly linked list rooted at the parent's
//!    `first_child`
//! 2. `depth == parent.depth + 1`, or `0` for roots
//! 3. The parent graph is acyclic
//!
//! Links are only rewritten by the graph operations on [`World`]. Cycle
//! checks always run before any link is touched, so a failed operation
//! leaves the graph unchanged.

use tracing::debug;

use super::propagator::TransformPropagator;
use super::transform::{Transform, TransformHandle};
use crate::ecs::{Component, ComponentPool, EntityId, Name, World};
use crate::error::{EcsError, EcsResult};

/// Per-entity hierarchy record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hierarchy {
    pub(crate) parent: EntityId,
    pub(crate) first_child: EntityId,
    pub(crate) next_sibling: EntityId,
    pub(crate) prev_sibling: EntityId,
    pub(crate) depth: usize,
}

impl Component for Hierarchy {}

impl Default for Hierarchy {
    fn default() -> Self {
        Self {
            parent: EntityId::NULL,
            first_child: EntityId::NULL,
            next_sibling: EntityId::NULL,
            prev_sibling: EntityId::NULL,
            depth: 0,
        }
    }
}

impl Hierarchy {
    /// The parent, or `None` for roots.
    #[inline]
    #[must_use]
    pub const fn parent(&self) -> Option<EntityId> {
        self.parent.to_option()
    }

    /// Most recently attached child.
    #[inline]
    #[must_use]
    pub const fn first_child(&self) -> Option<EntityId> {
        self.first_child.to_option()
    }

    /// Next sibling in the parent's child list.
    #[inline]
    #[must_use]
    pub const fn next_sibling(&self) -> Option<EntityId> {
        self.next_sibling.to_option()
    }

    /// Previous sibling in the parent's child list.
    #[inline]
    #[must_use]
    pub const fn prev_sibling(&self) -> Option<EntityId> {
        self.prev_sibling.to_option()
    }

    /// Distance in parent links to the root.
    #[inline]
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Returns true if the entity has no parent.
    #[inline]
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent.is_null()
    }
}

// =============================================================================
// Link surgery
// =============================================================================

/// Detaches `entity` from its parent's child list. Depth is left as is.
fn unlink(pool: &mut ComponentPool<Hierarchy>, entity: EntityId) -> EcsResult<()> {
    let node = *pool.get(entity)?;

    if let Some(prev) = node.prev_sibling.to_option() {
        pool.get_mut(prev)?.next_sibling = node.next_sibling;
    } else if let Some(parent) = node.parent.to_option() {
        pool.get_mut(parent)?.first_child = node.next_sibling;
    }
    if let Some(next) = node.next_sibling.to_option() {
        pool.get_mut(next)?.prev_sibling = node.prev_sibling;
    }

    let node = pool.get_mut(entity)?;
    node.parent = EntityId::NULL;
    node.next_sibling = EntityId::NULL;
    node.prev_sibling = EntityId::NULL;
    Ok(())
}

/// Inserts an unlinked `entity` as the new first child of `parent`
/// (`NULL` makes it a root). Returns the depth the entity now belongs at.
fn link(pool: &mut ComponentPool<Hierarchy>, entity: EntityId, parent: EntityId) -> EcsResult<usize> {
    let (depth, old_first) = match parent.to_option() {
        Some(parent) => {
            let parent_node = pool.get_mut(parent)?;
            let old_first = parent_node.first_child;
            parent_node.first_child = entity;
            (parent_node.depth + 1, old_first)
        }
        None => (0, EntityId::NULL),
    };

    if let Some(old_first) = old_first.to_option() {
        pool.get_mut(old_first)?.prev_sibling = entity;
    }

    let node = pool.get_mut(entity)?;
    node.parent = parent;
    node.next_sibling = old_first;
    node.prev_sibling = EntityId::NULL;
    Ok(depth)
}

/// Direct children of one entity, most recently attached first.
pub struct Children<'w> {
    hierarchies: &'w ComponentPool<Hierarchy>,
    cursor: EntityId,
}

impl<'w> Children<'w> {
    fn of(hierarchies: &'w ComponentPool<Hierarchy>, entity: EntityId) -> Self {
        Self {
            hierarchies,
            cursor: hierarchies
                .try_get(entity)
                .map_or(EntityId::NULL, |node| node.first_child),
        }
    }
}

impl Iterator for Children<'_> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        let current = self.cursor.to_option()?;
        self.cursor = self
            .hierarchies
            .try_get(current)
            .map_or(EntityId::NULL, |node| node.next_sibling);
        Some(current)
    }
}

// =============================================================================
// Graph operations
// =============================================================================

impl World {
    /// Creates a spatial entity with a [`Transform`] and a [`Hierarchy`],
    /// optionally named, and schedules it for propagation.
    ///
    /// # Arguments
    ///
    /// * `parent` - Parent entity, or `None` for a depth-0 root
    /// * `transform` - Local transform relative to the parent
    /// * `name` - Optional [`Name`] component
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotFound`] if `parent` is not alive
    /// - [`EcsError::ComponentNotFound`] if `parent` has no `Hierarchy`
    /// - [`EcsError::TypeNotRegistered`] if a required pool or the
    ///   propagator is missing
    ///
    /// Nothing is allocated when an error is returned.
    pub fn create_entity_3d(
        &mut self,
        parent: Option<EntityId>,
        transform: Transform,
        name: Option<&str>,
    ) -> EcsResult<EntityId> {
        self.components.require::<Transform>()?;
        self.components.require::<Hierarchy>()?;
        if name.is_some() {
            self.components.require::<Name>()?;
        }
        self.systems.require::<TransformPropagator>()?;
        if let Some(parent) = parent {
            self.ensure_exists(parent)?;
            self.components.pool::<Hierarchy>()?.get(parent)?;
        }

        let entity = self.allocator.create();
        self.components.add(entity, transform)?;

        let hierarchies = self.components.pool_mut::<Hierarchy>()?;
        hierarchies.add(entity, Hierarchy::default())?;
        let depth = link(hierarchies, entity, parent.unwrap_or(EntityId::NULL))?;
        hierarchies.get_mut(entity)?.depth = depth;

        if let Some(name) = name {
            self.components.add(entity, Name::new(name))?;
        }
        self.systems
            .get_mut::<TransformPropagator>()?
            .enqueue_at(entity, depth);
        Ok(entity)
    }

    /// Moves `entity` (and its subtree) under `new_parent`, or makes it a
    /// root when `new_parent` is `None`. No-op if the parent is unchanged.
    ///
    /// On success every depth in the moved subtree is updated and `entity`
    /// is scheduled for propagation; its descendants follow during the pass.
    ///
    /// # Errors
    ///
    /// - [`EcsError::SelfParenting`] if `new_parent == entity`
    /// - [`EcsError::CycleDetected`] if `new_parent` is below `entity`
    /// - [`EcsError::EntityNotFound`] if either entity is not alive
    /// - [`EcsError::ComponentNotFound`] if either has no `Hierarchy`
    ///
    /// The graph is unchanged when an error is returned.
    pub fn reparent_entity(&mut self, entity: EntityId, new_parent: Option<EntityId>) -> EcsResult<()> {
        self.ensure_exists(entity)?;
        if let Some(parent) = new_parent {
            self.ensure_exists(parent)?;
        }

        let target = new_parent.unwrap_or(EntityId::NULL);
        let propagator = self.systems.get_mut::<TransformPropagator>()?;
        let hierarchies = self.components.pool_mut::<Hierarchy>()?;

        let node = *hierarchies.get(entity)?;
        if node.parent == target {
            return Ok(());
        }
        if target == entity {
            return Err(EcsError::SelfParenting(entity));
        }

        // Walk up from the new parent before touching any link.
        let mut cursor = target;
        while let Some(ancestor) = cursor.to_option() {
            if ancestor == entity {
                return Err(EcsError::CycleDetected {
                    entity,
                    new_parent: target,
                });
            }
            cursor = hierarchies.get(ancestor)?.parent;
        }

        unlink(hierarchies, entity)?;
        let new_depth = link(hierarchies, entity, target)?;

        if new_depth != node.depth {
            let mut worklist = vec![(entity, new_depth)];
            while let Some((current, depth)) = worklist.pop() {
                let record = hierarchies.get_mut(current)?;
                let old_depth = record.depth;
                record.depth = depth;
                propagator.rebucket(current, old_depth, depth);

                let mut child = record.first_child;
                while let Some(next) = child.to_option() {
                    worklist.push((next, depth + 1));
                    child = hierarchies.get(next)?.next_sibling;
                }
            }
        }

        propagator.enqueue_at(entity, new_depth);
        debug!(%entity, new_parent = %target, depth = new_depth, "reparented entity");
        Ok(())
    }

    /// Destroys `entity`. No-op if it does not exist.
    ///
    /// With `recurse`, the whole subtree is destroyed, deepest first.
    /// Without it, every direct child is first reparented to `entity`'s
    /// own parent. Every pool is purged of each destroyed id before the id
    /// returns to the allocator.
    ///
    /// # Errors
    ///
    /// Only on a broken hierarchy (a linked entity missing its record).
    pub fn destroy_entity(&mut self, entity: EntityId, recurse: bool) -> EcsResult<()> {
        if !self.exists(entity) {
            debug!(%entity, "destroy of missing entity ignored");
            return Ok(());
        }

        let node = self
            .components
            .pool::<Hierarchy>()
            .ok()
            .and_then(|pool| pool.try_get(entity))
            .copied();
        let Some(node) = node else {
            self.release(entity, 0)?;
            debug!(%entity, "destroyed entity");
            return Ok(());
        };

        if recurse {
            let mut doomed = vec![entity];
            doomed.extend(self.descendants(entity)?);
            // Reverse pre-order puts every child before its parent.
            for &current in doomed.iter().rev() {
                self.detach_and_release(current)?;
            }
            debug!(%entity, count = doomed.len(), "destroyed subtree");
        } else {
            let children: Vec<_> = self.children(entity)?.collect();
            for &child in &children {
                self.reparent_entity(child, node.parent())?;
            }
            self.detach_and_release(entity)?;
            debug!(%entity, orphans = children.len(), "destroyed entity, children moved up");
        }
        Ok(())
    }

    fn detach_and_release(&mut self, entity: EntityId) -> EcsResult<()> {
        let hierarchies = self.components.pool_mut::<Hierarchy>()?;
        let depth = hierarchies.get(entity)?.depth;
        unlink(hierarchies, entity)?;
        self.release(entity, depth)
    }

    fn release(&mut self, entity: EntityId, depth: usize) -> EcsResult<()> {
        if let Ok(propagator) = self.systems.get_mut::<TransformPropagator>() {
            propagator.forget(entity, depth);
        }
        self.components.purge(entity);
        self.allocator.free(entity)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Direct children of `entity`, most recently attached first. Empty for
    /// entities without a `Hierarchy`.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] or [`EcsError::TypeNotRegistered`].
    pub fn children(&self, entity: EntityId) -> EcsResult<Children<'_>> {
        self.ensure_exists(entity)?;
        Ok(Children::of(self.components.pool::<Hierarchy>()?, entity))
    }

    /// Parent of `entity`, if any.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] or [`EcsError::TypeNotRegistered`].
    pub fn parent(&self, entity: EntityId) -> EcsResult<Option<EntityId>> {
        self.ensure_exists(entity)?;
        Ok(self
            .components
            .pool::<Hierarchy>()?
            .try_get(entity)
            .and_then(Hierarchy::parent))
    }

    /// Hierarchy depth of `entity`; `0` for entities without a `Hierarchy`.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] or [`EcsError::TypeNotRegistered`].
    pub fn depth(&self, entity: EntityId) -> EcsResult<usize> {
        self.ensure_exists(entity)?;
        Ok(self
            .components
            .pool::<Hierarchy>()?
            .try_get(entity)
            .map_or(0, Hierarchy::depth))
    }

    /// Ancestors of `entity`, nearest first.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] or [`EcsError::TypeNotRegistered`].
    pub fn ancestors(&self, entity: EntityId) -> EcsResult<Vec<EntityId>> {
        self.ensure_exists(entity)?;
        let hierarchies = self.components.pool::<Hierarchy>()?;

        let mut found = Vec::new();
        let mut cursor = hierarchies
            .try_get(entity)
            .map_or(EntityId::NULL, |node| node.parent);
        while let Some(ancestor) = cursor.to_option() {
            found.push(ancestor);
            cursor = hierarchies.get(ancestor)?.parent;
        }
        Ok(found)
    }

    /// Every descendant of `entity` in pre-order, excluding `entity`.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] or [`EcsError::TypeNotRegistered`].
    pub fn descendants(&self, entity: EntityId) -> EcsResult<Vec<EntityId>> {
        self.ensure_exists(entity)?;
        let hierarchies = self.components.pool::<Hierarchy>()?;

        let mut found = Vec::new();
        let mut stack: Vec<EntityId> = Children::of(hierarchies, entity).collect();
        stack.reverse();
        while let Some(current) = stack.pop() {
            found.push(current);
            let start = stack.len();
            stack.extend(Children::of(hierarchies, current));
            stack[start..].reverse();
        }
        Ok(found)
    }

    /// Opens a scoped write handle on `entity`'s transform. Mutations made
    /// through it are scheduled for propagation when it drops.
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotFound`] if `entity` is not alive
    /// - [`EcsError::ComponentNotFound`] if it has no `Transform`
    /// - [`EcsError::TypeNotRegistered`] if the propagator is missing
    pub fn get_transform_ref(&mut self, entity: EntityId) -> EcsResult<TransformHandle<'_>> {
        self.ensure_exists(entity)?;
        let depth = self
            .components
            .pool::<Hierarchy>()
            .ok()
            .and_then(|pool| pool.try_get(entity))
            .map_or(0, Hierarchy::depth);

        let propagator = self.systems.get_mut::<TransformPropagator>()?;
        let transform = self.components.get_mut::<Transform>(entity)?;
        Ok(TransformHandle::new(entity, depth, transform, propagator))
    }
}
