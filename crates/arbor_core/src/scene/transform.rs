//! # Transforms
//!
//! Local TRS plus the cached world matrix, and the scoped handle through
//! which callers mutate it.
//!
//! ## Rules
//!
//! 1. The world matrix is derived state, written only by the propagator
//! 2. Every mutation goes through a [`TransformHandle`], which schedules
//!    the entity for recomputation when it goes out of scope

use glam::{EulerRot, Mat3, Mat4, Quat, Vec3};

use super::propagator::TransformPropagator;
use crate::ecs::{Component, EntityId};

/// Spatial component: local position, rotation and scale, plus the world
/// matrix computed from them during the last propagation pass.
///
/// The world matrix is only meaningful while the entity is not pending
/// recomputation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Local translation relative to the parent.
    pub position: Vec3,
    /// Local rotation relative to the parent. Kept normalized.
    pub rotation: Quat,
    /// Local scale.
    pub scale: Vec3,
    world_matrix: Mat4,
}

impl Component for Transform {}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// Identity transform at the origin.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
        world_matrix: Mat4::IDENTITY,
    };

    /// Creates a transform from TRS parts.
    #[must_use]
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation: rotation.normalize(),
            scale,
            world_matrix: Mat4::IDENTITY,
        }
    }

    /// Creates a transform translated to `position`.
    #[must_use]
    pub const fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Returns a copy with `rotation`.
    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation.normalize();
        self
    }

    /// Returns a copy with `scale`.
    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Local matrix, `T * R * S`.
    #[inline]
    #[must_use]
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// World matrix committed by the last propagation pass.
    #[inline]
    #[must_use]
    pub const fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    /// Translation part of the world matrix.
    #[inline]
    #[must_use]
    pub fn world_position(&self) -> Vec3 {
        self.world_matrix.w_axis.truncate()
    }

    /// Local forward axis (-Z).
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Local right axis (+X).
    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Local up axis (+Y).
    #[must_use]
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Rotation as `(pitch_x, yaw_y, roll_z)` in degrees.
    #[must_use]
    pub fn euler_degrees(&self) -> Vec3 {
        let (yaw, pitch, roll) = self.rotation.to_euler(EulerRot::YXZ);
        Vec3::new(pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees())
    }

    #[inline]
    pub(crate) fn set_world_matrix(&mut self, world: Mat4) {
        self.world_matrix = world;
    }
}

/// Builds a rotation from `(pitch_x, yaw_y, roll_z)` degrees.
#[must_use]
pub fn quat_from_euler_degrees(degrees: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        degrees.y.to_radians(),
        degrees.x.to_radians(),
        degrees.z.to_radians(),
    )
}

// =============================================================================
// Scoped handle
// =============================================================================

/// Exclusive write-back accessor for one entity's [`Transform`].
///
/// Mutators write straight into the component and mark the handle dirty.
/// When a dirty handle is dropped it enqueues its entity for propagation
/// exactly once, so a mutation can never be left unscheduled.
///
/// Obtained from `World::get_transform_ref`.
pub struct TransformHandle<'w> {
    entity: EntityId,
    depth: usize,
    transform: &'w mut Transform,
    propagator: &'w mut TransformPropagator,
    dirty: bool,
}

impl<'w> TransformHandle<'w> {
    pub(crate) fn new(
        entity: EntityId,
        depth: usize,
        transform: &'w mut Transform,
        propagator: &'w mut TransformPropagator,
    ) -> Self {
        Self {
            entity,
            depth,
            transform,
            propagator,
            dirty: false,
        }
    }

    /// The entity this handle writes to.
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        self.entity
    }

    /// Whether a mutation has been made through this handle.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Local position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    /// Local rotation.
    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.transform.rotation
    }

    /// Local rotation as `(pitch_x, yaw_y, roll_z)` degrees.
    #[must_use]
    pub fn rotation_euler(&self) -> Vec3 {
        self.transform.euler_degrees()
    }

    /// Local scale.
    #[must_use]
    pub fn scale(&self) -> Vec3 {
        self.transform.scale
    }

    /// World matrix as of the last propagation pass.
    #[must_use]
    pub fn world_matrix(&self) -> Mat4 {
        self.transform.world_matrix
    }

    /// Sets the local position.
    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
        self.dirty = true;
    }

    /// Moves the local position by `delta`.
    pub fn translate(&mut self, delta: Vec3) {
        self.transform.position += delta;
        self.dirty = true;
    }

    /// Sets the local rotation. The quaternion is normalized.
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.transform.rotation = rotation.normalize();
        self.dirty = true;
    }

    /// Sets the local rotation from `(pitch_x, yaw_y, roll_z)` degrees.
    pub fn set_rotation_euler(&mut self, degrees: Vec3) {
        self.transform.rotation = quat_from_euler_degrees(degrees);
        self.dirty = true;
    }

    /// Sets the local scale.
    pub fn set_scale(&mut self, scale: Vec3) {
        self.transform.scale = scale;
        self.dirty = true;
    }

    /// Pre-multiplies the rotation by `radians` around `axis`.
    ///
    /// A zero axis leaves the transform untouched.
    pub fn rotate_around(&mut self, axis: Vec3, radians: f32) {
        let Some(axis) = axis.try_normalize() else {
            return;
        };
        self.transform.rotation =
            (Quat::from_axis_angle(axis, radians) * self.transform.rotation).normalize();
        self.dirty = true;
    }

    /// Rotates so the forward axis (-Z) points at `target`.
    ///
    /// Degenerate inputs (target at the position, `up` parallel to the
    /// view direction) leave the transform untouched.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let Some(back) = (self.transform.position - target).try_normalize() else {
            return;
        };
        let Some(right) = up.cross(back).try_normalize() else {
            return;
        };
        let up = back.cross(right);
        self.transform.rotation = Quat::from_mat3(&Mat3::from_cols(right, up, back));
        self.dirty = true;
    }
}

impl Drop for TransformHandle<'_> {
    fn drop(&mut self) {
        if self.dirty {
            self.propagator.enqueue_at(self.entity, self.depth);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_matrix_is_trs() {
        let transform = Transform::from_position(Vec3::new(1.0, 2.0, 3.0))
            .with_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2))
            .with_scale(Vec3::splat(2.0));

        let point = transform.local_matrix().transform_point3(Vec3::X);
        // Scale, then rotate +X onto -Z, then translate.
        assert!(point.abs_diff_eq(Vec3::new(1.0, 2.0, 1.0), 1e-5));
    }

    #[test]
    fn test_basis_vectors() {
        let transform = Transform::IDENTITY;
        assert_eq!(transform.forward(), Vec3::NEG_Z);
        assert_eq!(transform.right(), Vec3::X);
        assert_eq!(transform.up(), Vec3::Y);
    }

    #[test]
    fn test_euler_degrees_roundtrip() {
        let degrees = Vec3::new(20.0, 45.0, -10.0);
        let transform = Transform::IDENTITY.with_rotation(quat_from_euler_degrees(degrees));
        assert!(transform.euler_degrees().abs_diff_eq(degrees, 1e-3));
    }

    #[test]
    fn test_handle_marks_dirty_and_enqueues_once() {
        let mut transform = Transform::IDENTITY;
        let mut propagator = TransformPropagator::default();
        let entity = EntityId::new(3);

        {
            let mut handle = TransformHandle::new(entity, 0, &mut transform, &mut propagator);
            assert!(!handle.is_dirty());
            handle.set_position(Vec3::X);
            handle.translate(Vec3::Y);
            handle.set_scale(Vec3::splat(3.0));
            assert!(handle.is_dirty());
        }

        assert_eq!(transform.position, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(propagator.pending(), 1);
        assert!(propagator.is_pending(entity));
    }

    #[test]
    fn test_clean_handle_does_not_enqueue() {
        let mut transform = Transform::IDENTITY;
        let mut propagator = TransformPropagator::default();
        {
            let handle = TransformHandle::new(EntityId::new(0), 0, &mut transform, &mut propagator);
            let _ = handle.position();
        }
        assert_eq!(propagator.pending(), 0);
    }

    #[test]
    fn test_rotate_around_premultiplies() {
        let mut transform = Transform::IDENTITY.with_rotation(Quat::from_rotation_x(0.3));
        let mut propagator = TransformPropagator::default();
        {
            let mut handle = TransformHandle::new(EntityId::new(0), 0, &mut transform, &mut propagator);
            handle.rotate_around(Vec3::Y * 5.0, 0.7);
            handle.rotate_around(Vec3::ZERO, 1.0);
        }
        let expected = Quat::from_rotation_y(0.7) * Quat::from_rotation_x(0.3);
        assert!(transform.rotation.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn test_look_at_faces_target() {
        let mut transform = Transform::from_position(Vec3::new(0.0, 0.0, 5.0));
        let mut propagator = TransformPropagator::default();
        {
            let mut handle = TransformHandle::new(EntityId::new(0), 0, &mut transform, &mut propagator);
            handle.look_at(Vec3::new(5.0, 0.0, 5.0), Vec3::Y);
        }
        assert!(transform.forward().abs_diff_eq(Vec3::X, 1e-5));
        assert!(transform.up().abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn test_set_rotation_euler_reads_back() {
        let mut transform = Transform::IDENTITY;
        let mut propagator = TransformPropagator::default();
        let mut handle = TransformHandle::new(EntityId::new(0), 0, &mut transform, &mut propagator);
        handle.set_rotation_euler(Vec3::new(0.0, 90.0, 0.0));
        assert!(handle.rotation_euler().abs_diff_eq(Vec3::new(0.0, 90.0, 0.0), 1e-3));
        drop(handle);
        // Yaw of +90 degrees turns -Z onto -X.
        assert!(transform.forward().abs_diff_eq(Vec3::NEG_X, 1e-5));
    }
}
