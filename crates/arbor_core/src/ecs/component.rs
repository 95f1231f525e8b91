//! # Component System
//!
//! Components are data containers attached to entities. Any `'static` type
//! becomes storable by implementing the [`Component`] marker trait; the
//! registry keys its pools by the type's `TypeId`.
//!
//! This module also defines the non-spatial members of the default
//! component set. `Transform` and `Hierarchy` live in `scene`.

use std::fmt;
use std::sync::Arc;

use glam::{Mat4, Vec3};

use crate::scene::MeshCollection;

/// Marker trait for ECS components.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Debug)]
/// struct Health(u32);
///
/// impl Component for Health {}
///
/// world.register_component::<Health>()?;
/// ```
pub trait Component: 'static {}

/// Human-readable entity name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Name(pub String);

impl Component for Name {}

impl Name {
    /// Creates a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrows the name as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shape of a light source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightKind {
    /// Parallel rays along the entity's forward axis.
    Directional,
    /// Omnidirectional, attenuated by `range`.
    Point,
    /// Cone along the entity's forward axis.
    Spot {
        /// Full-intensity cone half-angle, degrees.
        inner_degrees: f32,
        /// Falloff cone half-angle, degrees.
        outer_degrees: f32,
    },
}

/// Light source. Position and direction come from the entity's transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    /// Shape of the light.
    pub kind: LightKind,
    /// Linear RGB color.
    pub color: Vec3,
    /// Scalar intensity multiplier.
    pub intensity: f32,
    /// Attenuation distance. Ignored by directional lights.
    pub range: f32,
}

impl Component for Light {}

impl Light {
    /// Creates a directional light.
    #[must_use]
    pub const fn directional(color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            color,
            intensity,
            range: f32::INFINITY,
        }
    }

    /// Creates a point light.
    #[must_use]
    pub const fn point(color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            kind: LightKind::Point,
            color,
            intensity,
            range,
        }
    }

    /// Creates a spot light with the given cone half-angles in degrees.
    #[must_use]
    pub const fn spot(
        color: Vec3,
        intensity: f32,
        range: f32,
        inner_degrees: f32,
        outer_degrees: f32,
    ) -> Self {
        Self {
            kind: LightKind::Spot {
                inner_degrees,
                outer_degrees,
            },
            color,
            intensity,
            range,
        }
    }
}

impl Default for Light {
    fn default() -> Self {
        Self::point(Vec3::ONE, 1.0, 10.0)
    }
}

/// Perspective camera. The view matrix is derived from the entity's
/// committed world matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Vertical field of view, degrees.
    pub fov_y_degrees: f32,
    /// Width / height.
    pub aspect: f32,
    /// Near clip distance.
    pub near: f32,
    /// Far clip distance.
    pub far: f32,
}

impl Component for Camera {}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov_y_degrees: 60.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Right-handed perspective projection.
    #[must_use]
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    /// View matrix for a camera placed at `world`.
    #[must_use]
    pub fn view_from(&self, world: Mat4) -> Mat4 {
        world.inverse()
    }
}

/// Renderable mesh/material set. The collection is shared and read-only.
#[derive(Clone, Debug)]
pub struct Drawable3D {
    /// Shared mesh/material collection.
    pub collection: Arc<MeshCollection>,
    /// Whether the renderer should draw it.
    pub visible: bool,
}

impl Component for Drawable3D {}

impl Drawable3D {
    /// Creates a visible drawable.
    #[must_use]
    pub fn new(collection: Arc<MeshCollection>) -> Self {
        Self {
            collection,
            visible: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_display() {
        let name = Name::new("turret");
        assert_eq!(name.as_str(), "turret");
        assert_eq!(name.to_string(), "turret");
    }

    #[test]
    fn test_light_constructors() {
        let sun = Light::directional(Vec3::ONE, 3.0);
        assert_eq!(sun.kind, LightKind::Directional);
        assert!(sun.range.is_infinite());

        let spot = Light::spot(Vec3::X, 2.0, 15.0, 20.0, 30.0);
        assert!(matches!(
            spot.kind,
            LightKind::Spot { inner_degrees, outer_degrees } if inner_degrees < outer_degrees
        ));
    }

    #[test]
    fn test_camera_view_inverts_world() {
        let camera = Camera::default();
        let world = Mat4::from_translation(Vec3::new(0.0, 2.0, 5.0));
        let view = camera.view_from(world);
        let origin = view.transform_point3(Vec3::new(0.0, 2.0, 5.0));
        assert!(origin.abs_diff_eq(Vec3::ZERO, 1e-6));
    }

    #[test]
    fn test_camera_projection_is_finite() {
        let projection = Camera::default().projection();
        assert!(projection.is_finite());
    }

    #[test]
    fn test_drawable_shares_collection() {
        let collection = Arc::new(MeshCollection::new("crate"));
        let a = Drawable3D::new(Arc::clone(&collection));
        let b = Drawable3D::new(Arc::clone(&collection));
        assert!(a.visible && b.visible);
        assert_eq!(Arc::strong_count(&collection), 3);
    }
}
