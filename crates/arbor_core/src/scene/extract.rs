//! Renderer extraction: packs committed world matrices of visible drawables
//! into GPU-ready instance records.

use bytemuck::{Pod, Zeroable};

use super::transform::Transform;
use crate::ecs::{Drawable3D, World};
use crate::error::EcsResult;

/// Per-instance data handed to the renderer.
///
/// Column-major world matrix followed by the owning entity id, padded to a
/// multiple of 16 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct InstanceData {
    /// World matrix columns.
    pub model: [[f32; 4]; 4],
    /// Raw id of the source entity, for picking.
    pub entity: u32,
    /// Padding to a 16-byte multiple.
    pub _padding: [u32; 3],
}

impl InstanceData {
    /// Size in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Views a slice of records as raw bytes for buffer upload.
    #[must_use]
    pub fn as_bytes(instances: &[Self]) -> &[u8] {
        bytemuck::cast_slice(instances)
    }
}

impl World {
    /// One [`InstanceData`] per visible entity owning both a
    /// [`Transform`] and a [`Drawable3D`].
    ///
    /// Reads the world matrices committed by the last propagation pass.
    ///
    /// # Errors
    ///
    /// Returns `TypeNotRegistered` if either pool is missing.
    pub fn extract_instances(&self) -> EcsResult<Vec<InstanceData>> {
        Ok(self
            .view::<(Transform, Drawable3D)>()?
            .filter(|(_, (_, drawable))| drawable.visible)
            .map(|(entity, (transform, _))| InstanceData {
                model: transform.world_matrix().to_cols_array_2d(),
                entity: entity.raw(),
                _padding: [0; 3],
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::Vec3;

    use super::*;
    use crate::scene::MeshCollection;

    #[test]
    fn test_layout() {
        assert_eq!(InstanceData::SIZE, 80);
        assert_eq!(InstanceData::SIZE % 16, 0);
        let records = [InstanceData::default(); 2];
        assert_eq!(InstanceData::as_bytes(&records).len(), 160);
    }

    #[test]
    fn test_extract_skips_hidden_and_undrawn() {
        let mut world = World::new();
        let collection = Arc::new(MeshCollection::new("cube"));

        let shown = world
            .create_entity_3d(None, Transform::from_position(Vec3::new(2.0, 0.0, 0.0)), None)
            .unwrap();
        let hidden = world.create_entity_3d(None, Transform::IDENTITY, None).unwrap();
        world.create_entity_3d(None, Transform::IDENTITY, None).unwrap();

        world.add_component(shown, Drawable3D::new(Arc::clone(&collection))).unwrap();
        let mut drawable = Drawable3D::new(collection);
        drawable.visible = false;
        world.add_component(hidden, drawable).unwrap();

        world.update(0.0).unwrap();
        world.post_update();

        let instances = world.extract_instances().unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].entity, shown.raw());
        assert_eq!(instances[0].model[3], [2.0, 0.0, 0.0, 1.0]);
    }
}
