//! # Model Blueprints
//!
//! A blueprint is an externally loaded, flattened node tree: each node has
//! a name, a local transform, an optional parent index into the same list
//! and an optional index into the model's shared mesh collections.
//! [`World::instantiate`] expands one into live entities.

use std::sync::Arc;

use tracing::debug;

use super::transform::Transform;
use crate::ecs::{Drawable3D, EntityId, Name, World};
use crate::error::{EcsError, EcsResult};

/// One drawable part: a mesh paired with the material it renders with.
///
/// Both are asset keys resolved by the renderer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubMesh {
    /// Mesh asset key.
    pub mesh: String,
    /// Material asset key.
    pub material: String,
}

/// Shared, read-only set of mesh/material pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MeshCollection {
    /// Debug name.
    pub name: String,
    /// Drawable parts.
    pub submeshes: Vec<SubMesh>,
}

impl MeshCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            submeshes: Vec::new(),
        }
    }

    /// Returns the collection with one more part.
    #[must_use]
    pub fn with_submesh(mut self, mesh: impl Into<String>, material: impl Into<String>) -> Self {
        self.submeshes.push(SubMesh {
            mesh: mesh.into(),
            material: material.into(),
        });
        self
    }
}

/// One node of a [`Model`].
#[derive(Clone, Debug, PartialEq)]
pub struct ModelNode {
    /// Node name, attached as a [`Name`].
    pub name: String,
    /// Local transform relative to the parent node.
    pub transform: Transform,
    /// Index of the parent node; must precede this node. `None` attaches
    /// the node to the model root.
    pub parent: Option<usize>,
    /// Index into [`Model::collections`]; `None` for pure pivots.
    pub collection: Option<usize>,
}

/// Hierarchical blueprint.
#[derive(Clone, Debug, Default)]
pub struct Model {
    /// Name given to the instantiated root entity.
    pub name: String,
    /// Nodes in parent-before-child order.
    pub nodes: Vec<ModelNode>,
    /// Mesh collections shared by every instance.
    pub collections: Vec<Arc<MeshCollection>>,
}

impl Model {
    /// Checks every parent and collection index.
    ///
    /// # Errors
    ///
    /// - [`EcsError::InvalidBlueprint`] if a node's parent does not precede it
    /// - [`EcsError::IndexOutOfRange`] if a collection index is out of range
    pub fn validate(&self) -> EcsResult<()> {
        for (index, node) in self.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                if parent >= index {
                    return Err(EcsError::InvalidBlueprint(format!(
                        "node {index} ('{}') references parent {parent}, which does not precede it",
                        node.name
                    )));
                }
            }
            if let Some(collection) = node.collection {
                if collection >= self.collections.len() {
                    return Err(EcsError::IndexOutOfRange {
                        index: collection,
                        len: self.collections.len(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl World {
    /// Expands `model` into live entities.
    ///
    /// A root entity named after the model is created under `parent` with
    /// `root_transform`; every node becomes a named descendant of it, and
    /// nodes owning a collection also get a [`Drawable3D`]. Every new entity
    /// is scheduled for propagation.
    ///
    /// # Returns
    ///
    /// The root entity.
    ///
    /// # Errors
    ///
    /// Blueprint validation errors, plus any error of
    /// [`World::create_entity_3d`]. The blueprint is validated before any
    /// entity is created.
    pub fn instantiate(
        &mut self,
        parent: Option<EntityId>,
        root_transform: Transform,
        model: &Model,
    ) -> EcsResult<EntityId> {
        model.validate()?;
        self.components.require::<Name>()?;
        self.components.require::<Drawable3D>()?;

        let root = self.create_entity_3d(parent, root_transform, Some(&model.name))?;
        let mut spawned: Vec<EntityId> = Vec::with_capacity(model.nodes.len());

        for node in &model.nodes {
            let node_parent = node.parent.map_or(root, |index| spawned[index]);
            let entity = self.create_entity_3d(Some(node_parent), node.transform, Some(&node.name))?;
            if let Some(collection) = node.collection {
                let collection = Arc::clone(&model.collections[collection]);
                self.components.add(entity, Drawable3D::new(collection))?;
            }
            spawned.push(entity);
        }

        debug!(model = %model.name, %root, nodes = spawned.len(), "instantiated model");
        Ok(root)
    }
}
