//! # Core Error Types
//!
//! Every failure the runtime core can report. All of them are programmer
//! errors surfaced at the call site; nothing here is retried internally.

use thiserror::Error;

use crate::ecs::EntityId;

/// Errors that can occur in the entity/component runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// A component or system type was used before being registered.
    #[error("type not registered: {type_name}")]
    TypeNotRegistered {
        /// Name of the unregistered type.
        type_name: &'static str,
    },

    /// A component or system type was registered twice.
    #[error("type already registered: {type_name}")]
    AlreadyRegistered {
        /// Name of the duplicated type.
        type_name: &'static str,
    },

    /// The entity already owns a component of this type.
    #[error("entity {entity} already has a {type_name} component")]
    DuplicateComponent {
        /// The entity that was targeted.
        entity: EntityId,
        /// Name of the component type.
        type_name: &'static str,
    },

    /// The entity does not own a component of this type.
    #[error("entity {entity} has no {type_name} component")]
    ComponentNotFound {
        /// The entity that was targeted.
        entity: EntityId,
        /// Name of the component type.
        type_name: &'static str,
    },

    /// The entity is not alive.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// An entity was asked to become its own parent.
    #[error("entity {0} cannot be its own parent")]
    SelfParenting(EntityId),

    /// Reparenting would make an entity its own ancestor.
    #[error("cycle detected: {new_parent} is a descendant of {entity}")]
    CycleDetected {
        /// The entity being reparented.
        entity: EntityId,
        /// The requested parent, found below `entity`.
        new_parent: EntityId,
    },

    /// The same pool was requested twice for simultaneous mutable access.
    #[error("pool {type_name} requested twice for mutable access")]
    AliasedPools {
        /// Name of the component type.
        type_name: &'static str,
    },

    /// The component type is maintained by dedicated operations and cannot
    /// be added, replaced or removed through the generic component API.
    #[error("{type_name} can only be changed through hierarchy operations")]
    ProtectedComponent {
        /// Name of the component type.
        type_name: &'static str,
    },

    /// A dense or blueprint index was out of bounds.
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The length of the indexed sequence.
        len: usize,
    },

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A model blueprint is malformed.
    #[error("invalid blueprint: {0}")]
    InvalidBlueprint(String),
}

/// Result type for runtime core operations.
pub type EcsResult<T> = Result<T, EcsError>;

impl EcsError {
    /// Builds a [`EcsError::TypeNotRegistered`] for `T`.
    #[must_use]
    pub fn not_registered<T: ?Sized>() -> Self {
        Self::TypeNotRegistered {
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Builds a [`EcsError::ComponentNotFound`] for `T` on `entity`.
    #[must_use]
    pub fn missing<T: ?Sized>(entity: EntityId) -> Self {
        Self::ComponentNotFound {
            entity,
            type_name: std::any::type_name::<T>(),
        }
    }
}
