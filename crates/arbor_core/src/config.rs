//! # World Configuration
//!
//! Sizing knobs for a [`World`](crate::World), loaded once at startup.
//!
//! ```toml
//! entity_capacity = 65536
//! depth_buckets = 16
//! register_defaults = true
//! ```
//!
//! Every field is optional; missing fields keep their defaults.

use std::path::Path;

use serde::Deserialize;

use crate::error::{EcsError, EcsResult};

/// Largest accepted `entity_capacity`. Every pool pre-sizes its sparse
/// array to this many slots; worlds can still grow past it at runtime.
pub const MAX_ENTITY_CAPACITY: usize = 1 << 22;

/// Largest accepted `depth_buckets`.
pub const MAX_DEPTH_BUCKETS: usize = 1024;

/// Configuration for a world.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Entity ids to reserve room for in the allocator and in every pool's
    /// sparse array. Storage still grows past it.
    pub entity_capacity: usize,
    /// Propagation buckets to pre-create. More are added on demand.
    pub depth_buckets: usize,
    /// Pre-register the default component set and the transform propagator.
    pub register_defaults: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            entity_capacity: 1024,
            depth_buckets: 8,
            register_defaults: true,
        }
    }
}

impl WorldConfig {
    /// Preset for scenes with tens of thousands of nodes and deep rigs.
    #[must_use]
    pub const fn large_scene() -> Self {
        Self {
            entity_capacity: 65_536,
            depth_buckets: 32,
            register_defaults: true,
        }
    }

    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] on malformed TOML or
    /// out-of-range values.
    pub fn from_toml_str(source: &str) -> EcsResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|err| EcsError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the file cannot be read or
    /// parsed.
    pub fn from_file(path: impl AsRef<Path>) -> EcsResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|err| {
            EcsError::InvalidConfig(format!("failed to read '{}': {err}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if `entity_capacity` exceeds
    /// [`MAX_ENTITY_CAPACITY`] or `depth_buckets` exceeds
    /// [`MAX_DEPTH_BUCKETS`].
    pub fn validate(&self) -> EcsResult<()> {
        if self.entity_capacity > MAX_ENTITY_CAPACITY {
            return Err(EcsError::InvalidConfig(format!(
                "entity_capacity {} exceeds the maximum of {MAX_ENTITY_CAPACITY}",
                self.entity_capacity
            )));
        }
        if self.depth_buckets > MAX_DEPTH_BUCKETS {
            return Err(EcsError::InvalidConfig(format!(
                "depth_buckets {} exceeds the maximum of {MAX_DEPTH_BUCKETS}",
                self.depth_buckets
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorldConfig::default();
        assert_eq!(config.entity_capacity, 1024);
        assert_eq!(config.depth_buckets, 8);
        assert!(config.register_defaults);
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = WorldConfig::from_toml_str("depth_buckets = 3").unwrap();
        assert_eq!(config.depth_buckets, 3);
        assert_eq!(config.entity_capacity, 1024);
        assert!(config.register_defaults);
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(WorldConfig::from_toml_str("").unwrap(), WorldConfig::default());
    }

    #[test]
    fn test_malformed_toml() {
        let err = WorldConfig::from_toml_str("depth_buckets = ").unwrap_err();
        assert!(matches!(err, EcsError::InvalidConfig(_)));

        let err = WorldConfig::from_toml_str("register_defaults = 7").unwrap_err();
        assert!(matches!(err, EcsError::InvalidConfig(_)));
    }

    #[test]
    fn test_capacity_out_of_range() {
        let err = WorldConfig::from_toml_str("entity_capacity = 5000000000").unwrap_err();
        assert!(matches!(err, EcsError::InvalidConfig(_)));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let config = WorldConfig {
            entity_capacity: MAX_ENTITY_CAPACITY,
            depth_buckets: MAX_DEPTH_BUCKETS,
            register_defaults: false,
        };
        assert!(config.validate().is_ok());

        let err = WorldConfig::from_toml_str("entity_capacity = 4294967294").unwrap_err();
        assert!(matches!(err, EcsError::InvalidConfig(msg) if msg.contains("entity_capacity")));
    }

    #[test]
    fn test_depth_buckets_out_of_range() {
        let err = WorldConfig::from_toml_str("depth_buckets = 10000000000").unwrap_err();
        assert!(matches!(err, EcsError::InvalidConfig(msg) if msg.contains("depth_buckets")));

        let config = WorldConfig {
            depth_buckets: MAX_DEPTH_BUCKETS + 1,
            ..WorldConfig::default()
        };
        assert!(matches!(config.validate(), Err(EcsError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = WorldConfig::from_file("/nonexistent/arbor.toml").unwrap_err();
        assert!(matches!(err, EcsError::InvalidConfig(msg) if msg.contains("failed to read")));
    }

    #[test]
    fn test_large_scene_preset() {
        let config = WorldConfig::large_scene();
        assert!(config.entity_capacity > WorldConfig::default().entity_capacity);
        assert!(config.validate().is_ok());
    }
}
