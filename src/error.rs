//! Error types.

use thiserror::Error;

/// Errors raised by precondition violations in the toolkit.
///
/// Interaction state that is merely inconsistent for a frame (stale contact ids,
/// events for entities that were despawned) is tolerated and never surfaces here.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value is outside its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An entity is missing a component the operation requires.
    #[error("entity {entity:?} has no `{component}` component")]
    MissingComponent {
        entity: hecs::Entity,
        component: &'static str,
    },

    /// The entity does not exist in the world.
    #[error("no such entity: {0:?}")]
    NoSuchEntity(hecs::Entity),
}

/// Result alias for toolkit operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a [`Error::MissingComponent`] for component type `T`.
    pub(crate) fn missing<T>(entity: hecs::Entity) -> Self {
        Error::MissingComponent {
            entity,
            component: short_type_name::<T>(),
        }
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker;

    #[test]
    fn test_missing_component_message() {
        let mut world = hecs::World::new();
        let entity = world.spawn(());
        let err = Error::missing::<Marker>(entity);
        assert!(err.to_string().contains("`Marker`"));
    }

    #[test]
    fn test_invalid_config_message() {
        let err = Error::InvalidConfig("radius must be positive".into());
        assert_eq!(
            err.to_string(),
            "invalid configuration: radius must be positive"
        );
    }
}
