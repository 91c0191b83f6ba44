//! Entity Component System integration with hecs.
//!
//! The host engine is modelled as a `hecs::World`: entities carry a
//! [`Transform`](components::Transform), a [`GlobalTransform`](components::GlobalTransform)
//! and optionally a place in the Parent/Children hierarchy.

pub mod components;
pub mod systems;

pub mod prelude {
    pub use super::components::*;
    pub use super::systems::{
        ancestors, attach_child, despawn_recursive, detach_child, set_world_pose,
        transform_system,
    };
}
