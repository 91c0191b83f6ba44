//! ECS systems (transform propagation).

pub mod transform;

pub use transform::{
    ancestors, attach_child, despawn_recursive, detach_child, parent_matrix, set_world_pose,
    transform_system,
};
