//! Shared setup helpers for rein-mrtk benchmarks.
//!
//! ## Running
//!
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench interaction
//!
//! Filter by group:
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench interaction -- sensors

use glam::{Mat4, Vec3};
use rein_mrtk::ecs::components::physics::Collider;
use rein_mrtk::ecs::components::transform::{GlobalTransform, Transform};
use rein_mrtk::{
    BoundingBox, Cursor, CursorManager, CursorManagerConfig, HandlerRegistry, PressableButton,
};

// ---------------------------------------------------------------------------
// Scenes
// ---------------------------------------------------------------------------

/// `n` buttons on a 10 cm grid in the z = 0 plane, every fourth one
/// carrying a bounding box rig instead.
#[allow(clippy::manual_is_multiple_of)]
pub fn setup_panel(n: usize) -> hecs::World {
    let mut world = hecs::World::new();
    let cols = (n as f32).sqrt().ceil() as usize;

    for i in 0..n {
        let pos = Vec3::new((i % cols) as f32 * 0.1, (i / cols) as f32 * 0.1, 0.0);
        let collider = Collider::cuboid(Vec3::new(0.03, 0.03, 0.01));
        if i % 4 == 3 {
            world.spawn((
                Transform::from_position(pos),
                GlobalTransform(Mat4::from_translation(pos)),
                collider,
                BoundingBox::default(),
            ));
        } else {
            world.spawn((
                Transform::from_position(pos),
                GlobalTransform(Mat4::from_translation(pos)),
                collider,
                PressableButton::default(),
            ));
        }
    }
    world
}

/// Spawn `hands` touch cursors spread over the panel, hovering 2 cm in front.
pub fn spawn_fingertips(
    world: &mut hecs::World,
    hands: usize,
    panel_size: usize,
) -> Vec<hecs::Entity> {
    let cols = (panel_size as f32).sqrt().ceil();
    (0..hands)
        .map(|i| {
            let t = (i as f32 + 0.5) / hands as f32;
            let pos = Vec3::new(t * cols * 0.1, t * cols * 0.1, 0.02);
            world.spawn((
                Cursor::touch(0.01, 0.1),
                Transform::from_position(pos),
                GlobalTransform(Mat4::from_translation(pos)),
            ))
        })
        .collect()
}

/// Registry and manager with every cursor in `world` activated.
pub fn setup_manager(world: &mut hecs::World) -> (HandlerRegistry, CursorManager) {
    let registry = HandlerRegistry::with_builtin();
    let mut manager = CursorManager::new(CursorManagerConfig::default());
    manager.sync_cursors(world, &registry);
    (registry, manager)
}

/// Move every fingertip along -Z by `step`, wrapping back out after 4 cm.
pub fn advance_fingertips(world: &mut hecs::World, fingertips: &[hecs::Entity], step: f32) {
    for &tip in fingertips {
        if let Ok(mut transform) = world.get::<&mut Transform>(tip) {
            transform.position.z -= step;
            if transform.position.z < -0.02 {
                transform.position.z = 0.02;
            }
        }
    }
}
