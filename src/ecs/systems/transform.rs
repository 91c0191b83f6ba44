//! Transform hierarchy propagation and parenting helpers.

use glam::{Mat4, Quat, Vec3};

use crate::ecs::components::transform::{Children, GlobalTransform, Parent, Transform};
use crate::error::{Error, Result};

/// Propagate transforms through the Parent/Children hierarchy.
///
/// Phase 1: Update root entities (no Parent) - GlobalTransform = Transform.to_matrix()
/// Phase 2: Recursively propagate through Children hierarchy.
pub fn transform_system(world: &mut hecs::World) {
    let roots: Vec<(hecs::Entity, Mat4)> = world
        .query_mut::<hecs::Without<(&Transform, &mut GlobalTransform), &Parent>>()
        .into_iter()
        .map(|(entity, (transform, global))| {
            global.0 = transform.to_matrix();
            (entity, global.0)
        })
        .collect();

    for (entity, matrix) in roots {
        if world.satisfies::<&Children>(entity).unwrap_or(false) {
            propagate_children(world, entity, matrix);
        }
    }
}

/// Recursively propagate GlobalTransform to children.
fn propagate_children(world: &mut hecs::World, parent: hecs::Entity, parent_global: Mat4) {
    // Clone to release the borrow.
    let children = match world.get::<&Children>(parent) {
        Ok(c) => c.0.clone(),
        Err(_) => return,
    };

    for child in children {
        let child_global = match world.get::<&Transform>(child) {
            Ok(transform) => parent_global * transform.to_matrix(),
            Err(_) => parent_global,
        };

        if let Ok(mut global) = world.get::<&mut GlobalTransform>(child) {
            global.0 = child_global;
        }

        if world.satisfies::<&Children>(child).unwrap_or(false) {
            propagate_children(world, child, child_global);
        }
    }
}

/// Make `child` a child of `parent`, detaching it from any previous parent.
///
/// The child's GlobalTransform is refreshed immediately so freshly built
/// hierarchies can be queried before the next [`transform_system`] pass.
pub fn attach_child(
    world: &mut hecs::World,
    parent: hecs::Entity,
    child: hecs::Entity,
) -> Result<()> {
    if !world.contains(parent) {
        return Err(Error::NoSuchEntity(parent));
    }
    if !world.contains(child) {
        return Err(Error::NoSuchEntity(child));
    }
    detach_child(world, child);

    let has_children = world.satisfies::<&Children>(parent).unwrap_or(false);
    if has_children {
        if let Ok(mut children) = world.get::<&mut Children>(parent) {
            children.0.push(child);
        }
    } else {
        world
            .insert_one(parent, Children(vec![child]))
            .map_err(|_| Error::NoSuchEntity(parent))?;
    }
    world
        .insert_one(child, Parent(parent))
        .map_err(|_| Error::NoSuchEntity(child))?;

    refresh_global(world, child);
    Ok(())
}

/// Remove `child` from its parent, if it has one. The child becomes a root.
pub fn detach_child(world: &mut hecs::World, child: hecs::Entity) {
    let Ok(Parent(parent)) = world.remove_one::<Parent>(child) else {
        return;
    };
    if let Ok(mut children) = world.get::<&mut Children>(parent) {
        children.0.retain(|&c| c != child);
    }
}

/// Despawn an entity together with all of its descendants.
pub fn despawn_recursive(world: &mut hecs::World, entity: hecs::Entity) {
    detach_child(world, entity);
    let mut stack = vec![entity];
    while let Some(e) = stack.pop() {
        if let Ok(children) = world.get::<&Children>(e) {
            stack.extend(children.0.iter().copied());
        }
        let _ = world.despawn(e);
    }
}

/// The entity followed by its ancestors, nearest first.
pub fn ancestors(
    world: &hecs::World,
    entity: hecs::Entity,
) -> impl Iterator<Item = hecs::Entity> + '_ {
    std::iter::successors(Some(entity), move |&e| {
        world.get::<&Parent>(e).ok().map(|p| p.0)
    })
}

/// World matrix of the entity's parent, or identity for roots.
pub fn parent_matrix(world: &hecs::World, entity: hecs::Entity) -> Mat4 {
    world
        .get::<&Parent>(entity)
        .ok()
        .and_then(|p| world.get::<&GlobalTransform>(p.0).ok().map(|g| g.0))
        .unwrap_or(Mat4::IDENTITY)
}

/// Set an entity's world-space pose by rewriting its local Transform.
///
/// Works with a shared `&World`, so interaction handlers can call it while
/// they hold a borrow of their own component. The GlobalTransform is updated
/// as well; descendants catch up on the next [`transform_system`] pass.
pub fn set_world_pose(
    world: &hecs::World,
    entity: hecs::Entity,
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
) -> Result<()> {
    let target = Mat4::from_scale_rotation_translation(scale, rotation, position);
    let local = parent_matrix(world, entity).inverse() * target;

    let mut transform = world
        .get::<&mut Transform>(entity)
        .map_err(|_| Error::missing::<Transform>(entity))?;
    *transform = Transform::from_matrix(local);

    if let Ok(mut global) = world.get::<&mut GlobalTransform>(entity) {
        global.0 = target;
    }
    Ok(())
}

fn refresh_global(world: &mut hecs::World, entity: hecs::Entity) {
    let local = world
        .get::<&Transform>(entity)
        .map(|t| t.to_matrix())
        .unwrap_or(Mat4::IDENTITY);
    let global = parent_matrix(world, entity) * local;
    if let Ok(mut g) = world.get::<&mut GlobalTransform>(entity) {
        g.0 = global;
    }
    if world.satisfies::<&Children>(entity).unwrap_or(false) {
        propagate_children(world, entity, global);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_at(world: &mut hecs::World, pos: Vec3) -> hecs::Entity {
        world.spawn((Transform::from_position(pos), GlobalTransform::default()))
    }

    #[test]
    fn test_root_entity_propagation() {
        let mut world = hecs::World::new();
        let pos = Vec3::new(1.0, 2.0, 3.0);
        let entity = spawn_at(&mut world, pos);

        transform_system(&mut world);

        let global = world.get::<&GlobalTransform>(entity).unwrap();
        assert_eq!(global.0, Mat4::from_translation(pos));
    }

    #[test]
    fn test_three_level_hierarchy() {
        let mut world = hecs::World::new();
        let grandparent = spawn_at(&mut world, Vec3::new(1.0, 0.0, 0.0));
        let parent = spawn_at(&mut world, Vec3::new(0.0, 1.0, 0.0));
        let child = spawn_at(&mut world, Vec3::new(0.0, 0.0, 1.0));

        attach_child(&mut world, grandparent, parent).unwrap();
        attach_child(&mut world, parent, child).unwrap();
        transform_system(&mut world);

        let actual = world.get::<&GlobalTransform>(child).unwrap().position();
        let expected = Vec3::new(1.0, 1.0, 1.0);
        assert!(
            (actual - expected).length() < 1e-5,
            "Expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_reattach_moves_child() {
        let mut world = hecs::World::new();
        let a = spawn_at(&mut world, Vec3::X);
        let b = spawn_at(&mut world, Vec3::Y);
        let child = spawn_at(&mut world, Vec3::ZERO);

        attach_child(&mut world, a, child).unwrap();
        attach_child(&mut world, b, child).unwrap();

        assert!(world.get::<&Children>(a).unwrap().0.is_empty());
        assert_eq!(world.get::<&Children>(b).unwrap().0, vec![child]);
        assert_eq!(world.get::<&Parent>(child).unwrap().0, b);
    }

    #[test]
    fn test_ancestors_order() {
        let mut world = hecs::World::new();
        let root = spawn_at(&mut world, Vec3::ZERO);
        let mid = spawn_at(&mut world, Vec3::ZERO);
        let leaf = spawn_at(&mut world, Vec3::ZERO);
        attach_child(&mut world, root, mid).unwrap();
        attach_child(&mut world, mid, leaf).unwrap();

        let chain: Vec<_> = ancestors(&world, leaf).collect();
        assert_eq!(chain, vec![leaf, mid, root]);
    }

    #[test]
    fn test_despawn_recursive() {
        let mut world = hecs::World::new();
        let root = spawn_at(&mut world, Vec3::ZERO);
        let mid = spawn_at(&mut world, Vec3::ZERO);
        let leaf = spawn_at(&mut world, Vec3::ZERO);
        attach_child(&mut world, root, mid).unwrap();
        attach_child(&mut world, mid, leaf).unwrap();

        despawn_recursive(&mut world, mid);

        assert!(world.contains(root));
        assert!(!world.contains(mid));
        assert!(!world.contains(leaf));
        assert!(world.get::<&Children>(root).unwrap().0.is_empty());
    }

    #[test]
    fn test_set_world_pose_under_scaled_parent() {
        let mut world = hecs::World::new();
        let parent = world.spawn((
            Transform::from_position(Vec3::new(0.0, 2.0, 0.0)).with_scale(Vec3::splat(2.0)),
            GlobalTransform::default(),
        ));
        let child = spawn_at(&mut world, Vec3::ZERO);
        attach_child(&mut world, parent, child).unwrap();
        transform_system(&mut world);

        set_world_pose(&world, child, Vec3::new(4.0, 2.0, 0.0), Quat::IDENTITY, Vec3::ONE).unwrap();

        let local = *world.get::<&Transform>(child).unwrap();
        assert!((local.position - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
        assert!((local.scale - Vec3::splat(0.5)).length() < 1e-5);

        transform_system(&mut world);
        let global = world.get::<&GlobalTransform>(child).unwrap().position();
        assert!((global - Vec3::new(4.0, 2.0, 0.0)).length() < 1e-5);
    }
}
