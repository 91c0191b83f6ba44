//! Far interaction: controller rays and gaze.
//!
//! A [`CursorRay`] sits on a pointer cursor and casts from a source entity's
//! forward axis (-Z) each frame. Whatever it hits becomes the cursor's only
//! overlap, and the cursor is moved to the hit point, so the regular pinch
//! dispatch in [`CursorManager`] drives far interaction unchanged.
//!
//! [`GazeProvider`] casts from the head and moves a focus reference between
//! the entities it looks at.

use glam::Vec3;

use crate::dispatch::{acquire_focus, release_focus, HandlerRegistry};
use crate::ecs::components::physics::CollisionLayers;
use crate::ecs::components::transform::GlobalTransform;
use crate::ecs::systems::set_world_pose;
use crate::focus::CursorManager;
use crate::geometry::Ray;
use crate::physics::{RayHit, Raycaster};

/// Default ray length, in meters.
pub const DEFAULT_RAY_DISTANCE: f32 = 10.0;

fn forward_ray(world: &hecs::World, source: hecs::Entity) -> Option<Ray> {
    let global = world.get::<&GlobalTransform>(source).ok()?;
    let (_, rotation, origin) = global.0.to_scale_rotation_translation();
    Some(Ray::new(origin, rotation * Vec3::NEG_Z))
}

/// Ray pointer attached to a cursor entity.
#[derive(Debug, Clone)]
pub struct CursorRay {
    /// Entity whose pose the ray starts from, e.g. a controller.
    pub source: hecs::Entity,
    pub max_distance: f32,
    pub mask: CollisionLayers,
    /// Where the cursor rests along the ray when nothing is hit.
    pub rest_distance: f32,
    hit: Option<RayHit>,
    grab_distance: Option<f32>,
}

impl CursorRay {
    pub fn new(source: hecs::Entity) -> Self {
        Self {
            source,
            max_distance: DEFAULT_RAY_DISTANCE,
            mask: CollisionLayers::ALL,
            rest_distance: 2.0,
            hit: None,
            grab_distance: None,
        }
    }

    /// Hit of the last cast, if any.
    pub fn hit(&self) -> Option<&RayHit> {
        self.hit.as_ref()
    }

    /// Distance the cursor is held at while its interaction lasts.
    pub fn grab_distance(&self) -> Option<f32> {
        self.grab_distance
    }
}

/// Cast every [`CursorRay`] and update its cursor.
///
/// While a cursor is interacting, the ray stops retargeting and the cursor
/// keeps the distance it had at grab time.
pub fn cursor_ray_system<R: Raycaster + ?Sized>(
    world: &mut hecs::World,
    manager: &mut CursorManager,
    raycaster: &R,
) {
    let cursors: Vec<hecs::Entity> = world
        .query_mut::<&CursorRay>()
        .into_iter()
        .map(|(e, _)| e)
        .collect();

    for cursor in cursors {
        let Ok(mut cursor_ray) = world.get::<&mut CursorRay>(cursor) else {
            continue;
        };
        let Some(ray) = forward_ray(world, cursor_ray.source) else {
            tracing::trace!(?cursor, "ray source has no transform");
            continue;
        };

        let distance = if manager.interacted(cursor).is_some() {
            let fallback = cursor_ray.hit.map_or(cursor_ray.rest_distance, |h| h.distance);
            *cursor_ray.grab_distance.get_or_insert(fallback)
        } else {
            cursor_ray.grab_distance = None;
            let hit = raycaster.raycast(world, &ray, cursor_ray.max_distance, cursor_ray.mask);
            cursor_ray.hit = hit;
            manager.set_overlap(cursor, hit.map(|h| h.entity));
            hit.map_or(cursor_ray.rest_distance, |h| h.distance)
        };
        drop(cursor_ray);

        let rotation = world
            .get::<&GlobalTransform>(cursor)
            .map(|g| g.rotation())
            .unwrap_or_default();
        if let Err(error) = set_world_pose(world, cursor, ray.at(distance), rotation, Vec3::ONE) {
            tracing::trace!(?cursor, %error, "ray cursor not moved");
        }
    }
}

/// Focus provider following the head's forward axis.
#[derive(Debug, Clone)]
pub struct GazeProvider {
    pub head: hecs::Entity,
    pub max_distance: f32,
    pub mask: CollisionLayers,
    target: Option<hecs::Entity>,
    hit: Option<RayHit>,
}

impl GazeProvider {
    pub fn new(head: hecs::Entity) -> Self {
        Self {
            head,
            max_distance: DEFAULT_RAY_DISTANCE,
            mask: CollisionLayers::ALL,
            target: None,
            hit: None,
        }
    }

    /// Entity currently gazed at.
    pub fn target(&self) -> Option<hecs::Entity> {
        self.target
    }

    pub fn hit(&self) -> Option<&RayHit> {
        self.hit.as_ref()
    }

    /// Cast from the head; on a change of target, release focus on the old
    /// one and acquire it on the new one.
    pub fn update<R: Raycaster + ?Sized>(
        &mut self,
        world: &mut hecs::World,
        registry: &HandlerRegistry,
        raycaster: &R,
    ) {
        self.hit = forward_ray(world, self.head)
            .and_then(|ray| raycaster.raycast(world, &ray, self.max_distance, self.mask));
        let target = self.hit.map(|h| h.entity);
        if target == self.target {
            return;
        }

        tracing::debug!(from = ?self.target, to = ?target, "gaze target changed");
        if let Some(previous) = self.target.take() {
            release_focus(world, registry, previous, Some(self.head));
        }
        if let Some(next) = target {
            acquire_focus(world, registry, next, Some(self.head));
        }
        self.target = target;
    }

    /// Drop the focus reference held on the current target.
    pub fn clear(&mut self, world: &mut hecs::World, registry: &HandlerRegistry) {
        if let Some(previous) = self.target.take() {
            release_focus(world, registry, previous, Some(self.head));
        }
        self.hit = None;
    }
}
