//! Collision sources and raycasting.
//!
//! The toolkit consumes physics through two narrow traits:
//!
//! - [`CollisionSource`] delivers begin/update/end events between cursor
//!   sensors and other bodies, keyed by a stable [`ContactId`].
//! - [`Raycaster`] answers ray queries against the scene.
//!
//! [`SensorWorld`] implements both over [`Collider`] components. Hosts that
//! run a full physics engine implement the traits on top of it instead.
//!
//! # Pipeline
//!
//! Each call to [`SensorWorld::collect_events`]:
//!
//! 1. Builds the near and external sensor spheres of every touch-capable cursor
//! 2. Rejects far pairs by world AABB overlap
//! 3. Runs the sphere-vs-shape narrowphase
//! 4. Diffs the overlapping pairs against the previous call

pub mod contact;
pub mod narrowphase;

use glam::Vec3;

use crate::cursor::Cursor;
use crate::ecs::components::physics::{Collider, CollisionLayers};
use crate::ecs::components::transform::GlobalTransform;
use crate::error::{Error, Result};
use crate::geometry::{Aabb, Ray};

pub use self::contact::{
    CollisionEvent, CollisionPhase, ContactId, ContactInfo, RayHit, SensorBody, SensorKind,
};
use self::narrowphase::{ray_collider, sphere_collider, world_aabb};

/// Producer of cursor collision callbacks.
pub trait CollisionSource {
    /// Append this frame's collision events to `out`, in delivery order.
    fn collect_events(&mut self, world: &hecs::World, out: &mut Vec<CollisionEvent>);
}

/// Ray queries against the scene.
pub trait Raycaster {
    /// Nearest hit along `ray` within `max_distance` on a collider whose layers
    /// intersect `mask`.
    fn raycast(&self, world: &hecs::World, ray: &Ray, max_distance: f32, mask: CollisionLayers)
        -> Option<RayHit>;
}

/// Configuration for [`SensorWorld`].
#[derive(Debug, Clone)]
pub struct SensorConfig {
    /// Layers cursor sensors overlap with. Default: all.
    pub mask: CollisionLayers,
    /// Whether sensors of different cursors report each other. Default: false.
    pub cursor_vs_cursor: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            mask: CollisionLayers::ALL,
            cursor_vs_cursor: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PairKey {
    body: SensorBody,
    other: hecs::Entity,
}

#[derive(Debug, Clone, Copy)]
struct ActivePair {
    key: PairKey,
    id: ContactId,
    point: Vec3,
    normal: Vec3,
}

/// Overlap detector for cursor sensors over [`Collider`] components.
#[derive(Debug, Default)]
pub struct SensorWorld {
    config: SensorConfig,
    active: Vec<ActivePair>,
    next_id: u64,
}

impl SensorWorld {
    pub fn new(config: SensorConfig) -> Self {
        Self {
            config,
            active: Vec::new(),
            next_id: 0,
        }
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Number of currently open contacts.
    pub fn active_contacts(&self) -> usize {
        self.active.len()
    }

    /// End every open contact, e.g. before dropping the world.
    pub fn clear(&mut self, out: &mut Vec<CollisionEvent>) {
        for pair in self.active.drain(..) {
            out.push(pair.event(CollisionPhase::End));
        }
    }

    fn allocate_id(&mut self) -> ContactId {
        let id = ContactId(self.next_id);
        self.next_id += 1;
        id
    }

    fn sensors(world: &hecs::World) -> Vec<(SensorBody, Vec3, f32)> {
        let mut sensors = Vec::new();
        for (entity, (cursor, transform)) in world.query::<(&Cursor, &GlobalTransform)>().iter() {
            if !cursor.is_touch_capable() {
                continue;
            }
            let center = transform.position();
            sensors.push((
                SensorBody {
                    cursor: entity,
                    sensor: SensorKind::Near,
                },
                center,
                cursor.near_radius,
            ));
            sensors.push((
                SensorBody {
                    cursor: entity,
                    sensor: SensorKind::External,
                },
                center,
                cursor.external_radius,
            ));
        }
        sensors
    }
}

impl ActivePair {
    fn event(&self, phase: CollisionPhase) -> CollisionEvent {
        CollisionEvent {
            id: self.id,
            phase,
            body: self.key.body,
            other: self.key.other,
            point: self.point,
            normal: self.normal,
        }
    }
}

impl CollisionSource for SensorWorld {
    fn collect_events(&mut self, world: &hecs::World, out: &mut Vec<CollisionEvent>) {
        let sensors = Self::sensors(world);

        let mut targets: Vec<(hecs::Entity, Collider, GlobalTransform, Aabb)> = Vec::new();
        for (entity, (collider, transform)) in
            world.query::<(&Collider, &GlobalTransform)>().iter()
        {
            if !collider.layers.intersects(self.config.mask) {
                continue;
            }
            let aabb = world_aabb(collider, transform);
            targets.push((entity, collider.clone(), *transform, aabb));
        }
        if self.config.cursor_vs_cursor {
            for (body, center, radius) in &sensors {
                if body.sensor == SensorKind::Near {
                    let collider = Collider::sphere(*radius);
                    let transform = GlobalTransform(glam::Mat4::from_translation(*center));
                    let aabb = world_aabb(&collider, &transform);
                    targets.push((body.cursor, collider, transform, aabb));
                }
            }
        }

        let mut current: Vec<ActivePair> = Vec::new();
        for (body, center, radius) in &sensors {
            let reach = Vec3::splat(*radius);
            let sensor_aabb = Aabb::new(*center - reach, *center + reach);
            for (other, collider, transform, aabb) in &targets {
                if *other == body.cursor || !overlaps(&sensor_aabb, aabb) {
                    continue;
                }
                let Some(info) = sphere_collider(*center, *radius, collider, transform) else {
                    continue;
                };
                let key = PairKey {
                    body: *body,
                    other: *other,
                };
                let previous = self.active.iter().position(|p| p.key == key);
                let (id, phase) = match previous {
                    Some(index) => (self.active.swap_remove(index).id, CollisionPhase::Update),
                    None => (self.allocate_id(), CollisionPhase::Begin),
                };
                let pair = ActivePair {
                    key,
                    id,
                    point: info.point,
                    normal: info.normal,
                };
                current.push(pair);
                out.push(pair.event(phase));
            }
        }

        // Whatever was not matched this frame has ended.
        for pair in self.active.drain(..) {
            tracing::trace!(id = pair.id.0, "sensor contact ended");
            out.push(pair.event(CollisionPhase::End));
        }
        self.active = current;
    }
}

impl Raycaster for SensorWorld {
    fn raycast(
        &self,
        world: &hecs::World,
        ray: &Ray,
        max_distance: f32,
        mask: CollisionLayers,
    ) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for (entity, (collider, transform)) in
            world.query::<(&Collider, &GlobalTransform)>().iter()
        {
            if !collider.layers.intersects(mask) {
                continue;
            }
            let limit = best.map_or(max_distance, |b| b.distance);
            if let Some((distance, point, normal)) = ray_collider(ray, limit, collider, transform) {
                best = Some(RayHit {
                    entity,
                    distance,
                    point,
                    normal,
                });
            }
        }
        best
    }
}

#[inline]
fn overlaps(a: &Aabb, b: &Aabb) -> bool {
    a.min.cmple(b.max).all() && a.max.cmpge(b.min).all()
}

impl SensorConfig {
    /// Reject configurations that can never produce contacts.
    pub fn validate(&self) -> Result<()> {
        if self.mask == CollisionLayers::NONE {
            return Err(Error::InvalidConfig("sensor mask selects no layers".into()));
        }
        Ok(())
    }
}
