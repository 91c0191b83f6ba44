//! The per-frame cursor driver.
//!
//! [`CursorManager`] owns all per-cursor interaction state: pose history,
//! touch trackers, overlap stacks and the entity each cursor is interacting
//! with. Once per frame, [`CursorManager::update`]:
//!
//! 1. Samples every registered cursor's pose and refreshes its velocities
//! 2. Routes collision callbacks to touch trackers and overlap stacks
//! 3. Turns pinch transitions into pointer Down / Dragged / Up / Clicked
//! 4. Commits each cursor's pinch as next frame's previous pinch
//!
//! Pointer focus is locked for the duration of a pinch: Dragged and Up go to
//! the entity that received Down, whatever the cursor overlaps afterwards.

use std::collections::HashMap;

use glam::{Quat, Vec3};

use crate::cursor::{Cursor, PoseHistory, HISTORY_CAPACITY};
use crate::dispatch::{bubble_pointer, HandlerRegistry, PointerEvent, PointerPhase};
use crate::ecs::components::transform::GlobalTransform;
use crate::error::{Error, Result};
use crate::physics::{CollisionEvent, CollisionPhase, CollisionSource, ContactId, SensorKind};
use crate::touch::{TouchOrigin, TouchTracker};

/// Configuration for [`CursorManager`].
#[derive(Debug, Clone)]
pub struct CursorManagerConfig {
    /// Pose samples kept per cursor for velocity estimation. Default: 10.
    pub history_capacity: usize,
    /// Emit `PointerClicked` after `PointerUp` when the cursor still overlaps
    /// the released entity. Default: true.
    pub emit_clicks: bool,
}

impl Default for CursorManagerConfig {
    fn default() -> Self {
        Self {
            history_capacity: HISTORY_CAPACITY,
            emit_clicks: true,
        }
    }
}

impl CursorManagerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.history_capacity < 2 {
            return Err(Error::InvalidConfig(format!(
                "history_capacity must be at least 2, got {}",
                self.history_capacity
            )));
        }
        Ok(())
    }
}

/// Entities a cursor currently overlaps, most recent first.
///
/// An entity appears once per open contact, so it stays on the stack until
/// its last contact ends.
#[derive(Debug, Clone, Default)]
pub struct OverlapStack(Vec<hecs::Entity>);

impl OverlapStack {
    /// The active interaction target.
    #[inline]
    pub fn head(&self) -> Option<hecs::Entity> {
        self.0.first().copied()
    }

    pub fn push(&mut self, entity: hecs::Entity) {
        self.0.insert(0, entity);
    }

    /// Remove one occurrence of `entity`, wherever it is.
    pub fn remove(&mut self, entity: hecs::Entity) -> bool {
        match self.0.iter().position(|&e| e == entity) {
            Some(index) => {
                self.0.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, entity: hecs::Entity) -> bool {
        self.0.contains(&entity)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Replace the whole stack with at most one entity.
    pub fn replace(&mut self, entity: Option<hecs::Entity>) {
        self.0.clear();
        self.0.extend(entity);
    }

    pub fn as_slice(&self) -> &[hecs::Entity] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug)]
struct CursorSlot {
    entity: hecs::Entity,
    history: PoseHistory,
    tracker: Option<TouchTracker>,
    overlaps: OverlapStack,
    /// Open near contacts feeding `overlaps`.
    near_contacts: HashMap<ContactId, hecs::Entity>,
    interacted: Option<hecs::Entity>,
    position: Vec3,
    orientation: Quat,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
}

impl CursorSlot {
    fn origin(&self) -> TouchOrigin {
        TouchOrigin {
            cursor: self.entity,
            position: self.position,
            previous_position: self.history.previous_position().unwrap_or(self.position),
        }
    }

    fn pointer_event(&self, target: hecs::Entity) -> PointerEvent {
        PointerEvent {
            cursor: self.entity,
            position: self.position,
            orientation: self.orientation,
            linear_velocity: self.linear_velocity,
            angular_velocity: self.angular_velocity,
            target,
            handled: false,
        }
    }
}

/// Registry and per-frame driver of all active cursors.
#[derive(Debug)]
pub struct CursorManager {
    config: CursorManagerConfig,
    slots: Vec<CursorSlot>,
    scratch: Vec<CollisionEvent>,
}

impl CursorManager {
    pub fn new(config: CursorManagerConfig) -> Self {
        Self {
            config,
            slots: Vec::new(),
            scratch: Vec::new(),
        }
    }

    pub fn config(&self) -> &CursorManagerConfig {
        &self.config
    }

    /// Registered cursors, in registration order.
    pub fn cursors(&self) -> impl Iterator<Item = hecs::Entity> + '_ {
        self.slots.iter().map(|s| s.entity)
    }

    pub fn is_active(&self, cursor: hecs::Entity) -> bool {
        self.slot(cursor).is_some()
    }

    fn slot(&self, cursor: hecs::Entity) -> Option<&CursorSlot> {
        self.slots.iter().find(|s| s.entity == cursor)
    }

    fn slot_mut(&mut self, cursor: hecs::Entity) -> Option<&mut CursorSlot> {
        self.slots.iter_mut().find(|s| s.entity == cursor)
    }

    /// Entities the cursor overlaps, most recent first.
    pub fn overlaps(&self, cursor: hecs::Entity) -> Option<&[hecs::Entity]> {
        self.slot(cursor).map(|s| s.overlaps.as_slice())
    }

    /// The entity that received the cursor's last `PointerDown`, while pinched.
    pub fn interacted(&self, cursor: hecs::Entity) -> Option<hecs::Entity> {
        self.slot(cursor).and_then(|s| s.interacted)
    }

    /// Linear and angular velocity estimated this frame.
    pub fn velocity(&self, cursor: hecs::Entity) -> Option<(Vec3, Vec3)> {
        self.slot(cursor).map(|s| (s.linear_velocity, s.angular_velocity))
    }

    /// Touch state of a touch-capable cursor.
    pub fn touch_tracker(&self, cursor: hecs::Entity) -> Option<&TouchTracker> {
        self.slot(cursor).and_then(|s| s.tracker.as_ref())
    }

    /// Replace a cursor's overlap stack, for cursors whose targets come from a
    /// raycast rather than collisions.
    pub fn set_overlap(&mut self, cursor: hecs::Entity, target: Option<hecs::Entity>) {
        if let Some(slot) = self.slot_mut(cursor) {
            slot.near_contacts.clear();
            slot.overlaps.replace(target);
        }
    }

    /// Add a cursor entity to the registry. Registering twice is a no-op.
    pub fn activate_cursor(&mut self, world: &hecs::World, cursor: hecs::Entity) -> Result<()> {
        if self.is_active(cursor) {
            return Ok(());
        }
        let touch_capable = world
            .get::<&Cursor>(cursor)
            .map_err(|e| match e {
                hecs::ComponentError::NoSuchEntity => Error::NoSuchEntity(cursor),
                hecs::ComponentError::MissingComponent(_) => Error::missing::<Cursor>(cursor),
            })?
            .is_touch_capable();

        tracing::debug!(?cursor, touch_capable, "cursor activated");
        self.slots.push(CursorSlot {
            entity: cursor,
            history: PoseHistory::new(self.config.history_capacity),
            tracker: touch_capable.then(TouchTracker::new),
            overlaps: OverlapStack::default(),
            near_contacts: HashMap::new(),
            interacted: None,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        });
        Ok(())
    }

    /// Remove a cursor from the registry, completing its open touches.
    ///
    /// An interaction in progress is abandoned without `PointerUp`; the
    /// receiving entity stays in whatever state `PointerDown` left it.
    pub fn deactivate_cursor(
        &mut self,
        world: &mut hecs::World,
        registry: &HandlerRegistry,
        cursor: hecs::Entity,
    ) -> bool {
        let Some(index) = self.slots.iter().position(|s| s.entity == cursor) else {
            return false;
        };
        let mut slot = self.slots.remove(index);
        if let Some(target) = slot.interacted {
            tracing::warn!(
                ?cursor,
                ?target,
                "cursor deactivated mid-interaction, no PointerUp sent"
            );
        }
        let origin = slot.origin();
        if let Some(tracker) = slot.tracker.as_mut() {
            tracker.deactivate(world, registry, &origin);
        }
        slot.history.clear();
        tracing::debug!(?cursor, "cursor deactivated");
        true
    }

    /// Register every `Cursor` entity not yet active and drop slots whose
    /// entity no longer has one.
    pub fn sync_cursors(&mut self, world: &mut hecs::World, registry: &HandlerRegistry) {
        let stale: Vec<_> = self
            .slots
            .iter()
            .map(|s| s.entity)
            .filter(|&e| !world.satisfies::<&Cursor>(e).unwrap_or(false))
            .collect();
        for cursor in stale {
            self.deactivate_cursor(world, registry, cursor);
        }

        let fresh: Vec<_> = world
            .query::<&Cursor>()
            .iter()
            .map(|(e, _)| e)
            .filter(|&e| !self.is_active(e))
            .collect();
        for cursor in fresh {
            // Each entity was just queried with a Cursor.
            let _ = self.activate_cursor(world, cursor);
        }
    }

    /// Pull this frame's events from `source`, then run [`CursorManager::update`].
    pub fn update_with_source<S: CollisionSource + ?Sized>(
        &mut self,
        world: &mut hecs::World,
        registry: &HandlerRegistry,
        source: &mut S,
        delta_time: f32,
    ) {
        let mut events = std::mem::take(&mut self.scratch);
        events.clear();
        source.collect_events(world, &mut events);
        self.update(world, registry, &events, delta_time);
        self.scratch = events;
    }

    /// Run one frame.
    pub fn update(
        &mut self,
        world: &mut hecs::World,
        registry: &HandlerRegistry,
        collisions: &[CollisionEvent],
        delta_time: f32,
    ) {
        self.sample_poses(world, delta_time);

        for event in collisions {
            self.route_collision(world, registry, event);
        }

        for slot in &mut self.slots {
            Self::dispatch_pointer(world, registry, slot, self.config.emit_clicks);
        }

        for slot in &self.slots {
            if let Ok(mut cursor) = world.get::<&mut Cursor>(slot.entity) {
                cursor.commit_frame();
            }
        }
    }

    fn sample_poses(&mut self, world: &hecs::World, delta_time: f32) {
        for slot in &mut self.slots {
            let Ok(global) = world.get::<&GlobalTransform>(slot.entity) else {
                continue;
            };
            let (_, orientation, position) = global.0.to_scale_rotation_translation();
            slot.position = position;
            slot.orientation = orientation;
            slot.history.push(position, orientation, delta_time);
            slot.linear_velocity = slot.history.linear_velocity();
            slot.angular_velocity = slot.history.angular_velocity();
        }
    }

    fn route_collision(
        &mut self,
        world: &mut hecs::World,
        registry: &HandlerRegistry,
        event: &CollisionEvent,
    ) {
        let Some(slot) = self.slots.iter_mut().find(|s| s.entity == event.body.cursor) else {
            tracing::trace!(cursor = ?event.body.cursor, "collision for inactive cursor ignored");
            return;
        };
        let origin = slot.origin();

        if let Some(tracker) = slot.tracker.as_mut() {
            match event.phase {
                CollisionPhase::Begin => {
                    tracker.on_begin_collision(world, registry, &origin, event);
                }
                CollisionPhase::Update => {
                    tracker.on_update_collision(world, registry, &origin, event);
                }
                CollisionPhase::End => {
                    tracker.on_end_collision(world, registry, &origin, event);
                }
            }
        }

        if event.body.sensor == SensorKind::Near {
            match event.phase {
                CollisionPhase::Begin => {
                    if slot.near_contacts.contains_key(&event.id) {
                        tracing::trace!(id = ?event.id, "duplicate overlap begin ignored");
                    } else {
                        slot.near_contacts.insert(event.id, event.other);
                        slot.overlaps.push(event.other);
                    }
                }
                CollisionPhase::End => match slot.near_contacts.remove(&event.id) {
                    Some(other) => {
                        slot.overlaps.remove(other);
                    }
                    None => tracing::trace!(id = ?event.id, "unknown overlap end ignored"),
                },
                CollisionPhase::Update => {}
            }
        }
    }

    fn dispatch_pointer(
        world: &hecs::World,
        registry: &HandlerRegistry,
        slot: &mut CursorSlot,
        emit_clicks: bool,
    ) {
        let Some((pinched, previous)) = world
            .get::<&Cursor>(slot.entity)
            .ok()
            .map(|c| (c.is_pinched(), c.previous_pinch()))
        else {
            return;
        };

        if !previous && pinched {
            let Some(target) = slot.overlaps.head() else {
                tracing::trace!(cursor = ?slot.entity, "pinch with nothing to interact with");
                return;
            };
            tracing::debug!(cursor = ?slot.entity, ?target, "pointer down");
            slot.interacted = Some(target);
            let mut event = slot.pointer_event(target);
            bubble_pointer(world, registry, PointerPhase::Down, &mut event);
            return;
        }

        if !previous {
            return;
        }
        let Some(target) = slot.interacted else {
            return;
        };
        if !world.contains(target) {
            slot.interacted = None;
            return;
        }

        if pinched {
            let mut event = slot.pointer_event(target);
            bubble_pointer(world, registry, PointerPhase::Dragged, &mut event);
        } else {
            tracing::debug!(cursor = ?slot.entity, ?target, "pointer up");
            slot.interacted = None;
            let mut event = slot.pointer_event(target);
            bubble_pointer(world, registry, PointerPhase::Up, &mut event);
            if emit_clicks && slot.overlaps.contains(target) {
                let mut event = slot.pointer_event(target);
                bubble_pointer(world, registry, PointerPhase::Clicked, &mut event);
            }
        }
    }
}

impl Default for CursorManager {
    fn default() -> Self {
        Self::new(CursorManagerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::tests::{recorder_registry, Recorder};
    use crate::dispatch::TouchPhase;
    use crate::ecs::components::transform::Transform;
    use crate::physics::SensorBody;
    use glam::Mat4;

    struct Scene {
        world: hecs::World,
        registry: HandlerRegistry,
        manager: CursorManager,
        cursor: hecs::Entity,
        next_id: u64,
    }

    impl Scene {
        fn new() -> Self {
            let mut world = hecs::World::new();
            let cursor = world.spawn((
                Cursor::default(),
                Transform::identity(),
                GlobalTransform::default(),
            ));
            let mut manager = CursorManager::default();
            manager.activate_cursor(&world, cursor).unwrap();
            Self {
                world,
                registry: recorder_registry(),
                manager,
                cursor,
                next_id: 0,
            }
        }

        fn target(&mut self) -> hecs::Entity {
            self.world.spawn((Recorder::default(),))
        }

        fn contact(
            &mut self,
            phase: CollisionPhase,
            other: hecs::Entity,
            id: Option<u64>,
        ) -> CollisionEvent {
            let id = id.unwrap_or_else(|| {
                self.next_id += 1;
                self.next_id
            });
            CollisionEvent {
                id: ContactId(id),
                phase,
                body: SensorBody {
                    cursor: self.cursor,
                    sensor: SensorKind::Near,
                },
                other,
                point: Vec3::ZERO,
                normal: Vec3::Z,
            }
        }

        fn pinch(&mut self, pinched: bool) {
            self.world.get::<&mut Cursor>(self.cursor).unwrap().set_pinched(pinched);
        }

        fn frame(&mut self, events: &[CollisionEvent]) {
            self.manager
                .update(&mut self.world, &self.registry, events, 1.0 / 60.0);
        }

        fn pointers(&self, target: hecs::Entity) -> Vec<PointerPhase> {
            self.world
                .get::<&Recorder>(target)
                .unwrap()
                .pointers
                .iter()
                .map(|(p, _)| *p)
                .collect()
        }
    }

    #[test]
    fn test_pointer_down_targets_stack_head() {
        let mut scene = Scene::new();
        let a = scene.target();
        let b = scene.target();
        let begin_a = scene.contact(CollisionPhase::Begin, a, None);
        let begin_b = scene.contact(CollisionPhase::Begin, b, None);
        scene.frame(&[begin_a, begin_b]);
        assert_eq!(scene.manager.overlaps(scene.cursor).unwrap(), &[b, a]);

        scene.pinch(true);
        scene.frame(&[]);

        assert_eq!(scene.pointers(b), vec![PointerPhase::Down]);
        assert!(scene.pointers(a).is_empty());
        assert_eq!(scene.manager.interacted(scene.cursor), Some(b));
    }

    #[test]
    fn test_empty_stack_emits_no_pointer_down() {
        let mut scene = Scene::new();
        let a = scene.target();
        scene.pinch(true);
        scene.frame(&[]);

        // Overlap begins while already pinched: no retroactive Down.
        let begin = scene.contact(CollisionPhase::Begin, a, None);
        scene.frame(&[begin]);
        scene.pinch(false);
        scene.frame(&[]);

        assert!(scene.pointers(a).is_empty());
        assert_eq!(scene.manager.interacted(scene.cursor), None);
    }

    #[test]
    fn test_focus_locked_during_drag() {
        let mut scene = Scene::new();
        let a = scene.target();
        let b = scene.target();
        let begin_a = scene.contact(CollisionPhase::Begin, a, Some(1));
        scene.frame(&[begin_a]);

        scene.pinch(true);
        scene.frame(&[]);

        // Cursor slides off `a` onto `b` while still pinched.
        let end_a = scene.contact(CollisionPhase::End, a, Some(1));
        let begin_b = scene.contact(CollisionPhase::Begin, b, Some(2));
        scene.frame(&[end_a, begin_b]);
        scene.frame(&[]);

        scene.pinch(false);
        scene.frame(&[]);

        assert_eq!(
            scene.pointers(a),
            vec![PointerPhase::Down, PointerPhase::Dragged, PointerPhase::Dragged, PointerPhase::Up]
        );
        // Released away from `a`: no click, and `b` saw nothing pointer-wise.
        assert!(scene.pointers(b).is_empty());
    }

    #[test]
    fn test_click_when_released_over_target() {
        let mut scene = Scene::new();
        let a = scene.target();
        let begin = scene.contact(CollisionPhase::Begin, a, None);
        scene.frame(&[begin]);
        scene.pinch(true);
        scene.frame(&[]);
        scene.pinch(false);
        scene.frame(&[]);

        assert_eq!(
            scene.pointers(a),
            vec![PointerPhase::Down, PointerPhase::Up, PointerPhase::Clicked]
        );
    }

    #[test]
    fn test_previous_pinch_lags_one_frame() {
        let mut scene = Scene::new();
        let script = [true, true, false, true, false, false];
        let mut last = false;
        for pinched in script {
            scene.pinch(pinched);
            {
                let cursor = scene.world.get::<&Cursor>(scene.cursor).unwrap();
                assert_eq!(cursor.previous_pinch(), last);
            }
            scene.frame(&[]);
            last = pinched;
        }
    }

    #[test]
    fn test_velocity_from_transform() {
        let mut scene = Scene::new();
        let velocity = Vec3::new(0.0, 0.3, -0.6);
        let dt = 1.0 / 60.0;
        for i in 0..12 {
            let pos = velocity * dt * i as f32;
            scene.world.get::<&mut GlobalTransform>(scene.cursor).unwrap().0 =
                Mat4::from_translation(pos);
            scene.manager.update(&mut scene.world, &scene.registry, &[], dt);
        }
        let (linear, angular) = scene.manager.velocity(scene.cursor).unwrap();
        // Full 10-sample window: 9 steps over 10 frame durations.
        assert!((linear - velocity * 0.9).length() < 1e-3, "got {:?}", linear);
        assert_eq!(angular, Vec3::ZERO);
    }

    #[test]
    fn test_deactivate_completes_touches() {
        let mut scene = Scene::new();
        let a = scene.target();
        let begin = scene.contact(CollisionPhase::Begin, a, None);
        scene.frame(&[begin]);
        assert!(scene.manager.touch_tracker(scene.cursor).unwrap().is_near_touching());

        assert!(scene
            .manager
            .deactivate_cursor(&mut scene.world, &scene.registry, scene.cursor));

        let touches: Vec<_> = scene
            .world
            .get::<&Recorder>(a)
            .unwrap()
            .touches
            .iter()
            .map(|(p, _)| *p)
            .collect();
        assert_eq!(touches, vec![TouchPhase::Started, TouchPhase::Completed]);
        assert!(!scene.manager.is_active(scene.cursor));
    }

    #[test]
    fn test_events_for_inactive_cursor_ignored() {
        let mut scene = Scene::new();
        let a = scene.target();
        let begin = scene.contact(CollisionPhase::Begin, a, None);
        scene
            .manager
            .deactivate_cursor(&mut scene.world, &scene.registry, scene.cursor);
        scene.frame(&[begin]);
        assert!(scene.world.get::<&Recorder>(a).unwrap().touches.is_empty());
    }

    #[test]
    fn test_activate_requires_cursor_component() {
        let mut world = hecs::World::new();
        let plain = world.spawn(());
        let mut manager = CursorManager::default();
        assert!(matches!(
            manager.activate_cursor(&world, plain),
            Err(Error::MissingComponent { .. })
        ));
    }

    #[test]
    fn test_sync_cursors() {
        let mut world = hecs::World::new();
        let registry = recorder_registry();
        let a = world.spawn((Cursor::default(), GlobalTransform::default()));
        let b = world.spawn((Cursor::pointer(), GlobalTransform::default()));
        let mut manager = CursorManager::default();

        manager.sync_cursors(&mut world, &registry);
        assert_eq!(manager.cursors().count(), 2);
        assert!(manager.touch_tracker(a).is_some());
        assert!(manager.touch_tracker(b).is_none());

        world.remove_one::<Cursor>(a).unwrap();
        manager.sync_cursors(&mut world, &registry);
        assert_eq!(manager.cursors().collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn test_overlap_stack_removes_from_middle() {
        let mut world = hecs::World::new();
        let [a, b, c] = [world.spawn(()), world.spawn(()), world.spawn(())];
        let mut stack = OverlapStack::default();
        stack.push(a);
        stack.push(b);
        stack.push(c);
        assert!(stack.remove(b));
        assert_eq!(stack.as_slice(), &[c, a]);
        assert!(!stack.remove(b));
    }

    #[test]
    fn test_unknown_contact_end_keeps_overlap() {
        let mut scene = Scene::new();
        let a = scene.target();
        let begin = scene.contact(CollisionPhase::Begin, a, Some(1));
        let stale_end = scene.contact(CollisionPhase::End, a, Some(99));
        scene.frame(&[begin, stale_end]);
        assert_eq!(scene.manager.overlaps(scene.cursor).unwrap(), &[a]);

        // A repeated Begin for an open contact does not stack twice.
        let repeat = scene.contact(CollisionPhase::Begin, a, Some(1));
        scene.frame(&[repeat]);
        assert_eq!(scene.manager.overlaps(scene.cursor).unwrap(), &[a]);

        scene.pinch(true);
        scene.frame(&[]);
        assert_eq!(scene.pointers(a), vec![PointerPhase::Down]);

        let end = scene.contact(CollisionPhase::End, a, Some(1));
        scene.frame(&[end]);
        assert!(scene.manager.overlaps(scene.cursor).unwrap().is_empty());
    }
}
