//! Near and external touch tracking for one cursor.
//!
//! Raw sensor callbacks become two independent streams:
//!
//! - **near**: direct overlap with a target that handles touch, reported as
//!   `TouchStarted` / `TouchUpdated` / `TouchCompleted`;
//! - **external**: overlap with the proximity shell, reported only as a
//!   focus reference on the target (no touch events).
//!
//! Both are keyed by [`ContactId`], so several simultaneous contacts with the
//! same target are tracked independently.

use std::collections::{BTreeMap, HashMap};

use glam::Vec3;

use crate::dispatch::{
    accepts_pointer, accepts_touch, acquire_focus, bubble_touch, release_focus, HandlerRegistry,
    TouchEvent, TouchPhase,
};
use crate::physics::{CollisionEvent, ContactId, SensorKind};

/// Where the cursor is while a touch callback is processed.
#[derive(Debug, Clone, Copy)]
pub struct TouchOrigin {
    pub cursor: hecs::Entity,
    pub position: Vec3,
    pub previous_position: Vec3,
}

impl TouchOrigin {
    fn event(&self, target: hecs::Entity) -> TouchEvent {
        TouchEvent {
            cursor: self.cursor,
            position: self.position,
            previous_position: self.previous_position,
            target,
        }
    }
}

/// Per-cursor contact bookkeeping.
#[derive(Debug, Default)]
pub struct TouchTracker {
    contacts: HashMap<ContactId, hecs::Entity>,
    near: BTreeMap<ContactId, hecs::Entity>,
    external: BTreeMap<ContactId, hecs::Entity>,
}

impl TouchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// At least one near contact is open.
    #[inline]
    pub fn is_near_touching(&self) -> bool {
        !self.near.is_empty()
    }

    /// At least one proximity-shell contact is open.
    #[inline]
    pub fn is_external_touching(&self) -> bool {
        !self.external.is_empty()
    }

    /// Targets of the open near contacts, by contact id.
    pub fn near_targets(&self) -> impl Iterator<Item = hecs::Entity> + '_ {
        self.near.values().copied()
    }

    /// Handle a begin callback. Returns whether a `TouchStarted` was dispatched.
    pub fn on_begin_collision(
        &mut self,
        world: &mut hecs::World,
        registry: &HandlerRegistry,
        origin: &TouchOrigin,
        event: &CollisionEvent,
    ) -> bool {
        let other = event.other;
        self.contacts.insert(event.id, other);

        match event.body.sensor {
            SensorKind::Near => {
                if !accepts_touch(world, registry, other) {
                    return false;
                }
                self.near.insert(event.id, other);
                tracing::debug!(cursor = ?origin.cursor, target = ?other, "touch started");
                bubble_touch(world, registry, TouchPhase::Started, &origin.event(other));
                true
            }
            SensorKind::External => {
                if accepts_touch(world, registry, other)
                    || accepts_pointer(world, registry, other)
                {
                    self.external.insert(event.id, other);
                    acquire_focus(world, registry, other, Some(origin.cursor));
                }
                false
            }
        }
    }

    /// Handle an update callback. Unknown ids are ignored.
    pub fn on_update_collision(
        &mut self,
        world: &hecs::World,
        registry: &HandlerRegistry,
        origin: &TouchOrigin,
        event: &CollisionEvent,
    ) -> bool {
        let Some(&target) = self.near.get(&event.id) else {
            tracing::trace!(id = event.id.0, "update for untracked contact ignored");
            return false;
        };
        bubble_touch(world, registry, TouchPhase::Updated, &origin.event(target));
        true
    }

    /// Handle an end callback. Returns whether a `TouchCompleted` was dispatched.
    pub fn on_end_collision(
        &mut self,
        world: &mut hecs::World,
        registry: &HandlerRegistry,
        origin: &TouchOrigin,
        event: &CollisionEvent,
    ) -> bool {
        if self.contacts.remove(&event.id).is_none() {
            tracing::trace!(id = event.id.0, "end for unknown contact ignored");
        }
        if let Some(target) = self.external.remove(&event.id) {
            release_focus(world, registry, target, Some(origin.cursor));
        }
        match self.near.remove(&event.id) {
            Some(target) => {
                tracing::debug!(cursor = ?origin.cursor, ?target, "touch completed");
                bubble_touch(world, registry, TouchPhase::Completed, &origin.event(target));
                true
            }
            None => false,
        }
    }

    /// Complete every open near touch and drop all state.
    ///
    /// Returns the number of `TouchCompleted` events dispatched.
    pub fn deactivate(
        &mut self,
        world: &mut hecs::World,
        registry: &HandlerRegistry,
        origin: &TouchOrigin,
    ) -> usize {
        let mut completed = 0;
        for (_, target) in std::mem::take(&mut self.near) {
            if world.contains(target) {
                bubble_touch(world, registry, TouchPhase::Completed, &origin.event(target));
                completed += 1;
            }
        }
        for (_, target) in std::mem::take(&mut self.external) {
            release_focus(world, registry, target, Some(origin.cursor));
        }
        self.contacts.clear();
        completed
    }
}
