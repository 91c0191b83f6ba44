//! Event payloads delivered to handler capabilities.

use std::collections::VecDeque;

use glam::{Quat, Vec3};

/// Touch lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchPhase {
    Started,
    Updated,
    Completed,
}

/// A near touch between a cursor and a target.
#[derive(Debug, Clone, Copy)]
pub struct TouchEvent {
    pub cursor: hecs::Entity,
    /// Cursor position this frame, in world space.
    pub position: Vec3,
    /// Cursor position the frame before.
    pub previous_position: Vec3,
    /// The entity the cursor touched (the start of the bubbling chain).
    pub target: hecs::Entity,
}

/// Pointer lifecycle phase, derived from pinch transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerPhase {
    Down,
    Dragged,
    Up,
    Clicked,
}

/// A pointer event. Handlers set `handled` to stop bubbling to ancestors.
#[derive(Debug, Clone, Copy)]
pub struct PointerEvent {
    pub cursor: hecs::Entity,
    pub position: Vec3,
    pub orientation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub target: hecs::Entity,
    pub handled: bool,
}

/// Focus phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FocusPhase {
    Enter,
    Exit,
}

/// Focus gained or lost by a target.
#[derive(Debug, Clone, Copy)]
pub struct FocusEvent {
    /// The cursor (or gaze source) responsible, if any.
    pub source: Option<hecs::Entity>,
    pub target: hecs::Entity,
}

/// Events a component keeps until the host drains them.
pub const EVENT_QUEUE_CAPACITY: usize = 64;

/// Bounded FIFO of component events. Once full, the oldest event is dropped.
///
/// Hosts are expected to drain once per frame.
#[derive(Debug, Clone)]
pub struct EventQueue<T> {
    events: VecDeque<T>,
    capacity: usize,
}

impl<T> EventQueue<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(EVENT_QUEUE_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, event: T) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
            tracing::trace!(capacity = self.capacity, "event queue full, dropped oldest");
        }
        self.events.push_back(event);
    }

    /// Take every queued event, oldest first.
    pub fn drain(&mut self) -> Vec<T> {
        self.events.drain(..).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::with_capacity(EVENT_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_queue_drops_oldest_when_full() {
        let mut queue = EventQueue::with_capacity(3);
        for i in 0..5 {
            queue.push(i);
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.drain(), vec![2, 3, 4]);
        assert!(queue.is_empty());
    }
}
