//! Capability-based event dispatch.
//!
//! Events start at their target entity and bubble up the `Parent` chain.
//! At every level, each registered handler component present on that entity
//! is invoked in registration order. Pointer events stop bubbling once a
//! handler sets [`PointerEvent::handled`]; the remaining handlers of that same
//! level still run.

pub mod events;
pub mod handler;

pub use events::{
    EventQueue, FocusEvent, FocusPhase, PointerEvent, PointerPhase, TouchEvent, TouchPhase,
    EVENT_QUEUE_CAPACITY,
};
pub use handler::{FocusHandler, HandlerContext, HandlerRegistry, PointerHandler, TouchHandler};

use crate::ecs::systems::ancestors;

/// Deliver a touch event to the target and its ancestors.
///
/// Returns the number of handler invocations.
pub fn bubble_touch(
    world: &hecs::World,
    registry: &HandlerRegistry,
    phase: TouchPhase,
    event: &TouchEvent,
) -> usize {
    let chain: Vec<_> = ancestors(world, event.target).collect();
    chain
        .into_iter()
        .map(|entity| registry.touch_at(world, entity, phase, event))
        .sum()
}

/// Deliver a pointer event to the target and its ancestors until handled.
pub fn bubble_pointer(
    world: &hecs::World,
    registry: &HandlerRegistry,
    phase: PointerPhase,
    event: &mut PointerEvent,
) -> usize {
    let chain: Vec<_> = ancestors(world, event.target).collect();
    let mut count = 0;
    for entity in chain {
        count += registry.pointer_at(world, entity, phase, event);
        if event.handled {
            tracing::trace!(?phase, ?entity, "pointer event handled, bubbling stopped");
            break;
        }
    }
    count
}

/// Deliver a focus event to the target and its ancestors.
pub fn bubble_focus(
    world: &hecs::World,
    registry: &HandlerRegistry,
    phase: FocusPhase,
    event: &FocusEvent,
) -> usize {
    let chain: Vec<_> = ancestors(world, event.target).collect();
    chain
        .into_iter()
        .map(|entity| registry.focus_at(world, entity, phase, event))
        .sum()
}

/// Whether the entity or one of its ancestors handles touch events.
pub fn accepts_touch(
    world: &hecs::World,
    registry: &HandlerRegistry,
    entity: hecs::Entity,
) -> bool {
    ancestors(world, entity).any(|e| registry.has_touch(world, e))
}

/// Whether the entity or one of its ancestors handles pointer events.
pub fn accepts_pointer(
    world: &hecs::World,
    registry: &HandlerRegistry,
    entity: hecs::Entity,
) -> bool {
    ancestors(world, entity).any(|e| registry.has_pointer(world, e))
}

/// Number of sources currently focusing an entity.
///
/// Inserted on first focus; `FocusEnter` fires on 0 -> 1 and `FocusExit` on 1 -> 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Focusable {
    pub count: u32,
}

impl Focusable {
    #[inline]
    pub fn is_focused(&self) -> bool {
        self.count > 0
    }
}

/// Add one focus reference to `target`, dispatching `FocusEnter` on the first.
pub fn acquire_focus(
    world: &mut hecs::World,
    registry: &HandlerRegistry,
    target: hecs::Entity,
    source: Option<hecs::Entity>,
) {
    if !world.contains(target) {
        return;
    }
    let existing = world.get::<&mut Focusable>(target).ok().map(|mut focus| {
        focus.count += 1;
        focus.count == 1
    });
    let entered = match existing {
        Some(entered) => entered,
        None => {
            let _ = world.insert_one(target, Focusable { count: 1 });
            true
        }
    };
    if entered {
        tracing::debug!(?target, "focus enter");
        bubble_focus(world, registry, FocusPhase::Enter, &FocusEvent { source, target });
    }
}

/// Drop one focus reference from `target`, dispatching `FocusExit` on the last.
pub fn release_focus(
    world: &mut hecs::World,
    registry: &HandlerRegistry,
    target: hecs::Entity,
    source: Option<hecs::Entity>,
) {
    let exited = world
        .get::<&mut Focusable>(target)
        .ok()
        .is_some_and(|mut focus| {
            if focus.count == 0 {
                return false;
            }
            focus.count -= 1;
            focus.count == 0
        });
    if exited {
        tracing::debug!(?target, "focus exit");
        bubble_focus(world, registry, FocusPhase::Exit, &FocusEvent { source, target });
    }
}
