//! Handler capabilities and the registry that resolves them.
//!
//! A component type opts into a capability by implementing [`TouchHandler`],
//! [`PointerHandler`] or [`FocusHandler`] and being registered once in a
//! [`HandlerRegistry`]. Dispatch then looks up exactly the registered types on
//! each entity, with no runtime type probing.

use super::events::{FocusEvent, FocusPhase, PointerEvent, PointerPhase, TouchEvent, TouchPhase};

/// What a handler sees besides its event.
///
/// `world` is shared: handlers may borrow components other than their own
/// (hecs checks borrows dynamically), but must not borrow their own type again.
#[derive(Clone, Copy)]
pub struct HandlerContext<'w> {
    pub world: &'w hecs::World,
    /// The entity the handler component lives on.
    pub entity: hecs::Entity,
}

/// Receives near-touch events.
#[allow(unused_variables)]
pub trait TouchHandler: hecs::Component {
    fn on_touch_started(&mut self, ctx: &HandlerContext<'_>, event: &TouchEvent) {}
    fn on_touch_updated(&mut self, ctx: &HandlerContext<'_>, event: &TouchEvent) {}
    fn on_touch_completed(&mut self, ctx: &HandlerContext<'_>, event: &TouchEvent) {}

    /// Inactive handlers are skipped by dispatch.
    fn is_active(&self) -> bool {
        true
    }
}

/// Receives pointer events derived from pinch transitions.
#[allow(unused_variables)]
pub trait PointerHandler: hecs::Component {
    fn on_pointer_down(&mut self, ctx: &HandlerContext<'_>, event: &mut PointerEvent) {}
    fn on_pointer_dragged(&mut self, ctx: &HandlerContext<'_>, event: &mut PointerEvent) {}
    fn on_pointer_up(&mut self, ctx: &HandlerContext<'_>, event: &mut PointerEvent) {}
    fn on_pointer_clicked(&mut self, ctx: &HandlerContext<'_>, event: &mut PointerEvent) {}

    fn is_active(&self) -> bool {
        true
    }
}

/// Receives focus enter/exit.
#[allow(unused_variables)]
pub trait FocusHandler: hecs::Component {
    fn on_focus_enter(&mut self, ctx: &HandlerContext<'_>, event: &FocusEvent) {}
    fn on_focus_exit(&mut self, ctx: &HandlerContext<'_>, event: &FocusEvent) {}

    fn is_active(&self) -> bool {
        true
    }
}

type Probe = fn(&hecs::World, hecs::Entity) -> bool;
type TouchInvoke = fn(&hecs::World, hecs::Entity, TouchPhase, &TouchEvent) -> bool;
type PointerInvoke = fn(&hecs::World, hecs::Entity, PointerPhase, &mut PointerEvent) -> bool;
type FocusInvoke = fn(&hecs::World, hecs::Entity, FocusPhase, &FocusEvent) -> bool;

struct Entry<F> {
    name: &'static str,
    probe: Probe,
    invoke: F,
}

impl<F> std::fmt::Debug for Entry<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// Registered handler component types, per capability, in registration order.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    touch: Vec<Entry<TouchInvoke>>,
    pointer: Vec<Entry<PointerInvoke>>,
    focus: Vec<Entry<FocusInvoke>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every handler component the toolkit ships.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register_touch::<crate::press::PressableButton>()
            .register_pointer::<crate::press::PressableButton>()
            .register_touch::<crate::manipulation::BoundingBox>()
            .register_pointer::<crate::manipulation::BoundingBox>()
            .register_focus::<crate::manipulation::BoundingBox>()
            .register_touch::<crate::manipulation::AxisManipulationHandler>()
            .register_pointer::<crate::manipulation::AxisManipulationHandler>();
        registry
    }

    /// Register `T` as a touch handler. Registering twice is a no-op.
    pub fn register_touch<T: TouchHandler>(&mut self) -> &mut Self {
        let name = std::any::type_name::<T>();
        if !self.touch.iter().any(|e| e.name == name) {
            self.touch.push(Entry {
                name,
                probe: probe_touch::<T>,
                invoke: invoke_touch::<T>,
            });
        }
        self
    }

    /// Register `T` as a pointer handler. Registering twice is a no-op.
    pub fn register_pointer<T: PointerHandler>(&mut self) -> &mut Self {
        let name = std::any::type_name::<T>();
        if !self.pointer.iter().any(|e| e.name == name) {
            self.pointer.push(Entry {
                name,
                probe: probe_pointer::<T>,
                invoke: invoke_pointer::<T>,
            });
        }
        self
    }

    /// Register `T` as a focus handler. Registering twice is a no-op.
    pub fn register_focus<T: FocusHandler>(&mut self) -> &mut Self {
        let name = std::any::type_name::<T>();
        if !self.focus.iter().any(|e| e.name == name) {
            self.focus.push(Entry {
                name,
                probe: probe_focus::<T>,
                invoke: invoke_focus::<T>,
            });
        }
        self
    }

    /// Whether `entity` itself carries an active touch handler.
    pub fn has_touch(&self, world: &hecs::World, entity: hecs::Entity) -> bool {
        self.touch.iter().any(|e| (e.probe)(world, entity))
    }

    /// Whether `entity` itself carries an active pointer handler.
    pub fn has_pointer(&self, world: &hecs::World, entity: hecs::Entity) -> bool {
        self.pointer.iter().any(|e| (e.probe)(world, entity))
    }

    /// Whether `entity` itself carries an active focus handler.
    pub fn has_focus(&self, world: &hecs::World, entity: hecs::Entity) -> bool {
        self.focus.iter().any(|e| (e.probe)(world, entity))
    }

    /// Invoke every touch handler on one entity. Returns how many ran.
    pub(crate) fn touch_at(
        &self,
        world: &hecs::World,
        entity: hecs::Entity,
        phase: TouchPhase,
        event: &TouchEvent,
    ) -> usize {
        self.touch
            .iter()
            .filter(|e| (e.invoke)(world, entity, phase, event))
            .count()
    }

    /// Invoke every pointer handler on one entity. Returns how many ran.
    pub(crate) fn pointer_at(
        &self,
        world: &hecs::World,
        entity: hecs::Entity,
        phase: PointerPhase,
        event: &mut PointerEvent,
    ) -> usize {
        let mut count = 0;
        for entry in &self.pointer {
            if (entry.invoke)(world, entity, phase, event) {
                count += 1;
            }
        }
        count
    }

    /// Invoke every focus handler on one entity. Returns how many ran.
    pub(crate) fn focus_at(
        &self,
        world: &hecs::World,
        entity: hecs::Entity,
        phase: FocusPhase,
        event: &FocusEvent,
    ) -> usize {
        self.focus
            .iter()
            .filter(|e| (e.invoke)(world, entity, phase, event))
            .count()
    }
}

fn probe_touch<T: TouchHandler>(world: &hecs::World, entity: hecs::Entity) -> bool {
    world.get::<&T>(entity).is_ok_and(|h| h.is_active())
}

fn probe_pointer<T: PointerHandler>(world: &hecs::World, entity: hecs::Entity) -> bool {
    world.get::<&T>(entity).is_ok_and(|h| h.is_active())
}

fn probe_focus<T: FocusHandler>(world: &hecs::World, entity: hecs::Entity) -> bool {
    world.get::<&T>(entity).is_ok_and(|h| h.is_active())
}

fn invoke_touch<T: TouchHandler>(
    world: &hecs::World,
    entity: hecs::Entity,
    phase: TouchPhase,
    event: &TouchEvent,
) -> bool {
    let Ok(mut handler) = world.get::<&mut T>(entity) else {
        return false;
    };
    if !handler.is_active() {
        return false;
    }
    let ctx = HandlerContext { world, entity };
    match phase {
        TouchPhase::Started => handler.on_touch_started(&ctx, event),
        TouchPhase::Updated => handler.on_touch_updated(&ctx, event),
        TouchPhase::Completed => handler.on_touch_completed(&ctx, event),
    }
    true
}

fn invoke_pointer<T: PointerHandler>(
    world: &hecs::World,
    entity: hecs::Entity,
    phase: PointerPhase,
    event: &mut PointerEvent,
) -> bool {
    let Ok(mut handler) = world.get::<&mut T>(entity) else {
        return false;
    };
    if !handler.is_active() {
        return false;
    }
    let ctx = HandlerContext { world, entity };
    match phase {
        PointerPhase::Down => handler.on_pointer_down(&ctx, event),
        PointerPhase::Dragged => handler.on_pointer_dragged(&ctx, event),
        PointerPhase::Up => handler.on_pointer_up(&ctx, event),
        PointerPhase::Clicked => handler.on_pointer_clicked(&ctx, event),
    }
    true
}

fn invoke_focus<T: FocusHandler>(
    world: &hecs::World,
    entity: hecs::Entity,
    phase: FocusPhase,
    event: &FocusEvent,
) -> bool {
    let Ok(mut handler) = world.get::<&mut T>(entity) else {
        return false;
    };
    if !handler.is_active() {
        return false;
    }
    let ctx = HandlerContext { world, entity };
    match phase {
        FocusPhase::Enter => handler.on_focus_enter(&ctx, event),
        FocusPhase::Exit => handler.on_focus_exit(&ctx, event),
    }
    true
}
