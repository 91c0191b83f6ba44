//! Pressable button gesture.
//!
//! A [`PressableButton`] tracks how deep cursors have pushed into it along its
//! press axis and runs a two-state machine with hysteresis:
//!
//! ```text
//!            position < press_position
//! Released ─────────────────────────────▶ Pressed
//!          ◀─────────────────────────────
//!            position > release_position
//! ```
//!
//! Positions are signed distances along the button's outward axis (the
//! opposite of `press_direction`) in its local frame, so pushing in lowers
//! the position from `start_position` toward `end_position`.

use glam::Vec3;

use crate::cursor::Cursor;
use crate::dispatch::{
    EventQueue, HandlerContext, PointerEvent, PointerHandler, TouchEvent, TouchHandler,
};
use crate::ecs::components::transform::GlobalTransform;
use crate::effects::ProximityLight;
use crate::error::{Error, Result};

/// Button travel and timing.
#[derive(Debug, Clone)]
pub struct PressConfig {
    /// Rest position with nothing touching. Default: 0.0.
    pub start_position: f32,
    /// Crossing below this enters Pressed. Default: -0.008.
    pub press_position: f32,
    /// Crossing above this while Pressed returns to Released. Default: -0.004.
    pub release_position: f32,
    /// Deepest position the button travels to. Default: -0.01.
    pub end_position: f32,
    /// Maximum travel per second toward the target position. Default: 0.5.
    pub retract_speed: f32,
    /// Only accept touches that arrive from the front of the button. Default: true.
    pub enforce_front_push: bool,
    /// Local direction the button is pushed in. Default: -Z.
    pub press_direction: Vec3,
    /// Seconds a simulated press takes to travel from start to end. Default: 0.25.
    pub simulated_press_duration: f32,
}

impl Default for PressConfig {
    fn default() -> Self {
        Self {
            start_position: 0.0,
            press_position: -0.008,
            release_position: -0.004,
            end_position: -0.01,
            retract_speed: 0.5,
            enforce_front_push: true,
            press_direction: Vec3::NEG_Z,
            simulated_press_duration: 0.25,
        }
    }
}

impl PressConfig {
    /// Check the configuration.
    ///
    /// Positions out of order only produce a warning; the state machine still
    /// runs with whatever thresholds it is given.
    pub fn validate(&self) -> Result<()> {
        if self.retract_speed <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "retract_speed must be positive, got {}",
                self.retract_speed
            )));
        }
        if self.simulated_press_duration < 0.0 {
            return Err(Error::InvalidConfig(
                "simulated_press_duration must be non-negative".into(),
            ));
        }
        if self.press_direction.length_squared() <= f32::EPSILON {
            return Err(Error::InvalidConfig("press_direction must be non-zero".into()));
        }
        let ordered = self.end_position <= self.press_position
            && self.press_position <= self.release_position
            && self.release_position <= self.start_position;
        if !ordered {
            tracing::warn!(
                start = self.start_position,
                release = self.release_position,
                press = self.press_position,
                end = self.end_position,
                "press positions are not ordered end <= press <= release <= start"
            );
        }
        Ok(())
    }

    fn outward_axis(&self) -> Vec3 {
        -self.press_direction.normalize_or_zero()
    }
}

/// Gesture state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PressState {
    #[default]
    Released,
    Pressed,
}

impl PressState {
    /// Next state for a position, with hysteresis between the thresholds.
    pub fn next(self, position: f32, press_position: f32, release_position: f32) -> Self {
        match self {
            Self::Released if position < press_position => Self::Pressed,
            Self::Pressed if position > release_position => Self::Released,
            state => state,
        }
    }
}

/// Emitted on every state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressEvent {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy)]
struct ButtonTouch {
    cursor: hecs::Entity,
    contacts: u32,
    local_position: Vec3,
    distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Simulation {
    Pressing { elapsed: f32, auto_release: bool },
    Holding,
    Releasing { elapsed: f32 },
}

/// Pressable button component.
#[derive(Debug, Clone)]
pub struct PressableButton {
    pub config: PressConfig,
    pub enabled: bool,
    current_position: f32,
    state: PressState,
    touches: Vec<ButtonTouch>,
    simulation: Option<Simulation>,
    events: EventQueue<PressEvent>,
}

impl PressableButton {
    pub fn new(config: PressConfig) -> Self {
        let current_position = config.start_position;
        Self {
            config,
            enabled: true,
            current_position,
            state: PressState::Released,
            touches: Vec::new(),
            simulation: None,
            events: EventQueue::default(),
        }
    }

    #[inline]
    pub fn current_position(&self) -> f32 {
        self.current_position
    }

    #[inline]
    pub fn state(&self) -> PressState {
        self.state
    }

    #[inline]
    pub fn is_pressed(&self) -> bool {
        self.state == PressState::Pressed
    }

    /// Cursors currently pushing the button.
    pub fn touching_cursors(&self) -> impl Iterator<Item = hecs::Entity> + '_ {
        self.touches.iter().map(|t| t.cursor)
    }

    /// Local-space position of a touching cursor.
    pub fn touch_position(&self, cursor: hecs::Entity) -> Option<Vec3> {
        self.touch(cursor).map(|t| t.local_position)
    }

    /// Take the transitions that happened since the last call.
    pub fn drain_events(&mut self) -> Vec<PressEvent> {
        self.events.drain()
    }

    /// Push the button in and hold it until [`PressableButton::release`].
    pub fn press(&mut self) {
        self.simulation = Some(Simulation::Pressing {
            elapsed: self.simulated_elapsed(),
            auto_release: false,
        });
    }

    /// Push the button in fully, then let it go.
    pub fn click(&mut self) {
        self.simulation = Some(Simulation::Pressing {
            elapsed: self.simulated_elapsed(),
            auto_release: true,
        });
    }

    /// End a simulated press started by [`PressableButton::press`].
    pub fn release(&mut self) {
        let progress = self.simulated_progress();
        if self.simulation.is_some() {
            let duration = self.config.simulated_press_duration;
            self.simulation = Some(Simulation::Releasing {
                elapsed: (1.0 - progress) * duration,
            });
        }
    }

    fn touch(&self, cursor: hecs::Entity) -> Option<&ButtonTouch> {
        self.touches.iter().find(|t| t.cursor == cursor)
    }

    fn distance(&self, local: Vec3) -> f32 {
        local.dot(self.config.outward_axis())
    }

    /// How far along its travel a simulated press is, 0 at start and 1 at end.
    fn simulated_progress(&self) -> f32 {
        let duration = self.config.simulated_press_duration;
        let ratio = |elapsed: f32| {
            if duration <= f32::EPSILON {
                1.0
            } else {
                (elapsed / duration).clamp(0.0, 1.0)
            }
        };
        match self.simulation {
            None => 0.0,
            Some(Simulation::Pressing { elapsed, .. }) => ratio(elapsed),
            Some(Simulation::Holding) => 1.0,
            Some(Simulation::Releasing { elapsed }) => 1.0 - ratio(elapsed),
        }
    }

    fn simulated_elapsed(&self) -> f32 {
        self.simulated_progress() * self.config.simulated_press_duration
    }

    fn advance_simulation(&mut self, delta_time: f32) {
        let duration = self.config.simulated_press_duration;
        self.simulation = match self.simulation {
            Some(Simulation::Pressing {
                elapsed,
                auto_release,
            }) => {
                let elapsed = elapsed + delta_time;
                if elapsed < duration {
                    Some(Simulation::Pressing {
                        elapsed,
                        auto_release,
                    })
                } else if auto_release {
                    Some(Simulation::Releasing { elapsed: 0.0 })
                } else {
                    Some(Simulation::Holding)
                }
            }
            Some(Simulation::Releasing { elapsed }) => {
                let elapsed = elapsed + delta_time;
                (elapsed < duration).then_some(Simulation::Releasing { elapsed })
            }
            other => other,
        };
    }

    /// Where the button wants to be: simulated press, else deepest touch, else rest.
    fn target_position(&self) -> f32 {
        let start = self.config.start_position;
        let end = self.config.end_position;
        let target = if self.simulation.is_some() {
            start + (end - start) * self.simulated_progress()
        } else {
            self.touches
                .iter()
                .map(|t| t.distance)
                .min_by(|a, b| a.total_cmp(b))
                .unwrap_or(start)
        };
        target.clamp(start.min(end), start.max(end))
    }

    /// Advance one frame. Returns the transition, if any.
    pub fn step(&mut self, delta_time: f32) -> Option<PressEvent> {
        self.advance_simulation(delta_time);

        let target = self.target_position();
        let max_step = self.config.retract_speed * delta_time;
        let delta = (target - self.current_position).clamp(-max_step, max_step);
        let start = self.config.start_position;
        let end = self.config.end_position;
        self.current_position =
            (self.current_position + delta).clamp(start.min(end), start.max(end));

        let next = self.state.next(
            self.current_position,
            self.config.press_position,
            self.config.release_position,
        );
        if next == self.state {
            return None;
        }
        self.state = next;
        let event = match next {
            PressState::Pressed => PressEvent::Pressed,
            PressState::Released => PressEvent::Released,
        };
        self.events.push(event);
        Some(event)
    }

    fn local_point(ctx: &HandlerContext<'_>, world_point: Vec3) -> Option<Vec3> {
        let global = ctx.world.get::<&GlobalTransform>(ctx.entity).ok()?;
        Some(global.inverse_transform_point(world_point))
    }
}

impl Default for PressableButton {
    fn default() -> Self {
        Self::new(PressConfig::default())
    }
}

impl TouchHandler for PressableButton {
    fn on_touch_started(&mut self, ctx: &HandlerContext<'_>, event: &TouchEvent) {
        let (Some(local), Some(previous)) = (
            Self::local_point(ctx, event.position),
            Self::local_point(ctx, event.previous_position),
        ) else {
            return;
        };

        if let Some(touch) = self.touches.iter_mut().find(|t| t.cursor == event.cursor) {
            touch.contacts += 1;
            return;
        }

        // The start plane must lie ahead of where the cursor came from.
        let from_front = self.distance(previous) - self.config.start_position > 0.0;
        if self.config.enforce_front_push && !from_front {
            tracing::trace!(
                cursor = ?event.cursor,
                button = ?ctx.entity,
                "touch from behind ignored"
            );
            return;
        }

        let distance = self.distance(local);
        self.touches.push(ButtonTouch {
            cursor: event.cursor,
            contacts: 1,
            local_position: local,
            distance,
        });
    }

    fn on_touch_updated(&mut self, ctx: &HandlerContext<'_>, event: &TouchEvent) {
        let Some(local) = Self::local_point(ctx, event.position) else {
            return;
        };
        let distance = self.distance(local);
        if let Some(touch) = self.touches.iter_mut().find(|t| t.cursor == event.cursor) {
            touch.local_position = local;
            touch.distance = distance;
        }
    }

    fn on_touch_completed(&mut self, _ctx: &HandlerContext<'_>, event: &TouchEvent) {
        if let Some(index) = self.touches.iter().position(|t| t.cursor == event.cursor) {
            let touch = &mut self.touches[index];
            touch.contacts = touch.contacts.saturating_sub(1);
            if touch.contacts == 0 {
                self.touches.remove(index);
            }
        }
    }

    fn is_active(&self) -> bool {
        self.enabled
    }
}

impl PointerHandler for PressableButton {
    fn on_pointer_down(&mut self, ctx: &HandlerContext<'_>, event: &mut PointerEvent) {
        // Touch cursors drive the button physically.
        let touch = ctx
            .world
            .get::<&Cursor>(event.cursor)
            .is_ok_and(|c| c.is_touch_capable());
        if touch {
            return;
        }
        self.press();
        event.handled = true;
    }

    fn on_pointer_up(&mut self, ctx: &HandlerContext<'_>, event: &mut PointerEvent) {
        let touch = ctx
            .world
            .get::<&Cursor>(event.cursor)
            .is_ok_and(|c| c.is_touch_capable());
        if touch || self.simulation.is_none() {
            return;
        }
        self.release();
        event.handled = true;
    }

    fn is_active(&self) -> bool {
        self.enabled
    }
}

/// Move every button toward its target and fire transitions.
///
/// Entering Pressed pulses the [`ProximityLight`] of each touching cursor
/// that has one. Transitions queue on the button until
/// [`PressableButton::drain_events`]; drain once per frame, since only the
/// newest [`EVENT_QUEUE_CAPACITY`](crate::dispatch::EVENT_QUEUE_CAPACITY) are kept.
pub fn pressable_system(world: &mut hecs::World, delta_time: f32) {
    let mut pulses = Vec::new();
    for (entity, button) in world.query_mut::<&mut PressableButton>() {
        if !button.enabled {
            continue;
        }
        let Some(event) = button.step(delta_time) else {
            continue;
        };
        tracing::debug!(?entity, ?event, position = button.current_position, "button transition");
        if event == PressEvent::Pressed {
            pulses.extend(button.touching_cursors());
        }
    }
    for cursor in pulses {
        if let Ok(mut light) = world.get::<&mut ProximityLight>(cursor) {
            light.pulse();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{
        bubble_pointer, bubble_touch, HandlerRegistry, PointerPhase, TouchPhase,
        EVENT_QUEUE_CAPACITY,
    };
    use glam::Quat;

    fn wide_travel_config() -> PressConfig {
        PressConfig {
            start_position: 0.5,
            press_position: 0.1,
            release_position: 0.3,
            end_position: -0.1,
            retract_speed: 100.0,
            ..PressConfig::default()
        }
    }

    struct Bench {
        world: hecs::World,
        registry: HandlerRegistry,
        button: hecs::Entity,
    }

    impl Bench {
        fn new(config: PressConfig) -> Self {
            let mut world = hecs::World::new();
            let button = world.spawn((PressableButton::new(config), GlobalTransform::default()));
            let mut registry = HandlerRegistry::new();
            registry
                .register_touch::<PressableButton>()
                .register_pointer::<PressableButton>();
            Self {
                world,
                registry,
                button,
            }
        }

        fn touch(&self, phase: TouchPhase, cursor: hecs::Entity, z: f32, previous_z: f32) {
            let event = TouchEvent {
                cursor,
                position: Vec3::new(0.0, 0.0, z),
                previous_position: Vec3::new(0.0, 0.0, previous_z),
                target: self.button,
            };
            bubble_touch(&self.world, &self.registry, phase, &event);
        }

        fn button(&self) -> hecs::Ref<'_, PressableButton> {
            self.world.get::<&PressableButton>(self.button).unwrap()
        }
    }

    #[test]
    fn test_hysteresis_dead_zone() {
        let mut state = PressState::Released;
        for position in [0.5, 0.3, 0.2, 0.1, 0.15, 0.29, 0.3] {
            state = state.next(position, 0.1, 0.3);
            assert_eq!(state, PressState::Released, "at {position}");
        }
        state = state.next(0.09, 0.1, 0.3);
        assert_eq!(state, PressState::Pressed);
        for position in [0.1, 0.2, 0.3, 0.0, 0.25] {
            state = state.next(position, 0.1, 0.3);
            assert_eq!(state, PressState::Pressed, "at {position}");
        }
        state = state.next(0.31, 0.1, 0.3);
        assert_eq!(state, PressState::Released);
    }

    #[test]
    fn test_depth_ramp_fires_once_each_way() {
        let mut bench = Bench::new(wide_travel_config());
        let cursor = bench.world.spawn(());
        bench.touch(TouchPhase::Started, cursor, 0.5, 0.6);

        let steps = 60;
        let down = (0..=steps).map(|i| 0.5 - 0.6 * i as f32 / steps as f32);
        let up = (0..=steps).map(|i| -0.1 + 0.6 * i as f32 / steps as f32);
        let mut transitions = Vec::new();
        for z in down.chain(up) {
            bench.touch(TouchPhase::Updated, cursor, z, z);
            pressable_system(&mut bench.world, 1.0 / 60.0);
            let mut button = bench.world.get::<&mut PressableButton>(bench.button).unwrap();
            for event in button.drain_events() {
                transitions.push((event, button.current_position()));
            }
        }

        assert_eq!(transitions.len(), 2, "{transitions:?}");
        assert_eq!(transitions[0].0, PressEvent::Pressed);
        assert!(transitions[0].1 <= 0.1);
        assert_eq!(transitions[1].0, PressEvent::Released);
        assert!(transitions[1].1 >= 0.3);
    }

    #[test]
    fn test_motion_is_rate_limited() {
        let mut bench = Bench::new(PressConfig {
            retract_speed: 1.0,
            ..wide_travel_config()
        });
        let cursor = bench.world.spawn(());
        bench.touch(TouchPhase::Started, cursor, -0.1, 0.6);

        pressable_system(&mut bench.world, 0.125);
        assert!((bench.button().current_position() - 0.375).abs() < 1e-5);
        assert_eq!(bench.button().state(), PressState::Released);
    }

    #[test]
    fn test_touch_from_behind_ignored() {
        let mut bench = Bench::new(wide_travel_config());
        let cursor = bench.world.spawn(());
        bench.touch(TouchPhase::Started, cursor, 0.0, 0.2);
        assert_eq!(bench.button().touching_cursors().count(), 0);

        bench
            .world
            .get::<&mut PressableButton>(bench.button)
            .unwrap()
            .config
            .enforce_front_push = false;
        bench.touch(TouchPhase::Started, cursor, 0.0, 0.2);
        assert_eq!(bench.button().touching_cursors().count(), 1);
    }

    #[test]
    fn test_deepest_touch_wins() {
        let mut bench = Bench::new(wide_travel_config());
        let a = bench.world.spawn(());
        let b = bench.world.spawn(());
        bench.touch(TouchPhase::Started, a, 0.4, 0.6);
        bench.touch(TouchPhase::Started, b, 0.0, 0.6);
        pressable_system(&mut bench.world, 0.1);
        assert!((bench.button().current_position() - 0.0).abs() < 1e-5);

        bench.touch(TouchPhase::Completed, b, 0.0, 0.0);
        pressable_system(&mut bench.world, 0.1);
        assert!((bench.button().current_position() - 0.4).abs() < 1e-5);
    }

    #[test]
    fn test_touch_position_is_local() {
        let mut bench = Bench::new(wide_travel_config());
        let transform = glam::Mat4::from_rotation_translation(
            Quat::from_rotation_y(std::f32::consts::PI),
            Vec3::new(1.0, 0.0, 0.0),
        );
        bench.world.get::<&mut GlobalTransform>(bench.button).unwrap().0 = transform;
        let cursor = bench.world.spawn(());
        // Local z = 0.4 is world z = -0.4 after the half turn.
        let event = TouchEvent {
            cursor,
            position: Vec3::new(1.0, 0.0, -0.4),
            previous_position: Vec3::new(1.0, 0.0, -0.6),
            target: bench.button,
        };
        bubble_touch(&bench.world, &bench.registry, TouchPhase::Started, &event);
        let local = bench.button().touch_position(cursor).unwrap();
        assert!((local - Vec3::new(0.0, 0.0, 0.4)).length() < 1e-5);
    }

    #[test]
    fn test_pressed_pulses_touching_cursor_light() {
        let mut bench = Bench::new(wide_travel_config());
        let cursor = bench.world.spawn((ProximityLight::default(),));
        bench.touch(TouchPhase::Started, cursor, 0.0, 0.6);
        pressable_system(&mut bench.world, 0.1);
        assert!(bench.button().is_pressed());
        assert_eq!(bench.world.get::<&ProximityLight>(cursor).unwrap().pulse_count(), 1);
    }

    #[test]
    fn test_click_ramps_through_both_states() {
        let mut bench = Bench::new(PressConfig {
            simulated_press_duration: 0.5,
            ..wide_travel_config()
        });
        bench.world.get::<&mut PressableButton>(bench.button).unwrap().click();

        let mut events = Vec::new();
        let mut positions = Vec::new();
        for _ in 0..80 {
            pressable_system(&mut bench.world, 1.0 / 60.0);
            let mut button = bench.world.get::<&mut PressableButton>(bench.button).unwrap();
            events.extend(button.drain_events());
            positions.push(button.current_position());
        }

        assert_eq!(events, vec![PressEvent::Pressed, PressEvent::Released]);
        // Linear ramp, never a jump straight to the end.
        assert!(positions[0] > 0.4);
        assert!((positions.last().unwrap() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_undrained_events_are_bounded() {
        let mut button = PressableButton::new(PressConfig {
            simulated_press_duration: 0.5,
            ..wide_travel_config()
        });
        for _ in 0..40 {
            button.click();
            for _ in 0..80 {
                button.step(1.0 / 60.0);
            }
        }
        let events = button.drain_events();
        assert_eq!(events.len(), EVENT_QUEUE_CAPACITY);
        assert_eq!(events.last(), Some(&PressEvent::Released));
        assert!(button.drain_events().is_empty());
    }

    #[test]
    fn test_pointer_cursor_simulates_press() {
        let mut bench = Bench::new(PressConfig {
            simulated_press_duration: 0.0,
            ..wide_travel_config()
        });
        let cursor = bench.world.spawn((Cursor::pointer(),));
        let mut event = PointerEvent {
            cursor,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            target: bench.button,
            handled: false,
        };
        bubble_pointer(&bench.world, &bench.registry, PointerPhase::Down, &mut event);
        assert!(event.handled);
        pressable_system(&mut bench.world, 0.1);
        assert!(bench.button().is_pressed());

        event.handled = false;
        bubble_pointer(&bench.world, &bench.registry, PointerPhase::Up, &mut event);
        pressable_system(&mut bench.world, 0.1);
        assert!(!bench.button().is_pressed());
    }

    #[test]
    fn test_touch_cursor_pointer_down_does_not_simulate() {
        let mut bench = Bench::new(wide_travel_config());
        let cursor = bench.world.spawn((Cursor::default(),));
        let mut event = PointerEvent {
            cursor,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            target: bench.button,
            handled: false,
        };
        bubble_pointer(&bench.world, &bench.registry, PointerPhase::Down, &mut event);
        assert!(!event.handled);
        pressable_system(&mut bench.world, 0.1);
        assert!(!bench.button().is_pressed());
    }

    #[test]
    fn test_validate() {
        assert!(PressConfig::default().validate().is_ok());
        // Out-of-order thresholds only warn.
        assert!(PressConfig {
            press_position: 1.0,
            ..PressConfig::default()
        }
        .validate()
        .is_ok());
        assert!(PressConfig {
            retract_speed: 0.0,
            ..PressConfig::default()
        }
        .validate()
        .is_err());
    }
}
