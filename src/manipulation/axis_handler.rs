//! Translation through center, axis and plane handles.
//!
//! Unlike [`BoundingBox`](super::BoundingBox), the handles are placed by the
//! user: any child of the owner carrying a translate
//! [`ManipulationHandle`] (see [`ManipulationHandle::translate`]) becomes a
//! handle once [`AxisManipulationHandler::bind`] runs.

use glam::Vec3;

use super::handle::{AxisMask, HandleRole, ManipulationHandle, MaterialSet};
use super::math::{self, Pose};
use super::{ManipulationEvent, ManipulationKind, ManipulationPhase};
use crate::dispatch::{
    EventQueue, HandlerContext, PointerEvent, PointerHandler, TouchEvent, TouchHandler,
};
use crate::ecs::components::physics::Collider;
use crate::ecs::components::transform::{Children, GlobalTransform};
use crate::ecs::systems::set_world_pose;
use crate::error::{Error, Result};

/// Translate handler configuration.
#[derive(Debug, Clone)]
pub struct AxisHandlerConfig {
    /// World axes translation may act on. Default: all three.
    pub axes: AxisMask,
    /// Applied to handles bound without materials of their own.
    pub center_materials: MaterialSet,
    pub axis_materials: MaterialSet,
    pub plane_materials: MaterialSet,
}

impl Default for AxisHandlerConfig {
    fn default() -> Self {
        Self {
            axes: AxisMask::XYZ,
            center_materials: MaterialSet::default(),
            axis_materials: MaterialSet::default(),
            plane_materials: MaterialSet::default(),
        }
    }
}

impl AxisHandlerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.axes.is_empty() {
            return Err(Error::InvalidConfig("translation needs at least one axis".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct TranslateGrab {
    handle: hecs::Entity,
    cursor: hecs::Entity,
    kind: ManipulationKind,
    mask: AxisMask,
    grab_start: Vec3,
    start_position: Vec3,
}

/// Translate handler owner component.
#[derive(Debug, Clone)]
pub struct AxisManipulationHandler {
    pub config: AxisHandlerConfig,
    pub enabled: bool,
    handles: Vec<hecs::Entity>,
    grab: Option<TranslateGrab>,
    events: EventQueue<ManipulationEvent>,
}

impl AxisManipulationHandler {
    pub fn new(config: AxisHandlerConfig) -> Self {
        Self {
            config,
            enabled: true,
            handles: Vec::new(),
            grab: None,
            events: EventQueue::default(),
        }
    }

    /// Collect the owner's translate handles.
    ///
    /// Every direct child with a collider must carry a translate
    /// `ManipulationHandle`. Returns the number of handles bound.
    pub fn bind(world: &hecs::World, owner: hecs::Entity) -> Result<usize> {
        let mut handler = world
            .get::<&mut AxisManipulationHandler>(owner)
            .map_err(|_| Error::missing::<AxisManipulationHandler>(owner))?;
        handler.config.validate()?;
        let children = world
            .get::<&Children>(owner)
            .map(|c| c.0.clone())
            .unwrap_or_default();

        let mut handles = Vec::new();
        for child in children {
            if !world.satisfies::<&Collider>(child).unwrap_or(false) {
                continue;
            }
            let mut handle = world
                .get::<&mut ManipulationHandle>(child)
                .map_err(|_| Error::missing::<ManipulationHandle>(child))?;
            let materials = match handle.role {
                HandleRole::Center => handler.config.center_materials,
                HandleRole::Axis => handler.config.axis_materials,
                HandleRole::Plane => handler.config.plane_materials,
                role => {
                    return Err(Error::InvalidConfig(format!(
                        "{child:?} has a {role:?} handle, expected a translate handle"
                    )))
                }
            };
            if handle.materials == MaterialSet::default() {
                handle.materials = materials;
            }
            handles.push(child);
        }

        tracing::debug!(?owner, handles = handles.len(), "translate handles bound");
        let count = handles.len();
        handler.handles = handles;
        handler.grab = None;
        Ok(count)
    }

    pub fn handles(&self) -> &[hecs::Entity] {
        &self.handles
    }

    pub fn is_grabbed(&self) -> bool {
        self.grab.is_some()
    }

    /// Take the queued manipulation events, oldest first. Drain once per
    /// frame; an undrained queue keeps only the newest events.
    pub fn drain_events(&mut self) -> Vec<ManipulationEvent> {
        self.events.drain()
    }
}

impl Default for AxisManipulationHandler {
    fn default() -> Self {
        Self::new(AxisHandlerConfig::default())
    }
}

impl TouchHandler for AxisManipulationHandler {
    fn on_touch_started(&mut self, ctx: &HandlerContext<'_>, event: &TouchEvent) {
        if !self.handles.contains(&event.target) {
            return;
        }
        if let Ok(mut handle) = ctx.world.get::<&mut ManipulationHandle>(event.target) {
            handle.touch_enter();
        }
    }

    fn on_touch_completed(&mut self, ctx: &HandlerContext<'_>, event: &TouchEvent) {
        if !self.handles.contains(&event.target) {
            return;
        }
        if let Ok(mut handle) = ctx.world.get::<&mut ManipulationHandle>(event.target) {
            handle.touch_exit();
        }
    }

    fn is_active(&self) -> bool {
        self.enabled
    }
}

impl PointerHandler for AxisManipulationHandler {
    fn on_pointer_down(&mut self, ctx: &HandlerContext<'_>, event: &mut PointerEvent) {
        if self.grab.is_some() || !self.handles.contains(&event.target) {
            return;
        }
        let Ok(mut handle) = ctx.world.get::<&mut ManipulationHandle>(event.target) else {
            return;
        };
        let Some(kind) =
            ManipulationKind::for_role(handle.role).filter(|_| handle.role.is_translate())
        else {
            return;
        };
        let Ok(start_position) =
            ctx.world.get::<&GlobalTransform>(ctx.entity).map(|g| g.position())
        else {
            tracing::warn!(owner = ?ctx.entity, "translate owner has no GlobalTransform");
            return;
        };
        handle.grab();

        self.grab = Some(TranslateGrab {
            handle: event.target,
            cursor: event.cursor,
            kind,
            mask: handle.axis & self.config.axes,
            grab_start: event.position,
            start_position,
        });
        self.events.push(ManipulationEvent {
            kind,
            phase: ManipulationPhase::Started,
            handle: event.target,
            value: None,
        });
        event.handled = true;
    }

    fn on_pointer_dragged(&mut self, ctx: &HandlerContext<'_>, event: &mut PointerEvent) {
        let Some(grab) = self.grab else {
            return;
        };
        if grab.cursor != event.cursor {
            return;
        }
        event.handled = true;
        let Ok(current) = ctx
            .world
            .get::<&GlobalTransform>(ctx.entity)
            .map(|g| Pose::from_matrix(g.0))
        else {
            return;
        };
        let position =
            math::axis_translate(grab.start_position, grab.grab_start, event.position, grab.mask);
        if let Err(error) =
            set_world_pose(ctx.world, ctx.entity, position, current.rotation, current.scale)
        {
            tracing::warn!(owner = ?ctx.entity, %error, "translation not applied");
            return;
        }
        self.events.push(ManipulationEvent {
            kind: grab.kind,
            phase: ManipulationPhase::Updated,
            handle: grab.handle,
            value: Some(position.distance(grab.start_position)),
        });
    }

    fn on_pointer_up(&mut self, ctx: &HandlerContext<'_>, event: &mut PointerEvent) {
        let Some(grab) = self.grab else {
            return;
        };
        if grab.cursor != event.cursor {
            return;
        }
        if let Ok(mut handle) = ctx.world.get::<&mut ManipulationHandle>(grab.handle) {
            handle.release();
        }
        self.events.push(ManipulationEvent {
            kind: grab.kind,
            phase: ManipulationPhase::Stopped,
            handle: grab.handle,
            value: None,
        });
        self.grab = None;
        event.handled = true;
    }

    fn is_active(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{bubble_pointer, bubble_touch, HandlerRegistry, PointerPhase, TouchPhase};
    use crate::ecs::components::transform::Transform;
    use crate::ecs::systems::{attach_child, transform_system};
    use crate::manipulation::handle::{HandleVisual, MaterialId};
    use glam::Quat;

    const EPSILON: f32 = 1e-5;

    struct Scene {
        world: hecs::World,
        registry: HandlerRegistry,
        owner: hecs::Entity,
        cursor: hecs::Entity,
    }

    impl Scene {
        fn new(config: AxisHandlerConfig, masks: &[AxisMask]) -> (Self, Vec<hecs::Entity>) {
            let mut world = hecs::World::new();
            let owner = world.spawn((
                Transform::from_position(Vec3::new(1.0, 0.0, 0.0)),
                GlobalTransform::default(),
                AxisManipulationHandler::new(config),
            ));
            let handles = masks
                .iter()
                .map(|&mask| {
                    let handle = world.spawn((
                        Transform::identity(),
                        GlobalTransform::default(),
                        Collider::sphere(0.05),
                        ManipulationHandle::translate(mask),
                    ));
                    attach_child(&mut world, owner, handle).unwrap();
                    handle
                })
                .collect();
            transform_system(&mut world);
            AxisManipulationHandler::bind(&world, owner).unwrap();
            let cursor = world.spawn(());
            let scene = Self {
                world,
                registry: HandlerRegistry::with_builtin(),
                owner,
                cursor,
            };
            (scene, handles)
        }

        fn pointer(&self, phase: PointerPhase, target: hecs::Entity, position: Vec3) -> bool {
            let mut event = PointerEvent {
                cursor: self.cursor,
                position,
                orientation: Quat::IDENTITY,
                linear_velocity: Vec3::ZERO,
                angular_velocity: Vec3::ZERO,
                target,
                handled: false,
            };
            bubble_pointer(&self.world, &self.registry, phase, &mut event);
            event.handled
        }

        fn drag(&self, handle: hecs::Entity, from: Vec3, to: Vec3) {
            assert!(self.pointer(PointerPhase::Down, handle, from));
            self.pointer(PointerPhase::Dragged, handle, to);
            self.pointer(PointerPhase::Up, handle, to);
        }

        fn owner_position(&self) -> Vec3 {
            self.world.get::<&Transform>(self.owner).unwrap().position
        }
    }

    fn assert_vec_eq(actual: Vec3, expected: Vec3) {
        assert!(
            (actual - expected).length() < EPSILON,
            "Expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_axis_handle_moves_along_one_axis() {
        let (scene, handles) = Scene::new(AxisHandlerConfig::default(), &[AxisMask::X]);
        scene.drag(handles[0], Vec3::new(1.2, 0.0, 0.0), Vec3::new(1.5, 0.4, -0.3));
        assert_vec_eq(scene.owner_position(), Vec3::new(1.3, 0.0, 0.0));

        let events = scene
            .world
            .get::<&mut AxisManipulationHandler>(scene.owner)
            .unwrap()
            .drain_events();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.kind == ManipulationKind::Axis));
        assert!((events[1].value.unwrap() - 0.3).abs() < EPSILON);
    }

    #[test]
    fn test_plane_and_center_handles() {
        let (scene, handles) =
            Scene::new(AxisHandlerConfig::default(), &[AxisMask::XZ, AxisMask::XYZ]);
        let delta = Vec3::new(0.1, 0.2, 0.3);

        scene.drag(handles[0], Vec3::ZERO, delta);
        assert_vec_eq(scene.owner_position(), Vec3::new(1.1, 0.0, 0.3));

        scene.drag(handles[1], Vec3::ZERO, delta);
        assert_vec_eq(scene.owner_position(), Vec3::new(1.2, 0.2, 0.6));
    }

    #[test]
    fn test_config_axes_restrict_center_handle() {
        let config = AxisHandlerConfig {
            axes: AxisMask::XZ,
            ..AxisHandlerConfig::default()
        };
        let (scene, handles) = Scene::new(config, &[AxisMask::XYZ]);
        scene.drag(handles[0], Vec3::ZERO, Vec3::new(0.1, 0.2, 0.3));
        assert_vec_eq(scene.owner_position(), Vec3::new(1.1, 0.0, 0.3));
    }

    #[test]
    fn test_bind_requires_handle_on_collider_children() {
        let mut world = hecs::World::new();
        let owner = world.spawn((
            Transform::identity(),
            GlobalTransform::default(),
            AxisManipulationHandler::default(),
        ));
        let bare = world.spawn((
            Transform::identity(),
            GlobalTransform::default(),
            Collider::sphere(0.1),
        ));
        attach_child(&mut world, owner, bare).unwrap();

        let result = AxisManipulationHandler::bind(&world, owner);
        assert!(matches!(result, Err(Error::MissingComponent { entity, .. }) if entity == bare));
    }

    #[test]
    fn test_bind_rejects_empty_axes() {
        let mut world = hecs::World::new();
        let owner = world.spawn((AxisManipulationHandler::new(AxisHandlerConfig {
            axes: AxisMask::empty(),
            ..AxisHandlerConfig::default()
        }),));
        assert!(matches!(
            AxisManipulationHandler::bind(&world, owner),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_bind_rejects_rig_handles() {
        let mut world = hecs::World::new();
        let owner = world.spawn((GlobalTransform::default(), AxisManipulationHandler::default()));
        let corner = world.spawn((
            Collider::sphere(0.1),
            ManipulationHandle::new(HandleRole::ScaleCorner, AxisMask::XYZ),
        ));
        attach_child(&mut world, owner, corner).unwrap();
        assert!(matches!(
            AxisManipulationHandler::bind(&world, owner),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_bind_applies_config_materials_and_touch_visuals() {
        let material = MaterialId(9);
        let config = AxisHandlerConfig {
            axis_materials: MaterialSet::uniform(material),
            ..AxisHandlerConfig::default()
        };
        let (scene, handles) = Scene::new(config, &[AxisMask::Y]);
        let handle = handles[0];
        assert_eq!(
            scene.world.get::<&ManipulationHandle>(handle).unwrap().material(),
            Some(material)
        );

        let event = TouchEvent {
            cursor: scene.cursor,
            position: Vec3::ZERO,
            previous_position: Vec3::ZERO,
            target: handle,
        };
        bubble_touch(&scene.world, &scene.registry, TouchPhase::Started, &event);
        assert_eq!(
            scene.world.get::<&ManipulationHandle>(handle).unwrap().visual(),
            HandleVisual::Focused
        );
        bubble_touch(&scene.world, &scene.registry, TouchPhase::Completed, &event);
        assert_eq!(
            scene.world.get::<&ManipulationHandle>(handle).unwrap().visual(),
            HandleVisual::Idle
        );
    }
}
