//! Bounding box rig: scale and rotate handles around an object.
//!
//! The rig is derived from the owner's box (its collider bounds, or the
//! merged [`MeshBounds`] of its subtree when auto-fitting):
//!
//! - 8 corner handles scale uniformly about the opposite corner
//! - 6 face handles scale one axis about the opposite face (optional)
//! - 12 edge handles rotate about the edge's axis through the box center
//! - 12 wireframe links, visual only
//!
//! Any configuration change marks the rig dirty; [`rig_system`] then tears
//! the whole rig down and builds a new one. A grab in progress is dropped.

use glam::{Mat4, Vec3};

use super::handle::{AxisMask, HandleRole, ManipulationHandle, MaterialId, MaterialSet};
use super::math::{self, Pose, ScaleLimits};
use super::{ManipulationEvent, ManipulationKind, ManipulationPhase};
use crate::dispatch::{
    EventQueue, FocusEvent, FocusHandler, HandlerContext, PointerEvent, PointerHandler, TouchEvent,
    TouchHandler,
};
use crate::ecs::components::physics::{Collider, CollisionLayers, MeshBounds};
use crate::ecs::components::transform::{Children, GlobalTransform, Transform};
use crate::ecs::systems::{attach_child, despawn_recursive, set_world_pose};
use crate::error::{Error, Result};
use crate::geometry::Aabb;

/// Rig layout and look.
#[derive(Debug, Clone)]
pub struct BoundingBoxConfig {
    /// Space added around the bounds on every side, in local units. Default: zero.
    pub padding: Vec3,
    /// Fit the box over the `MeshBounds` of the owner and its descendants
    /// instead of using the owner's collider. Default: false.
    pub auto_fit: bool,
    /// Default: true.
    pub show_scale_handles: bool,
    /// Default: false.
    pub show_face_scale_handles: bool,
    /// Default: true.
    pub show_rotation_handles: bool,
    /// Default: true.
    pub show_wireframe: bool,
    /// Keep the rig hidden until the owner or one of its handles is focused. Default: false.
    pub hide_until_focused: bool,
    /// World-space edge length of handle colliders. Default: 0.04.
    pub handle_size: f32,
    pub scale_handle_materials: MaterialSet,
    pub face_handle_materials: MaterialSet,
    pub rotation_handle_materials: MaterialSet,
    pub wireframe_material: Option<MaterialId>,
    /// Layers handle colliders belong to.
    pub handle_layers: CollisionLayers,
    /// Bounds on the owner's scale components. Default: 0.01 to 100.
    pub scale_limits: ScaleLimits,
    /// Camera distance at which handles have their nominal size. `Some`
    /// enables apparent-size mode. Default: None.
    pub apparent_size_distance: Option<f32>,
}

impl Default for BoundingBoxConfig {
    fn default() -> Self {
        Self {
            padding: Vec3::ZERO,
            auto_fit: false,
            show_scale_handles: true,
            show_face_scale_handles: false,
            show_rotation_handles: true,
            show_wireframe: true,
            hide_until_focused: false,
            handle_size: 0.04,
            scale_handle_materials: MaterialSet::default(),
            face_handle_materials: MaterialSet::default(),
            rotation_handle_materials: MaterialSet::default(),
            wireframe_material: None,
            handle_layers: CollisionLayers::default(),
            scale_limits: ScaleLimits { min: 0.01, max: 100.0 },
            apparent_size_distance: None,
        }
    }
}

impl BoundingBoxConfig {
    pub fn validate(&self) -> Result<()> {
        if self.handle_size <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "handle_size must be positive, got {}",
                self.handle_size
            )));
        }
        if self.padding.min_element() < 0.0 {
            return Err(Error::InvalidConfig("padding must be non-negative".into()));
        }
        let limits = self.scale_limits;
        if limits.min <= 0.0 || limits.min > limits.max {
            return Err(Error::InvalidConfig(format!(
                "scale limits must satisfy 0 < min <= max, got {}..{}",
                limits.min, limits.max
            )));
        }
        if self.apparent_size_distance.is_some_and(|d| d <= 0.0) {
            return Err(Error::InvalidConfig(
                "apparent_size_distance must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Grab {
    handle: hecs::Entity,
    cursor: hecs::Entity,
    role: HandleRole,
    kind: ManipulationKind,
    grab_start: Vec3,
    start: Pose,
    pivot: Vec3,
    center: Vec3,
    axis: Vec3,
    local_axis: usize,
}

/// Scale/rotate rig owner component.
#[derive(Debug, Clone)]
pub struct BoundingBox {
    config: BoundingBoxConfig,
    pub enabled: bool,
    dirty: bool,
    bounds: Option<Aabb>,
    handles: Vec<hecs::Entity>,
    grab: Option<Grab>,
    focus: u32,
    generation: u32,
    events: EventQueue<ManipulationEvent>,
}

impl BoundingBox {
    /// A rig that will be built on the next [`rig_system`] pass.
    pub fn new(config: BoundingBoxConfig) -> Self {
        Self {
            config,
            enabled: true,
            dirty: true,
            bounds: None,
            handles: Vec::new(),
            grab: None,
            focus: 0,
            generation: 0,
            events: EventQueue::default(),
        }
    }

    pub fn config(&self) -> &BoundingBoxConfig {
        &self.config
    }

    /// Mutable access to the configuration. Marks the rig for rebuild.
    pub fn config_mut(&mut self) -> &mut BoundingBoxConfig {
        self.dirty = true;
        &mut self.config
    }

    pub fn set_config(&mut self, config: BoundingBoxConfig) {
        self.config = config;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Padded local-space box of the current rig.
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    /// Handle entities of the current rig.
    pub fn handles(&self) -> &[hecs::Entity] {
        &self.handles
    }

    /// Number of rig builds so far.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn is_grabbed(&self) -> bool {
        self.grab.is_some()
    }

    pub fn grabbed_handle(&self) -> Option<hecs::Entity> {
        self.grab.map(|g| g.handle)
    }

    /// Whether the rig is currently shown.
    pub fn is_rig_visible(&self) -> bool {
        !self.config.hide_until_focused || self.focus > 0 || self.grab.is_some()
    }

    /// Take the queued manipulation events, oldest first. Drain once per
    /// frame; an undrained queue keeps only the newest events.
    pub fn drain_events(&mut self) -> Vec<ManipulationEvent> {
        self.events.drain()
    }

    fn owns(&self, entity: hecs::Entity) -> bool {
        self.handles.contains(&entity)
    }

    fn set_handles_visible(&self, world: &hecs::World, visible: bool) {
        for &entity in &self.handles {
            if let Ok(mut handle) = world.get::<&mut ManipulationHandle>(entity) {
                handle.visible = visible;
            }
        }
    }

    fn begin_grab(&self, ctx: &HandlerContext<'_>, event: &PointerEvent) -> Result<Option<Grab>> {
        let handle = ctx
            .world
            .get::<&ManipulationHandle>(event.target)
            .map_err(|_| Error::missing::<ManipulationHandle>(event.target))?;
        let Some(kind) = ManipulationKind::for_role(handle.role) else {
            return Ok(None);
        };
        if handle.role.is_translate() {
            return Ok(None);
        }
        let Some(bounds) = self.bounds else {
            return Ok(None);
        };
        let owner = ctx
            .world
            .get::<&GlobalTransform>(ctx.entity)
            .map_err(|_| Error::missing::<GlobalTransform>(ctx.entity))?
            .0;
        let start = Pose::from_matrix(owner);
        let pivot = owner.transform_point3(handle.opposite);

        // Measure scale drags along the pivot-to-handle line.
        let lever = (owner.transform_point3(handle.local_position) - pivot).normalize_or_zero();
        let grab_start = match handle.role {
            HandleRole::ScaleCorner | HandleRole::FaceScale => {
                pivot + lever * (event.position - pivot).dot(lever)
            }
            _ => event.position,
        };
        let local_axis = handle.axis.unit().unwrap_or(Vec3::Y);

        Ok(Some(Grab {
            handle: event.target,
            cursor: event.cursor,
            role: handle.role,
            kind,
            grab_start,
            start,
            pivot,
            center: owner.transform_point3(bounds.center()),
            axis: (start.rotation * local_axis).normalize_or_zero(),
            local_axis: handle.axis.index().unwrap_or(1),
        }))
    }

    fn drag(&self, grab: &Grab, current: Vec3) -> Option<(Pose, f32)> {
        let limits = self.config.scale_limits;
        match grab.role {
            HandleRole::ScaleCorner => {
                math::uniform_scale_drag(grab.grab_start, current, grab.pivot, &grab.start, limits)
            }
            HandleRole::FaceScale => math::face_scale_drag(
                grab.grab_start,
                current,
                grab.pivot,
                grab.local_axis,
                &grab.start,
                limits,
            ),
            HandleRole::EdgeRotate => {
                let delta = math::rotation_drag(grab.grab_start, current, grab.center, grab.axis);
                let (axis, angle) = delta.to_axis_angle();
                let signed = if axis.dot(grab.axis) < 0.0 { -angle } else { angle };
                Some((math::rotate_about(&grab.start, grab.center, delta), signed))
            }
            _ => None,
        }
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new(BoundingBoxConfig::default())
    }
}

impl TouchHandler for BoundingBox {
    fn on_touch_started(&mut self, ctx: &HandlerContext<'_>, event: &TouchEvent) {
        if !self.owns(event.target) {
            return;
        }
        if let Ok(mut handle) = ctx.world.get::<&mut ManipulationHandle>(event.target) {
            handle.touch_enter();
        }
    }

    fn on_touch_completed(&mut self, ctx: &HandlerContext<'_>, event: &TouchEvent) {
        if !self.owns(event.target) {
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

impl PointerHandler for BoundingBox {
    fn on_pointer_down(&mut self, ctx: &HandlerContext<'_>, event: &mut PointerEvent) {
        if !self.owns(event.target) {
            return;
        }
        if let Some(grab) = &self.grab {
            tracing::trace!(
                grabbed = ?grab.handle,
                requested = ?event.target,
                "rig already grabbed"
            );
            return;
        }
        let grab = match self.begin_grab(ctx, event) {
            Ok(Some(grab)) => grab,
            Ok(None) => return,
            Err(error) => {
                tracing::error!(owner = ?ctx.entity, %error, "cannot grab handle");
                return;
            }
        };
        if let Ok(mut handle) = ctx.world.get::<&mut ManipulationHandle>(grab.handle) {
            handle.grab();
        }
        tracing::debug!(
            owner = ?ctx.entity,
            handle = ?grab.handle,
            kind = ?grab.kind,
            "manipulation started"
        );
        self.events.push(ManipulationEvent {
            kind: grab.kind,
            phase: ManipulationPhase::Started,
            handle: grab.handle,
            value: None,
        });
        self.grab = Some(grab);
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
        let Some((pose, value)) = self.drag(&grab, event.position) else {
            return;
        };
        if let Err(error) =
            set_world_pose(ctx.world, ctx.entity, pose.position, pose.rotation, pose.scale)
        {
            tracing::warn!(owner = ?ctx.entity, %error, "manipulation not applied");
            return;
        }
        self.events.push(ManipulationEvent {
            kind: grab.kind,
            phase: ManipulationPhase::Updated,
            handle: grab.handle,
            value: Some(value),
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
        tracing::debug!(owner = ?ctx.entity, handle = ?grab.handle, "manipulation stopped");
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

impl FocusHandler for BoundingBox {
    fn on_focus_enter(&mut self, ctx: &HandlerContext<'_>, _event: &FocusEvent) {
        self.focus += 1;
        if self.config.hide_until_focused {
            self.set_handles_visible(ctx.world, true);
        }
    }

    fn on_focus_exit(&mut self, ctx: &HandlerContext<'_>, _event: &FocusEvent) {
        self.focus = self.focus.saturating_sub(1);
        if self.config.hide_until_focused && !self.is_rig_visible() {
            self.set_handles_visible(ctx.world, false);
        }
    }
}

/// Rebuild the rig of every dirty [`BoundingBox`].
pub fn rig_system(world: &mut hecs::World) -> Result<()> {
    let dirty: Vec<hecs::Entity> = world
        .query_mut::<&BoundingBox>()
        .into_iter()
        .filter(|(_, b)| b.dirty)
        .map(|(e, _)| e)
        .collect();
    for owner in dirty {
        let count = rebuild_rig(world, owner)?;
        tracing::debug!(?owner, handles = count, "manipulation rig rebuilt");
    }
    Ok(())
}

/// Despawn the owner's rig and build a fresh one. Returns the handle count.
///
/// Fails without touching the existing rig if the configuration is invalid
/// or the box cannot be determined.
pub fn rebuild_rig(world: &mut hecs::World, owner: hecs::Entity) -> Result<usize> {
    let (config, focused) = {
        let bbox = world
            .get::<&BoundingBox>(owner)
            .map_err(|_| Error::missing::<BoundingBox>(owner))?;
        bbox.config.validate()?;
        (bbox.config.clone(), bbox.focus > 0)
    };
    let owner_matrix = world
        .get::<&GlobalTransform>(owner)
        .map(|g| g.0)
        .unwrap_or(Mat4::IDENTITY);
    let bounds = fit_bounds(world, owner, owner_matrix, &config)?.padded(config.padding);

    let (old_handles, dropped) = {
        let mut bbox = world
            .get::<&mut BoundingBox>(owner)
            .map_err(|_| Error::missing::<BoundingBox>(owner))?;
        (std::mem::take(&mut bbox.handles), bbox.grab.take())
    };
    if let Some(grab) = dropped {
        tracing::debug!(?owner, handle = ?grab.handle, "rig rebuild dropped an active grab");
    }
    for handle in old_handles {
        despawn_recursive(world, handle);
    }

    let visible = !config.hide_until_focused || focused;
    let handle_scale = inverse_scale(Pose::from_matrix(owner_matrix).scale);
    let collider =
        Collider::cuboid(Vec3::splat(config.handle_size * 0.5)).with_layers(config.handle_layers);
    let mut planned: Vec<(ManipulationHandle, bool)> = Vec::new();

    if config.show_scale_handles {
        let corners = bounds.corners();
        for (i, &corner) in corners.iter().enumerate() {
            let mut handle = ManipulationHandle::new(HandleRole::ScaleCorner, AxisMask::XYZ)
                .with_materials(config.scale_handle_materials);
            handle.local_position = corner;
            handle.opposite = corners[7 - i];
            planned.push((handle, true));
        }
    }
    if config.show_face_scale_handles {
        let faces = bounds.face_centers();
        for (i, &face) in faces.iter().enumerate() {
            let axis = AxisMask::from_axis(Vec3::AXES[i / 2]);
            let mut handle = ManipulationHandle::new(HandleRole::FaceScale, axis)
                .with_materials(config.face_handle_materials);
            handle.local_position = face;
            handle.opposite = faces[i ^ 1];
            planned.push((handle, true));
        }
    }
    let edges = bounds.edge_midpoints();
    if config.show_rotation_handles {
        for &(midpoint, axis) in &edges {
            let mut handle =
                ManipulationHandle::new(HandleRole::EdgeRotate, AxisMask::from_axis(axis))
                    .with_materials(config.rotation_handle_materials);
            handle.local_position = midpoint;
            handle.opposite = bounds.center();
            planned.push((handle, true));
        }
    }
    if config.show_wireframe {
        let materials = config.wireframe_material.map(MaterialSet::uniform).unwrap_or_default();
        for &(midpoint, axis) in &edges {
            let mut handle =
                ManipulationHandle::new(HandleRole::WireframeLink, AxisMask::from_axis(axis))
                    .with_materials(materials);
            handle.local_position = midpoint;
            handle.opposite = midpoint;
            handle.extent = axis * bounds.size();
            planned.push((handle, false));
        }
    }

    let mut handles = Vec::with_capacity(planned.len());
    for (mut handle, grabbable) in planned {
        handle.visible = visible;
        let transform = Transform::from_position(handle.local_position);
        let entity = if grabbable {
            world.spawn((
                transform.with_scale(handle_scale),
                GlobalTransform::default(),
                handle,
                collider.clone(),
            ))
        } else {
            world.spawn((transform, GlobalTransform::default(), handle))
        };
        attach_child(world, owner, entity)?;
        handles.push(entity);
    }

    let count = handles.len();
    let mut bbox = world
        .get::<&mut BoundingBox>(owner)
        .map_err(|_| Error::missing::<BoundingBox>(owner))?;
    bbox.handles = handles;
    bbox.bounds = Some(bounds);
    bbox.dirty = false;
    bbox.generation += 1;
    Ok(count)
}

/// Local-space box of the owner: merged mesh bounds of the subtree when
/// auto-fitting, otherwise the owner's collider bounds.
fn fit_bounds(
    world: &hecs::World,
    owner: hecs::Entity,
    owner_matrix: Mat4,
    config: &BoundingBoxConfig,
) -> Result<Aabb> {
    if !config.auto_fit {
        return world
            .get::<&Collider>(owner)
            .map(|c| c.local_bounds())
            .map_err(|_| Error::missing::<Collider>(owner));
    }

    let to_owner = owner_matrix.inverse();
    let mut merged: Option<Aabb> = None;
    let mut stack = vec![owner];
    while let Some(entity) = stack.pop() {
        if let Ok(children) = world.get::<&Children>(entity) {
            stack.extend(children.0.iter().copied());
        }
        let Ok(mesh) = world.get::<&MeshBounds>(entity) else {
            continue;
        };
        let matrix = if entity == owner {
            Mat4::IDENTITY
        } else {
            world
                .get::<&GlobalTransform>(entity)
                .map(|g| to_owner * g.0)
                .unwrap_or(Mat4::IDENTITY)
        };
        let Some(local) = Aabb::from_points(mesh.0.corners().map(|c| matrix.transform_point3(c)))
        else {
            continue;
        };
        merged = Some(merged.map_or(local, |m| m.merge(&local)));
    }
    merged.ok_or_else(|| {
        Error::InvalidConfig(format!("auto-fit found no mesh bounds under {owner:?}"))
    })
}

fn inverse_scale(scale: Vec3) -> Vec3 {
    Vec3::select(scale.abs().cmpgt(Vec3::splat(f32::EPSILON)), scale.recip(), Vec3::ONE)
}

/// Resize rig handles for the camera.
///
/// Handles keep their configured world size; in apparent-size mode it grows
/// with camera distance so the on-screen size stays constant. Run before
/// `transform_system`.
pub fn apparent_size_system(world: &mut hecs::World, camera_position: Vec3) {
    let rigs: Vec<(Mat4, Option<f32>, Vec<hecs::Entity>)> = world
        .query::<(&BoundingBox, &GlobalTransform)>()
        .iter()
        .map(|(_, (bbox, global))| {
            (global.0, bbox.config.apparent_size_distance, bbox.handles.clone())
        })
        .collect();

    for (owner_matrix, reference, handles) in rigs {
        let compensation = inverse_scale(Pose::from_matrix(owner_matrix).scale);
        for entity in handles {
            let position = match world.get::<&ManipulationHandle>(entity) {
                Ok(handle) if handle.role != HandleRole::WireframeLink => {
                    owner_matrix.transform_point3(handle.local_position)
                }
                _ => continue,
            };
            let size = reference.map_or(1.0, |d| position.distance(camera_position) / d);
            if let Ok(mut transform) = world.get::<&mut Transform>(entity) {
                transform.scale = compensation * size;
            }
        }
    }
}
