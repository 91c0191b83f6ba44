//! Headless interaction script.
//!
//! A fingertip pushes a button, then a controller ray grabs a bounding box
//! corner and pulls it outward. Run with `RUST_LOG=debug` to see the
//! toolkit's dispatch logs.

use anyhow::Context;
use glam::{Quat, Vec3};
use rein_mrtk::ecs::components::physics::Collider;
use rein_mrtk::ecs::components::transform::{GlobalTransform, Transform};
use rein_mrtk::ecs::systems::transform_system;
use rein_mrtk::{
    apparent_size_system, cursor_ray_system, pressable_system, proximity_light_system, rig_system,
    BoundingBox, BoundingBoxConfig, Cursor, CursorManager, CursorManagerConfig, CursorRay,
    HandlerRegistry, PressableButton, ProximityLight, SensorConfig, SensorWorld,
};

const FRAME: f32 = 1.0 / 60.0;

struct InteractionApp {
    world: hecs::World,
    registry: HandlerRegistry,
    manager: CursorManager,
    sensors: SensorWorld,
    camera: Vec3,
    fingertip: hecs::Entity,
    controller: hecs::Entity,
    ray_cursor: hecs::Entity,
    button: hecs::Entity,
    crate_box: hecs::Entity,
}

impl InteractionApp {
    fn new() -> anyhow::Result<Self> {
        let mut world = hecs::World::new();

        // Button facing +Z, pressed towards -Z
        let button = world.spawn((
            Transform::from_position(Vec3::new(0.0, 1.0, -0.5)),
            GlobalTransform::default(),
            Collider::cuboid(Vec3::new(0.05, 0.05, 0.01)),
            PressableButton::default(),
        ));

        // Box with a scale/rotate rig
        let crate_box = world.spawn((
            Transform::from_position(Vec3::new(0.0, 1.5, -2.0)),
            GlobalTransform::default(),
            Collider::cuboid(Vec3::splat(0.25)),
            BoundingBox::new(BoundingBoxConfig {
                apparent_size_distance: Some(1.0),
                ..BoundingBoxConfig::default()
            }),
        ));

        // Hand
        let fingertip = world.spawn((
            Cursor::touch(0.01, 0.1),
            ProximityLight::default(),
            Transform::from_position(Vec3::new(0.0, 1.0, -0.45)),
            GlobalTransform::default(),
        ));

        // Controller aimed at the box's top-right-front corner
        let controller = world.spawn((
            Transform::from_position(Vec3::new(0.25, 1.75, 0.0)),
            GlobalTransform::default(),
        ));
        let ray_cursor = world.spawn((
            Cursor::pointer(),
            CursorRay::new(controller),
            Transform::identity(),
            GlobalTransform::default(),
        ));

        let registry = HandlerRegistry::with_builtin();
        let sensors = SensorWorld::new(SensorConfig::default());
        sensors.config().validate()?;
        let mut manager = CursorManager::new(CursorManagerConfig::default());
        manager.config().validate()?;

        transform_system(&mut world);
        rig_system(&mut world)?;
        manager.sync_cursors(&mut world, &registry);
        log::info!("{} cursors active", manager.cursors().count());

        Ok(Self {
            world,
            registry,
            manager,
            sensors,
            camera: Vec3::new(0.0, 1.6, 0.0),
            fingertip,
            controller,
            ray_cursor,
            button,
            crate_box,
        })
    }

    fn frame(&mut self) -> anyhow::Result<()> {
        transform_system(&mut self.world);
        cursor_ray_system(&mut self.world, &mut self.manager, &self.sensors);
        self.manager
            .update_with_source(&mut self.world, &self.registry, &mut self.sensors, FRAME);
        pressable_system(&mut self.world, FRAME);
        rig_system(&mut self.world)?;
        apparent_size_system(&mut self.world, self.camera);
        proximity_light_system(&mut self.world, FRAME);
        self.report()
    }

    fn report(&mut self) -> anyhow::Result<()> {
        for event in self
            .world
            .get::<&mut PressableButton>(self.button)
            .context("button lost its PressableButton")?
            .drain_events()
        {
            log::info!("button: {event:?}");
        }
        for event in self
            .world
            .get::<&mut BoundingBox>(self.crate_box)
            .context("box lost its BoundingBox")?
            .drain_events()
        {
            log::info!("box: {:?} {:?} {:?}", event.kind, event.phase, event.value);
        }
        Ok(())
    }

    fn move_entity(&self, entity: hecs::Entity, position: Vec3) -> anyhow::Result<()> {
        let mut transform = self
            .world
            .get::<&mut Transform>(entity)
            .context("moved entity has no Transform")?;
        transform.position = position;
        transform.rotation = Quat::IDENTITY;
        Ok(())
    }

    fn set_pinch(&self, cursor: hecs::Entity, pinched: bool) -> anyhow::Result<()> {
        self.world
            .get::<&mut Cursor>(cursor)
            .context("pinched entity has no Cursor")?
            .set_pinched(pinched);
        Ok(())
    }

    /// Push the fingertip 6 cm through the button face and pull it back out.
    fn press_button(&mut self) -> anyhow::Result<()> {
        let start = Vec3::new(0.0, 1.0, -0.45);
        let depth = Vec3::new(0.0, 0.0, -0.06);
        for i in 0..=60 {
            let t = if i <= 30 { i as f32 / 30.0 } else { (60 - i) as f32 / 30.0 };
            self.move_entity(self.fingertip, start + depth * t)?;
            self.frame()?;
        }
        let light = self
            .world
            .get::<&ProximityLight>(self.fingertip)
            .context("fingertip lost its ProximityLight")?
            .pulse_count();
        log::info!("fingertip light pulsed {light} times");
        Ok(())
    }

    /// Pinch on the corner handle and drag it diagonally.
    fn grab_corner(&mut self) -> anyhow::Result<()> {
        let origin = Vec3::new(0.25, 1.75, 0.0);
        self.frame()?;
        log::info!(
            "ray cursor overlaps {:?}",
            self.manager.overlaps(self.ray_cursor).unwrap_or_default()
        );

        self.set_pinch(self.ray_cursor, true)?;
        for i in 0..=20 {
            let offset = Vec3::new(0.1, 0.1, 0.0) * (i as f32 / 20.0);
            self.move_entity(self.controller, origin + offset)?;
            self.frame()?;
        }
        self.set_pinch(self.ray_cursor, false)?;
        self.frame()?;

        let scale = self
            .world
            .get::<&Transform>(self.crate_box)
            .context("box lost its Transform")?
            .scale;
        log::info!("box scale after drag: {scale:?}");
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let mut app = InteractionApp::new()?;
    app.press_button()?;
    app.grab_corner()?;
    Ok(())
}
