//! Rein MRTK
//!
//! Mixed reality interaction toolkit on hecs: hand cursors, touch and pinch
//! dispatch, pressable buttons and object manipulation rigs.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **ecs** - Transform hierarchy and collision components on a `hecs::World`
//! 2. **physics** - Cursor sensors, collision events and raycasting
//! 3. **cursor** - Cursor component and pose history
//! 4. **dispatch** - Handler registry and event bubbling
//! 5. **touch** - Near/external touch tracking per cursor
//! 6. **focus** - Cursor manager: overlap stacks and pinch-driven pointer events
//! 7. **ray** - Ray cursors and gaze focus
//! 8. **press** - Pressable buttons
//! 9. **manipulation** - Bounding box and translate handle rigs
//! 10. **effects** - Proximity light pulses
//!
//! # Frame order
//!
//! A host frame typically runs:
//!
//! ```text
//! transform_system -> cursor_ray_system -> SensorWorld::collect_events
//!   -> CursorManager::update -> pressable_system -> rig_system
//!   -> apparent_size_system -> proximity_light_system
//! ```
//!
//! Buttons and rigs queue their events; hosts drain them once per frame
//! with `drain_events`.

pub mod cursor;
pub mod dispatch;
pub mod ecs;
pub mod effects;
pub mod error;
pub mod focus;
pub mod geometry;
pub mod manipulation;
pub mod physics;
pub mod press;
pub mod ray;
pub mod touch;

// Re-export commonly used types
pub use cursor::{Cursor, PoseHistory};
pub use dispatch::{
    FocusEvent, FocusHandler, HandlerContext, HandlerRegistry, PointerEvent, PointerHandler,
    PointerPhase, TouchEvent, TouchHandler, TouchPhase,
};
pub use effects::{proximity_light_system, ProximityLight, ProximityLightConfig};
pub use error::{Error, Result};
pub use focus::{CursorManager, CursorManagerConfig};
pub use geometry::{Aabb, Plane, Ray};
pub use manipulation::{
    apparent_size_system, rig_system, AxisManipulationHandler, BoundingBox, BoundingBoxConfig,
    ManipulationEvent, ManipulationHandle,
};
pub use physics::{CollisionEvent, CollisionSource, RayHit, Raycaster, SensorConfig, SensorWorld};
pub use press::{pressable_system, PressConfig, PressEvent, PressableButton};
pub use ray::{cursor_ray_system, CursorRay, GazeProvider};
pub use touch::TouchTracker;

pub use glam;
pub use hecs;
