//! Object manipulation through draggable handles.
//!
//! - [`BoundingBox`] builds a rig of corner (uniform scale), face
//!   (non-uniform scale) and edge (rotation) handles around its owner.
//! - [`AxisManipulationHandler`] translates its owner through user-placed
//!   center, axis and plane handles.
//!
//! Both are pointer handlers on the owner entity; the handles are children of
//! the owner, so pointer events aimed at a handle bubble up to them.

pub mod axis_handler;
pub mod bounding_box;
pub mod handle;
pub mod math;

pub use axis_handler::{AxisHandlerConfig, AxisManipulationHandler};
pub use bounding_box::{
    apparent_size_system, rebuild_rig, rig_system, BoundingBox, BoundingBoxConfig,
};
pub use handle::{AxisMask, HandleRole, HandleVisual, ManipulationHandle, MaterialId, MaterialSet};
pub use math::{Pose, ScaleLimits};

/// What a manipulation changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManipulationKind {
    Rotate,
    Scale,
    Center,
    Axis,
    Plane,
}

impl ManipulationKind {
    pub(crate) fn for_role(role: HandleRole) -> Option<Self> {
        match role {
            HandleRole::Center => Some(Self::Center),
            HandleRole::Axis => Some(Self::Axis),
            HandleRole::Plane => Some(Self::Plane),
            HandleRole::ScaleCorner | HandleRole::FaceScale => Some(Self::Scale),
            HandleRole::EdgeRotate => Some(Self::Rotate),
            HandleRole::WireframeLink => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManipulationPhase {
    Started,
    Updated,
    Stopped,
}

/// Notification raised by a manipulation handler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManipulationEvent {
    pub kind: ManipulationKind,
    pub phase: ManipulationPhase,
    pub handle: hecs::Entity,
    /// Scale factor or signed rotation angle (radians) on updates.
    pub value: Option<f32>,
}
