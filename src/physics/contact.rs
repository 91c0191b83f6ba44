//! Contact and collision event data.

use glam::Vec3;

/// Stable identifier of one ongoing overlap, unique for the lifetime of a
/// [`CollisionSource`](super::CollisionSource).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactId(pub u64);

/// Which of a cursor's sensing volumes raised an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    /// The small collider overlapping targets directly.
    Near,
    /// The enlarged proximity shell around the cursor.
    External,
}

/// The cursor-side body of a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensorBody {
    pub cursor: hecs::Entity,
    pub sensor: SensorKind,
}

/// Lifecycle phase of a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionPhase {
    Begin,
    Update,
    End,
}

/// A single collision callback between a cursor sensor and another body.
///
/// For a given [`ContactId`], a source delivers exactly one `Begin`, any
/// number of `Update`s and exactly one `End`, in that order.
#[derive(Debug, Clone, Copy)]
pub struct CollisionEvent {
    pub id: ContactId,
    pub phase: CollisionPhase,
    pub body: SensorBody,
    pub other: hecs::Entity,
    /// Contact point in world space.
    pub point: Vec3,
    /// Contact normal, pointing from `other` towards the sensor.
    pub normal: Vec3,
}

/// Information about a single overlap between two shapes.
#[derive(Debug, Clone, Copy)]
pub struct ContactInfo {
    /// Contact normal (from the target towards the sensor).
    pub normal: Vec3,
    /// Penetration depth.
    pub penetration: f32,
    /// Contact point on the target surface, in world space.
    pub point: Vec3,
}

/// Result of a successful raycast.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub entity: hecs::Entity,
    /// Distance from the ray origin.
    pub distance: f32,
    pub point: Vec3,
    pub normal: Vec3,
}
