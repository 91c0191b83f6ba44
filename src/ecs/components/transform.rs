//! Transform components for ECS entities.

use glam::{Mat4, Quat, Vec3};

/// Local-space transform. Stores position, rotation, and scale separately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Create an identity transform.
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// Create a transform from a position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    /// Builder-style rotation override.
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Builder-style scale override.
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Convert to a 4x4 matrix (translation * rotation * scale).
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Decompose a 4x4 matrix into a Transform.
    ///
    /// Note: This assumes the matrix represents a valid affine transform
    /// (no shear). Non-uniform scale with rotation may lose precision.
    pub fn from_matrix(mat: Mat4) -> Self {
        let (scale, rotation, position) = mat.to_scale_rotation_translation();
        Self {
            position,
            rotation,
            scale,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// World-space transform matrix. Updated every frame by [`transform_system`].
///
/// [`transform_system`]: crate::ecs::systems::transform_system
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalTransform(pub Mat4);

impl GlobalTransform {
    /// World-space position.
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.0.w_axis.truncate()
    }

    /// World-space orientation.
    pub fn rotation(&self) -> Quat {
        self.0.to_scale_rotation_translation().1
    }

    /// World-space (lossy) scale.
    pub fn scale(&self) -> Vec3 {
        self.0.to_scale_rotation_translation().0
    }

    /// Transform a local-space point into world space.
    #[inline]
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.0.transform_point3(local)
    }

    /// Transform a world-space point into this entity's local space.
    #[inline]
    pub fn inverse_transform_point(&self, world: Vec3) -> Vec3 {
        self.0.inverse().transform_point3(world)
    }
}

impl Default for GlobalTransform {
    fn default() -> Self {
        Self(Mat4::IDENTITY)
    }
}

impl From<Transform> for GlobalTransform {
    fn from(t: Transform) -> Self {
        Self(t.to_matrix())
    }
}

/// Reference to a parent entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent(pub hecs::Entity);

/// List of child entities.
#[derive(Debug, Clone, Default)]
pub struct Children(pub Vec<hecs::Entity>);
