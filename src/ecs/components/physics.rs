//! Collision components for ECS entities.

use glam::Vec3;

use crate::geometry::Aabb;

/// Collider shape, in the entity's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
}

/// Bitmask of collision layers a collider belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollisionLayers(pub u32);

impl CollisionLayers {
    pub const ALL: Self = Self(u32::MAX);
    pub const NONE: Self = Self(0);

    /// Whether any layer of `self` is enabled in `mask`.
    #[inline]
    pub fn intersects(self, mask: CollisionLayers) -> bool {
        self.0 & mask.0 != 0
    }
}

impl Default for CollisionLayers {
    fn default() -> Self {
        Self(1)
    }
}

/// Collision detection component.
///
/// Colliders never produce a physics response in the toolkit; they are the
/// bodies cursors overlap and rays hit.
#[derive(Debug, Clone)]
pub struct Collider {
    pub shape: ColliderShape,
    /// Offset from the entity's transform origin.
    pub offset: Vec3,
    /// Layers this collider belongs to.
    pub layers: CollisionLayers,
}

impl Collider {
    /// A sphere collider centered on the entity.
    pub fn sphere(radius: f32) -> Self {
        Self {
            shape: ColliderShape::Sphere { radius },
            ..Self::default()
        }
    }

    /// A box collider centered on the entity.
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self {
            shape: ColliderShape::Box { half_extents },
            ..Self::default()
        }
    }

    /// Builder-style offset override.
    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    /// Builder-style layer override.
    pub fn with_layers(mut self, layers: CollisionLayers) -> Self {
        self.layers = layers;
        self
    }

    /// Local-space bounds of the shape, including the offset.
    pub fn local_bounds(&self) -> Aabb {
        let half = match self.shape {
            ColliderShape::Sphere { radius } => Vec3::splat(radius),
            ColliderShape::Box { half_extents } => half_extents,
        };
        Aabb::new(self.offset - half, self.offset + half)
    }
}

impl Default for Collider {
    fn default() -> Self {
        Self {
            shape: ColliderShape::Sphere { radius: 0.5 },
            offset: Vec3::ZERO,
            layers: CollisionLayers::default(),
        }
    }
}

/// Local-space bounds of whatever mesh an entity renders.
///
/// Only used to auto-fit manipulation rigs; the toolkit never draws meshes.
#[derive(Debug, Clone, Copy)]
pub struct MeshBounds(pub Aabb);
