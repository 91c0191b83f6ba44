//! Geometric primitives shared by the toolkit.
//!
//! Provides axis-aligned boxes (with the corner / face / edge layout used to
//! place manipulation handles), planes, and rays.

use glam::Vec3;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at `center` with the given full `size`.
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        Self::new(center - half, center + half)
    }

    /// Create an AABB from a set of points. Returns `None` for an empty set.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    /// Get the center of the AABB.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the size of the AABB.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Grow the box by `padding` on every side.
    pub fn padded(&self, padding: Vec3) -> Self {
        Self::new(self.min - padding, self.max + padding)
    }

    /// Get all 8 corners of the AABB.
    ///
    /// Corner `i` takes `max` on axis `k` when bit `k` of `i` is set, so the
    /// opposite of corner `i` is corner `7 - i`.
    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|i| {
            Vec3::new(
                if i & 1 != 0 { self.max.x } else { self.min.x },
                if i & 2 != 0 { self.max.y } else { self.min.y },
                if i & 4 != 0 { self.max.z } else { self.min.z },
            )
        })
    }

    /// Centers of the 6 faces, ordered -X, +X, -Y, +Y, -Z, +Z.
    ///
    /// The opposite of face `i` is face `i ^ 1`.
    pub fn face_centers(&self) -> [Vec3; 6] {
        let c = self.center();
        [
            Vec3::new(self.min.x, c.y, c.z),
            Vec3::new(self.max.x, c.y, c.z),
            Vec3::new(c.x, self.min.y, c.z),
            Vec3::new(c.x, self.max.y, c.z),
            Vec3::new(c.x, c.y, self.min.z),
            Vec3::new(c.x, c.y, self.max.z),
        ]
    }

    /// Midpoints of the 12 edges together with the axis each edge runs along.
    pub fn edge_midpoints(&self) -> [(Vec3, Vec3); 12] {
        let corners = self.corners();
        EDGES.map(|(a, b)| {
            let (pa, pb) = (corners[a], corners[b]);
            ((pa + pb) * 0.5, (pb - pa).normalize_or_zero().abs())
        })
    }

    /// Check if a point is inside the AABB.
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Merge two AABBs.
    pub fn merge(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
        }
    }
}

/// Corner index pairs of the 12 box edges (see [`Aabb::corners`]).
pub const EDGES: [(usize, usize); 12] = [
    // Along X
    (0, 1),
    (2, 3),
    (4, 5),
    (6, 7),
    // Along Y
    (0, 2),
    (1, 3),
    (4, 6),
    (5, 7),
    // Along Z
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// A plane through `point` with unit `normal`.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub point: Vec3,
    pub normal: Vec3,
}

impl Plane {
    /// Create a plane; the normal is normalized.
    pub fn new(point: Vec3, normal: Vec3) -> Self {
        Self {
            point,
            normal: normal.normalize_or_zero(),
        }
    }

    /// Signed distance from a point to the plane.
    /// Positive = in front (same side as normal), Negative = behind.
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point - self.point)
    }

    /// Orthogonal projection of a point onto the plane.
    pub fn project(&self, point: Vec3) -> Vec3 {
        point - self.normal * self.signed_distance(point)
    }
}

/// A half-line with a unit direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray; the direction is normalized.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Point at distance `t` along the ray.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}
