//! Narrowphase overlap and ray tests against collider shapes.
//!
//! Sensors are always spheres, so only sphere-vs-shape tests are needed.

use glam::{Mat4, Vec3};

use crate::ecs::components::physics::{Collider, ColliderShape};
use crate::ecs::components::transform::GlobalTransform;
use crate::geometry::{Aabb, Ray};

use super::contact::ContactInfo;

/// Largest axis scale of a transform matrix.
#[inline]
fn max_scale(mat: &Mat4) -> f32 {
    // max(sqrt(a),sqrt(b)) == sqrt(max(a,b))
    mat.x_axis
        .truncate()
        .length_squared()
        .max(mat.y_axis.truncate().length_squared())
        .max(mat.z_axis.truncate().length_squared())
        .sqrt()
}

/// World matrix of a collider, including its local offset.
#[inline]
pub fn collider_matrix(collider: &Collider, transform: &GlobalTransform) -> Mat4 {
    if collider.offset != Vec3::ZERO {
        transform.0 * Mat4::from_translation(collider.offset)
    } else {
        transform.0
    }
}

/// World-space AABB of a collider, used to reject far pairs cheaply.
pub fn world_aabb(collider: &Collider, transform: &GlobalTransform) -> Aabb {
    let mat = collider_matrix(collider, transform);
    let center = mat.transform_point3(Vec3::ZERO);
    match collider.shape {
        ColliderShape::Sphere { radius } => {
            let r = radius * max_scale(&mat);
            Aabb::new(center - Vec3::splat(r), center + Vec3::splat(r))
        }
        ColliderShape::Box { half_extents } => {
            // Project the local box axes onto each world axis.
            let extent = mat.x_axis.truncate().abs() * half_extents.x
                + mat.y_axis.truncate().abs() * half_extents.y
                + mat.z_axis.truncate().abs() * half_extents.z;
            Aabb::new(center - extent, center + extent)
        }
    }
}

/// Test a world-space sphere against a collider.
pub fn sphere_collider(
    center: Vec3,
    radius: f32,
    collider: &Collider,
    transform: &GlobalTransform,
) -> Option<ContactInfo> {
    let mat = collider_matrix(collider, transform);
    match collider.shape {
        ColliderShape::Sphere { radius: r } => {
            sphere_sphere(center, radius, mat.transform_point3(Vec3::ZERO), r * max_scale(&mat))
        }
        ColliderShape::Box { half_extents } => sphere_box(center, radius, half_extents, &mat),
    }
}

/// Sphere-sphere overlap. The normal points from sphere B towards sphere A.
pub fn sphere_sphere(
    center_a: Vec3,
    radius_a: f32,
    center_b: Vec3,
    radius_b: f32,
) -> Option<ContactInfo> {
    let diff = center_a - center_b;
    let dist_sq = diff.length_squared();
    let min_dist = radius_a + radius_b;

    if dist_sq >= min_dist * min_dist {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > 1e-6 { diff / dist } else { Vec3::Y };

    Some(ContactInfo {
        normal,
        penetration: min_dist - dist,
        point: center_b + normal * radius_b,
    })
}

/// Sphere vs oriented box. The normal points from the box towards the sphere.
pub fn sphere_box(
    center: Vec3,
    radius: f32,
    half_extents: Vec3,
    box_mat: &Mat4,
) -> Option<ContactInfo> {
    let box_center = box_mat.transform_point3(Vec3::ZERO);
    let box_axes = [
        box_mat.x_axis.truncate().normalize_or_zero(),
        box_mat.y_axis.truncate().normalize_or_zero(),
        box_mat.z_axis.truncate().normalize_or_zero(),
    ];
    let scaled_half = half_extents
        * Vec3::new(
            box_mat.x_axis.truncate().length(),
            box_mat.y_axis.truncate().length(),
            box_mat.z_axis.truncate().length(),
        );

    // Sphere center in the box's (unscaled) frame.
    let diff = center - box_center;
    let local = Vec3::new(diff.dot(box_axes[0]), diff.dot(box_axes[1]), diff.dot(box_axes[2]));
    let clamped = local.clamp(-scaled_half, scaled_half);

    let closest =
        box_center + box_axes[0] * clamped.x + box_axes[1] * clamped.y + box_axes[2] * clamped.z;
    let to_sphere = center - closest;
    let dist_sq = to_sphere.length_squared();

    if dist_sq >= radius * radius {
        return None;
    }

    let dist = dist_sq.sqrt();

    if dist < 1e-6 {
        // Center inside the box: push out through the nearest face.
        let mut min_pen = f32::MAX;
        let mut normal = Vec3::Y;
        for i in 0..3 {
            let pen_pos = scaled_half[i] - local[i];
            let pen_neg = scaled_half[i] + local[i];
            if pen_pos < min_pen {
                min_pen = pen_pos;
                normal = box_axes[i];
            }
            if pen_neg < min_pen {
                min_pen = pen_neg;
                normal = -box_axes[i];
            }
        }
        return Some(ContactInfo {
            normal,
            penetration: min_pen + radius,
            point: center + normal * min_pen,
        });
    }

    Some(ContactInfo {
        normal: to_sphere / dist,
        penetration: radius - dist,
        point: closest,
    })
}

/// Cast a ray against a collider. Returns (distance, point, normal).
pub fn ray_collider(
    ray: &Ray,
    max_distance: f32,
    collider: &Collider,
    transform: &GlobalTransform,
) -> Option<(f32, Vec3, Vec3)> {
    let mat = collider_matrix(collider, transform);
    let t_normal = match collider.shape {
        ColliderShape::Sphere { radius } => {
            ray_sphere(ray, mat.transform_point3(Vec3::ZERO), radius * max_scale(&mat))
        }
        ColliderShape::Box { half_extents } => ray_box(ray, half_extents, &mat),
    };
    let (t, normal) = t_normal?;
    (t <= max_distance).then(|| (t, ray.at(t), normal))
}

fn ray_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<(f32, Vec3)> {
    let oc = ray.origin - center;
    let b = oc.dot(ray.direction);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let t = if -b - sqrt_disc >= 0.0 {
        -b - sqrt_disc
    } else if -b + sqrt_disc >= 0.0 {
        // Origin inside the sphere.
        0.0
    } else {
        return None;
    };
    let normal = (ray.at(t) - center).normalize_or(-ray.direction);
    Some((t, normal))
}

/// Slab test in the box's local frame. Parameters along the local ray map
/// one-to-one onto world distances because the ray direction is unit length.
fn ray_box(ray: &Ray, half_extents: Vec3, box_mat: &Mat4) -> Option<(f32, Vec3)> {
    let inv = box_mat.inverse();
    let origin = inv.transform_point3(ray.origin);
    let dir = inv.transform_vector3(ray.direction);

    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;
    let mut local_normal = Vec3::ZERO;

    for axis in 0..3 {
        let (o, d, h) = (origin[axis], dir[axis], half_extents[axis]);
        if d.abs() < 1e-8 {
            if o < -h || o > h {
                return None;
            }
            continue;
        }
        let mut t1 = (-h - o) / d;
        let mut t2 = (h - o) / d;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        if t1 > t_min {
            t_min = t1;
            local_normal = Vec3::ZERO;
            local_normal[axis] = -d.signum();
        }
        t_max = t_max.min(t2);
        if t_min > t_max {
            return None;
        }
    }

    if t_max < 0.0 {
        return None;
    }
    if t_min < 0.0 {
        // Origin inside the box.
        return Some((0.0, -ray.direction));
    }
    let normal = inv.transpose().transform_vector3(local_normal).normalize_or_zero();
    Some((t_min, normal))
}
