//! Drag-to-transform math for manipulation handles.
//!
//! Every function maps a grab point and a current cursor point to a new
//! world pose. All inputs and outputs are in world space.

use glam::{Quat, Vec3};

use super::handle::AxisMask;

/// Rotations smaller than this (radians) are treated as no rotation.
pub const MIN_ROTATION_ANGLE: f32 = 1e-4;

/// Minimum distance between a grab point and its pivot.
const MIN_LEVER: f32 = 1e-5;

/// World-space position, rotation and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Pose {
    pub fn from_matrix(matrix: glam::Mat4) -> Self {
        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        Self {
            position,
            rotation,
            scale,
        }
    }
}

/// Bounds on any scale component produced by a drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleLimits {
    pub min: f32,
    pub max: f32,
}

impl ScaleLimits {
    pub const UNBOUNDED: Self = Self {
        min: f32::EPSILON,
        max: f32::MAX,
    };

    /// Clamp `factor` so that every scaled component of `scale` stays in bounds.
    pub fn clamp_factor(&self, factor: f32, scale: Vec3) -> f32 {
        let smallest = scale.abs().min_element();
        let largest = scale.abs().max_element();
        if smallest <= f32::EPSILON {
            return factor;
        }
        factor.clamp(self.min / smallest, (self.max / largest).max(self.min / smallest))
    }
}

impl Default for ScaleLimits {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

/// Ratio of the current to the initial grab distance from `pivot`, both
/// measured along the pivot-to-grab direction.
///
/// `None` when the grab point sits on the pivot.
pub fn projected_scale_factor(grab_start: Vec3, current: Vec3, pivot: Vec3) -> Option<f32> {
    let lever = grab_start - pivot;
    let initial = lever.length();
    if initial < MIN_LEVER {
        return None;
    }
    let direction = lever / initial;
    let projected = (current - pivot).dot(direction);
    Some(1.0 + (projected - initial) / initial)
}

/// Corner handle: uniform scale keeping `pivot` (the opposite corner) fixed.
///
/// Returns the new pose and the applied factor.
pub fn uniform_scale_drag(
    grab_start: Vec3,
    current: Vec3,
    pivot: Vec3,
    start: &Pose,
    limits: ScaleLimits,
) -> Option<(Pose, f32)> {
    let factor = projected_scale_factor(grab_start, current, pivot)?;
    let factor = limits.clamp_factor(factor, start.scale);
    let pose = Pose {
        position: pivot + (start.position - pivot) * factor,
        rotation: start.rotation,
        scale: start.scale * factor,
    };
    Some((pose, factor))
}

/// Face handle: scale along one local axis keeping `pivot` (the opposite
/// face) fixed. The other two scale components keep their start values.
pub fn face_scale_drag(
    grab_start: Vec3,
    current: Vec3,
    pivot: Vec3,
    local_axis: usize,
    start: &Pose,
    limits: ScaleLimits,
) -> Option<(Pose, f32)> {
    let factor = projected_scale_factor(grab_start, current, pivot)?;
    let component = *Vec3::AXES.get(local_axis)?;
    let factor = limits.clamp_factor(factor, Vec3::splat(start.scale[local_axis]));

    let mut scale = start.scale;
    scale[local_axis] *= factor;

    let direction = start.rotation * component;
    let offset = (start.position - pivot).dot(direction);
    let pose = Pose {
        position: start.position + direction * offset * (factor - 1.0),
        rotation: start.rotation,
        scale,
    };
    Some((pose, factor))
}

/// Edge handle: rotation about `axis` through `center` taking the grab
/// direction to the current direction.
///
/// Both points are projected onto the plane through `center` perpendicular
/// to `axis`. Degenerate cases (a point on the axis, or an angle below
/// [`MIN_ROTATION_ANGLE`]) return the identity.
pub fn rotation_drag(grab_start: Vec3, current: Vec3, center: Vec3, axis: Vec3) -> Quat {
    let axis = axis.normalize_or_zero();
    if axis == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let flatten = |p: Vec3| {
        let v = p - center;
        (v - axis * v.dot(axis)).normalize_or_zero()
    };
    let from = flatten(grab_start);
    let to = flatten(current);
    if from == Vec3::ZERO || to == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    if from.angle_between(to) < MIN_ROTATION_ANGLE {
        return Quat::IDENTITY;
    }
    Quat::from_rotation_arc(from, to)
}

/// Apply a rotation delta about `center` to a start pose.
pub fn rotate_about(start: &Pose, center: Vec3, delta: Quat) -> Pose {
    Pose {
        position: center + delta * (start.position - center),
        rotation: (delta * start.rotation).normalize(),
        scale: start.scale,
    }
}

/// Translate handle: the drag delta restricted to the world axes in `mask`.
pub fn axis_translate(
    start_position: Vec3,
    grab_start: Vec3,
    current: Vec3,
    mask: AxisMask,
) -> Vec3 {
    start_position + mask.apply(current - grab_start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    const EPSILON: f32 = 1e-4;

    fn unit_pose() -> Pose {
        Pose {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
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

    /// Same rotation, up to quaternion sign.
    fn assert_quat_eq(actual: Quat, expected: Quat) {
        assert!(
            actual.dot(expected).abs() > 1.0 - 1e-6,
            "Expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_doubling_projected_distance_doubles_scale() {
        let start = Pose {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(0.7),
            scale: Vec3::splat(1.5),
        };
        let matrix =
            Mat4::from_scale_rotation_translation(start.scale, start.rotation, start.position);
        let opposite = matrix.transform_point3(Vec3::splat(-0.5));
        let grab = matrix.transform_point3(Vec3::splat(0.5));
        let current = opposite + (grab - opposite) * 2.0;

        let (pose, factor) =
            uniform_scale_drag(grab, current, opposite, &start, ScaleLimits::UNBOUNDED).unwrap();

        assert!((factor - 2.0).abs() < EPSILON);
        assert_vec_eq(pose.scale, start.scale * 2.0);
        let after = Mat4::from_scale_rotation_translation(pose.scale, pose.rotation, pose.position);
        assert_vec_eq(after.transform_point3(Vec3::splat(-0.5)), opposite);
    }

    #[test]
    fn test_off_diagonal_motion_is_ignored() {
        let pivot = Vec3::splat(-0.5);
        let grab = Vec3::splat(0.5);
        let diagonal = (grab - pivot).normalize();
        let sideways = diagonal.any_orthonormal_vector();
        let factor = projected_scale_factor(grab, grab + sideways * 0.3, pivot).unwrap();
        assert!((factor - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_scale_factor_degenerate_lever() {
        assert!(projected_scale_factor(Vec3::ONE, Vec3::ZERO, Vec3::ONE).is_none());
    }

    #[test]
    fn test_scale_limits_clamp() {
        let limits = ScaleLimits { min: 0.5, max: 4.0 };
        let (pose, factor) = uniform_scale_drag(
            Vec3::splat(0.5),
            Vec3::splat(-0.45),
            Vec3::splat(-0.5),
            &unit_pose(),
            limits,
        )
        .unwrap();
        assert!((factor - 0.5).abs() < EPSILON);
        assert_vec_eq(pose.scale, Vec3::splat(0.5));
    }

    #[test]
    fn test_face_scale_holds_other_axes() {
        let start = Pose {
            scale: Vec3::new(1.0, 2.0, 3.0),
            ..unit_pose()
        };
        // +X face of a unit box scaled to (1, 2, 3); pivot on the -X face.
        let grab = Vec3::new(0.5, 0.0, 0.0);
        let pivot = Vec3::new(-0.5, 0.0, 0.0);
        let current = Vec3::new(1.5, 0.7, -0.2);

        let (pose, factor) =
            face_scale_drag(grab, current, pivot, 0, &start, ScaleLimits::UNBOUNDED).unwrap();

        assert!((factor - 2.0).abs() < EPSILON);
        assert_vec_eq(pose.scale, Vec3::new(2.0, 2.0, 3.0));
        // The -X face stays put: new center is 0.5 to the right.
        assert_vec_eq(pose.position, Vec3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn test_rotation_identical_directions_is_identity() {
        let center = Vec3::new(0.2, 0.0, 0.0);
        let grab = Vec3::new(1.0, 0.5, 0.0);
        let delta = rotation_drag(grab, grab, center, Vec3::Y);
        assert_eq!(delta, Quat::IDENTITY);

        let start = Pose {
            rotation: Quat::from_rotation_z(0.3),
            ..unit_pose()
        };
        let after = rotate_about(&start, center, delta);
        assert_quat_eq(after.rotation, start.rotation);
        assert_vec_eq(after.position, start.position);
    }

    #[test]
    fn test_rotation_quarter_turn() {
        let delta = rotation_drag(
            Vec3::new(1.0, 0.3, 0.0),
            Vec3::new(0.0, -0.2, -2.0),
            Vec3::ZERO,
            Vec3::Y,
        );
        let expected = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        assert_quat_eq(delta, expected);
    }

    #[test]
    fn test_rotation_point_on_axis_is_identity() {
        let delta = rotation_drag(Vec3::new(0.0, 1.0, 0.0), Vec3::X, Vec3::ZERO, Vec3::Y);
        assert_eq!(delta, Quat::IDENTITY);
    }

    #[test]
    fn test_axis_translate_projects_delta() {
        let start = Vec3::new(1.0, 1.0, 1.0);
        let moved = axis_translate(start, Vec3::ZERO, Vec3::new(0.3, -0.4, 0.5), AxisMask::X);
        assert_vec_eq(moved, Vec3::new(1.3, 1.0, 1.0));
        let moved = axis_translate(start, Vec3::ZERO, Vec3::new(0.3, -0.4, 0.5), AxisMask::YZ);
        assert_vec_eq(moved, Vec3::new(1.0, 0.6, 1.5));
    }
}
