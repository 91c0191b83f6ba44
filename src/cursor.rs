//! Interaction sources: cursors and their pose history.
//!
//! A [`Cursor`] is one tracked input point (hand joint, controller ray, mouse).
//! The host writes its pinch state and moves its entity's transform; the
//! [`CursorManager`](crate::focus::CursorManager) samples both once per frame.

use std::collections::VecDeque;

use glam::{Quat, Vec3};

/// Number of pose samples kept for velocity estimation.
pub const HISTORY_CAPACITY: usize = 10;

/// Default radius of the near (direct touch) sensor, in meters.
pub const DEFAULT_NEAR_RADIUS: f32 = 0.005;
/// Default radius of the external (proximity) sensor, in meters.
pub const DEFAULT_EXTERNAL_RADIUS: f32 = 0.1;

/// Input point component.
#[derive(Debug, Clone)]
pub struct Cursor {
    pinched: bool,
    previous_pinch: bool,
    touch_capable: bool,
    /// Radius of the direct-overlap sensor.
    pub near_radius: f32,
    /// Radius of the proximity shell.
    pub external_radius: f32,
}

impl Cursor {
    /// A touch-capable cursor, e.g. an index fingertip.
    pub fn touch(near_radius: f32, external_radius: f32) -> Self {
        Self {
            pinched: false,
            previous_pinch: false,
            touch_capable: true,
            near_radius,
            external_radius,
        }
    }

    /// A cursor without touch sensors, e.g. the end of a controller ray.
    pub fn pointer() -> Self {
        Self {
            pinched: false,
            previous_pinch: false,
            touch_capable: false,
            near_radius: 0.0,
            external_radius: 0.0,
        }
    }

    /// Whether this cursor carries touch sensors. Fixed at construction.
    #[inline]
    pub fn is_touch_capable(&self) -> bool {
        self.touch_capable
    }

    #[inline]
    pub fn is_pinched(&self) -> bool {
        self.pinched
    }

    /// Pinch value of the previous frame.
    #[inline]
    pub fn previous_pinch(&self) -> bool {
        self.previous_pinch
    }

    /// Set the current pinch (activation) state.
    pub fn set_pinched(&mut self, pinched: bool) {
        self.pinched = pinched;
    }

    /// Rising edge of the pinch signal this frame.
    #[inline]
    pub fn pinch_started(&self) -> bool {
        !self.previous_pinch && self.pinched
    }

    /// Falling edge of the pinch signal this frame.
    #[inline]
    pub fn pinch_released(&self) -> bool {
        self.previous_pinch && !self.pinched
    }

    /// Close the frame: the current pinch becomes next frame's previous pinch.
    pub(crate) fn commit_frame(&mut self) {
        self.previous_pinch = self.pinched;
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::touch(DEFAULT_NEAR_RADIUS, DEFAULT_EXTERNAL_RADIUS)
    }
}

/// One pose sample and the time elapsed since the previous sample.
#[derive(Debug, Clone, Copy)]
pub struct PoseSample {
    pub position: Vec3,
    pub orientation: Quat,
    pub delta_time: f32,
}

/// Bounded FIFO of cursor poses used to estimate velocities.
#[derive(Debug, Clone)]
pub struct PoseHistory {
    samples: VecDeque<PoseSample>,
    capacity: usize,
}

impl PoseHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, dropping the oldest once full.
    pub fn push(&mut self, position: Vec3, orientation: Quat, delta_time: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(PoseSample {
            position,
            orientation,
            delta_time,
        });
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn newest(&self) -> Option<&PoseSample> {
        self.samples.back()
    }

    /// Position before the newest sample, or the newest if there is none.
    pub fn previous_position(&self) -> Option<Vec3> {
        let n = self.samples.len();
        match n {
            0 => None,
            1 => Some(self.samples[0].position),
            _ => Some(self.samples[n - 2].position),
        }
    }

    /// Sum of the frame durations of every stored sample.
    ///
    /// Once full, a constant velocity is reported scaled by `(len - 1) / len`.
    pub fn window(&self) -> f32 {
        self.samples.iter().map(|s| s.delta_time).sum()
    }

    /// (newest - oldest) / window.
    pub fn linear_velocity(&self) -> Vec3 {
        let (Some(oldest), Some(newest)) = (self.samples.front(), self.samples.back()) else {
            return Vec3::ZERO;
        };
        let window = self.window();
        if window <= f32::EPSILON {
            return Vec3::ZERO;
        }
        (newest.position - oldest.position) / window
    }

    /// Axis * angle / window of the rotation from the oldest to the newest sample.
    pub fn angular_velocity(&self) -> Vec3 {
        let (Some(oldest), Some(newest)) = (self.samples.front(), self.samples.back()) else {
            return Vec3::ZERO;
        };
        let window = self.window();
        if window <= f32::EPSILON {
            return Vec3::ZERO;
        }
        let mut delta = newest.orientation * oldest.orientation.inverse();
        if delta.w < 0.0 {
            // Shortest arc.
            delta = -delta;
        }
        let (axis, angle) = delta.to_axis_angle();
        if angle.abs() < 1e-6 {
            return Vec3::ZERO;
        }
        axis * angle / window
    }
}

impl Default for PoseHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pinch_edges() {
        let mut cursor = Cursor::default();
        assert!(!cursor.pinch_started());

        cursor.set_pinched(true);
        assert!(cursor.pinch_started());
        cursor.commit_frame();
        assert!(!cursor.pinch_started());
        assert!(cursor.previous_pinch());

        cursor.set_pinched(false);
        assert!(cursor.pinch_released());
        cursor.commit_frame();
        assert!(!cursor.pinch_released());
    }

    #[test]
    fn test_pointer_cursor_not_touch_capable() {
        assert!(!Cursor::pointer().is_touch_capable());
        assert!(Cursor::default().is_touch_capable());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut history = PoseHistory::default();
        for i in 0..25 {
            history.push(Vec3::splat(i as f32), Quat::IDENTITY, 0.1);
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history.newest().unwrap().position, Vec3::splat(24.0));
        assert_eq!(history.previous_position(), Some(Vec3::splat(23.0)));
    }

    #[test]
    fn test_constant_velocity_converges() {
        let mut history = PoseHistory::default();
        let velocity = Vec3::new(0.5, -1.0, 2.0);
        let dt = 1.0 / 60.0;
        let mut position = Vec3::ZERO;
        for _ in 0..15 {
            position += velocity * dt;
            history.push(position, Quat::IDENTITY, dt);
        }
        // 9 displacements over 10 frame durations.
        let expected = velocity * 0.9;
        let estimate = history.linear_velocity();
        assert!(
            (estimate - expected).length() < 1e-3,
            "expected {:?}, got {:?}",
            expected,
            estimate
        );
    }

    #[test]
    fn test_window_sums_every_frame() {
        let mut history = PoseHistory::default();
        for _ in 0..HISTORY_CAPACITY {
            history.push(Vec3::ZERO, Quat::IDENTITY, 0.1);
        }
        assert!((history.window() - 1.0).abs() < 1e-5);

        history.push(Vec3::ZERO, Quat::IDENTITY, 0.5);
        assert!((history.window() - 1.4).abs() < 1e-5);
    }

    #[test]
    fn test_variable_frame_times() {
        let mut history = PoseHistory::default();
        let velocity = Vec3::X * 3.0;
        let mut position = Vec3::ZERO;
        for (i, dt) in [0.01, 0.02, 0.015, 0.03, 0.01].into_iter().enumerate() {
            if i > 0 {
                position += velocity * dt;
            }
            history.push(position, Quat::IDENTITY, dt);
        }
        // Travel covers the last four frames, the window all five.
        let expected = velocity * (0.075 / 0.085);
        assert!((history.linear_velocity() - expected).length() < 1e-3);
    }

    #[test]
    fn test_angular_velocity() {
        let mut history = PoseHistory::default();
        let rate = 1.5; // rad/s around Y
        let dt = 0.02;
        for i in 0..10 {
            history.push(Vec3::ZERO, Quat::from_rotation_y(rate * dt * i as f32), dt);
        }
        let omega = history.angular_velocity();
        let expected = Vec3::Y * rate * 0.9;
        assert!((omega - expected).length() < 1e-3, "got {:?}", omega);
    }

    #[test]
    fn test_single_sample_has_no_velocity() {
        let mut history = PoseHistory::default();
        history.push(Vec3::ONE, Quat::IDENTITY, 0.016);
        assert_eq!(history.linear_velocity(), Vec3::ZERO);
        assert_eq!(history.angular_velocity(), Vec3::ZERO);
    }
}
