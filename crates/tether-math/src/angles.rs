//! Angle arithmetic on radians in the `(-PI, PI]` range.

use std::f32::consts::{PI, TAU};

use glam::Vec2;

use crate::smoothing::exp_blend;

/// Wraps an angle into `(-PI, PI]`.
pub fn wrap_angle(angle: f32) -> f32 {
    let mut a = angle % TAU;
    if a > PI {
        a -= TAU;
    } else if a <= -PI {
        a += TAU;
    }
    a
}

/// Signed shortest angular difference `to - from`, in `(-PI, PI]`.
pub fn shortest_arc(from: f32, to: f32) -> f32 {
    wrap_angle(to - from)
}

/// Exponentially blends `current` toward `target` along the shortest arc.
pub fn approach_angle(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    wrap_angle(current + shortest_arc(current, target) * exp_blend(rate, dt))
}

/// Heading (radians) of a displacement vector, or `None` when the
/// displacement is shorter than `deadband`.
///
/// The deadband keeps orientation stable when an entity is jittering in
/// place: sub-threshold displacements carry no meaningful direction.
pub fn heading_from_displacement(displacement: Vec2, deadband: f32) -> Option<f32> {
    if displacement.length_squared() < deadband * deadband {
        return None;
    }
    Some(displacement.y.atan2(displacement.x))
}
