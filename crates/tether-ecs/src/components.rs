//! Core components shared by every gameplay subsystem.

use glam::Vec2;

/// The entity's live pose: position in world pixels, rotation in radians.
///
/// For synchronized entities this is written exclusively by the tick loop
/// (interpolation and reconciliation systems); network code stages updates
/// elsewhere and never touches it directly.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Transform {
    /// World-space position in pixels.
    pub position: Vec2,
    /// Heading in radians, counter-clockwise from +X.
    pub rotation: f32,
}

impl Transform {
    /// Creates a transform at the given position with zero rotation.
    pub fn from_xy(x: f32, y: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            rotation: 0.0,
        }
    }

    /// Creates a transform with an explicit heading.
    pub fn new(x: f32, y: f32, rotation: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            rotation,
        }
    }
}

/// Movement in pixels per second, integrated by whichever system owns the
/// entity's motion.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Velocity(pub Vec2);

impl Velocity {
    /// Creates a velocity from per-axis pixels-per-second values.
    pub fn new(x: f32, y: f32) -> Self {
        Self(Vec2::new(x, y))
    }
}

/// Human-readable debug name. Used in log messages and tooling, never for
/// gameplay identity.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Name(pub String);

impl Name {
    /// Creates a new [`Name`] from anything that converts to `String`.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// Expiry stamp for transient entities (hit flashes, ground effects).
/// A cleanup sweep destroys the entity once the world clock passes it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lifetime {
    /// World-clock second at which the entity should be destroyed.
    pub expires_at: f64,
}
