//! 2D pose math shared by the simulation and synchronization layers.

mod angles;
mod sanitize;
mod smoothing;

pub use angles::{approach_angle, heading_from_displacement, shortest_arc, wrap_angle};
pub use sanitize::{sanitize_component, sanitize_vec2};
pub use smoothing::{exp_blend, lerp, move_toward, remap_clamped};
