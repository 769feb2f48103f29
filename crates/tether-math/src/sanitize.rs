//! Defensive coercion of non-finite floating-point input.
//!
//! Network payloads are untrusted: a NaN or infinity that reaches a live
//! transform poisons every computation downstream. These helpers replace
//! non-finite fields with a caller-supplied last-known-good value.

use glam::Vec2;

/// Returns `value` if finite, otherwise `fallback`.
pub fn sanitize_component(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

/// Sanitizes each axis independently, so one poisoned axis does not discard
/// the other.
pub fn sanitize_vec2(value: Vec2, fallback: Vec2) -> Vec2 {
    Vec2::new(
        sanitize_component(value.x, fallback.x),
        sanitize_component(value.y, fallback.y),
    )
}
