//! Ground-plane math helpers.
//!
//! The battlefield is the `(x, z)` ground plane. Positions are stored as
//! [`Vec2`] with `.x` = world x and `.y` = world z. Facing angles follow the
//! renderer's convention: a facing of `0` looks down `+z`, and the forward
//! vector of facing `f` is `(sin f, cos f)`.

use std::f32::consts::{PI, TAU};

pub use glam::Vec2;

/// Heading (facing angle) that looks from `from` toward `to`.
#[must_use]
pub fn heading(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    d.x.atan2(d.y)
}

/// Unit forward vector for a facing angle.
#[must_use]
pub fn forward(facing: f32) -> Vec2 {
    Vec2::new(facing.sin(), facing.cos())
}

/// Signed shortest angular difference `target - current`, wrapped to `(-PI, PI]`.
#[must_use]
pub fn angle_diff(target: f32, current: f32) -> f32 {
    let mut d = (target - current) % TAU;
    if d > PI {
        d -= TAU;
    } else if d <= -PI {
        d += TAU;
    }
    d
}

/// Rotate `current` toward `target` by a fraction `rate * dt` of the
/// remaining difference.
///
/// The fraction is capped at 1 so a large `dt` lands exactly on the target
/// instead of overshooting.
#[must_use]
pub fn turn_toward(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    let t = (rate * dt).clamp(0.0, 1.0);
    wrap_angle(current + angle_diff(target, current) * t)
}

/// Wrap an angle into `(-PI, PI]`.
#[must_use]
pub fn wrap_angle(angle: f32) -> f32 {
    angle_diff(angle, 0.0)
}

/// Rotate a formation offset into the facing frame and place it at `anchor`.
///
/// `lateral` runs across the facing direction, `depth` along it.
#[must_use]
pub fn place_offset(anchor: Vec2, lateral: f32, depth: f32, facing: f32) -> Vec2 {
    let (sin, cos) = facing.sin_cos();
    Vec2::new(
        anchor.x + lateral * cos + depth * sin,
        anchor.y - lateral * sin + depth * cos,
    )
}

/// Move `from` toward `to` by at most `max_step`, never overshooting.
#[must_use]
pub fn step_toward(from: Vec2, to: Vec2, max_step: f32) -> Vec2 {
    let delta = to - from;
    let dist = delta.length();
    if dist <= max_step || dist <= f32::EPSILON {
        to
    } else {
        from + delta / dist * max_step
    }
}
