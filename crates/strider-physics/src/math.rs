//! 2D vector and angle helpers on top of glam

use glam::Vec2;
use std::f32::consts::{PI, TAU};

/// Wrap an angle into `(-PI, PI]`
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % TAU;
    if a > PI {
        a -= TAU;
    } else if a <= -PI {
        a += TAU;
    }
    a
}

/// Shortest signed rotation that takes `current` to `target`
pub fn angle_diff(target: f32, current: f32) -> f32 {
    normalize_angle(target - current)
}

/// Rotate `v` counter-clockwise by `angle` radians
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

/// Scalar z component of the 3D cross product `a x b`
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Velocity contribution of angular velocity `w` at lever arm `r` (w x r)
#[inline]
pub fn cross_scalar(w: f32, r: Vec2) -> Vec2 {
    Vec2::new(-w * r.y, w * r.x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_angle_range() {
        for i in -40..40 {
            let a = normalize_angle(i as f32 * 0.7);
            assert!(a > -PI - 1e-5 && a <= PI + 1e-5, "{} out of range", a);
        }
        assert!((normalize_angle(2.5 * PI) - PI / 2.0).abs() < 1e-4);
        assert!((normalize_angle(-PI / 2.0) + PI / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_angle_diff_wraparound() {
        // PI and -PI are the same angle
        assert!(angle_diff(PI, -PI).abs() < 1e-4);
        let d = angle_diff(-PI * 0.9, PI * 0.9);
        assert!((d - 0.2 * PI).abs() < 1e-4, "Expected 0.2*PI, got {}", d);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let r = rotate(Vec2::X, PI / 2.0);
        assert!((r - Vec2::Y).length() < 1e-6);
    }

    #[test]
    fn test_cross_products() {
        assert_eq!(cross(Vec2::X, Vec2::Y), 1.0);
        assert_eq!(cross_scalar(2.0, Vec2::X), Vec2::new(0.0, 2.0));
    }
}
