//! Static terrain rectangles

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Static, axis-aligned terrain rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub center: Vec2,
    pub half_extents: Vec2,
    pub friction: f32,
}

impl Platform {
    pub fn new(center: Vec2, half_extents: Vec2, friction: f32) -> Self {
        Self {
            center,
            half_extents,
            friction,
        }
    }

    /// Platform whose top surface sits at `top`, spanning `x_min..x_max`, resting on the ground
    pub fn block(x_min: f32, x_max: f32, top: f32, friction: f32) -> Self {
        let half_extents = Vec2::new((x_max - x_min) * 0.5, top * 0.5);
        Self::new(
            Vec2::new((x_min + x_max) * 0.5, top * 0.5),
            half_extents,
            friction,
        )
    }

    pub fn top(&self) -> f32 {
        self.center.y + self.half_extents.y
    }

    pub fn contains(&self, point: Vec2) -> bool {
        let d = (point - self.center).abs();
        d.x < self.half_extents.x && d.y < self.half_extents.y
    }

    /// Minimum translation pushing `point` out of the platform, with the
    /// outward surface normal. `None` when the point is outside.
    pub fn penetration(&self, point: Vec2) -> Option<(f32, Vec2)> {
        if !self.contains(point) {
            return None;
        }
        let local = point - self.center;
        let h = self.half_extents;
        let candidates = [
            (h.y - local.y, Vec2::Y),
            (h.y + local.y, Vec2::NEG_Y),
            (h.x - local.x, Vec2::X),
            (h.x + local.x, Vec2::NEG_X),
        ];
        candidates
            .into_iter()
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    /// Like [`Self::penetration`], but points lying within `tolerance` outside
    /// a face also count, with a depth of zero
    pub fn contact(&self, point: Vec2, tolerance: f32) -> Option<(f32, Vec2)> {
        let grown = Self {
            half_extents: self.half_extents + Vec2::splat(tolerance),
            ..*self
        };
        grown
            .penetration(point)
            .map(|(depth, normal)| ((depth - tolerance).max(0.0), normal))
    }

    /// True when `point` lies on or just above the top surface within `slop`
    pub fn touches_top(&self, point: Vec2, slop: f32) -> bool {
        let d = point.x - self.center.x;
        d.abs() <= self.half_extents.x
            && point.y <= self.top() + slop
            && point.y >= self.top() - self.half_extents.y.min(slop * 4.0)
    }
}
