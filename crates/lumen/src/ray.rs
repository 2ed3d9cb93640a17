use crate::math::point::Point;

use super::math::vec::Vec3;

#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point,
    /// Unit length except for rays transformed into instance-local space.
    pub direction: Vec3,
    /// Parametric interval on which hits are valid. The upper bound is
    /// tightened during traversal.
    pub bounds: (f32, f32),
}

impl Ray {
    pub fn new(origin: Point, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
            bounds: (0.0, f32::INFINITY),
        }
    }

    pub fn new_with_range(origin: Point, direction: Vec3, bounds: (f32, f32)) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
            bounds,
        }
    }

    /// Secondary ray leaving a surface. The origin is pushed along the
    /// geometric normal, away from the surface on the side the ray departs,
    /// so the ray does not immediately re-hit its own origin.
    pub fn spawn(origin: Point, geometric_normal: Vec3, direction: Vec3) -> Self {
        let eps = 1e-4 * origin.vec().abs().max_element().max(1.0);
        let n = if geometric_normal.dot(direction) >= 0.0 {
            geometric_normal
        } else {
            -geometric_normal
        };
        Self::new(origin + eps * n, direction)
    }

    pub fn at(&self, t: f32) -> Point {
        self.origin + t * self.direction
    }
}
