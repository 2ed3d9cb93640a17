use std::ops::{Add, Sub};

use glam::Vec3;

/// World-space position, kept distinct from [`Vec3`] so positions and
/// displacements cannot be mixed up: a point minus a point is a vector, and
/// only vectors can be added to a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point(pub Vec3);

impl Point {
    pub const ORIGIN: Point = Point(Vec3::ZERO);

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self(Vec3::new(x, y, z))
    }

    pub fn vec(self) -> Vec3 {
        self.0
    }

    /// Componentwise minimum; bounding boxes grow through this.
    pub fn min(self, other: Point) -> Point {
        Point(self.0.min(other.0))
    }

    /// Componentwise maximum; bounding boxes grow through this.
    pub fn max(self, other: Point) -> Point {
        Point(self.0.max(other.0))
    }

    /// True on every axis. Geometry that fails this is dropped during
    /// world commit rather than poisoning the hierarchy build.
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

impl Add<Vec3> for Point {
    type Output = Self;

    fn add(self, rhs: Vec3) -> Self::Output {
        Point(self.vec() + rhs)
    }
}

impl Sub<Vec3> for Point {
    type Output = Self;

    fn sub(self, rhs: Vec3) -> Self::Output {
        Point(self.vec() - rhs)
    }
}

impl Sub for Point {
    type Output = Vec3;

    fn sub(self, rhs: Self) -> Self::Output {
        self.vec() - rhs.vec()
    }
}
