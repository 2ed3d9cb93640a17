use glam::{Mat4, Quat, Vec3};

use crate::ray::Ray;

use super::point::Point;

/// Affine world transform carried together with its inverse so that rays and
/// normals can be moved both ways without re-inverting.
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    m: Mat4,
    minv: Mat4,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        m: Mat4::IDENTITY,
        minv: Mat4::IDENTITY,
    };

    pub fn new(m: Mat4) -> Self {
        Self { m, minv: m.inverse() }
    }

    pub fn from_trs(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self::new(Mat4::from_scale_rotation_translation(
            scale,
            rotation,
            translation,
        ))
    }

    pub fn translation(v: Vec3) -> Self {
        Self::new(Mat4::from_translation(v))
    }

    pub fn scale(v: Vec3) -> Self {
        Self::new(Mat4::from_scale(v))
    }

    pub fn rotation_x(angle: f32) -> Self {
        Self::new(Mat4::from_rotation_x(angle))
    }

    pub fn inverse(&self) -> Transform {
        Transform {
            m: self.minv,
            minv: self.m,
        }
    }

    pub fn then(&self, outer: &Transform) -> Transform {
        Transform {
            m: outer.m * self.m,
            minv: self.minv * outer.minv,
        }
    }

    pub fn apply_point(&self, p: Point) -> Point {
        Point(self.m.transform_point3(p.vec()))
    }

    pub fn apply_vector(&self, v: Vec3) -> Vec3 {
        self.m.transform_vector3(v)
    }

    /// Normals transform by the inverse transpose.
    pub fn apply_normal(&self, n: Vec3) -> Vec3 {
        self.minv.transpose().transform_vector3(n).normalize()
    }

    pub fn inverse_point(&self, p: Point) -> Point {
        Point(self.minv.transform_point3(p.vec()))
    }

    pub fn inverse_vector(&self, v: Vec3) -> Vec3 {
        self.minv.transform_vector3(v)
    }

    pub fn inverse_normal(&self, n: Vec3) -> Vec3 {
        self.m.transpose().transform_vector3(n).normalize()
    }

    /// Ray into the local space of this transform. The direction is left
    /// unnormalized so parametric distances agree in both spaces.
    pub fn inverse_ray(&self, ray: &Ray) -> Ray {
        Ray {
            origin: self.inverse_point(ray.origin),
            direction: self.inverse_vector(ray.direction),
            bounds: ray.bounds,
        }
    }

    pub fn apply_ray(&self, ray: &Ray) -> Ray {
        Ray {
            origin: self.apply_point(ray.origin),
            direction: self.apply_vector(ray.direction),
            bounds: ray.bounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_round_trips_through_inverse() {
        let t = Transform::from_trs(
            Vec3::new(1.0, -2.0, 0.5),
            Quat::from_rotation_y(0.7),
            Vec3::new(2.0, 1.0, 3.0),
        );
        let ray = Ray::new(Point::new(0.3, 1.0, -4.0), Vec3::new(0.2, -0.7, 1.0));

        let back = t.apply_ray(&t.inverse_ray(&ray));
        assert!((back.origin - ray.origin).length() < 1e-5);
        assert!((back.direction - ray.direction).length() < 1e-5);
    }

    #[test]
    fn normals_stay_orthogonal_under_nonuniform_scale() {
        let t = Transform::scale(Vec3::new(4.0, 1.0, 1.0));
        // Surface tangent to (1, 1, 0) normal stretches; the normal must be
        // transformed by the inverse transpose to stay perpendicular.
        let n = Vec3::new(1.0, 1.0, 0.0).normalize();
        let tangent = Vec3::new(-1.0, 1.0, 0.0);

        let n2 = t.apply_normal(n);
        let tangent2 = t.apply_vector(tangent);
        assert!(n2.dot(tangent2).abs() < 1e-5);
        assert!((n2.length() - 1.0).abs() < 1e-5);
    }
}
