use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use crate::{
    material::MaterialId,
    math::{
        bounds::Bounds,
        distributions::{cartesian_to_spherical, spherical_to_cartesian},
        point::Point,
        transform::Transform,
        vec::orthonormal_basis,
    },
    ray::Ray,
};

use super::Hit;

/// Analytic sphere of a given radius around the local origin, placed in the
/// world by a transform.
#[derive(Debug, Clone)]
pub struct Sphere {
    pub radius: f32,
    pub transform: Transform,
    pub material: MaterialId,
}

impl Sphere {
    pub fn new(radius: f32, transform: Transform, material: MaterialId) -> Self {
        Self {
            radius,
            transform,
            material,
        }
    }

    pub fn unit(center: Point, radius: f32, material: MaterialId) -> Self {
        Self::new(radius, Transform::translation(center.vec()), material)
    }

    pub fn center(&self) -> Point {
        self.transform.apply_point(Point::ORIGIN)
    }

    pub fn bounds(&self) -> Bounds {
        let r = self.radius;
        let mut bounds = Bounds::EMPTY;
        for corner in 0..8 {
            let local = Vec3::new(
                if corner & 1 == 0 { -r } else { r },
                if corner & 2 == 0 { -r } else { r },
                if corner & 4 == 0 { -r } else { r },
            );
            bounds = bounds.extend(self.transform.apply_point(Point(local)));
        }
        bounds
    }

    pub fn intersect(&self, ray: &Ray, tmax: f32) -> Option<Hit> {
        let local = self.transform.inverse_ray(ray);
        let o = local.origin.vec();
        let d = local.direction;

        let a = d.length_squared();
        let b = 2.0 * o.dot(d);
        let c = o.length_squared() - self.radius * self.radius;

        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return None;
        }
        let sqrt_disc = disc.sqrt();

        // Smaller positive root inside the active interval.
        let t0 = (-b - sqrt_disc) / (2.0 * a);
        let t1 = (-b + sqrt_disc) / (2.0 * a);
        let t = if t0 > ray.bounds.0 && t0 < tmax {
            t0
        } else if t1 > ray.bounds.0 && t1 < tmax {
            t1
        } else {
            return None;
        };

        let p_local = local.at(t);
        let n_local = p_local.vec() / self.radius;
        let (phi, theta) = cartesian_to_spherical(n_local.normalize());

        let n = self.transform.apply_normal(n_local);
        let (dpdu, dpdv) = orthonormal_basis(n);

        Some(Hit {
            p: self.transform.apply_point(p_local),
            t,
            n,
            ng: n,
            dpdu,
            dpdv,
            uv: [phi / (2.0 * PI), theta / PI],
            material: self.material,
            prim: u32::MAX,
        })
    }

    pub fn area(&self) -> f32 {
        4.0 * PI * self.radius * self.radius
    }

    pub fn sample_surface(&self, u: Vec2) -> (Point, Vec3) {
        let phi = 2.0 * PI * u.x;
        let theta = (1.0 - 2.0 * u.y).clamp(-1.0, 1.0).acos();
        let n_local = spherical_to_cartesian(phi, theta);
        let p = self.transform.apply_point(Point(n_local * self.radius));
        (p, self.transform.apply_normal(n_local))
    }
}
