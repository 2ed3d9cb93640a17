use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use crate::{
    math::{distributions::spherical_to_cartesian, point::Point},
    ray::Ray,
};

/// Cameras turn an image-plane coordinate in `[0, 1]^2` into a world-space
/// ray. `(0, 0)` is the top-left corner of the image.
pub enum Camera {
    Perspective(PerspectiveCamera),
    Environment(EnvironmentCamera),
}

impl Camera {
    pub fn generate_ray(&self, uv: Vec2) -> Ray {
        match self {
            Camera::Perspective(c) => c.generate_ray(uv),
            Camera::Environment(c) => c.generate_ray(uv),
        }
    }
}

pub struct PerspectiveCamera {
    eye: Point,
    right: Vec3,
    up: Vec3,
    forward: Vec3,
    /// Near and far clip distances applied as the ray interval.
    zcap: (f32, f32),
    tan_half_fovy: f32,
    aspect: f32,
}

impl PerspectiveCamera {
    pub fn new(eye: Point, at: Point, up: Vec3, zcap: (f32, f32), fovy: f32, aspect: f32) -> Self {
        let forward = (at - eye).normalize();
        let right = forward.cross(up).normalize();
        let up = right.cross(forward);

        Self {
            eye,
            right,
            up,
            forward,
            zcap,
            tan_half_fovy: f32::tan(fovy / 2.0),
            aspect,
        }
    }

    pub fn generate_ray(&self, uv: Vec2) -> Ray {
        let x = (2.0 * uv.x - 1.0) * self.tan_half_fovy * self.aspect;
        let y = (1.0 - 2.0 * uv.y) * self.tan_half_fovy;
        let dir = self.forward + x * self.right + y * self.up;
        Ray::new_with_range(self.eye, dir, self.zcap)
    }
}

/// Lat-long panorama camera: the full sphere mapped over the image plane.
pub struct EnvironmentCamera {
    eye: Point,
    right: Vec3,
    up: Vec3,
    forward: Vec3,
    zcap: (f32, f32),
}

impl EnvironmentCamera {
    pub fn new(eye: Point, forward: Vec3, up: Vec3, zcap: (f32, f32)) -> Self {
        let forward = forward.normalize();
        let right = forward.cross(up).normalize();
        let up = right.cross(forward);
        Self {
            eye,
            right,
            up,
            forward,
            zcap,
        }
    }

    pub fn generate_ray(&self, uv: Vec2) -> Ray {
        let phi = 2.0 * PI * uv.x;
        let theta = PI * uv.y;
        let local = spherical_to_cartesian(phi, theta);
        // Local frame is y-up; map it onto the camera basis.
        let dir = local.x * self.right + local.y * self.up + local.z * self.forward;
        Ray::new_with_range(self.eye, dir, self.zcap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_pixel_looks_forward() {
        let cam = PerspectiveCamera::new(
            Point::new(0.0, 1.0, 5.0),
            Point::new(0.0, 1.0, 0.0),
            Vec3::Y,
            (0.01, 10000.0),
            PI / 4.0,
            1.0,
        );
        let ray = cam.generate_ray(Vec2::new(0.5, 0.5));
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-5);
        assert_eq!(ray.bounds, (0.01, 10000.0));
    }

    #[test]
    fn image_axes_follow_screen_conventions() {
        let cam = PerspectiveCamera::new(
            Point::ORIGIN,
            Point::new(0.0, 0.0, -1.0),
            Vec3::Y,
            (0.0, f32::INFINITY),
            PI / 3.0,
            2.0,
        );
        // Moving right in the image moves the ray toward +x; moving down
        // in the image moves it toward -y.
        let right = cam.generate_ray(Vec2::new(1.0, 0.5));
        assert!(right.direction.x > 0.0);
        let down = cam.generate_ray(Vec2::new(0.5, 1.0));
        assert!(down.direction.y < 0.0);
    }

    #[test]
    fn environment_camera_covers_the_poles() {
        let cam = EnvironmentCamera::new(
            Point::ORIGIN,
            Vec3::NEG_Z,
            Vec3::Y,
            (0.0, f32::INFINITY),
        );
        let top = cam.generate_ray(Vec2::new(0.5, 0.0));
        assert!((top.direction - Vec3::Y).length() < 1e-4);
        let bottom = cam.generate_ray(Vec2::new(0.5, 1.0));
        assert!((bottom.direction - Vec3::NEG_Y).length() < 1e-4);
    }
}
