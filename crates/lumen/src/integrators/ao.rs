use crate::{
    color::Rgb,
    math::{distributions::square_to_cosine_hemisphere, vec::orthonormal_basis},
    ray::Ray,
    renderer::World,
};

use super::{Ctx, Integrator};

/// Ambient occlusion: materials are ignored; the estimate is the fraction
/// of `samples` cosine-weighted hemisphere rays that escape within
/// `radius`.
pub struct AmbientOcclusion {
    pub samples: u32,
    pub radius: f32,
}

impl Default for AmbientOcclusion {
    fn default() -> Self {
        Self {
            samples: 8,
            radius: f32::INFINITY,
        }
    }
}

impl Integrator for AmbientOcclusion {
    fn li(&self, world: &World, ctx: &mut Ctx, ray: Ray, _depth: u32) -> Rgb {
        let Some(hit) = world.intersect(&ray) else {
            return world.le_escaped(&ray);
        };

        // Face the hemisphere against the incoming ray.
        let n = if hit.n.dot(ray.direction) < 0.0 {
            hit.n
        } else {
            -hit.n
        };
        let (s, t) = orthonormal_basis(n);

        let mut unoccluded = 0u32;
        for _ in 0..self.samples.max(1) {
            let u = ctx.light_sampler.sample_2d();
            let local = square_to_cosine_hemisphere(u);
            let dir = local.x * s + local.y * t + local.z * n;

            let mut probe = Ray::spawn(hit.p, hit.ng, dir);
            probe.bounds.1 = self.radius;
            if !world.occluded(&probe) {
                unoccluded += 1;
            }
        }

        Rgb::splat(unoccluded as f32 / self.samples.max(1) as f32)
    }
}
