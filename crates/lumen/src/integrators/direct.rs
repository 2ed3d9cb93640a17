use glam::Vec3;

use crate::{
    color::{linear::BLACK, Rgb},
    light::Light,
    ray::Ray,
    renderer::World,
    shape::Hit,
};

use super::{bsdf_strategy_weight, lobe_select, sample_light_strategy, Ctx, Integrator};

/// Direct illumination with multiple importance sampling: for every light,
/// one light-strategy sample and one BSDF-strategy sample, combined with
/// the power heuristic.
pub struct DirectLighting;

impl Integrator for DirectLighting {
    fn li(&self, world: &World, ctx: &mut Ctx, ray: Ray, _depth: u32) -> Rgb {
        let Some(hit) = world.intersect(&ray) else {
            return world.le_escaped(&ray);
        };

        let wi = -ray.direction;
        let material = world.material(hit.material);
        let hit = material.apply_normal_map(hit, world.texture_system());

        let mut l = material.emitted(&hit, wi);
        let Some(bsdf) = material.bsdf(&hit, world.texture_system()) else {
            return l;
        };

        // Light sampling cannot match a delta lobe; skip the shadow rays
        // and let the BSDF strategy carry mirrors and glass alone.
        let singular = bsdf.is_singular();
        for light in world.lights() {
            if !singular {
                l += sample_light_strategy(world, ctx, &hit, &bsdf, wi, light);
            }
            l += self.sample_bsdf_strategy(world, ctx, &hit, &bsdf, wi, light);
        }

        l
    }
}

impl DirectLighting {
    /// BSDF-strategy half of the MIS estimator: sample the BSDF and count
    /// the contribution only when the ray reaches this particular light.
    fn sample_bsdf_strategy(
        &self,
        world: &World,
        ctx: &mut Ctx,
        hit: &Hit,
        bsdf: &crate::bsdf::Bsdf,
        wi: Vec3,
        light: &Light,
    ) -> Rgb {
        // Delta lights cannot be hit by sampled rays.
        if light.is_delta() {
            return BLACK;
        }

        let u = ctx.bsdf_sampler.sample_2d();
        let uc = lobe_select(ctx);
        let Some(bs) = bsdf.sample(hit, wi, u, uc) else {
            return BLACK;
        };
        if bs.pdf <= 0.0 {
            return BLACK;
        }

        let probe = Ray::spawn(hit.p, hit.ng, bs.wo);
        let cos = hit.n.dot(bs.wo).abs();

        let le = match light.area_primitive() {
            Some(primitive) => match world.intersect(&probe) {
                Some(found) if found.prim == primitive => {
                    world.material(found.material).emitted(&found, -bs.wo)
                }
                _ => return BLACK,
            },
            // Sky light: contributes when the sampled ray escapes.
            None => match world.intersect(&probe) {
                None => light.le(&probe),
                Some(_) => return BLACK,
            },
        };
        if le.is_black() {
            return BLACK;
        }

        let weight = bsdf_strategy_weight(world, hit, bs.pdf, bs.singular, light, bs.wo);
        bs.f * le * (cos * weight / bs.pdf)
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_1_PI, PI};

    use glam::Vec2;
    use rand::SeedableRng;

    use super::*;
    use crate::{
        camera::{Camera, PerspectiveCamera},
        color::Rgb,
        light::Light,
        material::{Material, MaterialDescriptor},
        math::{point::Point, transform::Transform},
        renderer::WorldBuilder,
        sampler::{RandomSampler, Sampler},
    };

    fn looking_down_camera() -> Camera {
        Camera::Perspective(PerspectiveCamera::new(
            Point::new(0.0, 2.0, 0.0),
            Point::ORIGIN,
            Vec3::Z,
            (0.001, 10000.0),
            PI / 4.0,
            1.0,
        ))
    }

    fn run(world: &World, ray: Ray, integrator: &dyn Integrator, samples: u32) -> Rgb {
        let mut rng = crate::Rng::seed_from_u64(7);
        let mut light_sampler = RandomSampler::new(1, 1);
        let mut bsdf_sampler = RandomSampler::new(1, 2);
        light_sampler.start_pixel(crate::Seed::default());
        bsdf_sampler.start_pixel(crate::Seed::default());

        let mut sum = Rgb::splat(0.0);
        for _ in 0..samples {
            let mut ctx = Ctx {
                rng: &mut rng,
                light_sampler: &mut light_sampler,
                bsdf_sampler: &mut bsdf_sampler,
            };
            sum += integrator.li(world, &mut ctx, ray, 0);
        }
        sum * (1.0 / samples as f32)
    }

    /// Lambert floor under a point light has an analytic answer:
    /// `L = I / d^2 * albedo / pi * cos`.
    #[test]
    fn point_light_over_lambert_floor_is_analytic() {
        let mut builder = WorldBuilder::new();
        let m = builder.add_material(MaterialDescriptor {
            label: None,
            material: Material::matte(Rgb::splat(0.6)),
        });
        builder.add_mesh(crate::shape::Mesh::quad(m, Transform::IDENTITY));
        builder.add_light(Light::Point {
            position: Point::new(0.0, 1.0, 0.0),
            intensity: Rgb::splat(1.0),
        });
        builder.set_camera(looking_down_camera());
        let world = builder.commit().unwrap();

        let ray = Ray::new(Point::new(0.0, 2.0, 0.0), Vec3::NEG_Y);
        let l = run(&world, ray, &DirectLighting, 8);

        // Hit at the origin, light straight above at distance 1.
        let expected = 1.0 * 0.6 * FRAC_1_PI;
        assert!(
            (l.0[0] - expected).abs() < 1e-4,
            "direct lighting {l:?}, expected {expected}"
        );
    }

    #[test]
    fn occluded_point_light_contributes_nothing() {
        let mut builder = WorldBuilder::new();
        let m = builder.add_material(MaterialDescriptor {
            label: None,
            material: Material::matte(Rgb::splat(0.6)),
        });
        builder.add_mesh(crate::shape::Mesh::quad(m, Transform::IDENTITY));
        // Blocker between surface and light.
        builder.add_mesh(crate::shape::Mesh::quad(
            m,
            Transform::translation(Vec3::new(0.0, 0.5, 0.0)),
        ));
        builder.add_light(Light::Point {
            position: Point::new(0.0, 1.0, 0.0),
            intensity: Rgb::splat(1.0),
        });
        builder.set_camera(looking_down_camera());
        let world = builder.commit().unwrap();

        // Probe the lower quad from below the blocker.
        let ray = Ray::new(Point::new(0.0, 0.25, 0.3), Vec3::new(0.0, -1.0, -0.3));
        let hit = world.intersect(&ray).unwrap();
        assert!(hit.p.vec().y.abs() < 1e-4, "expected the floor, got {hit:?}");

        let l = run(&world, ray, &DirectLighting, 4);
        assert!(l.is_black(), "light leaked through the blocker: {l:?}");
    }

    /// MIS direct lighting against an area light stays close to the
    /// analytic disk-free solid-angle estimate for a small panel.
    #[test]
    fn area_light_estimate_is_stable_and_unbiased() {
        let mut builder = WorldBuilder::new();
        let floor = builder.add_material(MaterialDescriptor {
            label: None,
            material: Material::matte(Rgb::splat(1.0)),
        });
        let emit = builder.add_material(MaterialDescriptor {
            label: None,
            material: Material::Emissive {
                radiance: Rgb::splat(10.0),
            },
        });
        builder.add_mesh(crate::shape::Mesh::quad(floor, Transform::IDENTITY));

        // Small emissive panel high above, facing down.
        let mut panel = crate::shape::Mesh::quad(
            emit,
            Transform::from_trs(
                Vec3::new(0.0, 5.0, 0.0),
                glam::Quat::IDENTITY,
                Vec3::splat(0.1),
            ),
        );
        for n in &mut panel.normals {
            *n = -*n;
        }
        for f in &mut panel.indices {
            f.swap(1, 2);
        }
        builder.add_mesh(panel);
        builder.set_camera(looking_down_camera());
        let world = builder.commit().unwrap();
        assert_eq!(world.lights().len(), 2, "panel faces become area lights");

        let ray = Ray::new(Point::new(0.0, 2.0, 0.0), Vec3::NEG_Y);
        let l = run(&world, ray, &DirectLighting, 512);

        // Far-field approximation: Li * A * cos^2 / d^2 * albedo / pi.
        let expected = 10.0 * (0.2f32 * 0.2) * 1.0 / (5.0f32 * 5.0) * FRAC_1_PI;
        assert!(
            (l.0[0] - expected).abs() / expected < 0.1,
            "estimate {} vs approx {expected}",
            l.0[0]
        );
    }
}
