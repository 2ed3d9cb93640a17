use rand::Rng as _;

use crate::{
    color::{linear::BLACK, linear::WHITE, Rgb},
    ray::Ray,
    renderer::World,
    shape::Hit,
};

use super::{bsdf_strategy_weight, lobe_select, sample_light_strategy, Ctx, Integrator};

/// Global illumination by path tracing.
///
/// Next-event estimation at every vertex, with emission found by the
/// continued path MIS-weighted against the light strategy; Russian roulette
/// starts after `min_bounces`.
pub struct PathTracer {
    pub max_depth: u32,
    pub min_bounces: u32,
}

impl Default for PathTracer {
    fn default() -> Self {
        Self {
            max_depth: 16,
            min_bounces: 3,
        }
    }
}

impl Integrator for PathTracer {
    fn li(&self, world: &World, ctx: &mut Ctx, ray: Ray, depth: u32) -> Rgb {
        let mut l = BLACK;
        let mut beta = WHITE;
        let mut ray = ray;
        // The camera vertex behaves like a singular bounce: emission found
        // directly is not MIS-weighted.
        let mut prev: Option<(Hit, f32)> = None;

        for bounce in depth..self.max_depth {
            let Some(hit) = world.intersect(&ray) else {
                l += beta * self.escaped_radiance(world, &ray, prev.as_ref());
                break;
            };

            let wi = -ray.direction;
            let material = world.material(hit.material);
            let hit = material.apply_normal_map(hit, world.texture_system());

            let le = material.emitted(&hit, wi);
            if !le.is_black() {
                let weight = match (&prev, world.light_of_prim(hit.prim)) {
                    (Some((prev_hit, pdf)), Some(light)) => {
                        bsdf_strategy_weight(world, prev_hit, *pdf, false, light, ray.direction)
                    }
                    _ => 1.0,
                };
                l += beta * weight * le;
            }

            let Some(bsdf) = material.bsdf(&hit, world.texture_system()) else {
                // Pure emitter; nothing scatters past it.
                break;
            };

            // Next event estimation; pointless against a delta lobe, whose
            // evaluation is identically black.
            if !bsdf.is_singular() {
                for light in world.lights() {
                    l += beta * sample_light_strategy(world, ctx, &hit, &bsdf, wi, light);
                }
            }

            let u = ctx.bsdf_sampler.sample_2d();
            let uc = lobe_select(ctx);
            let Some(bs) = bsdf.sample(&hit, wi, u, uc) else {
                break;
            };
            if bs.pdf <= 0.0 {
                break;
            }

            let cos = hit.n.dot(bs.wo).abs();
            beta *= bs.f * (cos / bs.pdf);
            if beta.is_black() {
                break;
            }

            prev = if bs.singular {
                None
            } else {
                Some((hit, bs.pdf))
            };
            ray = Ray::spawn(hit.p, hit.ng, bs.wo);

            if bounce + 1 >= self.min_bounces {
                let q = beta.max_component().clamp(0.05, 0.95);
                if ctx.rng.gen::<f32>() > q {
                    break;
                }
                beta = beta * (1.0 / q);
            }
        }

        l
    }
}

impl PathTracer {
    /// Radiance for a ray that left the scene: the flat background plus the
    /// sky lights, the latter MIS-weighted when the path arrived here
    /// through a regular BSDF sample.
    fn escaped_radiance(&self, world: &World, ray: &Ray, prev: Option<&(Hit, f32)>) -> Rgb {
        let mut out = world.background;
        for light in world.lights() {
            let le = light.le(ray);
            if le.is_black() {
                continue;
            }
            let weight = match prev {
                Some((prev_hit, pdf)) => {
                    bsdf_strategy_weight(world, prev_hit, *pdf, false, light, ray.direction)
                }
                None => 1.0,
            };
            out += weight * le;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use glam::Vec3;
    use rand::SeedableRng;

    use super::*;
    use crate::{
        camera::{Camera, PerspectiveCamera},
        light::{EnvironmentLight, Light},
        material::{Material, MaterialDescriptor},
        math::point::Point,
        renderer::WorldBuilder,
        sampler::{RandomSampler, Sampler},
    };

    fn run(world: &World, ray: Ray, integrator: &PathTracer, samples: u32) -> Rgb {
        let mut rng = crate::Rng::seed_from_u64(123);
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

    fn camera() -> Camera {
        Camera::Perspective(PerspectiveCamera::new(
            Point::new(0.0, 0.0, 4.0),
            Point::ORIGIN,
            Vec3::Y,
            (0.001, 10000.0),
            PI / 4.0,
            1.0,
        ))
    }

    /// Furnace configuration: a convex Lambert body under a constant unit
    /// sky reflects exactly its albedo, and cosine sampling of a constant
    /// environment is a zero-variance estimator, so even a handful of
    /// samples lands on the answer.
    #[test]
    fn lambert_sphere_furnace_returns_albedo() {
        let mut builder = WorldBuilder::new();
        let m = builder.add_material(MaterialDescriptor {
            label: None,
            material: Material::matte(Rgb::splat(0.5)),
        });
        builder.add_sphere(crate::shape::Sphere::unit(Point::ORIGIN, 1.0, m));
        builder.add_light(Light::Environment(EnvironmentLight::constant(Rgb::splat(
            1.0,
        ))));
        builder.set_camera(camera());
        let world = builder.commit().unwrap();

        // Straight at the sphere's pole: the first bounce leaves the
        // surface and must escape (a convex body never shadows itself).
        let ray = Ray::new(Point::new(0.0, 3.0, 0.0), Vec3::NEG_Y);
        let integrator = PathTracer {
            max_depth: 3,
            min_bounces: 8,
        };
        let l = run(&world, ray, &integrator, 64);
        assert!(
            (l.0[0] - 0.5).abs() < 0.01,
            "furnace test returned {l:?}, expected 0.5"
        );
    }

    #[test]
    fn empty_scene_returns_exactly_the_background() {
        let mut builder = WorldBuilder::new();
        builder.set_background(Rgb([0.1, 0.2, 0.3]));
        builder.set_camera(camera());
        let world = builder.commit().unwrap();

        let ray = Ray::new(Point::ORIGIN, Vec3::Z);
        let l = run(&world, ray, &PathTracer::default(), 1);
        assert_eq!(l, Rgb([0.1, 0.2, 0.3]));
    }

    /// A closed diffuse box lit by an emissive ceiling panel: radiance on
    /// the floor is positive and finite, and deepening the path only adds
    /// energy (each extra bounce is a non-negative term).
    #[test]
    fn emissive_panel_in_closed_box_converges() {
        fn box_world() -> World {
            let mut builder = WorldBuilder::new();
            let gray = builder.add_material(MaterialDescriptor {
                label: None,
                material: Material::matte(Rgb::splat(0.7)),
            });
            let emit = builder.add_material(MaterialDescriptor {
                label: None,
                material: Material::Emissive {
                    radiance: Rgb::splat(10.0),
                },
            });

            use crate::math::transform::Transform;
            use glam::Quat;
            // Floor and four walls of a 2x2x2 box centered at the origin.
            builder.add_mesh(crate::shape::Mesh::quad(
                gray,
                Transform::translation(Vec3::new(0.0, -1.0, 0.0)),
            ));
            for (rot, offset) in [
                (Quat::from_rotation_x(PI / 2.0), Vec3::new(0.0, 0.0, -1.0)),
                (Quat::from_rotation_x(-PI / 2.0), Vec3::new(0.0, 0.0, 1.0)),
                (Quat::from_rotation_z(-PI / 2.0), Vec3::new(-1.0, 0.0, 0.0)),
                (Quat::from_rotation_z(PI / 2.0), Vec3::new(1.0, 0.0, 0.0)),
            ] {
                builder.add_mesh(crate::shape::Mesh::quad(
                    gray,
                    Transform::from_trs(offset, rot, Vec3::ONE),
                ));
            }
            // Emissive ceiling, facing down.
            let mut ceiling = crate::shape::Mesh::quad(
                emit,
                Transform::translation(Vec3::new(0.0, 1.0, 0.0)),
            );
            for n in &mut ceiling.normals {
                *n = -*n;
            }
            for f in &mut ceiling.indices {
                f.swap(1, 2);
            }
            builder.add_mesh(ceiling);
            builder.set_camera(camera());
            builder.commit().unwrap()
        }

        let world = box_world();
        // Look at the center of the floor from inside the box.
        let ray = Ray::new(Point::new(0.0, 0.5, 0.0), Vec3::NEG_Y);

        let direct_only = run(
            &world,
            ray,
            &PathTracer {
                max_depth: 2,
                min_bounces: 16,
            },
            1024,
        );
        let with_gi = run(
            &world,
            ray,
            &PathTracer {
                max_depth: 6,
                min_bounces: 16,
            },
            1024,
        );

        assert!(direct_only.0[0] > 0.0);
        assert!(direct_only.is_finite());
        assert!(with_gi.is_finite());
        assert!(
            with_gi.0[0] > direct_only.0[0] * 1.02,
            "indirect light should add energy: {} vs {}",
            with_gi.0[0],
            direct_only.0[0]
        );
    }
}
