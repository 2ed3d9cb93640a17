use std::f32::consts::PI;

use glam::{Quat, Vec3};

use crate::{
    camera::{Camera, PerspectiveCamera},
    color::Rgb,
    material::{Material, MaterialDescriptor},
    math::{point::Point, transform::Transform},
    renderer::WorldBuilder,
    shape::Mesh,
};

/// Classic box: white floor, ceiling and back wall, red and green side
/// walls, an emissive panel below the ceiling.
pub struct CornellBoxScene;

impl CornellBoxScene {
    pub fn build() -> WorldBuilder {
        let mut builder = WorldBuilder::new();

        let white = builder.add_material(MaterialDescriptor {
            label: Some("white".into()),
            material: Material::matte(Rgb::splat(0.73)),
        });
        let red = builder.add_material(MaterialDescriptor {
            label: Some("red".into()),
            material: Material::matte(Rgb([0.65, 0.05, 0.05])),
        });
        let green = builder.add_material(MaterialDescriptor {
            label: Some("green".into()),
            material: Material::matte(Rgb([0.12, 0.45, 0.15])),
        });
        let light = builder.add_material(MaterialDescriptor {
            label: Some("light".into()),
            material: Material::Emissive {
                radiance: Rgb([17.0, 12.0, 4.0]),
            },
        });

        // Unit-quad walls of a 2x2x2 box centered at the origin, normals
        // pointing inward.
        builder.add_mesh(Mesh::quad(
            white,
            Transform::translation(Vec3::new(0.0, -1.0, 0.0)),
        ));
        builder.add_mesh(flipped_quad(
            white,
            Transform::translation(Vec3::new(0.0, 1.0, 0.0)),
        ));
        builder.add_mesh(Mesh::quad(
            white,
            Transform::from_trs(
                Vec3::new(0.0, 0.0, -1.0),
                Quat::from_rotation_x(PI / 2.0),
                Vec3::ONE,
            ),
        ));
        builder.add_mesh(Mesh::quad(
            red,
            Transform::from_trs(
                Vec3::new(-1.0, 0.0, 0.0),
                Quat::from_rotation_z(-PI / 2.0),
                Vec3::ONE,
            ),
        ));
        builder.add_mesh(Mesh::quad(
            green,
            Transform::from_trs(
                Vec3::new(1.0, 0.0, 0.0),
                Quat::from_rotation_z(PI / 2.0),
                Vec3::ONE,
            ),
        ));

        // Emissive panel just below the ceiling, facing down.
        builder.add_mesh(flipped_quad(
            light,
            Transform::from_trs(
                Vec3::new(0.0, 0.99, 0.0),
                Quat::IDENTITY,
                Vec3::splat(0.25),
            ),
        ));

        builder.set_camera(Camera::Perspective(PerspectiveCamera::new(
            Point::new(0.0, 0.0, 3.4),
            Point::ORIGIN,
            Vec3::Y,
            (0.01, 10000.0),
            PI / 4.0,
            1.0,
        )));
        builder
    }
}

/// Quad with its face turned to -y.
fn flipped_quad(material: crate::material::MaterialId, transform: Transform) -> Mesh {
    let mut mesh = Mesh::quad(material, transform);
    for n in &mut mesh.normals {
        *n = -*n;
    }
    for f in &mut mesh.indices {
        f.swap(1, 2);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        integrators::{Ctx, Integrator, PathTracer},
        ray::Ray,
        sampler::{RandomSampler, Sampler},
    };
    use rand::SeedableRng;

    /// The floor patch under the emitter receives a stable amount of
    /// light: two renders of the same build agree within a few percent.
    #[test]
    fn floor_under_the_emitter_is_reproducibly_lit() {
        let world = CornellBoxScene::build().commit().unwrap();
        let ray = Ray::new(Point::new(0.0, 0.5, 0.0), Vec3::NEG_Y);
        let integrator = PathTracer {
            max_depth: 4,
            min_bounces: 16,
        };

        let mut estimate = |seed: u64| {
            let mut rng = crate::Rng::seed_from_u64(seed);
            let mut light_sampler = RandomSampler::new(1, 1);
            let mut bsdf_sampler = RandomSampler::new(1, 2);
            light_sampler.start_pixel(crate::Seed {
                seed,
                ..Default::default()
            });
            bsdf_sampler.start_pixel(crate::Seed {
                seed,
                ..Default::default()
            });

            let mut sum = Rgb::splat(0.0);
            let n = 2048;
            for _ in 0..n {
                let mut ctx = Ctx {
                    rng: &mut rng,
                    light_sampler: &mut light_sampler,
                    bsdf_sampler: &mut bsdf_sampler,
                };
                sum += integrator.li(&world, &mut ctx, ray, 0);
            }
            sum * (1.0 / n as f32)
        };

        let a = estimate(1);
        let b = estimate(2);

        assert!(a.0[0] > 0.0, "floor under the emitter is lit");
        assert!(a.is_finite() && b.is_finite());
        for c in 0..3 {
            let mean = 0.5 * (a.0[c] + b.0[c]);
            assert!(
                (a.0[c] - b.0[c]).abs() <= 0.1 * mean.max(1e-3),
                "channel {c}: {a:?} vs {b:?}"
            );
        }
    }
}
