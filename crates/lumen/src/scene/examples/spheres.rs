use std::f32::consts::PI;

use glam::Vec3;

use crate::{
    bsdf::MicrofacetDistribution,
    camera::{Camera, PerspectiveCamera},
    color::Rgb,
    light::{EnvMap, IsEnvironmentLight, Light},
    material::{Material, MaterialDescriptor},
    math::{point::Point, transform::Transform},
    renderer::WorldBuilder,
    shape::{Mesh, Sphere},
};

/// Ground plane with a matte and a glossy sphere under a sky dome.
pub struct SpheresScene;

impl SpheresScene {
    pub fn build() -> WorldBuilder {
        let mut builder = WorldBuilder::new();

        let ground = builder.add_material(MaterialDescriptor {
            label: Some("ground".into()),
            material: Material::matte(Rgb([0.7, 0.6, 0.6])),
        });
        let matte = builder.add_material(MaterialDescriptor {
            label: Some("matte".into()),
            material: Material::matte(Rgb([0.6, 0.6, 0.5])),
        });
        let glossy = builder.add_material(MaterialDescriptor {
            label: Some("glossy".into()),
            material: Material::Glossy {
                reflectance: Rgb::splat(0.9),
                eta: 1.5,
                distribution: MicrofacetDistribution::Ggx { alpha: 0.15 },
            },
        });

        builder.add_mesh(Mesh::quad(
            ground,
            Transform::translation(Vec3::new(0.0, -1.0, 0.0))
                .then(&Transform::scale(Vec3::new(5.0, 1.0, 5.0))),
        ));
        builder.add_sphere(Sphere::unit(Point::new(-2.0, 0.0, 0.0), 1.0, matte));
        builder.add_sphere(Sphere::unit(Point::new(2.0, 0.0, 0.0), 1.0, glossy));

        // Warm-to-cool gradient sky, importance sampled.
        let map = gradient_sky(64, 32);
        builder.add_light(Light::EnvironmentIs(IsEnvironmentLight::new(map, 0.6)));

        builder.set_camera(Camera::Perspective(PerspectiveCamera::new(
            Point::new(0.0, 3.0, -4.5),
            Point::new(-2.0, 1.0, 0.0),
            Vec3::Y,
            (0.01, 10000.0),
            PI / 4.0,
            1.0,
        )));
        builder
    }
}

fn gradient_sky(width: usize, height: usize) -> EnvMap {
    let zenith = Rgb([0.35, 0.5, 0.9]);
    let horizon = Rgb([1.0, 0.85, 0.6]);

    let mut texels = Vec::with_capacity(width * height);
    for y in 0..height {
        let t = (y as f32 + 0.5) / height as f32;
        // Blend toward the horizon band in the middle of the map.
        let k = (1.0 - (t - 0.5).abs() * 2.0).clamp(0.0, 1.0);
        let color = zenith * (1.0 - k) + horizon * k;
        texels.extend(std::iter::repeat(color).take(width));
    }
    EnvMap::new(width, height, texels)
}
