use std::f32::consts::PI;

use glam::{Quat, Vec3};

use crate::{
    camera::{Camera, PerspectiveCamera},
    color::Rgb,
    material::{Material, MaterialDescriptor},
    math::{point::Point, transform::Transform},
    renderer::WorldBuilder,
    shape::{Mesh, Sphere},
};

/// Ground plane, two spheres and an emissive panel overhead; exercises
/// area-light sampling, mirror reflection and the Fresnel-blend material.
pub struct AreaLightScene;

impl AreaLightScene {
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
        let phong = builder.add_material(MaterialDescriptor {
            label: Some("phong".into()),
            material: Material::phong(Rgb::splat(0.0), Rgb::splat(0.5)),
        });
        let emissive = builder.add_material(MaterialDescriptor {
            label: Some("panel".into()),
            material: Material::Emissive {
                radiance: Rgb([20.0, 18.0, 14.0]),
            },
        });

        builder.add_mesh(Mesh::quad(
            ground,
            Transform::translation(Vec3::new(0.0, -1.0, 0.0))
                .then(&Transform::scale(Vec3::new(5.0, 1.0, 5.0))),
        ));

        // Downward-facing emitter.
        let mut panel = Mesh::quad(
            emissive,
            Transform::translation(Vec3::new(0.0, 4.0, 0.0)),
        );
        for n in &mut panel.normals {
            *n = -*n;
        }
        for f in &mut panel.indices {
            f.swap(1, 2);
        }
        builder.add_mesh(panel);

        builder.add_sphere(Sphere::new(
            1.0,
            Transform::from_trs(
                Vec3::new(-2.0, 0.0, 0.0),
                Quat::from_rotation_x(PI / 2.0),
                Vec3::ONE,
            ),
            matte,
        ));
        builder.add_sphere(Sphere::unit(Point::new(2.0, 0.0, 0.0), 1.0, phong));

        builder.set_camera(Camera::Perspective(PerspectiveCamera::new(
            Point::new(0.0, 3.0, -10.5),
            Point::ORIGIN,
            Vec3::Y,
            (0.01, 10000.0),
            PI / 4.0,
            1.0,
        )));
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_faces_register_as_area_lights() {
        let world = AreaLightScene::build().commit().unwrap();
        assert_eq!(world.lights().len(), 2);
        // Refinement order: ground quad faces, then the panel's.
        assert!(world.light_of_prim(2).is_some());
        assert!(world.light_of_prim(3).is_some());
        assert!(world.light_of_prim(0).is_none());
    }
}
