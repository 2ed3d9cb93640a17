use crate::{
    aggregate::{Sbvh, SbvhOptions, ShapeList},
    camera::Camera,
    color::{linear::BLACK, Rgb},
    light::Light,
    material::{texture::NullTextureSystem, texture::TextureSystem, MaterialDescriptor},
    math::bounds::Bounds,
    ray::Ray,
    shape::{Hit, Instance, Mesh, Primitive, SceneView, Sphere, Triangle},
    utils::timer::timed_scope_log,
    warn_once,
};

#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("no camera attached to the world")]
    NoCamera,
    #[error("material index {index} out of range ({count} materials)")]
    MaterialIndexOutOfRange { index: u32, count: usize },
    #[error("vertex index {index} out of range in mesh {mesh}")]
    VertexIndexOutOfRange { mesh: usize, index: u32 },
    #[error("mesh index {index} out of range ({count} meshes)")]
    MeshIndexOutOfRange { index: u32, count: usize },
    #[error("area light references primitive {index} out of range ({count} primitives)")]
    LightPrimitiveOutOfRange { index: u32, count: usize },
}

/// Acceleration structure selection for [`WorldBuilder::commit`].
pub enum AccelKind {
    /// Linear scan; only sensible for tiny scenes and oracle tests.
    List,
    Sbvh(SbvhOptions),
}

enum Accel {
    List(ShapeList),
    Sbvh(Sbvh),
}

/// Everything a render needs, immutable once committed.
pub struct World {
    meshes: Vec<Mesh>,
    primitives: Vec<Primitive>,
    materials: Vec<MaterialDescriptor>,
    lights: Vec<Light>,
    pub camera: Camera,
    pub background: Rgb,
    texture_system: Box<dyn TextureSystem>,
    accel: Accel,
    /// For each primitive, the index of the area light backed by it.
    prim_light: Vec<Option<u32>>,
    bounds: Bounds,
}

impl World {
    pub fn view(&self) -> SceneView<'_> {
        SceneView {
            meshes: &self.meshes,
            primitives: &self.primitives,
            materials: &self.materials,
        }
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn material(&self, id: crate::material::MaterialId) -> &crate::material::Material {
        &self.materials[id.0 as usize].material
    }

    pub fn texture_system(&self) -> &dyn TextureSystem {
        self.texture_system.as_ref()
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    pub fn intersect(&self, ray: &Ray) -> Option<Hit> {
        crate::utils::counter::counter!("Rays");
        match &self.accel {
            Accel::List(list) => list.intersect(&self.primitives, &self.meshes, ray),
            Accel::Sbvh(bvh) => bvh.intersect(&self.primitives, &self.meshes, ray),
        }
    }

    pub fn occluded(&self, ray: &Ray) -> bool {
        crate::utils::counter::counter!("Shadow rays");
        match &self.accel {
            Accel::List(list) => list.occluded(&self.primitives, &self.meshes, ray),
            Accel::Sbvh(bvh) => bvh.occluded(&self.primitives, &self.meshes, ray),
        }
    }

    /// Radiance for a camera ray that left the scene entirely: the flat
    /// background plus every sky light.
    pub fn le_escaped(&self, ray: &Ray) -> Rgb {
        self.lights
            .iter()
            .fold(self.background, |acc, light| acc + light.le(ray))
    }

    /// The area light backed by primitive `prim`, if any.
    pub fn light_of_prim(&self, prim: u32) -> Option<&Light> {
        self.prim_light
            .get(prim as usize)
            .copied()
            .flatten()
            .map(|i| &self.lights[i as usize])
    }
}

/// Accumulates scene content, then validates and freezes it into a
/// [`World`]. Import collaborators feed it through [`Self::extend`].
pub struct WorldBuilder {
    meshes: Vec<Mesh>,
    shapes: Vec<Primitive>,
    materials: Vec<MaterialDescriptor>,
    lights: Vec<Light>,
    camera: Option<Camera>,
    background: Rgb,
    texture_system: Option<Box<dyn TextureSystem>>,
    accel: AccelKind,
}

impl Default for WorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldBuilder {
    pub fn new() -> Self {
        Self {
            meshes: Vec::new(),
            shapes: Vec::new(),
            materials: Vec::new(),
            lights: Vec::new(),
            camera: None,
            background: BLACK,
            texture_system: None,
            accel: AccelKind::Sbvh(SbvhOptions::default()),
        }
    }

    pub fn add_material(&mut self, descriptor: MaterialDescriptor) -> crate::material::MaterialId {
        self.materials.push(descriptor);
        crate::material::MaterialId(self.materials.len() as u32 - 1)
    }

    /// Number of materials registered so far; importers use it to compute
    /// the id their first emitted material will receive.
    pub fn material_count(&self) -> u32 {
        self.materials.len() as u32
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> u32 {
        self.meshes.push(mesh);
        self.meshes.len() as u32 - 1
    }

    pub fn add_sphere(&mut self, sphere: Sphere) {
        self.shapes.push(Primitive::Sphere(sphere));
    }

    pub fn add_instance(&mut self, instance: Instance) {
        self.shapes.push(Primitive::Instance(instance));
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = Some(camera);
    }

    pub fn set_background(&mut self, background: Rgb) {
        self.background = background;
    }

    pub fn set_texture_system(&mut self, texsys: Box<dyn TextureSystem>) {
        self.texture_system = Some(texsys);
    }

    pub fn set_accel(&mut self, accel: AccelKind) {
        self.accel = accel;
    }

    /// Fold a stream of import events into the builder.
    pub fn extend(&mut self, events: impl IntoIterator<Item = crate::loader::SceneEvent>) {
        use crate::loader::SceneEvent;
        for event in events {
            match event {
                SceneEvent::Material(descriptor) => {
                    self.add_material(descriptor);
                }
                SceneEvent::Mesh(mesh) => {
                    self.add_mesh(mesh);
                }
                SceneEvent::Light(light) => self.add_light(light),
            }
        }
    }

    /// Validate the scene, refine meshes into triangles, wire up area
    /// lights and build the acceleration structure.
    pub fn commit(self) -> Result<World, CommitError> {
        self.validate_indices()?;

        let Some(camera) = self.camera else {
            return Err(CommitError::NoCamera);
        };

        // Refinement: one triangle primitive per non-degenerate face.
        let mut primitives = Vec::new();
        for (mesh_index, mesh) in self.meshes.iter().enumerate() {
            for face in 0..mesh.face_count() {
                if mesh.face_degenerate(face) {
                    crate::utils::counter::counter!("Degenerate faces skipped");
                    warn_once!("mesh {mesh_index}: skipping degenerate faces");
                    continue;
                }
                primitives.push(Primitive::Triangle(Triangle {
                    mesh: mesh_index as u32,
                    face,
                }));
            }
        }
        primitives.extend(self.shapes);

        let mut lights = self.lights;
        for light in &lights {
            if let Some(prim) = light.area_primitive() {
                if prim as usize >= primitives.len() {
                    return Err(CommitError::LightPrimitiveOutOfRange {
                        index: prim,
                        count: primitives.len(),
                    });
                }
            }
        }

        // Emissive primitives become area lights unless one already points
        // at them.
        let known: Vec<u32> = lights.iter().filter_map(|l| l.area_primitive()).collect();
        for (index, prim) in primitives.iter().enumerate() {
            let material = &self.materials[prim.material(&self.meshes).0 as usize].material;
            if material.is_emissive() && !known.contains(&(index as u32)) {
                lights.push(Light::Area {
                    primitive: index as u32,
                });
            }
        }

        let mut prim_light = vec![None; primitives.len()];
        for (light_index, light) in lights.iter().enumerate() {
            if let Some(prim) = light.area_primitive() {
                prim_light[prim as usize] = Some(light_index as u32);
            }
        }

        let (accel, bounds) = match self.accel {
            AccelKind::List => {
                let list = ShapeList;
                let bounds = list.bounds(&primitives, &self.meshes);
                (Accel::List(list), bounds)
            }
            AccelKind::Sbvh(options) => {
                let bvh = timed_scope_log("Build acceleration structure", || {
                    Sbvh::build(&primitives, &self.meshes, &options)
                })
                .res;
                let stats = bvh.stats();
                log::info!(
                    "SBVH: {} internal nodes, {} leaves, {} references over {} primitives",
                    stats.internal_nodes,
                    stats.leaves,
                    stats.references,
                    stats.primitives
                );
                let bounds = bvh.bounds();
                (Accel::Sbvh(bvh), bounds)
            }
        };

        Ok(World {
            meshes: self.meshes,
            primitives,
            materials: self.materials,
            lights,
            camera,
            background: self.background,
            texture_system: self
                .texture_system
                .unwrap_or_else(|| Box::new(NullTextureSystem)),
            accel,
            prim_light,
            bounds,
        })
    }

    fn validate_indices(&self) -> Result<(), CommitError> {
        let material_count = self.materials.len();
        let check_material = |id: crate::material::MaterialId| {
            if id.0 as usize >= material_count {
                Err(CommitError::MaterialIndexOutOfRange {
                    index: id.0,
                    count: material_count,
                })
            } else {
                Ok(())
            }
        };

        for (mesh_index, mesh) in self.meshes.iter().enumerate() {
            for &m in &mesh.face_materials {
                check_material(m)?;
            }
            for face in &mesh.indices {
                for &v in face {
                    if v as usize >= mesh.positions.len() {
                        return Err(CommitError::VertexIndexOutOfRange {
                            mesh: mesh_index,
                            index: v,
                        });
                    }
                }
            }
        }

        for shape in &self.shapes {
            match shape {
                Primitive::Sphere(s) => check_material(s.material)?,
                Primitive::Instance(i) => {
                    if i.mesh as usize >= self.meshes.len() {
                        return Err(CommitError::MeshIndexOutOfRange {
                            index: i.mesh,
                            count: self.meshes.len(),
                        });
                    }
                    if let Some(m) = i.material {
                        check_material(m)?;
                    }
                }
                Primitive::Triangle(_) => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use glam::Vec3;

    use super::*;
    use crate::{
        camera::PerspectiveCamera,
        material::{Material, MaterialId},
        math::{point::Point, transform::Transform},
    };

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

    #[test]
    fn commit_without_camera_fails() {
        let builder = WorldBuilder::new();
        assert!(matches!(builder.commit(), Err(CommitError::NoCamera)));
    }

    #[test]
    fn out_of_range_material_is_fatal() {
        let mut builder = WorldBuilder::new();
        builder.add_mesh(Mesh::quad(MaterialId(7), Transform::IDENTITY));
        builder.set_camera(camera());
        assert!(matches!(
            builder.commit(),
            Err(CommitError::MaterialIndexOutOfRange { index: 7, .. })
        ));
    }

    #[test]
    fn out_of_range_vertex_is_fatal() {
        let mut builder = WorldBuilder::new();
        let m = builder.add_material(MaterialDescriptor {
            label: None,
            material: Material::matte(Rgb::splat(0.5)),
        });
        builder.add_mesh(Mesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![],
            vec![],
            vec![[0, 1, 9]],
            vec![m],
            Transform::IDENTITY,
        ));
        builder.set_camera(camera());
        assert!(matches!(
            builder.commit(),
            Err(CommitError::VertexIndexOutOfRange { index: 9, .. })
        ));
    }

    #[test]
    fn degenerate_faces_are_skipped_not_fatal() {
        let mut builder = WorldBuilder::new();
        let m = builder.add_material(MaterialDescriptor {
            label: None,
            material: Material::matte(Rgb::splat(0.5)),
        });
        // One real face, one zero-area face.
        builder.add_mesh(Mesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::X * 2.0],
            vec![],
            vec![],
            vec![[0, 1, 2], [0, 1, 3]],
            vec![m, m],
            Transform::IDENTITY,
        ));
        builder.set_camera(camera());
        let world = builder.commit().unwrap();
        assert_eq!(world.primitive_count(), 1);
    }

    #[test]
    fn emissive_faces_become_area_lights() {
        let mut builder = WorldBuilder::new();
        let emit = builder.add_material(MaterialDescriptor {
            label: None,
            material: Material::Emissive {
                radiance: Rgb::splat(4.0),
            },
        });
        builder.add_mesh(Mesh::quad(emit, Transform::IDENTITY));
        builder.set_camera(camera());
        let world = builder.commit().unwrap();

        assert_eq!(world.lights().len(), 2);
        assert!(world.light_of_prim(0).is_some());
        assert!(world.light_of_prim(1).is_some());
    }

    #[test]
    fn list_and_sbvh_agree_on_a_simple_scene() {
        fn build(accel: AccelKind) -> World {
            let mut builder = WorldBuilder::new();
            let m = builder.add_material(MaterialDescriptor {
                label: None,
                material: Material::matte(Rgb::splat(0.5)),
            });
            builder.add_mesh(Mesh::quad(m, Transform::IDENTITY));
            builder.add_sphere(crate::shape::Sphere::unit(
                Point::new(0.0, 2.0, 0.0),
                0.5,
                m,
            ));
            builder.set_camera(camera());
            builder.set_accel(accel);
            builder.commit().unwrap()
        }

        let a = build(AccelKind::List);
        let b = build(AccelKind::Sbvh(SbvhOptions::default()));
        let ray = Ray::new(Point::new(0.0, 4.0, 0.0), Vec3::NEG_Y);
        let ha = a.intersect(&ray).unwrap();
        let hb = b.intersect(&ray).unwrap();
        assert!((ha.t - hb.t).abs() < 1e-5);
        assert_eq!(ha.prim, hb.prim);
    }
}
