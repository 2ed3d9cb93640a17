use glam::{Vec2, Vec3};

use crate::{
    material::MaterialId,
    math::{bounds::Bounds, point::Point, transform::Transform},
    ray::Ray,
};

use super::{Hit, Mesh};

/// A mesh from the arena re-placed in the world by an extra transform.
///
/// Rays are moved into the instance's local space by the inverse transform;
/// hit points come back through the transform and normals through its
/// inverse transpose.
#[derive(Debug, Clone)]
pub struct Instance {
    pub mesh: u32,
    pub transform: Transform,
    /// Overrides the mesh's per-face materials when set.
    pub material: Option<MaterialId>,
}

impl Instance {
    pub fn new(mesh: u32, transform: Transform) -> Self {
        Self {
            mesh,
            transform,
            material: None,
        }
    }

    fn mesh_of<'a>(&self, meshes: &'a [Mesh]) -> &'a Mesh {
        &meshes[self.mesh as usize]
    }

    pub fn material(&self, meshes: &[Mesh]) -> MaterialId {
        self.material.unwrap_or(self.mesh_of(meshes).material_of(0))
    }

    pub fn bounds(&self, meshes: &[Mesh]) -> Bounds {
        let mesh = self.mesh_of(meshes);
        let mut bounds = Bounds::EMPTY;
        for p in &mesh.positions {
            bounds = bounds.extend(self.transform.apply_point(Point(*p)));
        }
        bounds
    }

    pub fn intersect(&self, meshes: &[Mesh], ray: &Ray, tmax: f32) -> Option<Hit> {
        let mesh = self.mesh_of(meshes);
        let local = self.transform.inverse_ray(ray);

        let mut best: Option<Hit> = None;
        let mut tmax = tmax;
        for face in 0..mesh.face_count() {
            if let Some(hit) = mesh.intersect_face(face, &local, tmax) {
                tmax = hit.t;
                best = Some(hit);
            }
        }

        best.map(|hit| self.hit_to_world(hit))
    }

    pub fn occluded(&self, meshes: &[Mesh], ray: &Ray) -> bool {
        let mesh = self.mesh_of(meshes);
        let local = self.transform.inverse_ray(ray);
        (0..mesh.face_count()).any(|face| mesh.intersect_face(face, &local, local.bounds.1).is_some())
    }

    fn hit_to_world(&self, hit: Hit) -> Hit {
        let n = self.transform.apply_normal(hit.n);
        let ng = self.transform.apply_normal(hit.ng);
        let dpdu = self.transform.apply_vector(hit.dpdu).normalize();
        let dpdv = n.cross(dpdu);
        Hit {
            p: self.transform.apply_point(hit.p),
            n,
            ng,
            dpdu,
            dpdv,
            material: self.material.unwrap_or(hit.material),
            ..hit
        }
    }

    pub fn area(&self, meshes: &[Mesh]) -> f32 {
        // Approximate under non-uniform scale; exact for rigid transforms.
        let mesh = self.mesh_of(meshes);
        let scale = self.transform.apply_vector(Vec3::X).length()
            * self.transform.apply_vector(Vec3::Y).length();
        (0..mesh.face_count()).map(|f| mesh.face_area(f)).sum::<f32>() * scale
    }

    pub fn sample_surface(&self, meshes: &[Mesh], u: Vec2) -> (Point, Vec3) {
        let mesh = self.mesh_of(meshes);
        // Pick a face proportional to index, then a uniform point on it.
        let face = ((u.x * mesh.face_count() as f32) as u32).min(mesh.face_count() - 1);
        let u = Vec2::new((u.x * mesh.face_count() as f32).fract(), u.y);
        let (p, ng) = mesh.sample_face(face, u);
        (
            self.transform.apply_point(p),
            self.transform.apply_normal(ng),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::transform::Transform;
    use glam::Quat;

    #[test]
    fn instanced_quad_hits_through_transform() {
        let meshes = vec![Mesh::quad(MaterialId(3), Transform::IDENTITY)];
        let instance = Instance::new(
            0,
            Transform::from_trs(Vec3::new(0.0, 2.0, 0.0), Quat::IDENTITY, Vec3::splat(2.0)),
        );

        let ray = Ray::new(Point::new(0.5, 5.0, 0.5), Vec3::NEG_Y);
        let hit = instance.intersect(&meshes, &ray, f32::INFINITY).unwrap();
        assert!((hit.t - 3.0).abs() < 1e-4);
        assert!((hit.p.vec().y - 2.0).abs() < 1e-4);
        assert!((hit.n - Vec3::Y).length() < 1e-4);
        assert_eq!(hit.material.0, 3);
        assert!(instance.occluded(&meshes, &ray));
    }

    #[test]
    fn bounds_enclose_transformed_mesh() {
        let meshes = vec![Mesh::quad(MaterialId(0), Transform::IDENTITY)];
        let instance = Instance::new(0, Transform::scale(Vec3::new(3.0, 1.0, 3.0)));
        let b = instance.bounds(&meshes);
        assert!(b.contains(Point::new(3.0, 0.0, -3.0)));
        assert!(!b.contains(Point::new(4.0, 0.0, 0.0)));
    }
}
