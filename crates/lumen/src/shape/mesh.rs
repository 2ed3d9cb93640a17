use glam::{Vec2, Vec3};

use crate::{
    material::MaterialId,
    math::{
        bounds::Bounds, distributions::square_to_uniform_triangle, point::Point,
        transform::Transform, vec::orthonormal_basis,
    },
    ray::Ray,
};

use super::Hit;

/// Determinant threshold below which a triangle is treated as edge-on.
const DET_EPSILON: f32 = 1e-8;

/// Indexed triangle soup with shared per-vertex attributes.
///
/// The world transform is baked into the vertex data at construction;
/// refinement then yields one [`super::Triangle`] per face that indexes back
/// into this mesh by position in the world's mesh arena.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    /// Empty when the source had no normals; the geometric normal is used.
    pub normals: Vec<Vec3>,
    /// Empty when the source had no uv parametrization.
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<[u32; 3]>,
    /// One entry per face, or a single shared entry.
    pub face_materials: Vec<MaterialId>,
    pub transform: Transform,
}

impl Mesh {
    pub fn new(
        mut positions: Vec<Vec3>,
        mut normals: Vec<Vec3>,
        uvs: Vec<[f32; 2]>,
        indices: Vec<[u32; 3]>,
        face_materials: Vec<MaterialId>,
        transform: Transform,
    ) -> Self {
        for p in &mut positions {
            *p = transform.apply_point(Point(*p)).vec();
        }
        for n in &mut normals {
            *n = transform.apply_normal(*n);
        }

        Self {
            positions,
            normals,
            uvs,
            indices,
            face_materials,
            transform,
        }
    }

    /// Unit quad on `y = 0`, spanning `[-1, 1]^2`, split into two triangles.
    /// The workhorse of the built-in scenes.
    pub fn quad(material: MaterialId, transform: Transform) -> Self {
        Self::new(
            vec![
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(-1.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, -1.0),
            ],
            vec![Vec3::Y; 4],
            vec![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]],
            vec![[0, 1, 2], [0, 2, 3]],
            vec![material],
            transform,
        )
    }

    pub fn face_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn material_of(&self, face: u32) -> MaterialId {
        self.face_materials
            .get(face as usize)
            .or_else(|| self.face_materials.first())
            .copied()
            .unwrap_or(MaterialId(0))
    }

    pub fn face_positions(&self, face: u32) -> [Vec3; 3] {
        let [i0, i1, i2] = self.indices[face as usize];
        [
            self.positions[i0 as usize],
            self.positions[i1 as usize],
            self.positions[i2 as usize],
        ]
    }

    pub fn face_bounds(&self, face: u32) -> Bounds {
        let [p0, p1, p2] = self.face_positions(face);
        Bounds::from_points(Point(p0), Point(p1)).extend(Point(p2))
    }

    pub fn face_area(&self, face: u32) -> f32 {
        let [p0, p1, p2] = self.face_positions(face);
        0.5 * (p1 - p0).cross(p2 - p0).length()
    }

    /// Zero-area or non-finite faces are dropped during world commit.
    pub fn face_degenerate(&self, face: u32) -> bool {
        let [p0, p1, p2] = self.face_positions(face);
        if !(p0.is_finite() && p1.is_finite() && p2.is_finite()) {
            return true;
        }
        (p1 - p0).cross(p2 - p0).length_squared() < 1e-20
    }

    /// Möller-Trumbore intersection against a single face.
    pub fn intersect_face(&self, face: u32, ray: &Ray, tmax: f32) -> Option<Hit> {
        let [p0, p1, p2] = self.face_positions(face);
        let e1 = p1 - p0;
        let e2 = p2 - p0;

        let pvec = ray.direction.cross(e2);
        let det = e1.dot(pvec);
        if det.abs() < DET_EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;

        let tvec = ray.origin.vec() - p0;
        let u = tvec.dot(pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let qvec = tvec.cross(e1);
        let v = ray.direction.dot(qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = e2.dot(qvec) * inv_det;
        if t <= ray.bounds.0 || t >= tmax {
            return None;
        }

        let ng = e1.cross(e2).normalize();
        let n = self.shading_normal(face, u, v).unwrap_or(ng);
        let uv = self.shading_uv(face, u, v);
        let (dpdu, dpdv) = orthonormal_basis(n);

        Some(Hit {
            p: Point(p0 + u * e1 + v * e2),
            t,
            n,
            ng,
            dpdu,
            dpdv,
            uv,
            material: self.material_of(face),
            prim: u32::MAX,
        })
    }

    fn shading_normal(&self, face: u32, u: f32, v: f32) -> Option<Vec3> {
        if self.normals.is_empty() {
            return None;
        }
        let [i0, i1, i2] = self.indices[face as usize];
        let n0 = *self.normals.get(i0 as usize)?;
        let n1 = *self.normals.get(i1 as usize)?;
        let n2 = *self.normals.get(i2 as usize)?;
        let n = (1.0 - u - v) * n0 + u * n1 + v * n2;
        (n.length_squared() > 1e-12).then(|| n.normalize())
    }

    fn shading_uv(&self, face: u32, u: f32, v: f32) -> [f32; 2] {
        if self.uvs.is_empty() {
            return [u, v];
        }
        let [i0, i1, i2] = self.indices[face as usize];
        match (
            self.uvs.get(i0 as usize),
            self.uvs.get(i1 as usize),
            self.uvs.get(i2 as usize),
        ) {
            (Some(a), Some(b), Some(c)) => {
                let w = 1.0 - u - v;
                [
                    w * a[0] + u * b[0] + v * c[0],
                    w * a[1] + u * b[1] + v * c[1],
                ]
            }
            _ => [u, v],
        }
    }

    pub fn sample_face(&self, face: u32, u: Vec2) -> (Point, Vec3) {
        let [p0, p1, p2] = self.face_positions(face);
        let (b0, b1) = square_to_uniform_triangle(u);
        let p = b0 * p0 + b1 * p1 + (1.0 - b0 - b1) * p2;
        let ng = (p1 - p0).cross(p2 - p0).normalize();
        (Point(p), ng)
    }
}
