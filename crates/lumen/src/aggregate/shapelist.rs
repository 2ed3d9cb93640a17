use crate::{
    math::bounds::Bounds,
    ray::Ray,
    shape::{Hit, Mesh, Primitive},
};

/// Exhaustive scan over every primitive. O(n) per ray.
#[derive(Debug, Default)]
pub struct ShapeList;

impl ShapeList {
    pub fn intersect(&self, prims: &[Primitive], meshes: &[Mesh], ray: &Ray) -> Option<Hit> {
        let mut tmax = ray.bounds.1;
        let mut best = None;
        for (index, prim) in prims.iter().enumerate() {
            if let Some(mut hit) = prim.intersect(meshes, ray, tmax) {
                tmax = hit.t;
                hit.prim = index as u32;
                best = Some(hit);
            }
        }
        best
    }

    pub fn occluded(&self, prims: &[Primitive], meshes: &[Mesh], ray: &Ray) -> bool {
        prims.iter().any(|prim| prim.occluded(meshes, ray))
    }

    pub fn bounds(&self, prims: &[Primitive], meshes: &[Mesh]) -> Bounds {
        prims
            .iter()
            .fold(Bounds::EMPTY, |acc, prim| acc.union(&prim.bounds(meshes)))
    }
}
