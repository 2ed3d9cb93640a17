use glam::Vec3;

use crate::ray::Ray;

use super::point::Point;

/// Axis aligned bounding box stored as its two extreme corners.
///
/// The empty box has `pmin = +INF` and `pmax = -INF` so that a union with any
/// box returns that box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub pmin: Point,
    pub pmax: Point,
}

impl Bounds {
    pub const EMPTY: Bounds = Bounds {
        pmin: Point(Vec3::INFINITY),
        pmax: Point(Vec3::NEG_INFINITY),
    };

    pub fn from_point(p: Point) -> Self {
        Self { pmin: p, pmax: p }
    }

    pub fn from_points(a: Point, b: Point) -> Self {
        Self {
            pmin: a.min(b),
            pmax: a.max(b),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pmin.vec().cmpgt(self.pmax.vec()).any()
    }

    pub fn center(&self) -> Point {
        Point(0.5 * (self.pmin.vec() + self.pmax.vec()))
    }

    pub fn extents(&self) -> Vec3 {
        self.pmax.vec() - self.pmin.vec()
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            pmin: self.pmin.min(other.pmin),
            pmax: self.pmax.max(other.pmax),
        }
    }

    pub fn extend(&self, p: Point) -> Bounds {
        Bounds {
            pmin: self.pmin.min(p),
            pmax: self.pmax.max(p),
        }
    }

    pub fn intersection(&self, other: &Bounds) -> Bounds {
        Bounds {
            pmin: self.pmin.max(other.pmin),
            pmax: self.pmax.min(other.pmax),
        }
    }

    /// Componentwise separating axis test: two boxes overlap iff their
    /// centers are closer than the sum of their half extents on every axis.
    pub fn intersects(&self, other: &Bounds) -> bool {
        let d = (other.center() - self.center()).abs();
        let r = 0.5 * (self.extents() + other.extents());
        d.x < r.x && d.y < r.y && d.z < r.z
    }

    pub fn contains(&self, p: Point) -> bool {
        p.vec().cmpge(self.pmin.vec()).all() && p.vec().cmple(self.pmax.vec()).all()
    }

    pub fn contains_bounds(&self, other: &Bounds) -> bool {
        self.contains(other.pmin) && self.contains(other.pmax)
    }

    /// Axis with the largest extent.
    pub fn maxdim(&self) -> usize {
        let ext = self.extents();
        if ext.x >= ext.y && ext.x >= ext.z {
            0
        } else if ext.y >= ext.z {
            1
        } else {
            2
        }
    }

    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let ext = self.extents();
        2.0 * (ext.x * ext.y + ext.x * ext.z + ext.y * ext.z)
    }

    fn corner(&self, i: usize) -> Vec3 {
        if i == 0 {
            self.pmin.vec()
        } else {
            self.pmax.vec()
        }
    }

    /// Slab test with precomputed `1 / d` and per-axis direction signs so the
    /// near and far planes are picked without branching.
    ///
    /// Returns the entry distance when `[tnear, tfar]` overlaps
    /// `[tmin, tmax]`. NaNs arising from `0 * inf` are discarded because
    /// `f32::max`/`f32::min` return the non-NaN operand.
    pub fn hit_distance(
        &self,
        origin: Point,
        inv_dir: Vec3,
        dirneg: [usize; 3],
        tmin: f32,
        tmax: f32,
    ) -> Option<f32> {
        let o = origin.vec();

        let mut t0 = tmin;
        let mut t1 = tmax;

        t0 = t0.max((self.corner(dirneg[0]).x - o.x) * inv_dir.x);
        t1 = t1.min((self.corner(1 - dirneg[0]).x - o.x) * inv_dir.x);
        t0 = t0.max((self.corner(dirneg[1]).y - o.y) * inv_dir.y);
        t1 = t1.min((self.corner(1 - dirneg[1]).y - o.y) * inv_dir.y);
        t0 = t0.max((self.corner(dirneg[2]).z - o.z) * inv_dir.z);
        t1 = t1.min((self.corner(1 - dirneg[2]).z - o.z) * inv_dir.z);

        (t0 <= t1).then_some(t0)
    }

    /// Convenience slab test for a full ray.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, f32)> {
        let inv = ray.direction.recip();
        let o = ray.origin.vec();
        let mut t0 = ray.bounds.0;
        let mut t1 = ray.bounds.1;
        for axis in 0..3 {
            let tn = (self.pmin.vec()[axis] - o[axis]) * inv[axis];
            let tf = (self.pmax.vec()[axis] - o[axis]) * inv[axis];
            let (tn, tf) = if tn <= tf { (tn, tf) } else { (tf, tn) };
            t0 = t0.max(tn);
            t1 = t1.min(tf);
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1))
    }
}

pub fn dirneg(direction: Vec3) -> [usize; 3] {
    [
        (direction.x < 0.0) as usize,
        (direction.y < 0.0) as usize,
        (direction.z < 0.0) as usize,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::point::Point;
    use glam::Vec3;

    #[test]
    fn empty_union_is_identity() {
        let b = Bounds::from_points(Point::new(-1.0, 0.0, 2.0), Point::new(3.0, 1.0, 4.0));
        let u = Bounds::EMPTY.union(&b);
        assert_eq!(u, b);
        assert!(Bounds::EMPTY.is_empty());
        assert_eq!(Bounds::EMPTY.surface_area(), 0.0);
    }

    #[test]
    fn disjoint_on_z_only_does_not_intersect() {
        // Boxes that overlap on x and y but are separated along z.
        let a = Bounds::from_points(Point::new(0.0, 0.0, 0.0), Point::new(1.0, 1.0, 1.0));
        let b = Bounds::from_points(Point::new(0.2, 0.2, 2.0), Point::new(0.8, 0.8, 3.0));
        assert!(!a.intersects(&b));
        assert!(!b.intersects(&a));

        let c = Bounds::from_points(Point::new(0.5, 0.5, 0.5), Point::new(1.5, 1.5, 1.5));
        assert!(a.intersects(&c));
    }

    #[test]
    fn slab_test_hits_and_misses() {
        let b = Bounds::from_points(Point::new(-1.0, -1.0, -1.0), Point::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Point::new(0.0, 0.0, -5.0), Vec3::Z);
        let (t0, t1) = b.intersect_ray(&ray).unwrap();
        assert!((t0 - 4.0).abs() < 1e-5);
        assert!((t1 - 6.0).abs() < 1e-5);

        let miss = Ray::new(Point::new(0.0, 3.0, -5.0), Vec3::Z);
        assert!(b.intersect_ray(&miss).is_none());

        let inv = ray.direction.recip();
        let neg = dirneg(ray.direction);
        let tnear = b
            .hit_distance(ray.origin, inv, neg, ray.bounds.0, ray.bounds.1)
            .unwrap();
        assert!((tnear - 4.0).abs() < 1e-5);
    }

    #[test]
    fn slab_test_axis_parallel_ray() {
        // Direction has zero components; 0 * inf must not poison the result.
        let b = Bounds::from_points(Point::new(-1.0, -1.0, -1.0), Point::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Point::new(-1.0, 0.0, -5.0), Vec3::Z);
        assert!(b.intersect_ray(&ray).is_some());

        let outside = Ray::new(Point::new(-2.0, 0.0, -5.0), Vec3::Z);
        assert!(b.intersect_ray(&outside).is_none());
    }

    #[test]
    fn intersection_of_disjoint_is_empty() {
        let a = Bounds::from_points(Point::new(0.0, 0.0, 0.0), Point::new(1.0, 1.0, 1.0));
        let b = Bounds::from_points(Point::new(2.0, 2.0, 2.0), Point::new(3.0, 3.0, 3.0));
        assert!(a.intersection(&b).is_empty());
        assert!(!a.intersection(&b).intersects(&a));
    }
}
