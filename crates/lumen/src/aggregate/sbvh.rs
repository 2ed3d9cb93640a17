//! Spatial-split bounding volume hierarchy.
//!
//! Top-down binned SAH builder. Each node first evaluates the best object
//! partition; when the SAH overlap of the two sides is large relative to the
//! root, spatial splits are also evaluated and references straddling the
//! winning plane are either duplicated into both children with clipped
//! bounds or, when that is cheaper, unsplit onto a single side.
//!
//! Leaves store references (original primitive index); traversal always
//! tests the original primitive, so duplicated references never change
//! which hit is found, only how fast it is found.

use itertools::Itertools;

use crate::{
    math::bounds::{dirneg, Bounds},
    ray::Ray,
    shape::{Hit, Mesh, Primitive},
};

#[derive(Debug, Clone)]
pub struct SbvhOptions {
    /// Relative cost of one traversal step vs one primitive test.
    pub traversal_cost: f32,
    /// Node size at or below which a leaf is always emitted.
    pub min_leaf_size: usize,
    pub spatial_splits: bool,
    pub num_bins: usize,
    pub num_spatial_bins: usize,
    /// Overlap fraction of the root surface area above which spatial splits
    /// are considered.
    pub min_overlap: f32,
    pub max_depth: usize,
}

impl Default for SbvhOptions {
    fn default() -> Self {
        Self {
            traversal_cost: 1.0,
            min_leaf_size: 4,
            spatial_splits: true,
            num_bins: 16,
            num_spatial_bins: 32,
            min_overlap: 1e-5,
            max_depth: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SbvhStats {
    pub internal_nodes: usize,
    pub leaves: usize,
    pub references: usize,
    pub primitives: usize,
}

#[derive(Debug, Clone)]
enum Node {
    Internal { bounds: Bounds, right: u32 },
    Leaf { bounds: Bounds, start: u32, count: u32 },
}

impl Node {
    fn bounds(&self) -> &Bounds {
        match self {
            Node::Internal { bounds, .. } => bounds,
            Node::Leaf { bounds, .. } => bounds,
        }
    }
}

/// A primitive reference carried through the build; its bounds may be a
/// clipped portion of the primitive's full bounds.
#[derive(Debug, Clone, Copy)]
struct Reference {
    prim: u32,
    bounds: Bounds,
}

impl Reference {
    fn centroid(&self, axis: usize) -> f32 {
        0.5 * (self.bounds.pmin.vec()[axis] + self.bounds.pmax.vec()[axis])
    }
}

pub struct Sbvh {
    nodes: Vec<Node>,
    /// Leaf payload: original primitive indices.
    refs: Vec<u32>,
    bounds: Bounds,
    primitives: usize,
}

struct ObjectSplit {
    cost: f32,
    axis: usize,
    /// References whose centroid bin is `< bin` go left.
    bin: usize,
    num_bins: usize,
    cb_min: f32,
    cb_extent: f32,
}

impl ObjectSplit {
    fn goes_left(&self, r: &Reference) -> bool {
        object_bin(r.centroid(self.axis), self.cb_min, self.cb_extent, self.num_bins) < self.bin
    }
}

struct SpatialSplit {
    cost: f32,
    axis: usize,
    plane: f32,
    left_bounds: Bounds,
    right_bounds: Bounds,
    left_count: usize,
    right_count: usize,
}

struct Builder<'a> {
    opts: &'a SbvhOptions,
    nodes: Vec<Node>,
    refs: Vec<u32>,
    root_sa: f32,
    /// Remaining reference duplications before the 3x budget is exhausted.
    duplication_budget: usize,
}

const STACK_SIZE: usize = 128;

impl Sbvh {
    pub fn build(prims: &[Primitive], meshes: &[Mesh], opts: &SbvhOptions) -> Self {
        let references: Vec<Reference> = prims
            .iter()
            .enumerate()
            .map(|(index, prim)| Reference {
                prim: index as u32,
                bounds: prim.bounds(meshes),
            })
            .collect();

        let bounds = references
            .iter()
            .fold(Bounds::EMPTY, |acc, r| acc.union(&r.bounds));

        let mut builder = Builder {
            opts,
            nodes: Vec::with_capacity(2 * prims.len()),
            refs: Vec::with_capacity(prims.len()),
            root_sa: bounds.surface_area().max(f32::MIN_POSITIVE),
            duplication_budget: 2 * prims.len(),
        };

        if !references.is_empty() {
            builder.build_node(references, 0);
        }

        Self {
            nodes: builder.nodes,
            refs: builder.refs,
            bounds,
            primitives: prims.len(),
        }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn stats(&self) -> SbvhStats {
        let leaves = self
            .nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count();
        SbvhStats {
            internal_nodes: self.nodes.len() - leaves,
            leaves,
            references: self.refs.len(),
            primitives: self.primitives,
        }
    }

    pub fn intersect(&self, prims: &[Primitive], meshes: &[Mesh], ray: &Ray) -> Option<Hit> {
        if self.nodes.is_empty() {
            return None;
        }

        let inv_dir = ray.direction.recip();
        let neg = dirneg(ray.direction);
        let tmin = ray.bounds.0;
        let mut tmax = ray.bounds.1;

        let mut best: Option<Hit> = None;
        let mut stack = [(0u32, 0.0f32); STACK_SIZE];
        let mut sp = 0usize;

        if let Some(t) = self.nodes[0]
            .bounds()
            .hit_distance(ray.origin, inv_dir, neg, tmin, tmax)
        {
            stack[sp] = (0, t);
            sp += 1;
        }

        while sp > 0 {
            sp -= 1;
            let (current, tnear) = stack[sp];
            if tnear > tmax {
                continue;
            }

            match &self.nodes[current as usize] {
                Node::Leaf { start, count, .. } => {
                    for &prim_index in &self.refs[*start as usize..(*start + *count) as usize] {
                        if let Some(mut hit) =
                            prims[prim_index as usize].intersect(meshes, ray, tmax)
                        {
                            tmax = hit.t;
                            hit.prim = prim_index;
                            best = Some(hit);
                        }
                    }
                }
                Node::Internal { right, .. } => {
                    let left = current + 1;
                    let lt = self.nodes[left as usize].bounds().hit_distance(
                        ray.origin, inv_dir, neg, tmin, tmax,
                    );
                    let rt = self.nodes[*right as usize].bounds().hit_distance(
                        ray.origin, inv_dir, neg, tmin, tmax,
                    );

                    // Push the farther child first so the nearer one is
                    // popped and traversed before it.
                    match (lt, rt) {
                        (Some(lt), Some(rt)) => {
                            let (near, far) = if lt <= rt {
                                ((left, lt), (*right, rt))
                            } else {
                                ((*right, rt), (left, lt))
                            };
                            debug_assert!(sp + 2 <= STACK_SIZE);
                            stack[sp] = far;
                            stack[sp + 1] = near;
                            sp += 2;
                        }
                        (Some(lt), None) => {
                            stack[sp] = (left, lt);
                            sp += 1;
                        }
                        (None, Some(rt)) => {
                            stack[sp] = (*right, rt);
                            sp += 1;
                        }
                        (None, None) => {}
                    }
                }
            }
        }

        best
    }

    /// Any-hit query; returns on the first intersection inside the ray
    /// interval without tightening `tmax`.
    pub fn occluded(&self, prims: &[Primitive], meshes: &[Mesh], ray: &Ray) -> bool {
        if self.nodes.is_empty() {
            return false;
        }

        let inv_dir = ray.direction.recip();
        let neg = dirneg(ray.direction);
        let (tmin, tmax) = ray.bounds;

        let mut stack = [0u32; STACK_SIZE];
        let mut sp = 0usize;
        stack[sp] = 0;
        sp += 1;

        while sp > 0 {
            sp -= 1;
            let current = stack[sp];
            let node = &self.nodes[current as usize];
            if node
                .bounds()
                .hit_distance(ray.origin, inv_dir, neg, tmin, tmax)
                .is_none()
            {
                continue;
            }

            match node {
                Node::Leaf { start, count, .. } => {
                    for &prim_index in &self.refs[*start as usize..(*start + *count) as usize] {
                        if prims[prim_index as usize].occluded(meshes, ray) {
                            return true;
                        }
                    }
                }
                Node::Internal { right, .. } => {
                    debug_assert!(sp + 2 <= STACK_SIZE);
                    stack[sp] = current + 1;
                    stack[sp + 1] = *right;
                    sp += 2;
                }
            }
        }

        false
    }

    #[cfg(test)]
    fn validate_bounds(&self) {
        let mut stack = vec![0usize];
        while let Some(current) = stack.pop() {
            if let Node::Internal { bounds, right } = &self.nodes[current] {
                for child in [current + 1, *right as usize] {
                    let cb = self.nodes[child].bounds();
                    assert!(
                        bounds.pmin.vec().cmple(cb.pmin.vec() + 1e-4).all()
                            && bounds.pmax.vec().cmpge(cb.pmax.vec() - 1e-4).all(),
                        "child bounds escape parent"
                    );
                    stack.push(child);
                }
            }
        }
    }
}

fn clip_to_slab(bounds: &Bounds, axis: usize, lo: f32, hi: f32) -> Bounds {
    let mut pmin = bounds.pmin.vec();
    let mut pmax = bounds.pmax.vec();
    pmin[axis] = pmin[axis].max(lo);
    pmax[axis] = pmax[axis].min(hi);
    Bounds {
        pmin: crate::math::point::Point(pmin),
        pmax: crate::math::point::Point(pmax),
    }
}

impl Builder<'_> {
    fn build_node(&mut self, refs: Vec<Reference>, depth: usize) -> u32 {
        let bounds = refs
            .iter()
            .fold(Bounds::EMPTY, |acc, r| acc.union(&r.bounds));

        if refs.len() <= self.opts.min_leaf_size || depth >= self.opts.max_depth {
            return self.emit_leaf(bounds, &refs);
        }

        let object = self.find_object_split(&refs, &bounds);
        let spatial = self.find_spatial_split(&refs, &bounds, object.as_ref());

        let leaf_cost = refs.len() as f32;
        let split_cost = [
            object.as_ref().map(|o| o.cost),
            spatial.as_ref().map(|s| s.cost),
        ]
        .into_iter()
        .flatten()
        .fold(f32::INFINITY, f32::min);

        if split_cost >= leaf_cost {
            return self.emit_leaf(bounds, &refs);
        }

        let (left, right) = match (&object, &spatial) {
            (_, Some(s)) if s.cost < object.as_ref().map_or(f32::INFINITY, |o| o.cost) => {
                self.partition_spatial(refs, s)
            }
            (Some(o), _) => partition_object(refs, o),
            (None, _) => return self.emit_leaf(bounds, &refs),
        };

        debug_assert!(!left.is_empty() && !right.is_empty());

        let index = self.nodes.len() as u32;
        self.nodes.push(Node::Internal { bounds, right: 0 });
        self.build_node(left, depth + 1);
        let right_index = self.build_node(right, depth + 1);
        if let Node::Internal { right, .. } = &mut self.nodes[index as usize] {
            *right = right_index;
        }
        index
    }

    fn emit_leaf(&mut self, bounds: Bounds, refs: &[Reference]) -> u32 {
        let start = self.refs.len() as u32;
        self.refs.extend(refs.iter().map(|r| r.prim));
        let index = self.nodes.len() as u32;
        self.nodes.push(Node::Leaf {
            bounds,
            start,
            count: refs.len() as u32,
        });
        index
    }

    fn find_object_split(&self, refs: &[Reference], bounds: &Bounds) -> Option<ObjectSplit> {
        let centroid_bounds = centroid_bounds(refs);
        let num_bins = self.opts.num_bins;
        let node_sa = bounds.surface_area().max(f32::MIN_POSITIVE);
        let mut best: Option<ObjectSplit> = None;

        // Axes visited by decreasing centroid extent; the strict `<` in the
        // cost comparison then breaks ties toward the larger extent and the
        // earlier split index.
        let axis_order = (0..3usize)
            .sorted_by(|&a, &b| centroid_bounds.extents()[b].total_cmp(&centroid_bounds.extents()[a]));

        for axis in axis_order {
            let cb_min = centroid_bounds.pmin.vec()[axis];
            let extent = centroid_bounds.pmax.vec()[axis] - cb_min;
            if extent <= 1e-12 {
                continue;
            }

            let mut counts = vec![0usize; num_bins];
            let mut bin_bounds = vec![Bounds::EMPTY; num_bins];
            for r in refs {
                let b = object_bin(r.centroid(axis), cb_min, extent, num_bins);
                counts[b] += 1;
                bin_bounds[b] = bin_bounds[b].union(&r.bounds);
            }

            // Suffix sweep once, then a prefix sweep while scanning planes.
            let mut right_bounds = vec![Bounds::EMPTY; num_bins];
            let mut right_counts = vec![0usize; num_bins];
            let mut acc_bounds = Bounds::EMPTY;
            let mut acc_count = 0usize;
            for b in (1..num_bins).rev() {
                acc_bounds = acc_bounds.union(&bin_bounds[b]);
                acc_count += counts[b];
                right_bounds[b] = acc_bounds;
                right_counts[b] = acc_count;
            }

            let mut left_bounds = Bounds::EMPTY;
            let mut left_count = 0usize;
            for b in 1..num_bins {
                left_bounds = left_bounds.union(&bin_bounds[b - 1]);
                left_count += counts[b - 1];
                if left_count == 0 || right_counts[b] == 0 {
                    continue;
                }

                let cost = self.opts.traversal_cost
                    + (left_bounds.surface_area() * left_count as f32
                        + right_bounds[b].surface_area() * right_counts[b] as f32)
                        / node_sa;
                if best.as_ref().map_or(true, |o| cost < o.cost) {
                    best = Some(ObjectSplit {
                        cost,
                        axis,
                        bin: b,
                        num_bins,
                        cb_min,
                        cb_extent: extent,
                    });
                }
            }
        }

        best
    }

    fn find_spatial_split(
        &self,
        refs: &[Reference],
        bounds: &Bounds,
        object: Option<&ObjectSplit>,
    ) -> Option<SpatialSplit> {
        if !self.opts.spatial_splits || self.duplication_budget == 0 {
            return None;
        }

        // Only bother when the object split children overlap a significant
        // fraction of the root surface area.
        let object = object?;
        let (left_bounds, right_bounds) = object_split_bounds(refs, object);
        let overlap = left_bounds.intersection(&right_bounds);
        let lambda = if overlap.is_empty() {
            0.0
        } else {
            overlap.surface_area() / self.root_sa
        };
        if lambda <= self.opts.min_overlap {
            return None;
        }

        let num_bins = self.opts.num_spatial_bins;
        let node_sa = bounds.surface_area().max(f32::MIN_POSITIVE);
        let mut best: Option<SpatialSplit> = None;

        for axis in 0..3 {
            let lo = bounds.pmin.vec()[axis];
            let extent = bounds.pmax.vec()[axis] - lo;
            if extent <= 1e-12 {
                continue;
            }
            let slab = extent / num_bins as f32;

            let mut bin_bounds = vec![Bounds::EMPTY; num_bins];
            let mut enter = vec![0usize; num_bins];
            let mut exit = vec![0usize; num_bins];

            for r in refs {
                let first = spatial_bin(r.bounds.pmin.vec()[axis], lo, slab, num_bins);
                let last = spatial_bin(r.bounds.pmax.vec()[axis], lo, slab, num_bins).max(first);
                for b in first..=last {
                    let slab_lo = lo + b as f32 * slab;
                    let clipped = clip_to_slab(&r.bounds, axis, slab_lo, slab_lo + slab);
                    bin_bounds[b] = bin_bounds[b].union(&clipped);
                }
                enter[first] += 1;
                exit[last] += 1;
            }

            let mut right_bounds = vec![Bounds::EMPTY; num_bins];
            let mut acc = Bounds::EMPTY;
            for b in (1..num_bins).rev() {
                acc = acc.union(&bin_bounds[b]);
                right_bounds[b] = acc;
            }

            let mut left_bounds = Bounds::EMPTY;
            let mut left_count = 0usize;
            let mut right_count: usize = exit.iter().sum();
            for b in 1..num_bins {
                left_bounds = left_bounds.union(&bin_bounds[b - 1]);
                left_count += enter[b - 1];
                right_count -= exit[b - 1];

                if left_count == 0 || right_count == 0 {
                    continue;
                }
                let cost = self.opts.traversal_cost
                    + (left_bounds.surface_area() * left_count as f32
                        + right_bounds[b].surface_area() * right_count as f32)
                        / node_sa;
                if best.as_ref().map_or(true, |s| cost < s.cost) {
                    best = Some(SpatialSplit {
                        cost,
                        axis,
                        plane: lo + b as f32 * slab,
                        left_bounds,
                        right_bounds: right_bounds[b],
                        left_count,
                        right_count,
                    });
                }
            }
        }

        best
    }

    /// Distribute references across the spatial plane. Straddling references
    /// are normally duplicated with clipped bounds; the unsplit test moves a
    /// reference wholly to one side when growing that side is cheaper than
    /// keeping two references.
    fn partition_spatial(
        &mut self,
        refs: Vec<Reference>,
        split: &SpatialSplit,
    ) -> (Vec<Reference>, Vec<Reference>) {
        let axis = split.axis;
        let plane = split.plane;

        let sa_l = split.left_bounds.surface_area();
        let sa_r = split.right_bounds.surface_area();
        let nl = split.left_count as f32;
        let nr = split.right_count as f32;
        let cost_split = sa_l * nl + sa_r * nr;

        let mut left = Vec::with_capacity(refs.len());
        let mut right = Vec::with_capacity(refs.len());

        for r in refs {
            if r.bounds.pmax.vec()[axis] <= plane {
                left.push(r);
            } else if r.bounds.pmin.vec()[axis] >= plane {
                right.push(r);
            } else {
                let cost_unsplit_left = split.left_bounds.union(&r.bounds).surface_area() * nl
                    + sa_r * (nr - 1.0);
                let cost_unsplit_right =
                    sa_l * (nl - 1.0) + split.right_bounds.union(&r.bounds).surface_area() * nr;

                let may_duplicate = self.duplication_budget > 0;
                if may_duplicate
                    && cost_split <= cost_unsplit_left
                    && cost_split <= cost_unsplit_right
                {
                    self.duplication_budget -= 1;
                    left.push(Reference {
                        prim: r.prim,
                        bounds: clip_to_slab(&r.bounds, axis, f32::NEG_INFINITY, plane),
                    });
                    right.push(Reference {
                        prim: r.prim,
                        bounds: clip_to_slab(&r.bounds, axis, plane, f32::INFINITY),
                    });
                } else if cost_unsplit_left <= cost_unsplit_right {
                    left.push(r);
                } else {
                    right.push(r);
                }
            }
        }

        // Unsplitting can empty one side entirely; fall back to a median
        // partition to guarantee progress.
        if left.is_empty() || right.is_empty() {
            let mut all: Vec<Reference> = left.into_iter().chain(right).collect();
            all.sort_by(|a, b| a.centroid(axis).total_cmp(&b.centroid(axis)));
            let mid = all.len() / 2;
            let right = all.split_off(mid);
            return (all, right);
        }

        (left, right)
    }
}

fn object_bin(centroid: f32, cb_min: f32, extent: f32, num_bins: usize) -> usize {
    (((centroid - cb_min) / extent * num_bins as f32) as usize).min(num_bins - 1)
}

fn spatial_bin(position: f32, lo: f32, slab: f32, num_bins: usize) -> usize {
    (((position - lo) / slab) as usize).min(num_bins - 1)
}

fn centroid_bounds(refs: &[Reference]) -> Bounds {
    refs.iter().fold(Bounds::EMPTY, |acc, r| {
        acc.extend(crate::math::point::Point(glam::Vec3::new(
            r.centroid(0),
            r.centroid(1),
            r.centroid(2),
        )))
    })
}

fn object_split_bounds(refs: &[Reference], split: &ObjectSplit) -> (Bounds, Bounds) {
    let mut left = Bounds::EMPTY;
    let mut right = Bounds::EMPTY;
    for r in refs {
        if split.goes_left(r) {
            left = left.union(&r.bounds);
        } else {
            right = right.union(&r.bounds);
        }
    }
    (left, right)
}

fn partition_object(refs: Vec<Reference>, split: &ObjectSplit) -> (Vec<Reference>, Vec<Reference>) {
    let (left, right): (Vec<_>, Vec<_>) = refs.into_iter().partition(|r| split.goes_left(r));
    debug_assert!(!left.is_empty() && !right.is_empty());
    (left, right)
}
