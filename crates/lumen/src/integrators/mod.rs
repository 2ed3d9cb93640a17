//! Radiance estimators.
//!
//! An integrator answers "how much light arrives along this ray". All of
//! them share the light-sampling building block below; they differ in what
//! they do after the first hit.

pub mod ao;
pub mod direct;
pub mod path;

pub use ao::AmbientOcclusion;
pub use direct::DirectLighting;
pub use path::PathTracer;

use rand::Rng as _;

use crate::{
    bsdf::Bsdf,
    color::{linear::BLACK, Rgb},
    light::Light,
    math::distributions::power_heuristic,
    ray::Ray,
    renderer::World,
    sampler::Sampler,
    shape::Hit,
};

/// Per-worker mutable state handed down the recursion: the worker RNG plus
/// the light and BSDF sample streams.
pub struct Ctx<'a> {
    pub rng: &'a mut crate::Rng,
    pub light_sampler: &'a mut dyn Sampler,
    pub bsdf_sampler: &'a mut dyn Sampler,
}

pub trait Integrator: Send + Sync {
    /// Incoming radiance along `ray`.
    fn li(&self, world: &World, ctx: &mut Ctx, ray: Ray, depth: u32) -> Rgb;
}

/// One light-sampling (next event) estimate at `hit`, MIS-weighted against
/// the BSDF strategy. Delta lights take weight 1; singular BSDFs evaluate
/// to black and contribute nothing here.
pub(crate) fn sample_light_strategy(
    world: &World,
    ctx: &mut Ctx,
    hit: &Hit,
    bsdf: &Bsdf,
    wi: glam::Vec3,
    light: &Light,
) -> Rgb {
    let u = ctx.light_sampler.sample_2d();
    let Some(ls) = light.sample(&world.view(), hit, u) else {
        return BLACK;
    };
    if ls.pdf <= 0.0 || ls.li.is_black() {
        return BLACK;
    }

    let f = bsdf.eval(hit, wi, ls.wi);
    if f.is_black() {
        return BLACK;
    }

    let mut shadow = Ray::spawn(hit.p, hit.ng, ls.wi);
    if ls.distance.is_finite() {
        // Stop just short of the light surface itself.
        shadow.bounds.1 = ls.distance * (1.0 - 1e-3);
    }
    if world.occluded(&shadow) {
        return BLACK;
    }

    let weight = if ls.delta {
        1.0
    } else {
        power_heuristic(ls.pdf, bsdf.pdf(hit, wi, ls.wi))
    };
    let cos = hit.n.dot(ls.wi).abs();
    f * ls.li * (cos * weight / ls.pdf)
}

/// Uniform variate for lobe selection, drawn from the worker RNG.
pub(crate) fn lobe_select(ctx: &mut Ctx) -> f32 {
    ctx.rng.gen()
}

/// MIS weight for radiance found by following a BSDF sample into a light.
pub(crate) fn bsdf_strategy_weight(
    world: &World,
    prev_hit: &Hit,
    bsdf_pdf: f32,
    singular: bool,
    light: &Light,
    wo: glam::Vec3,
) -> f32 {
    if singular {
        1.0
    } else {
        power_heuristic(bsdf_pdf, light.pdf(&world.view(), prev_hit, wo))
    }
}
