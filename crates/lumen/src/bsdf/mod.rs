//! Scattering models.
//!
//! Directions follow the tracing convention: `wi` points from the surface
//! toward the previous path vertex, `wo` toward the next one. Both are unit
//! world-space vectors. `f` is the bare BSDF value, not premultiplied by
//! `|cos theta_o|`; `pdf` is the solid-angle density of `wo` given `wi`.
//!
//! Singular models (mirror, glass) cannot be evaluated for an arbitrary
//! direction pair; they flag their samples `singular` and the integrator
//! gives them MIS weight 1.

pub mod fresnel;
pub mod lambert;
pub mod microfacet;
pub mod specular;

pub use fresnel::fresnel_dielectric;
pub use lambert::Lambert;
pub use microfacet::{Microfacet, MicrofacetDistribution};
pub use specular::{SpecularReflect, SpecularRefract};

use glam::{Vec2, Vec3};

use crate::{color::Rgb, shape::Hit};

#[derive(Debug, Clone, Copy)]
pub struct BsdfSample {
    /// Sampled outgoing direction, world space, unit.
    pub wo: Vec3,
    pub f: Rgb,
    pub pdf: f32,
    pub singular: bool,
}

/// Orthonormal shading frame at a hit, flipped so that `wi` is always on the
/// positive side of `n`.
#[derive(Debug, Clone, Copy)]
pub struct ShadingFrame {
    pub n: Vec3,
    pub s: Vec3,
    pub t: Vec3,
    /// False when the incoming direction arrived from the back side
    /// (the ray travels inside the medium).
    pub entering: bool,
}

impl ShadingFrame {
    pub fn new(hit: &Hit, wi: Vec3) -> Self {
        let entering = hit.n.dot(wi) >= 0.0;
        if entering {
            Self {
                n: hit.n,
                s: hit.dpdu,
                t: hit.dpdv,
                entering,
            }
        } else {
            Self {
                n: -hit.n,
                s: -hit.dpdu,
                t: -hit.dpdv,
                entering,
            }
        }
    }

    pub fn to_world(&self, local: Vec3) -> Vec3 {
        local.x * self.s + local.y * self.t + local.z * self.n
    }

    pub fn cos_theta(&self, world: Vec3) -> f32 {
        self.n.dot(world)
    }
}

/// Closed set of scattering models; keeps the shading path monomorphic.
#[derive(Debug, Clone)]
pub enum Bsdf {
    Lambert(Lambert),
    SpecularReflect(SpecularReflect),
    SpecularRefract(SpecularRefract),
    Microfacet(Microfacet),
    /// Lambert and mirror lobes blended by the dielectric Fresnel factor.
    FresnelBlend(FresnelBlend),
    /// Fixed-weight blend of two non-singular models.
    Mix(MixBsdf),
}

impl Bsdf {
    /// Draw `wo` given `wi`; `u` drives the lobe shape, `uc` lobe selection.
    pub fn sample(&self, hit: &Hit, wi: Vec3, u: Vec2, uc: f32) -> Option<BsdfSample> {
        let frame = ShadingFrame::new(hit, wi);
        self.sample_local(&frame, wi, u, uc)
    }

    fn sample_local(
        &self,
        frame: &ShadingFrame,
        wi: Vec3,
        u: Vec2,
        uc: f32,
    ) -> Option<BsdfSample> {
        match self {
            Bsdf::Lambert(b) => b.sample(frame, wi, u),
            Bsdf::SpecularReflect(b) => b.sample(frame, wi),
            Bsdf::SpecularRefract(b) => b.sample(frame, wi, uc),
            Bsdf::Microfacet(b) => b.sample(frame, wi, u),
            Bsdf::FresnelBlend(b) => b.sample(frame, wi, u, uc),
            Bsdf::Mix(b) => b.sample(frame, wi, u, uc),
        }
    }

    pub fn eval(&self, hit: &Hit, wi: Vec3, wo: Vec3) -> Rgb {
        let frame = ShadingFrame::new(hit, wi);
        self.eval_local(&frame, wi, wo)
    }

    fn eval_local(&self, frame: &ShadingFrame, wi: Vec3, wo: Vec3) -> Rgb {
        match self {
            Bsdf::Lambert(b) => b.eval(frame, wo),
            Bsdf::SpecularReflect(_) | Bsdf::SpecularRefract(_) => crate::color::linear::BLACK,
            Bsdf::Microfacet(b) => b.eval(frame, wi, wo),
            Bsdf::FresnelBlend(b) => b.eval(frame, wi, wo),
            Bsdf::Mix(b) => b.eval(frame, wi, wo),
        }
    }

    pub fn pdf(&self, hit: &Hit, wi: Vec3, wo: Vec3) -> f32 {
        let frame = ShadingFrame::new(hit, wi);
        self.pdf_local(&frame, wi, wo)
    }

    fn pdf_local(&self, frame: &ShadingFrame, wi: Vec3, wo: Vec3) -> f32 {
        match self {
            Bsdf::Lambert(b) => b.pdf(frame, wo),
            Bsdf::SpecularReflect(_) | Bsdf::SpecularRefract(_) => 0.0,
            Bsdf::Microfacet(b) => b.pdf(frame, wi, wo),
            Bsdf::FresnelBlend(b) => b.pdf(frame, wi, wo),
            Bsdf::Mix(b) => b.pdf(frame, wi, wo),
        }
    }

    /// True when every lobe is a delta distribution and light sampling can
    /// never match the model.
    pub fn is_singular(&self) -> bool {
        match self {
            Bsdf::SpecularReflect(_) | Bsdf::SpecularRefract(_) => true,
            Bsdf::Mix(b) => b.a.is_singular() && b.b.is_singular(),
            _ => false,
        }
    }
}

/// Blend of two models: `f = w f_a + (1 - w) f_b`, sampled by picking a
/// component with probability equal to its weight; the returned density is
/// the weighted sum of both strategies.
#[derive(Debug, Clone)]
pub struct MixBsdf {
    pub a: Box<Bsdf>,
    pub b: Box<Bsdf>,
    /// Weight of `a`, in `[0, 1]`.
    pub weight: f32,
}

impl MixBsdf {
    pub fn sample(
        &self,
        frame: &ShadingFrame,
        wi: Vec3,
        u: Vec2,
        uc: f32,
    ) -> Option<BsdfSample> {
        let w = self.weight.clamp(0.0, 1.0);
        // Remap the selection variate to keep it uniform in the branch.
        let (chosen, p, uc) = if uc < w {
            (&self.a, w, uc / w.max(1e-6))
        } else {
            (&self.b, 1.0 - w, (uc - w) / (1.0 - w).max(1e-6))
        };

        let s = chosen.sample_local(frame, wi, u, uc)?;
        if s.singular {
            // Delta components keep their branch value, weighted by the
            // selection probability on both sides of the estimator.
            return Some(BsdfSample {
                pdf: s.pdf * p,
                f: s.f * p,
                ..s
            });
        }

        Some(BsdfSample {
            f: self.eval(frame, wi, s.wo),
            pdf: self.pdf(frame, wi, s.wo),
            ..s
        })
    }

    pub fn eval(&self, frame: &ShadingFrame, wi: Vec3, wo: Vec3) -> Rgb {
        let w = self.weight.clamp(0.0, 1.0);
        w * self.a.eval_local(frame, wi, wo) + (1.0 - w) * self.b.eval_local(frame, wi, wo)
    }

    pub fn pdf(&self, frame: &ShadingFrame, wi: Vec3, wo: Vec3) -> f32 {
        let w = self.weight.clamp(0.0, 1.0);
        w * self.a.pdf_local(frame, wi, wo) + (1.0 - w) * self.b.pdf_local(frame, wi, wo)
    }
}

/// Lambert + perfect mirror, the lobe picked with probability equal to the
/// Fresnel reflectance. Evaluation is the deterministic weighted sum of the
/// lobes, so repeated calls with the same arguments agree.
#[derive(Debug, Clone)]
pub struct FresnelBlend {
    pub diffuse: Rgb,
    pub specular: Rgb,
    pub eta: f32,
}

impl FresnelBlend {
    fn fresnel(&self, frame: &ShadingFrame, wi: Vec3) -> f32 {
        fresnel_dielectric(frame.cos_theta(wi), self.eta)
    }

    pub fn sample(
        &self,
        frame: &ShadingFrame,
        wi: Vec3,
        u: Vec2,
        uc: f32,
    ) -> Option<BsdfSample> {
        let fr = self.fresnel(frame, wi);
        if uc < fr {
            let mirror = SpecularReflect {
                reflectance: self.specular,
            };
            let s = mirror.sample(frame, wi)?;
            Some(BsdfSample {
                f: fr * s.f,
                pdf: fr,
                ..s
            })
        } else {
            let lambert = Lambert {
                albedo: self.diffuse,
            };
            let s = lambert.sample(frame, wi, u)?;
            Some(BsdfSample {
                f: (1.0 - fr) * s.f,
                pdf: (1.0 - fr) * s.pdf,
                singular: false,
                ..s
            })
        }
    }

    pub fn eval(&self, frame: &ShadingFrame, wi: Vec3, wo: Vec3) -> Rgb {
        // The mirror lobe never evaluates; only the diffuse term remains.
        let fr = self.fresnel(frame, wi);
        (1.0 - fr)
            * Lambert {
                albedo: self.diffuse,
            }
            .eval(frame, wo)
    }

    pub fn pdf(&self, frame: &ShadingFrame, wi: Vec3, wo: Vec3) -> f32 {
        let fr = self.fresnel(frame, wi);
        (1.0 - fr)
            * Lambert {
                albedo: self.diffuse,
            }
            .pdf(frame, wo)
    }
}
