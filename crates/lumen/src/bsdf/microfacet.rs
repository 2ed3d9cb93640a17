use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use crate::{
    color::{linear::BLACK, Rgb},
    math::{safe_sqrt, sqr},
};

use super::{fresnel_dielectric, BsdfSample, ShadingFrame};

/// Normal distribution of the microfacet surface.
#[derive(Debug, Clone, Copy)]
pub enum MicrofacetDistribution {
    /// `D(wh) = (e + 2) / (2 pi) * cos^e theta_h`
    Blinn { exponent: f32 },
    Ggx { alpha: f32 },
}

impl MicrofacetDistribution {
    pub fn d(&self, cos_theta_h: f32) -> f32 {
        let c = cos_theta_h.abs();
        match self {
            MicrofacetDistribution::Blinn { exponent } => {
                (exponent + 2.0) / (2.0 * PI) * c.powf(*exponent)
            }
            MicrofacetDistribution::Ggx { alpha } => {
                let a2 = sqr(*alpha);
                a2 / (PI * sqr(sqr(c) * (a2 - 1.0) + 1.0))
            }
        }
    }

    /// Half vector in the local z-up frame.
    fn sample_wh(&self, u: Vec2) -> Vec3 {
        let cos_theta = match self {
            MicrofacetDistribution::Blinn { exponent } => u.x.powf(1.0 / (exponent + 1.0)),
            MicrofacetDistribution::Ggx { alpha } => {
                safe_sqrt((1.0 - u.x) / (u.x * (sqr(*alpha) - 1.0) + 1.0))
            }
        };
        let sin_theta = safe_sqrt(1.0 - sqr(cos_theta));
        let (sin_phi, cos_phi) = f32::sin_cos(2.0 * PI * u.y);
        Vec3::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta)
    }
}

/// Torrance-Sparrow reflection:
/// `f = D(wh) G(wi, wo) F(wi.wh) / (4 cos_theta_i cos_theta_o)`.
#[derive(Debug, Clone)]
pub struct Microfacet {
    pub reflectance: Rgb,
    pub eta: f32,
    pub distribution: MicrofacetDistribution,
}

impl Microfacet {
    pub fn sample(&self, frame: &ShadingFrame, wi: Vec3, u: Vec2) -> Option<BsdfSample> {
        let wh_local = self.distribution.sample_wh(u);
        let wh = frame.to_world(wh_local);

        // Reflect wi around the sampled facet normal.
        let wo = -wi + 2.0 * wi.dot(wh) * wh;
        if frame.cos_theta(wo) <= 0.0 {
            return None;
        }

        let pdf = self.pdf(frame, wi, wo);
        if pdf <= 0.0 {
            return None;
        }

        Some(BsdfSample {
            wo,
            f: self.eval(frame, wi, wo),
            pdf,
            singular: false,
        })
    }

    pub fn eval(&self, frame: &ShadingFrame, wi: Vec3, wo: Vec3) -> Rgb {
        let cos_theta_i = frame.cos_theta(wi);
        let cos_theta_o = frame.cos_theta(wo);
        if cos_theta_i <= 0.0 || cos_theta_o <= 0.0 {
            return BLACK;
        }

        let wh = (wi + wo).normalize_or_zero();
        if wh == Vec3::ZERO {
            return BLACK;
        }

        let fr = fresnel_dielectric(wi.dot(wh), self.eta);
        let d = self.distribution.d(frame.cos_theta(wh));
        let g = geometric_term(frame, wi, wo, wh);

        self.reflectance * (d * g * fr / (4.0 * cos_theta_i * cos_theta_o))
    }

    /// Density of `wo`, converted from the half-vector density:
    /// `pdf(wo) = D(wh) |n.wh| / (4 |wo.wh|)`.
    pub fn pdf(&self, frame: &ShadingFrame, wi: Vec3, wo: Vec3) -> f32 {
        if frame.cos_theta(wo) <= 0.0 {
            return 0.0;
        }
        let wh = (wi + wo).normalize_or_zero();
        if wh == Vec3::ZERO {
            return 0.0;
        }
        let denom = 4.0 * wo.dot(wh).abs();
        if denom <= 1e-8 {
            return 0.0;
        }
        self.distribution.d(frame.cos_theta(wh)) * frame.cos_theta(wh).abs() / denom
    }
}

/// Shadowing-masking term of the V-cavity model.
fn geometric_term(frame: &ShadingFrame, wi: Vec3, wo: Vec3, wh: Vec3) -> f32 {
    let ndotwh = frame.cos_theta(wh).abs();
    let ndotwo = frame.cos_theta(wo).abs();
    let ndotwi = frame.cos_theta(wi).abs();
    let wodotwh = wo.dot(wh).abs().max(1e-8);

    1.0f32
        .min(2.0 * ndotwh * ndotwo / wodotwh)
        .min(2.0 * ndotwh * ndotwi / wodotwh)
}

#[cfg(test)]
mod tests {
    use rand::{Rng as _, SeedableRng};

    use super::*;

    fn frame() -> ShadingFrame {
        ShadingFrame {
            n: Vec3::Z,
            s: Vec3::X,
            t: Vec3::Y,
            entering: true,
        }
    }

    #[test]
    fn distributions_normalize_over_the_hemisphere() {
        // Integrate D(wh) cos over the hemisphere; should come out near 1.
        for dist in [
            MicrofacetDistribution::Blinn { exponent: 20.0 },
            MicrofacetDistribution::Ggx { alpha: 0.3 },
        ] {
            let steps = 256;
            let mut integral = 0.0f64;
            for i in 0..steps {
                let theta = (i as f32 + 0.5) / steps as f32 * PI / 2.0;
                let d = dist.d(theta.cos());
                integral +=
                    (d * theta.cos() * theta.sin()) as f64 * (PI / 2.0 / steps as f32) as f64;
            }
            integral *= 2.0 * PI as f64;
            assert!(
                (integral - 1.0).abs() < 0.02,
                "D integrates to {integral} for {dist:?}"
            );
        }
    }

    #[test]
    fn sampled_directions_match_reported_pdf_shape() {
        let bsdf = Microfacet {
            reflectance: Rgb::splat(1.0),
            eta: 1.5,
            distribution: MicrofacetDistribution::Ggx { alpha: 0.25 },
        };
        let frame = frame();
        let wi = Vec3::new(0.4, 0.0, 0.9).normalize();
        let mut rng = crate::Rng::seed_from_u64(17);

        let mut accepted = 0;
        for _ in 0..512 {
            let u = Vec2::new(rng.gen(), rng.gen());
            if let Some(s) = bsdf.sample(&frame, wi, u) {
                accepted += 1;
                assert!(frame.cos_theta(s.wo) > 0.0);
                assert!(s.pdf > 0.0);
                // pdf() evaluated at the sampled direction agrees with the
                // pdf returned alongside the sample.
                assert!((bsdf.pdf(&frame, wi, s.wo) - s.pdf).abs() / s.pdf < 1e-3);
            }
        }
        assert!(accepted > 300, "only {accepted}/512 samples accepted");
    }

    #[test]
    fn rough_lobe_concentrates_around_mirror_direction() {
        let bsdf = Microfacet {
            reflectance: Rgb::splat(1.0),
            eta: 1.5,
            distribution: MicrofacetDistribution::Blinn { exponent: 200.0 },
        };
        let frame = frame();
        let wi = Vec3::new(0.3, 0.0, 0.95).normalize();
        let mirror = -wi + 2.0 * wi.dot(frame.n) * frame.n;

        let mut rng = crate::Rng::seed_from_u64(4);
        let mut mean_cos = 0.0;
        let mut n = 0;
        for _ in 0..256 {
            let u = Vec2::new(rng.gen(), rng.gen());
            if let Some(s) = bsdf.sample(&frame, wi, u) {
                mean_cos += s.wo.dot(mirror);
                n += 1;
            }
        }
        mean_cos /= n as f32;
        assert!(mean_cos > 0.95, "lobe too wide: mean cos {mean_cos}");
    }
}
