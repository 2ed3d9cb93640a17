use glam::Vec3;

use crate::{
    color::Rgb,
    math::{safe_sqrt, sqr},
};

use super::{fresnel_dielectric, BsdfSample, ShadingFrame};

/// Mirror reflection about the shading normal.
fn mirror(wi: Vec3, n: Vec3) -> Vec3 {
    -wi + 2.0 * wi.dot(n) * n
}

/// Perfect mirror. The delta lobe is represented by `f = r / cos_theta_o`
/// with `pdf = 1`, so `f * cos / pdf` collapses to the reflectance.
#[derive(Debug, Clone)]
pub struct SpecularReflect {
    pub reflectance: Rgb,
}

impl SpecularReflect {
    pub fn sample(&self, frame: &ShadingFrame, wi: Vec3) -> Option<BsdfSample> {
        let cos_theta = frame.cos_theta(wi);
        if cos_theta <= 1e-6 {
            return None;
        }

        Some(BsdfSample {
            wo: mirror(wi, frame.n),
            f: self.reflectance * (1.0 / cos_theta),
            pdf: 1.0,
            singular: true,
        })
    }
}

/// Smooth dielectric: reflection with probability equal to the Fresnel term,
/// refraction by Snell's law otherwise. Total internal reflection drives the
/// Fresnel term to 1 so the refraction branch is never drawn for it.
#[derive(Debug, Clone)]
pub struct SpecularRefract {
    pub reflectance: Rgb,
    pub transmittance: Rgb,
    /// Index of refraction of the interior over the exterior.
    pub eta: f32,
}

impl SpecularRefract {
    pub fn sample(&self, frame: &ShadingFrame, wi: Vec3, uc: f32) -> Option<BsdfSample> {
        let cos_i = frame.cos_theta(wi);
        if cos_i <= 1e-6 {
            return None;
        }

        // Relative IOR of the far side over the side the ray arrives from.
        let eta_rel = if frame.entering { self.eta } else { 1.0 / self.eta };
        let fr = fresnel_dielectric(cos_i, eta_rel);

        if uc < fr {
            Some(BsdfSample {
                wo: mirror(wi, frame.n),
                f: fr * self.reflectance * (1.0 / cos_i),
                pdf: fr,
                singular: true,
            })
        } else {
            let sin2_t = (1.0 - sqr(cos_i)) / sqr(eta_rel);
            debug_assert!(sin2_t < 1.0, "TIR must be absorbed by the Fresnel term");
            let cos_t = safe_sqrt(1.0 - sin2_t);
            let wo = -wi / eta_rel + (cos_i / eta_rel - cos_t) * frame.n;

            Some(BsdfSample {
                wo: wo.normalize(),
                f: (1.0 - fr) * self.transmittance * (1.0 / cos_t.max(1e-6)),
                pdf: 1.0 - fr,
                singular: true,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsdf::ShadingFrame;

    fn frame() -> ShadingFrame {
        ShadingFrame {
            n: Vec3::Y,
            s: Vec3::X,
            t: Vec3::Z,
            entering: true,
        }
    }

    #[test]
    fn mirror_reflects_about_normal() {
        let bsdf = SpecularReflect {
            reflectance: Rgb::splat(0.8),
        };
        let wi = Vec3::new(1.0, 1.0, 0.0).normalize();
        let s = bsdf.sample(&frame(), wi).unwrap();
        let expected = Vec3::new(-1.0, 1.0, 0.0).normalize();
        assert!((s.wo - expected).length() < 1e-5);
        assert!(s.singular);

        // f * cos / pdf == reflectance
        let carried = s.f * frame().cos_theta(s.wo) * (1.0 / s.pdf);
        assert!((carried.0[0] - 0.8).abs() < 1e-5);
    }

    #[test]
    fn grazing_mirror_sample_is_rejected() {
        let bsdf = SpecularReflect {
            reflectance: Rgb::splat(1.0),
        };
        let wi = Vec3::new(1.0, 1e-8, 0.0).normalize();
        assert!(bsdf.sample(&frame(), wi).is_none());
    }

    #[test]
    fn refraction_obeys_snell() {
        let bsdf = SpecularRefract {
            reflectance: Rgb::splat(1.0),
            transmittance: Rgb::splat(1.0),
            eta: 1.5,
        };
        let wi = Vec3::new(0.5, 0.8, 0.0).normalize();
        // uc = 1.0 never selects the reflection branch.
        let s = bsdf.sample(&frame(), wi, 0.999).unwrap();
        assert!(s.wo.y < 0.0, "refracted ray continues into the medium");

        let sin_i = wi.x.abs();
        let sin_t = s.wo.x.abs();
        assert!((sin_i - 1.5 * sin_t).abs() < 1e-4, "sin_i = eta sin_t");
    }

    #[test]
    fn tir_from_inside_always_reflects() {
        let bsdf = SpecularRefract {
            reflectance: Rgb::splat(1.0),
            transmittance: Rgb::splat(1.0),
            eta: 1.5,
        };
        // Leaving the dense medium at a shallow angle: the frame saw the ray
        // from the back side.
        let hit_frame = ShadingFrame {
            n: Vec3::Y,
            s: Vec3::X,
            t: Vec3::Z,
            entering: false,
        };
        let wi = Vec3::new(0.9, 0.2, 0.0).normalize();
        for uc in [0.0, 0.5, 0.999] {
            let s = bsdf.sample(&hit_frame, wi, uc).unwrap();
            assert!(s.wo.y > 0.0, "total internal reflection stays inside");
        }
    }
}
