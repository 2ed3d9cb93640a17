use std::f32::consts::FRAC_1_PI;

use glam::{Vec2, Vec3};

use crate::{
    color::{linear::BLACK, Rgb},
    math::distributions::{cosine_hemisphere_pdf, square_to_cosine_hemisphere},
};

use super::{BsdfSample, ShadingFrame};

/// Ideal diffuse reflection, `f = albedo / pi`.
#[derive(Debug, Clone)]
pub struct Lambert {
    pub albedo: Rgb,
}

impl Lambert {
    pub fn sample(&self, frame: &ShadingFrame, _wi: Vec3, u: Vec2) -> Option<BsdfSample> {
        let local = square_to_cosine_hemisphere(u);
        let pdf = cosine_hemisphere_pdf(local.z);
        if pdf <= 0.0 {
            return None;
        }

        Some(BsdfSample {
            wo: frame.to_world(local),
            f: self.albedo * FRAC_1_PI,
            pdf,
            singular: false,
        })
    }

    pub fn eval(&self, frame: &ShadingFrame, wo: Vec3) -> Rgb {
        if frame.cos_theta(wo) > 0.0 {
            self.albedo * FRAC_1_PI
        } else {
            BLACK
        }
    }

    pub fn pdf(&self, frame: &ShadingFrame, wo: Vec3) -> f32 {
        cosine_hemisphere_pdf(frame.cos_theta(wo))
    }
}
