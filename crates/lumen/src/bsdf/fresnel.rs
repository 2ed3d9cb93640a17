use crate::math::{safe_sqrt, sqr};

/// Unpolarized Fresnel reflectance of a dielectric interface.
///
/// `eta` is the relative index of refraction of the far side over the near
/// side for `cos_theta_i >= 0`; a negative cosine means the ray arrives from
/// inside and the ratio is inverted. Returns 1 on total internal reflection.
pub fn fresnel_dielectric(mut cos_theta_i: f32, mut eta: f32) -> f32 {
    cos_theta_i = cos_theta_i.clamp(-1.0, 1.0);
    if cos_theta_i < 0.0 {
        eta = 1.0 / eta;
        cos_theta_i = -cos_theta_i;
    }

    let sin2_theta_i = 1.0 - sqr(cos_theta_i);
    let sin2_theta_t = sin2_theta_i / sqr(eta);
    if sin2_theta_t >= 1.0 {
        return 1.0;
    }
    let cos_theta_t = safe_sqrt(1.0 - sin2_theta_t);

    let r_parl = (eta * cos_theta_i - cos_theta_t) / (eta * cos_theta_i + cos_theta_t);
    let r_perp = (cos_theta_i - eta * cos_theta_t) / (cos_theta_i + eta * cos_theta_t);
    (sqr(r_parl) + sqr(r_perp)) / 2.0
}
