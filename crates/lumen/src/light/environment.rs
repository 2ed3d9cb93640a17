use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use crate::{
    color::Rgb,
    math::distributions::{
        cartesian_to_spherical, cosine_hemisphere_pdf, spherical_to_cartesian,
        square_to_cosine_hemisphere, Distribution2d,
    },
    math::vec::orthonormal_basis,
    shape::Hit,
};

use super::LightSample;

/// Lat-long radiance map, y-up: `u` runs along azimuth, `v` from the +y pole
/// to the -y pole.
#[derive(Debug, Clone)]
pub struct EnvMap {
    width: usize,
    height: usize,
    texels: Vec<Rgb>,
}

impl EnvMap {
    pub fn new(width: usize, height: usize, texels: Vec<Rgb>) -> Self {
        assert_eq!(texels.len(), width * height);
        Self {
            width,
            height,
            texels,
        }
    }

    pub fn constant(color: Rgb) -> Self {
        Self::new(1, 1, vec![color])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn lookup_uv(&self, uv: Vec2) -> Rgb {
        let x = ((uv.x.rem_euclid(1.0) * self.width as f32) as usize).min(self.width - 1);
        let y = ((uv.y.clamp(0.0, 1.0) * self.height as f32) as usize).min(self.height - 1);
        self.texels[y * self.width + x]
    }

    pub fn lookup_dir(&self, d: Vec3) -> Rgb {
        let (phi, theta) = cartesian_to_spherical(d.normalize_or_zero());
        self.lookup_uv(Vec2::new(phi / (2.0 * PI), theta / PI))
    }

    /// Scalar importance image for sampling: texel luminance weighted by the
    /// sine of the row's polar angle, which removes the pole stretching of
    /// the lat-long layout.
    fn importance(&self) -> Vec<f32> {
        let mut img = Vec::with_capacity(self.texels.len());
        for y in 0..self.height {
            let theta = (y as f32 + 0.5) / self.height as f32 * PI;
            let sin_theta = theta.sin();
            for x in 0..self.width {
                img.push(self.texels[y * self.width + x].luminance() * sin_theta);
            }
        }
        img
    }
}

/// Sky dome sampled with a cosine-weighted hemisphere around the shading
/// normal; cheap and effective for smooth maps.
pub struct EnvironmentLight {
    pub map: EnvMap,
    pub scale: f32,
}

impl EnvironmentLight {
    pub fn new(map: EnvMap, scale: f32) -> Self {
        Self { map, scale }
    }

    pub fn constant(color: Rgb) -> Self {
        Self::new(EnvMap::constant(color), 1.0)
    }

    pub fn sample(&self, hit: &Hit, u: Vec2) -> Option<LightSample> {
        let (s, t) = orthonormal_basis(hit.n);
        let local = square_to_cosine_hemisphere(u);
        let wi = local.x * s + local.y * t + local.z * hit.n;

        let pdf = cosine_hemisphere_pdf(local.z);
        if pdf <= 0.0 {
            return None;
        }

        Some(LightSample {
            wi,
            distance: f32::INFINITY,
            li: self.scale * self.map.lookup_dir(wi),
            pdf,
            delta: false,
        })
    }

    pub fn pdf(&self, hit: &Hit, w: Vec3) -> f32 {
        cosine_hemisphere_pdf(hit.n.dot(w))
    }

    pub fn le(&self, d: Vec3) -> Rgb {
        self.scale * self.map.lookup_dir(d)
    }
}

/// Sky dome importance-sampled from a luminance CDF over the lat-long map.
///
/// The solid-angle density of a map sample is the image-space density times
/// the Jacobian `1 / (2 pi^2 sin theta)`.
pub struct IsEnvironmentLight {
    pub map: EnvMap,
    pub scale: f32,
    distribution: Distribution2d,
}

impl IsEnvironmentLight {
    pub fn new(map: EnvMap, scale: f32) -> Self {
        let importance = map.importance();
        let distribution = Distribution2d::new(&importance, map.width(), map.height());
        Self {
            map,
            scale,
            distribution,
        }
    }

    pub fn sample(&self, u: Vec2) -> Option<LightSample> {
        let s = self.distribution.sample(u);
        if s.pdf <= 0.0 {
            return None;
        }

        let phi = s.uv.x * 2.0 * PI;
        let theta = s.uv.y * PI;
        let sin_theta = theta.sin();
        if sin_theta <= 1e-6 {
            return None;
        }

        Some(LightSample {
            wi: spherical_to_cartesian(phi, theta),
            distance: f32::INFINITY,
            li: self.scale * self.map.lookup_uv(s.uv),
            pdf: s.pdf / (2.0 * PI * PI * sin_theta),
            delta: false,
        })
    }

    pub fn pdf(&self, w: Vec3) -> f32 {
        let (phi, theta) = cartesian_to_spherical(w.normalize_or_zero());
        let sin_theta = theta.sin();
        if sin_theta <= 1e-6 {
            return 0.0;
        }
        let uv = Vec2::new(phi / (2.0 * PI), theta / PI);
        self.distribution.pdf(uv) / (2.0 * PI * PI * sin_theta)
    }

    pub fn le(&self, d: Vec3) -> Rgb {
        self.scale * self.map.lookup_dir(d)
    }
}
