use std::f32::consts::{FRAC_1_PI, PI, TAU};

use glam::{Vec2, Vec3};

use super::find_interval;

/// Uniform point on the unit disk, polar method.
pub fn square_to_disk(u: Vec2) -> Vec2 {
    let r = u.y.sqrt();
    let (s, c) = f32::sin_cos(TAU * u.x);
    Vec2::new(r * c, r * s)
}

/// Cosine-weighted direction on the local z-up hemisphere.
pub fn square_to_cosine_hemisphere(u: Vec2) -> Vec3 {
    let p = square_to_disk(u);
    let z = (1.0 - p.length_squared()).max(0.0).sqrt();
    Vec3::new(p.x, p.y, z)
}

pub fn cosine_hemisphere_pdf(cos_theta: f32) -> f32 {
    (cos_theta * FRAC_1_PI).max(0.0)
}

/// Uniform direction on the local z-up hemisphere.
pub fn square_to_uniform_hemisphere(u: Vec2) -> Vec3 {
    let z = u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let (s, c) = f32::sin_cos(TAU * u.y);
    Vec3::new(r * c, r * s, z)
}

pub fn uniform_hemisphere_pdf() -> f32 {
    1.0 / (2.0 * PI)
}

/// Uniform barycentrics over a triangle.
pub fn square_to_uniform_triangle(u: Vec2) -> (f32, f32) {
    let su = u.x.sqrt();
    (1.0 - su, u.y * su)
}

/// Spherical angles of a unit direction, y-up lat-long convention:
/// `phi` in `[0, 2pi)` around y, `theta` in `[0, pi]` from the +y pole.
pub fn cartesian_to_spherical(d: Vec3) -> (f32, f32) {
    let mut phi = f32::atan2(d.z, d.x);
    if phi < 0.0 {
        phi += TAU;
    }
    let theta = d.y.clamp(-1.0, 1.0).acos();
    (phi, theta)
}

pub fn spherical_to_cartesian(phi: f32, theta: f32) -> Vec3 {
    let (sp, cp) = f32::sin_cos(phi);
    let (st, ct) = f32::sin_cos(theta);
    Vec3::new(st * cp, ct, st * sp)
}

/// Power heuristic with beta = 2 for combining two sampling strategies.
pub fn power_heuristic(pdf_a: f32, pdf_b: f32) -> f32 {
    let a2 = pdf_a * pdf_a;
    let b2 = pdf_b * pdf_b;
    if a2 + b2 == 0.0 {
        0.0
    } else {
        a2 / (a2 + b2)
    }
}

/// Piecewise-constant distribution over `[0, 1]` built from tabulated,
/// non-negative function values.
pub struct Distribution1d {
    pub func: Vec<f32>,
    cdf: Vec<f32>,
    integral: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct Sample1d {
    pub value: f32,
    pub pdf: f32,
    pub offset: usize,
}

impl Distribution1d {
    pub fn new(mut func: Vec<f32>) -> Self {
        assert!(!func.is_empty());
        for f in &mut func {
            *f = f.abs();
        }

        let n = func.len();
        let mut cdf = vec![0.0; n + 1];
        for i in 1..=n {
            cdf[i] = cdf[i - 1] + func[i - 1] / n as f32;
        }

        let integral = cdf[n];
        if integral == 0.0 {
            for (i, c) in cdf.iter_mut().enumerate() {
                *c = i as f32 / n as f32;
            }
        } else {
            for c in &mut cdf {
                *c /= integral;
            }
        }

        Self { func, cdf, integral }
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn size(&self) -> usize {
        self.func.len()
    }

    pub fn sample(&self, u: f32) -> Sample1d {
        let offset = find_interval(self.cdf.len(), |i| self.cdf[i] <= u);
        let mut du = u - self.cdf[offset];
        let dc = self.cdf[offset + 1] - self.cdf[offset];
        if dc > 0.0 {
            du /= dc;
        }

        Sample1d {
            value: (offset as f32 + du) / self.size() as f32,
            pdf: self.pdf_at(offset),
            offset,
        }
    }

    /// Density of the continuous sample falling into cell `offset`.
    pub fn pdf_at(&self, offset: usize) -> f32 {
        if self.integral > 0.0 {
            self.func[offset] / self.integral
        } else {
            0.0
        }
    }
}

/// Product distribution over the unit square, one conditional row
/// distribution per `v` cell plus the marginal over `v`.
pub struct Distribution2d {
    conditional: Vec<Distribution1d>,
    marginal: Distribution1d,
    nu: usize,
    nv: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Sample2d {
    pub uv: Vec2,
    pub pdf: f32,
}

impl Distribution2d {
    /// `func` is `nv` rows of `nu` values, row-major.
    pub fn new(func: &[f32], nu: usize, nv: usize) -> Self {
        assert_eq!(func.len(), nu * nv);
        let conditional: Vec<Distribution1d> = func
            .chunks_exact(nu)
            .map(|row| Distribution1d::new(row.to_vec()))
            .collect();
        let marginal =
            Distribution1d::new(conditional.iter().map(|c| c.integral()).collect());

        Self {
            conditional,
            marginal,
            nu,
            nv,
        }
    }

    pub fn sample(&self, u: Vec2) -> Sample2d {
        let sv = self.marginal.sample(u.y);
        let su = self.conditional[sv.offset].sample(u.x);
        Sample2d {
            uv: Vec2::new(su.value, sv.value),
            pdf: su.pdf * sv.pdf,
        }
    }

    pub fn pdf(&self, uv: Vec2) -> f32 {
        let iu = ((uv.x * self.nu as f32) as usize).min(self.nu - 1);
        let iv = ((uv.y * self.nv as f32) as usize).min(self.nv - 1);
        self.marginal.pdf_at(iv) * self.conditional[iv].pdf_at(iu)
    }
}
