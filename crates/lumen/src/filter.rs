use crate::math::{lerp, Vec2};

pub struct FilterSample {
    /// Offset from the pixel center, in pixels.
    pub offset: Vec2,
    pub weight: f32,
}

/// Reconstruction filter: maps a canonical `[0, 1)^2` sample to an offset
/// around the pixel center plus the weight the sample contributes with.
pub trait Filter: Send + Sync {
    fn sample(&self, u: Vec2) -> FilterSample;
}

/// Uniform box of the given half width.
pub struct BoxFilter {
    pub radius: Vec2,
}

impl Default for BoxFilter {
    fn default() -> Self {
        Self {
            radius: Vec2::splat(0.5),
        }
    }
}

impl Filter for BoxFilter {
    fn sample(&self, u: Vec2) -> FilterSample {
        FilterSample {
            offset: Vec2 {
                x: lerp(u.x, -self.radius.x, self.radius.x),
                y: lerp(u.y, -self.radius.y, self.radius.y),
            },
            weight: 1.0,
        }
    }
}

/// Tent filter, sampled by inverting the tent CDF so all weights stay 1.
pub struct TriangleFilter {
    pub radius: Vec2,
}

impl Filter for TriangleFilter {
    fn sample(&self, u: Vec2) -> FilterSample {
        fn sample_tent(c: f32) -> f32 {
            if c <= 0.5 {
                f32::sqrt(2.0 * c) - 1.0
            } else {
                1.0 - f32::sqrt(2.0 - 2.0 * c)
            }
        }
        FilterSample {
            offset: Vec2 {
                x: self.radius.x * sample_tent(u.x),
                y: self.radius.y * sample_tent(u.y),
            },
            weight: 1.0,
        }
    }
}
