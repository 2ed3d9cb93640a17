use bytemuck::{Pod, Zeroable};

/// Linear RGB radiance value.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Zeroable, Pod)]
pub struct Rgb(pub [f32; 3]);

impl Rgb {
    pub const fn from_array(arr: [f32; 3]) -> Self {
        Self(arr)
    }

    pub const fn to_array(self) -> [f32; 3] {
        self.0
    }

    pub const fn splat(v: f32) -> Self {
        Self([v, v, v])
    }

    pub fn luminance(self) -> f32 {
        0.2126 * self.0[0] + 0.7152 * self.0[1] + 0.0722 * self.0[2]
    }

    pub fn max_component(self) -> f32 {
        self.0[0].max(self.0[1]).max(self.0[2])
    }

    pub fn is_black(self) -> bool {
        self.0 == [0.0; 3]
    }

    pub fn is_finite(self) -> bool {
        self.0.iter().all(|c| c.is_finite())
    }

    /// Gamma 1/2.2 encoding of a `[0, 1]`-clamped value.
    pub fn to_srgb(self) -> Rgb {
        Rgb(self.0.map(|c| c.clamp(0.0, 1.0).powf(1.0 / 2.2)))
    }

    pub fn to_byte_array(self) -> [u8; 3] {
        self.0.map(|c| (c.clamp(0.0, 1.0) * 255. + 0.5) as u8)
    }
}

impl std::ops::Add for Rgb {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self([
            self.0[0] + rhs.0[0],
            self.0[1] + rhs.0[1],
            self.0[2] + rhs.0[2],
        ])
    }
}

impl std::ops::AddAssign for Rgb {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::Mul for Rgb {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self([
            self.0[0] * rhs.0[0],
            self.0[1] * rhs.0[1],
            self.0[2] * rhs.0[2],
        ])
    }
}

impl std::ops::MulAssign for Rgb {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl std::ops::Mul<Rgb> for f32 {
    type Output = Rgb;

    fn mul(self, rhs: Rgb) -> Rgb {
        Rgb([self * rhs.0[0], self * rhs.0[1], self * rhs.0[2]])
    }
}

impl std::ops::Mul<f32> for Rgb {
    type Output = Rgb;

    fn mul(self, rhs: f32) -> Rgb {
        rhs * self
    }
}

impl std::ops::Div<f32> for Rgb {
    type Output = Rgb;

    fn div(self, rhs: f32) -> Rgb {
        Rgb([self.0[0] / rhs, self.0[1] / rhs, self.0[2] / rhs])
    }
}

impl From<[f32; 3]> for Rgb {
    fn from(val: [f32; 3]) -> Self {
        Rgb(val)
    }
}

impl From<Rgb> for image::Rgb<f32> {
    fn from(val: Rgb) -> Self {
        image::Rgb(val.to_array())
    }
}

/// Scalar channel value (depth, occlusion fractions, weights).
#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable, Pod)]
pub struct Luma(pub f32);

impl From<Luma> for image::Luma<f32> {
    fn from(val: Luma) -> Self {
        image::Luma([val.0])
    }
}

pub mod linear {
    use super::Rgb;

    pub const WHITE: Rgb = Rgb::from_array([1.0, 1.0, 1.0]);
    pub const BLACK: Rgb = Rgb::from_array([0.0, 0.0, 0.0]);
    pub const MAGENTA: Rgb = Rgb::from_array([1.0, 0.0, 1.0]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_is_detected() {
        assert!(Rgb::splat(0.5).is_finite());
        assert!(!Rgb([f32::NAN, 0.0, 0.0]).is_finite());
        assert!(!Rgb([0.0, f32::INFINITY, 0.0]).is_finite());
    }

    #[test]
    fn srgb_encode_is_monotone() {
        let lo = Rgb::splat(0.2).to_srgb();
        let hi = Rgb::splat(0.8).to_srgb();
        assert!(lo.0[0] < hi.0[0]);
        assert_eq!(Rgb::splat(0.0).to_srgb(), Rgb::splat(0.0));
        assert!((Rgb::splat(1.0).to_srgb().0[0] - 1.0).abs() < 1e-6);
    }
}
