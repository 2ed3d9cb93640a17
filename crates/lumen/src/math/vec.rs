pub use glam::Vec3;

use crate::color::Rgb;

pub trait RgbAsVec3Ext {
    fn vec(&self) -> Vec3;
}

impl RgbAsVec3Ext for Rgb {
    fn vec(&self) -> Vec3 {
        Vec3::from_array(self.0)
    }
}

pub trait Vec3AsRgbExt {
    fn rgb(&self) -> Rgb;
}

impl Vec3AsRgbExt for Vec3 {
    fn rgb(&self) -> Rgb {
        Rgb::from_array(self.to_array())
    }
}

pub trait Vec3SameDirExt {
    fn same_direction(self, other: Self) -> Self;
}

impl Vec3SameDirExt for Vec3 {
    /// Returns self flipped so that it points in the same general direction
    /// as `other` (`dot > 0`).
    fn same_direction(self, other: Self) -> Self {
        if self.dot(other) > 0.0 {
            self
        } else {
            -self
        }
    }
}

/// Two unit vectors orthogonal to `n` forming a right-handed frame `(t, b, n)`.
pub fn orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
    let up = if n.z.abs() < 0.999 { Vec3::Z } else { Vec3::X };
    let t = n.cross(up).normalize();
    let b = n.cross(t);
    (t, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basis_is_orthonormal() {
        for n in [
            Vec3::Y,
            Vec3::Z,
            Vec3::new(1.0, 2.0, -0.5).normalize(),
            Vec3::new(0.0, 0.0, -1.0),
        ] {
            let (t, b) = orthonormal_basis(n);
            assert!(t.dot(n).abs() < 1e-5);
            assert!(b.dot(n).abs() < 1e-5);
            assert!(t.dot(b).abs() < 1e-5);
            assert!((t.length() - 1.0).abs() < 1e-5);
            assert!((b.length() - 1.0).abs() < 1e-5);
        }
    }
}
