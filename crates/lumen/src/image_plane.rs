use image::{Rgb32FImage, RgbImage};

use crate::color::Rgb;

/// Accumulation target for radiance samples.
///
/// Each pixel stores `(r, g, b, weight)`; the final value is the weighted
/// mean. Workers render disjoint tiles, so accumulation needs no locking;
/// the collector thread owns the plane while the render runs.
pub struct ImagePlane {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
}

/// Normalized render output: linear HDR plus gamma-encoded LDR.
pub struct FinalImage {
    pub hdr: Rgb32FImage,
    pub ldr: RgbImage,
}

impl ImagePlane {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0.0; 4]; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Called once before samples are added.
    pub fn prepare(&mut self) {
        self.pixels.fill([0.0; 4]);
    }

    pub fn add_sample(&mut self, x: u32, y: u32, value: Rgb, weight: f32) {
        let p = &mut self.pixels[(y * self.width + x) as usize];
        p[0] += value.0[0];
        p[1] += value.0[1];
        p[2] += value.0[2];
        p[3] += weight;
    }

    /// Weighted mean of the samples accumulated in a pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        let p = self.pixels[(y * self.width + x) as usize];
        if p[3] > 0.0 {
            Rgb([p[0] / p[3], p[1] / p[3], p[2] / p[3]])
        } else {
            Rgb([0.0; 3])
        }
    }

    /// Raw accumulator, exposed so outputs can compare runs bit-exactly.
    pub fn raw(&self) -> &[[f32; 4]] {
        &self.pixels
    }

    /// Normalize and tone-map. The LDR image applies gamma 1/2.2.
    pub fn finalize(&self) -> FinalImage {
        let mut hdr = Rgb32FImage::new(self.width, self.height);
        let mut ldr = RgbImage::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let value = self.pixel(x, y);
                hdr.put_pixel(x, y, value.into());
                ldr.put_pixel(x, y, image::Rgb(value.to_srgb().to_byte_array()));
            }
        }
        FinalImage { hdr, ldr }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_mean_and_reset() {
        let mut plane = ImagePlane::new(2, 2);
        plane.prepare();
        plane.add_sample(1, 0, Rgb::splat(1.0), 1.0);
        plane.add_sample(1, 0, Rgb::splat(0.0), 1.0);
        assert_eq!(plane.pixel(1, 0), Rgb::splat(0.5));
        // Untouched pixels stay black instead of dividing by zero.
        assert_eq!(plane.pixel(0, 1), Rgb::splat(0.0));

        plane.prepare();
        assert_eq!(plane.pixel(1, 0), Rgb::splat(0.0));
    }

    #[test]
    fn finalize_encodes_gamma() {
        let mut plane = ImagePlane::new(1, 1);
        plane.prepare();
        plane.add_sample(0, 0, Rgb::splat(0.5), 1.0);
        let out = plane.finalize();
        assert_eq!(out.hdr.get_pixel(0, 0).0, [0.5; 3]);
        let expected = (0.5f32.powf(1.0 / 2.2) * 255.0 + 0.5) as u8;
        assert_eq!(out.ldr.get_pixel(0, 0).0, [expected; 3]);
    }
}
