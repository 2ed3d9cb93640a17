//! Per-pixel 2D sample streams.
//!
//! Every sampler is reseeded at each pixel boundary from the render seed,
//! the pixel coordinates and its own stream id, so a pixel's sequence never
//! depends on which worker rendered it and resets reproduce the identical
//! sequence.

use glam::Vec2;
use rand::{seq::SliceRandom, Rng as _};

use crate::Seed;

/// Largest f32 below 1; keeps quantized samples inside `[0, 1)`.
pub const ONE_MINUS_EPSILON: f32 = 1.0 - f32::EPSILON / 2.0;

pub trait Sampler: Send + Sync {
    /// Next 2D sample in `[0, 1)^2`.
    fn sample_2d(&mut self) -> Vec2;

    /// Number of samples per pixel this sampler is configured for.
    fn num_samples(&self) -> u32;

    /// Reset the stream for a new pixel.
    fn start_pixel(&mut self, seed: Seed);

    fn clone_box(&self) -> Box<dyn Sampler>;
}

fn unit(v: f32) -> f32 {
    v.min(ONE_MINUS_EPSILON)
}

/// Independent uniform samples.
#[derive(Clone)]
pub struct RandomSampler {
    count: u32,
    stream: u32,
    rng: crate::Rng,
}

impl RandomSampler {
    pub fn new(count: u32, stream: u32) -> Self {
        Self {
            count,
            stream,
            rng: Seed::default().into_rng(stream),
        }
    }
}

impl Sampler for RandomSampler {
    fn sample_2d(&mut self) -> Vec2 {
        Vec2::new(unit(self.rng.gen()), unit(self.rng.gen()))
    }

    fn num_samples(&self) -> u32 {
        self.count
    }

    fn start_pixel(&mut self, seed: Seed) {
        self.rng = seed.into_rng(self.stream);
    }

    fn clone_box(&self) -> Box<dyn Sampler> {
        Box::new(self.clone())
    }
}

/// One jittered sample per cell of a `g x g` grid, cells visited in a random
/// permutation drawn per pixel.
#[derive(Clone)]
pub struct StratifiedSampler {
    grid: u32,
    stream: u32,
    rng: crate::Rng,
    permutation: Vec<u32>,
    index: u32,
}

impl StratifiedSampler {
    pub fn new(grid: u32, stream: u32) -> Self {
        assert!(grid > 0);
        Self {
            grid,
            stream,
            rng: Seed::default().into_rng(stream),
            permutation: (0..grid * grid).collect(),
            index: 0,
        }
    }
}

impl Sampler for StratifiedSampler {
    fn sample_2d(&mut self) -> Vec2 {
        let g = self.grid;
        let cell = self.permutation[(self.index % (g * g)) as usize];
        self.index += 1;

        let cx = (cell % g) as f32;
        let cy = (cell / g) as f32;
        Vec2::new(
            unit((cx + self.rng.gen::<f32>()) / g as f32),
            unit((cy + self.rng.gen::<f32>()) / g as f32),
        )
    }

    fn num_samples(&self) -> u32 {
        self.grid * self.grid
    }

    fn start_pixel(&mut self, seed: Seed) {
        self.rng = seed.into_rng(self.stream);
        self.index = 0;
        self.permutation.shuffle(&mut self.rng);
    }

    fn clone_box(&self) -> Box<dyn Sampler> {
        Box::new(self.clone())
    }
}

/// Correlated multi-jittered sampling (Kensler). `g x g` samples that are
/// stratified on the grid and in both 1D projections.
#[derive(Clone)]
pub struct CmjSampler {
    grid: u32,
    stream: u32,
    pattern: u32,
    index: u32,
}

impl CmjSampler {
    pub fn new(grid: u32, stream: u32) -> Self {
        assert!(grid > 0);
        Self {
            grid,
            stream,
            pattern: 0,
            index: 0,
        }
    }
}

impl Sampler for CmjSampler {
    fn sample_2d(&mut self) -> Vec2 {
        let n = self.grid * self.grid;
        let s = self.index % n;
        self.index += 1;
        cmj(s, self.grid, self.grid, self.pattern)
    }

    fn num_samples(&self) -> u32 {
        self.grid * self.grid
    }

    fn start_pixel(&mut self, seed: Seed) {
        self.index = 0;
        self.pattern = seed.into_rng(self.stream).gen();
    }

    fn clone_box(&self) -> Box<dyn Sampler> {
        Box::new(self.clone())
    }
}

/// Base-2 (0, 2) low-discrepancy sequence with per-dimension scrambling.
#[derive(Clone)]
pub struct SobolSampler {
    count: u32,
    stream: u32,
    scramble: (u32, u32),
    index: u32,
}

impl SobolSampler {
    pub fn new(count: u32, stream: u32) -> Self {
        Self {
            count,
            stream,
            scramble: (0, 0),
            index: 0,
        }
    }
}

impl Sampler for SobolSampler {
    fn sample_2d(&mut self) -> Vec2 {
        let i = self.index;
        self.index += 1;
        Vec2::new(
            unit(van_der_corput(i, self.scramble.0)),
            unit(sobol_dim2(i, self.scramble.1)),
        )
    }

    fn num_samples(&self) -> u32 {
        self.count
    }

    fn start_pixel(&mut self, seed: Seed) {
        self.index = 0;
        let mut rng = seed.into_rng(self.stream);
        self.scramble = (rng.gen(), rng.gen());
    }

    fn clone_box(&self) -> Box<dyn Sampler> {
        Box::new(self.clone())
    }
}

fn van_der_corput(bits: u32, scramble: u32) -> f32 {
    (bits.reverse_bits() ^ scramble) as f32 * 2.328_306_4e-10
}

fn sobol_dim2(index: u32, scramble: u32) -> f32 {
    let mut v: u32 = 1 << 31;
    let mut result = scramble;
    let mut i = index;
    while i != 0 {
        if i & 1 == 1 {
            result ^= v;
        }
        i >>= 1;
        v ^= v >> 1;
    }
    result as f32 * 2.328_306_4e-10
}

/// Kensler's correlated multi-jitter pattern: sample `s` of an `m x n` grid
/// under pattern key `p`.
fn cmj(s: u32, m: u32, n: u32, p: u32) -> Vec2 {
    let sx = permute(s % m, m, p.wrapping_mul(0xa511e9b3));
    let sy = permute(s / m, n, p.wrapping_mul(0x63d83595));
    let jx = randfloat(s, p.wrapping_mul(0xa399d265));
    let jy = randfloat(s, p.wrapping_mul(0x711ad6a5));
    Vec2::new(
        ((s % m) as f32 + (sy as f32 + jx) / n as f32) / m as f32,
        ((s / m) as f32 + (sx as f32 + jy) / m as f32) / n as f32,
    )
    .min(Vec2::splat(ONE_MINUS_EPSILON))
}

/// Cycle-walking hash permutation of `[0, l)`.
fn permute(mut i: u32, l: u32, p: u32) -> u32 {
    let mut w = l - 1;
    w |= w >> 1;
    w |= w >> 2;
    w |= w >> 4;
    w |= w >> 8;
    w |= w >> 16;
    loop {
        i ^= p;
        i = i.wrapping_mul(0xe170893d);
        i ^= p >> 16;
        i ^= (i & w) >> 4;
        i ^= p >> 8;
        i = i.wrapping_mul(0x0929eb3f);
        i ^= p >> 23;
        i ^= (i & w) >> 1;
        i = i.wrapping_mul(1 | p >> 27);
        i = i.wrapping_mul(0x6935fa69);
        i ^= (i & w) >> 11;
        i = i.wrapping_mul(0x74dcb303);
        i ^= (i & w) >> 2;
        i = i.wrapping_mul(0x9e501cc3);
        i ^= (i & w) >> 2;
        i = i.wrapping_mul(0xc860a3df);
        i &= w;
        i ^= i >> 5;
        if i < l {
            break;
        }
    }
    (i.wrapping_add(p)) % l
}

fn randfloat(mut i: u32, p: u32) -> f32 {
    i ^= p;
    i ^= i >> 17;
    i ^= i >> 10;
    i = i.wrapping_mul(0xb36534e5);
    i ^= i >> 12;
    i ^= i >> 21;
    i = i.wrapping_mul(0x93fc4795);
    i ^= 0xdf6e307f;
    i ^= i >> 17;
    i = i.wrapping_mul(1 | p >> 18);
    i as f32 * (1.0 / 4294967808.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(x: u32, y: u32) -> Seed {
        Seed {
            seed: 42,
            x,
            y,
            sample: 0,
        }
    }

    fn collect(sampler: &mut dyn Sampler, n: u32) -> Vec<Vec2> {
        (0..n).map(|_| sampler.sample_2d()).collect()
    }

    #[test]
    fn all_samplers_stay_in_the_unit_square_and_replay() {
        let mut samplers: Vec<Box<dyn Sampler>> = vec![
            Box::new(RandomSampler::new(16, 0)),
            Box::new(StratifiedSampler::new(4, 1)),
            Box::new(CmjSampler::new(4, 2)),
            Box::new(SobolSampler::new(16, 3)),
        ];

        for sampler in &mut samplers {
            sampler.start_pixel(seed(3, 5));
            let n = sampler.num_samples();
            let first = collect(sampler.as_mut(), n);
            for p in &first {
                assert!((0.0..1.0).contains(&p.x) && (0.0..1.0).contains(&p.y));
            }

            // Resetting to the same pixel replays the identical sequence.
            sampler.start_pixel(seed(3, 5));
            let second = collect(sampler.as_mut(), n);
            assert_eq!(first, second);

            // A different pixel decorrelates the stream.
            sampler.start_pixel(seed(4, 5));
            let third = collect(sampler.as_mut(), n);
            assert_ne!(first, third);
        }
    }

    #[test]
    fn stratified_hits_every_cell_exactly_once() {
        let g = 5u32;
        let mut sampler = StratifiedSampler::new(g, 0);
        sampler.start_pixel(seed(1, 2));

        let mut cells = vec![0u32; (g * g) as usize];
        for _ in 0..g * g {
            let p = sampler.sample_2d();
            let cx = (p.x * g as f32) as u32;
            let cy = (p.y * g as f32) as u32;
            cells[(cy * g + cx) as usize] += 1;
        }
        assert!(cells.iter().all(|&c| c == 1), "cells hit: {cells:?}");
    }

    #[test]
    fn cmj_is_stratified_in_grid_and_projections() {
        let g = 4u32;
        let n = g * g;
        let mut sampler = CmjSampler::new(g, 0);
        sampler.start_pixel(seed(9, 7));

        let samples = collect(&mut sampler, n);

        let mut cells = vec![0u32; n as usize];
        let mut cols = vec![0u32; n as usize];
        let mut rows = vec![0u32; n as usize];
        for p in &samples {
            let cx = (p.x * g as f32) as u32;
            let cy = (p.y * g as f32) as u32;
            cells[(cy * g + cx) as usize] += 1;
            cols[(p.x * n as f32) as usize] += 1;
            rows[(p.y * n as f32) as usize] += 1;
        }
        assert!(cells.iter().all(|&c| c == 1), "grid cells: {cells:?}");
        assert!(cols.iter().all(|&c| c == 1), "x substrata: {cols:?}");
        assert!(rows.iter().all(|&c| c == 1), "y substrata: {rows:?}");
    }

    #[test]
    fn unscrambled_sobol_prefix_is_the_classic_sequence() {
        let mut sampler = SobolSampler::new(4, 0);
        // Leave the zero scramble in place: no start_pixel call.
        let pts = collect(&mut sampler, 4);
        let expected = [
            Vec2::new(0.0, 0.0),
            Vec2::new(0.5, 0.5),
            Vec2::new(0.25, 0.75),
            Vec2::new(0.75, 0.25),
        ];
        for (p, e) in pts.iter().zip(expected) {
            assert!((*p - e).length() < 1e-6, "{p:?} vs {e:?}");
        }
    }

    #[test]
    fn sobol_prefix_is_well_distributed() {
        let mut sampler = SobolSampler::new(16, 0);
        sampler.start_pixel(seed(0, 0));
        let pts = collect(&mut sampler, 16);
        // Any 16-sample prefix of a scrambled (0,2) sequence is stratified
        // on the 4x4 grid.
        let mut cells = vec![0u32; 16];
        for p in &pts {
            let cx = (p.x * 4.0) as u32;
            let cy = (p.y * 4.0) as u32;
            cells[(cy * 4 + cx) as usize] += 1;
        }
        assert!(cells.iter().all(|&c| c == 1), "cells: {cells:?}");
    }
}
