pub mod aggregate;
pub mod bsdf;
pub mod camera;
pub mod color;
pub mod filter;
pub mod image_plane;
pub mod integrators;
pub mod light;
pub mod loader;
pub mod material;
pub mod math;
pub mod ray;
pub mod renderer;
pub mod sampler;
pub mod scene;
pub mod shape;
pub mod utils;

pub use rand_xoshiro::Xoshiro256StarStar as Rng;

/// Identifies one sample stream of a render: the render seed, the pixel and
/// the sample index. Hashing it (plus a per-consumer stream id) yields the
/// RNG for that stream, so results do not depend on thread scheduling.
#[derive(Debug, Copy, Clone, Default, Hash)]
pub struct Seed {
    pub seed: u64,
    pub x: u32,
    pub y: u32,
    pub sample: u32,
}

impl Seed {
    pub fn into_rng(self, stream: u32) -> Rng {
        let mut hasher = std::hash::DefaultHasher::new();
        std::hash::Hash::hash(&self, &mut hasher);
        std::hash::Hash::hash(&stream, &mut hasher);
        <Rng as rand::SeedableRng>::seed_from_u64(std::hash::Hasher::finish(&hasher))
    }
}
