mod output;
mod progress;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use lumen::{
    aggregate::SbvhOptions,
    integrators::{AmbientOcclusion, DirectLighting, Integrator, PathTracer},
    loader,
    material::{Material, MaterialDescriptor, MaterialId},
    math::transform::Transform,
    renderer::{AccelKind, Dimensions, Executor},
    sampler::{CmjSampler, RandomSampler, Sampler, SobolSampler, StratifiedSampler},
    scene::{AreaLightScene, CornellBoxScene, SpheresScene},
};

use output::FileOutput;
use progress::Progress;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum AvailableScene {
    #[default]
    Spheres,
    Cornell,
    AreaLight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum AvailableIntegrator {
    Direct,
    #[default]
    Path,
    Ao,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum AvailableSampler {
    #[default]
    Random,
    Stratified,
    Cmj,
    Sobol,
}

#[derive(Parser, Debug)]
#[command(about = "Offline CPU path tracer")]
pub struct Args {
    #[arg(long = "spp", default_value_t = 32)]
    /// Samples per pixel; grid samplers round up to the next square
    sample_per_pixel: u32,

    #[arg(long, value_enum, default_value_t)]
    /// Scene preset
    scene: AvailableScene,

    /// Additionally load this OBJ file into the scene
    #[arg(long)]
    obj: Option<PathBuf>,

    #[arg(short, long, default_value = "800x600")]
    /// Image dimensions as `width`x`height`
    dimensions: Dimensions,

    #[arg(short, long, value_enum, default_value_t)]
    integrator: AvailableIntegrator,

    #[arg(long, value_enum, default_value_t)]
    sampler: AvailableSampler,

    #[arg(long, default_value_t = 16)]
    /// Maximum path length for the path integrator
    max_depth: u32,

    #[arg(long, default_value_t = 64)]
    tile_size: u32,

    #[arg(long, default_value_t = 0)]
    /// Master seed; same seed and scene give the same image
    seed: u64,

    #[arg(short, long, default_value = "output")]
    /// Directory the LDR/HDR images are written to
    output: PathBuf,

    #[arg(long)]
    /// Size of the worker pool; defaults to the hardware concurrency
    threads: Option<usize>,

    #[arg(long, default_value_t = false)]
    /// Render on a single thread
    disable_threading: bool,

    #[arg(long, default_value_t = false)]
    /// Build the scene without spatial splits in the BVH
    no_spatial_splits: bool,
}

fn sampler_for(kind: AvailableSampler, spp: u32, stream: u32) -> Box<dyn Sampler> {
    let grid = (spp as f32).sqrt().ceil() as u32;
    match kind {
        AvailableSampler::Random => Box::new(RandomSampler::new(spp, stream)),
        AvailableSampler::Stratified => Box::new(StratifiedSampler::new(grid.max(1), stream)),
        AvailableSampler::Cmj => Box::new(CmjSampler::new(grid.max(1), stream)),
        AvailableSampler::Sobol => Box::new(SobolSampler::new(spp, stream)),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("configuring the worker pool")?;
    }

    let mut builder = match args.scene {
        AvailableScene::Spheres => SpheresScene::build(),
        AvailableScene::Cornell => CornellBoxScene::build(),
        AvailableScene::AreaLight => AreaLightScene::build(),
    };

    if let Some(obj) = &args.obj {
        let fallback = builder.add_material(MaterialDescriptor {
            label: Some("obj fallback".into()),
            material: Material::matte(lumen::color::Rgb::splat(0.5)),
        });
        let events = loader::load_obj(
            obj,
            Transform::IDENTITY,
            MaterialId(builder.material_count()),
            fallback,
        )
        .with_context(|| format!("importing {}", obj.display()))?;
        builder.extend(events);
    }

    builder.set_accel(AccelKind::Sbvh(SbvhOptions {
        spatial_splits: !args.no_spatial_splits,
        ..Default::default()
    }));

    log::info!("Committing world...");
    let world = builder.commit().context("world commit failed")?;

    let integrator: Box<dyn Integrator> = match args.integrator {
        AvailableIntegrator::Direct => Box::new(DirectLighting),
        AvailableIntegrator::Path => Box::new(PathTracer {
            max_depth: args.max_depth,
            ..Default::default()
        }),
        AvailableIntegrator::Ao => Box::new(AmbientOcclusion::default()),
    };

    let mut executor = Executor::new(
        args.dimensions,
        integrator,
        sampler_for(args.sampler, args.sample_per_pixel, 0),
        // Light and BSDF strategies draw from their own streams.
        Box::new(RandomSampler::new(1, 1)),
        Box::new(RandomSampler::new(1, 2)),
    );
    executor.tile_size = args.tile_size;
    executor.seed = args.seed;
    executor.multithreaded = !args.disable_threading;

    if args.disable_threading {
        log::warn!("threading disabled, rendering on one worker");
    }

    let progress = Progress::new();
    let plane = {
        let timed = lumen::utils::timer::timed_scope_log("Render", || {
            executor.run(&world, |_msg, fraction| progress.report(fraction))
        });
        timed.res
    };
    progress.finish();

    FileOutput::new(args.output).commit(&plane)?;

    lumen::utils::counter::report_counters();
    log::info!("Done");
    Ok(())
}
