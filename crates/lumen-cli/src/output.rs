use std::path::PathBuf;

use anyhow::{Context, Result};

use lumen::image_plane::ImagePlane;

/// Writes the finished image plane to disk: gamma-encoded PNG plus a linear
/// EXR for further grading.
pub struct FileOutput {
    outdir: PathBuf,
}

impl FileOutput {
    pub fn new(outdir: PathBuf) -> Self {
        Self { outdir }
    }

    pub fn commit(&self, plane: &ImagePlane) -> Result<()> {
        std::fs::create_dir_all(&self.outdir)
            .with_context(|| format!("creating {}", self.outdir.display()))?;

        let images = plane.finalize();

        let ldr_path = self.outdir.join("render.png");
        log::info!("Saving {}", ldr_path.display());
        images.ldr.save(&ldr_path).context("saving LDR image")?;

        let hdr_path = self.outdir.join("render.exr");
        log::info!("Saving {}", hdr_path.display());
        images.hdr.save(&hdr_path).context("saving HDR image")?;

        Ok(())
    }
}
