//! The world container and the tiled render driver.

pub mod executor;
pub mod tile;
pub mod world;

pub use executor::{Executor, TileMsg};
pub use tile::{Tile, Tiler};
pub use world::{AccelKind, CommitError, World, WorldBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl std::str::FromStr for Dimensions {
    type Err = String;

    /// Parses `<width>x<height>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once('x')
            .ok_or_else(|| format!("expected <width>x<height>, got {s:?}"))?;
        Ok(Dimensions {
            width: w.trim().parse().map_err(|e| format!("bad width: {e}"))?,
            height: h.trim().parse().map_err(|e| format!("bad height: {e}"))?,
        })
    }
}
