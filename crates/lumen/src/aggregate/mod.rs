//! Ray query acceleration over the world's refined primitive list.
//!
//! [`ShapeList`] is the linear-scan baseline, kept both for tiny scenes and
//! as the oracle the hierarchy is validated against. [`Sbvh`] is the
//! production structure: a binned-SAH BVH with optional spatial splits.

pub mod sbvh;
pub mod shapelist;

pub use sbvh::{Sbvh, SbvhOptions, SbvhStats};
pub use shapelist::ShapeList;
