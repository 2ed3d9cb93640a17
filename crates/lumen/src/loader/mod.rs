//! Scene import.
//!
//! Importers are external collaborators; the contract between them and the
//! core is the [`SceneEvent`] stream. An importer yields materials before
//! the meshes that reference them, and the caller folds the stream into a
//! [`crate::renderer::WorldBuilder`], which assigns indices in emission
//! order. Indices stay stable for the lifetime of the world.

pub mod obj;

pub use obj::{load_obj, ObjLoadError};

use crate::{light::Light, material::MaterialDescriptor, shape::Mesh};

pub enum SceneEvent {
    Material(MaterialDescriptor),
    Mesh(Mesh),
    Light(Light),
}
