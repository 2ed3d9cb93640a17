//! Built-in scenes, treated as configuration rather than core: each preset
//! fills a [`WorldBuilder`] with geometry, materials, lights and a camera.

pub mod examples;

pub use examples::{area_light::AreaLightScene, cornell::CornellBoxScene, spheres::SpheresScene};
