//! Light sources.
//!
//! `sample` draws a direction toward the light from a shading point and
//! reports the radiance arriving along it together with the solid-angle
//! density of the draw. Delta lights (point, directional) report `pdf = 1`
//! and are never combined with BSDF samples; their MIS weight is 1 by
//! convention.

pub mod environment;

pub use environment::{EnvMap, EnvironmentLight, IsEnvironmentLight};

use glam::{Vec2, Vec3};

use crate::{
    color::{linear::BLACK, Rgb},
    math::point::Point,
    ray::Ray,
    shape::{Hit, SceneView},
};

#[derive(Debug, Clone, Copy)]
pub struct LightSample {
    /// Unit direction from the shading point toward the light.
    pub wi: Vec3,
    /// Distance to the sampled light point; infinite for sky and
    /// directional lights.
    pub distance: f32,
    /// Radiance arriving at the shading point if unoccluded.
    pub li: Rgb,
    /// Solid-angle density at the shading point.
    pub pdf: f32,
    pub delta: bool,
}

pub enum Light {
    Point {
        position: Point,
        intensity: Rgb,
    },
    Directional {
        /// Direction of propagation, unit length.
        direction: Vec3,
        radiance: Rgb,
    },
    /// Emissive primitive, referenced by index into the world's primitive
    /// list; the primitive itself stays owned by the world.
    Area {
        primitive: u32,
    },
    Environment(EnvironmentLight),
    EnvironmentIs(IsEnvironmentLight),
}

impl Light {
    pub fn is_delta(&self) -> bool {
        matches!(self, Light::Point { .. } | Light::Directional { .. })
    }

    pub fn sample(&self, view: &SceneView, hit: &Hit, u: Vec2) -> Option<LightSample> {
        match self {
            Light::Point {
                position,
                intensity,
            } => {
                let d = *position - hit.p;
                let dist2 = d.length_squared();
                if dist2 <= 1e-12 {
                    return None;
                }
                Some(LightSample {
                    wi: d / dist2.sqrt(),
                    distance: dist2.sqrt(),
                    li: *intensity * (1.0 / dist2),
                    pdf: 1.0,
                    delta: true,
                })
            }
            Light::Directional {
                direction,
                radiance,
            } => Some(LightSample {
                wi: -*direction,
                distance: f32::INFINITY,
                li: *radiance,
                pdf: 1.0,
                delta: true,
            }),
            Light::Area { primitive } => self.sample_area(view, hit, u, *primitive),
            Light::Environment(env) => env.sample(hit, u),
            Light::EnvironmentIs(env) => env.sample(u),
        }
    }

    fn sample_area(
        &self,
        view: &SceneView,
        hit: &Hit,
        u: Vec2,
        primitive: u32,
    ) -> Option<LightSample> {
        let prim = &view.primitives[primitive as usize];
        let (q, nq) = prim.sample_surface(view.meshes, u);

        let d = q - hit.p;
        let dist2 = d.length_squared();
        if dist2 <= 1e-12 {
            return None;
        }
        let dist = dist2.sqrt();
        let wi = d / dist;

        // One sided: the emitter radiates from its front face only.
        let cos_q = nq.dot(-wi);
        if cos_q <= 1e-6 {
            return None;
        }

        let area = prim.area(view.meshes);
        if area <= 0.0 {
            return None;
        }

        let material = &view.materials[prim.material(view.meshes).0 as usize].material;
        Some(LightSample {
            wi,
            distance: dist,
            li: material.emission(),
            pdf: dist2 / (cos_q * area),
            delta: false,
        })
    }

    /// Density of sampling direction `w` from `hit` with this light's
    /// strategy; used by MIS when the BSDF strategy found the light.
    pub fn pdf(&self, view: &SceneView, hit: &Hit, w: Vec3) -> f32 {
        match self {
            Light::Point { .. } | Light::Directional { .. } => 1.0,
            Light::Area { primitive } => {
                let prim = &view.primitives[*primitive as usize];
                let ray = Ray::spawn(hit.p, hit.ng, w);
                let Some(q) = prim.intersect(view.meshes, &ray, f32::INFINITY) else {
                    return 0.0;
                };
                let cos_q = q.ng.dot(-w).abs();
                let area = prim.area(view.meshes);
                if cos_q <= 1e-6 || area <= 0.0 {
                    return 0.0;
                }
                q.t * q.t / (cos_q * area)
            }
            Light::Environment(env) => env.pdf(hit, w),
            Light::EnvironmentIs(env) => env.pdf(w),
        }
    }

    /// Radiance carried by a ray that escaped the scene. Zero for anything
    /// but sky lights.
    pub fn le(&self, ray: &Ray) -> Rgb {
        match self {
            Light::Environment(env) => env.le(ray.direction),
            Light::EnvironmentIs(env) => env.le(ray.direction),
            _ => BLACK,
        }
    }

    /// Primitive index backing an area light.
    pub fn area_primitive(&self) -> Option<u32> {
        match self {
            Light::Area { primitive } => Some(*primitive),
            _ => None,
        }
    }
}
