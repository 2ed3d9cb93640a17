//! Maps a shading hit to a scattering model.
//!
//! Texture lookups go through the [`texture::TextureSystem`] collaborator;
//! a missing texture falls back to the material's constant color so a render
//! never fails over an unresolved map.

pub mod texture;

use glam::Vec3;

use crate::{
    bsdf::{Bsdf, FresnelBlend, Lambert, Microfacet, MicrofacetDistribution, SpecularReflect,
        SpecularRefract},
    color::{linear::BLACK, Rgb},
    shape::Hit,
};

use texture::TextureSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialId(pub u32);

pub struct MaterialDescriptor {
    pub label: Option<String>,
    pub material: Material,
}

impl std::fmt::Debug for MaterialDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialDescriptor")
            .field("label", &self.label)
            .finish()
    }
}

/// Closed set of surface materials.
#[derive(Debug, Clone)]
pub enum Material {
    /// Pure diffuse, optionally textured.
    Matte {
        albedo: Rgb,
        albedo_map: Option<String>,
        normal_map: Option<String>,
    },
    /// Diffuse and mirror lobes combined by the dielectric Fresnel factor.
    Phong {
        diffuse: Rgb,
        specular: Rgb,
        eta: f32,
        diffuse_map: Option<String>,
        normal_map: Option<String>,
    },
    Mirror {
        reflectance: Rgb,
    },
    Glass {
        reflectance: Rgb,
        transmittance: Rgb,
        eta: f32,
    },
    /// Torrance-Sparrow microfacet reflection.
    Glossy {
        reflectance: Rgb,
        eta: f32,
        distribution: MicrofacetDistribution,
    },
    Emissive {
        radiance: Rgb,
    },
    /// Fixed-weight combination of two other materials.
    Blend {
        /// Weight of `a`, in `[0, 1]`.
        weight: f32,
        a: Box<Material>,
        b: Box<Material>,
    },
}

impl Material {
    pub fn matte(albedo: Rgb) -> Self {
        Material::Matte {
            albedo,
            albedo_map: None,
            normal_map: None,
        }
    }

    pub fn phong(diffuse: Rgb, specular: Rgb) -> Self {
        Material::Phong {
            diffuse,
            specular,
            eta: 1.5,
            diffuse_map: None,
            normal_map: None,
        }
    }

    /// Scattering model at `hit`, with texture-driven albedo and normal
    /// perturbation resolved through `texsys`. Emitters do not scatter.
    pub fn bsdf(&self, hit: &Hit, texsys: &dyn TextureSystem) -> Option<Bsdf> {
        match self {
            Material::Matte {
                albedo, albedo_map, ..
            } => Some(Bsdf::Lambert(Lambert {
                albedo: resolve_color(*albedo, albedo_map, hit, texsys),
            })),
            Material::Phong {
                diffuse,
                specular,
                eta,
                diffuse_map,
                ..
            } => Some(Bsdf::FresnelBlend(FresnelBlend {
                diffuse: resolve_color(*diffuse, diffuse_map, hit, texsys),
                specular: *specular,
                eta: *eta,
            })),
            Material::Mirror { reflectance } => Some(Bsdf::SpecularReflect(SpecularReflect {
                reflectance: *reflectance,
            })),
            Material::Glass {
                reflectance,
                transmittance,
                eta,
            } => Some(Bsdf::SpecularRefract(SpecularRefract {
                reflectance: *reflectance,
                transmittance: *transmittance,
                eta: *eta,
            })),
            Material::Glossy {
                reflectance,
                eta,
                distribution,
            } => Some(Bsdf::Microfacet(Microfacet {
                reflectance: *reflectance,
                eta: *eta,
                distribution: *distribution,
            })),
            Material::Emissive { .. } => None,
            Material::Blend { weight, a, b } => {
                match (a.bsdf(hit, texsys), b.bsdf(hit, texsys)) {
                    (Some(a), Some(b)) => Some(Bsdf::Mix(crate::bsdf::MixBsdf {
                        a: Box::new(a),
                        b: Box::new(b),
                        weight: *weight,
                    })),
                    (Some(a), None) => Some(a),
                    (None, Some(b)) => Some(b),
                    (None, None) => None,
                }
            }
        }
    }

    /// Shading hit with the normal perturbed by this material's normal map,
    /// when it has one that resolves.
    pub fn apply_normal_map(&self, hit: Hit, texsys: &dyn TextureSystem) -> Hit {
        let name = match self {
            Material::Matte { normal_map, .. } | Material::Phong { normal_map, .. } => normal_map,
            _ => &None,
        };
        let Some(name) = name else { return hit };
        let Some(c) = texsys.sample(name, hit.uv, [0.0, 0.0]) else {
            return hit;
        };

        // Tangent-space normal packed into [0, 1]^3.
        let local = 2.0 * Vec3::from_array(c.to_array()) - Vec3::ONE;
        let n =
            (local.x * hit.dpdu + local.y * hit.dpdv + local.z * hit.n).normalize_or_zero();
        if n == Vec3::ZERO {
            return hit;
        }
        let dpdu = (hit.dpdu - n * hit.dpdu.dot(n)).normalize_or_zero();
        if dpdu == Vec3::ZERO {
            return hit;
        }
        Hit {
            n,
            dpdu,
            dpdv: n.cross(dpdu),
            ..hit
        }
    }

    /// Emitted radiance toward `wo`; emitters radiate from their front face.
    pub fn emitted(&self, hit: &Hit, wo: Vec3) -> Rgb {
        if hit.n.dot(wo) > 0.0 {
            self.emission()
        } else {
            BLACK
        }
    }

    /// Raw emitted radiance, without the facing check of [`Self::emitted`].
    pub fn emission(&self) -> Rgb {
        match self {
            Material::Emissive { radiance } => *radiance,
            Material::Blend { weight, a, b } => {
                *weight * a.emission() + (1.0 - *weight) * b.emission()
            }
            _ => BLACK,
        }
    }

    pub fn is_emissive(&self) -> bool {
        match self {
            Material::Emissive { .. } => true,
            Material::Blend { a, b, .. } => a.is_emissive() || b.is_emissive(),
            _ => false,
        }
    }
}

fn resolve_color(
    fallback: Rgb,
    map: &Option<String>,
    hit: &Hit,
    texsys: &dyn TextureSystem,
) -> Rgb {
    map.as_deref()
        .and_then(|name| texsys.sample(name, hit.uv, [0.0, 0.0]))
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::texture::NullTextureSystem;
    use crate::math::{point::Point, vec::orthonormal_basis};

    fn hit() -> Hit {
        let n = Vec3::Y;
        let (dpdu, dpdv) = orthonormal_basis(n);
        Hit {
            p: Point::ORIGIN,
            t: 1.0,
            n,
            ng: n,
            dpdu,
            dpdv,
            uv: [0.5, 0.5],
            material: MaterialId(0),
            prim: 0,
        }
    }

    #[test]
    fn missing_texture_falls_back_to_constant() {
        let material = Material::Matte {
            albedo: Rgb::splat(0.25),
            albedo_map: Some("not_there.png".into()),
            normal_map: None,
        };
        let bsdf = material.bsdf(&hit(), &NullTextureSystem).unwrap();
        match bsdf {
            Bsdf::Lambert(l) => assert_eq!(l.albedo, Rgb::splat(0.25)),
            other => panic!("unexpected bsdf {other:?}"),
        }
    }

    #[test]
    fn emissive_radiates_only_forward() {
        let material = Material::Emissive {
            radiance: Rgb::splat(5.0),
        };
        let h = hit();
        assert_eq!(material.emitted(&h, Vec3::Y), Rgb::splat(5.0));
        assert!(material.emitted(&h, Vec3::NEG_Y).is_black());
        assert!(material.bsdf(&h, &NullTextureSystem).is_none());
        assert!(material.is_emissive());
    }
}
