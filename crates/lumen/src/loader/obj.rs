use std::path::Path;

use glam::Vec3;

use crate::{
    color::Rgb,
    material::{Material, MaterialDescriptor, MaterialId},
    math::transform::Transform,
    shape::Mesh,
};

use super::SceneEvent;

#[derive(Debug, thiserror::Error)]
pub enum ObjLoadError {
    #[error("failed to load OBJ file: {0}")]
    Load(#[from] tobj::LoadError),
}

/// Import a Wavefront OBJ file as a scene-event stream.
///
/// `first_material` is the id the consuming builder will hand to the first
/// material event of this stream (its current material count); the emitted
/// meshes reference materials relative to it. Models without a material
/// fall back to `default_material`.
pub fn load_obj(
    path: impl AsRef<Path>,
    transform: Transform,
    first_material: MaterialId,
    default_material: MaterialId,
) -> Result<impl Iterator<Item = SceneEvent>, ObjLoadError> {
    let mut options = tobj::GPU_LOAD_OPTIONS;
    options.single_index = true;
    let (models, materials) = tobj::load_obj(path.as_ref(), &options)?;

    let mut events = Vec::new();
    let mut material_ids = Vec::new();

    if let Ok(materials) = materials {
        for material in materials {
            let id = MaterialId(first_material.0 + material_ids.len() as u32);
            material_ids.push(id);

            // Non-zero Ke turns the material into an emitter.
            let ke = material
                .unknown_param
                .get("Ke")
                .and_then(|v| parse_rgb(v))
                .filter(|c| !c.is_black());

            let parsed = match ke {
                Some(radiance) => Material::Emissive { radiance },
                None => Material::Matte {
                    albedo: material.diffuse.map(Rgb).unwrap_or(Rgb::splat(0.5)),
                    albedo_map: material.diffuse_texture.clone(),
                    normal_map: material.normal_texture.clone(),
                },
            };

            log::debug!("importing material {:?} as {:?}", material.name, id);
            events.push(SceneEvent::Material(MaterialDescriptor {
                label: Some(material.name.clone()),
                material: parsed,
            }));
        }
    }

    for model in models {
        let mesh = &model.mesh;
        log::debug!("importing model {}", model.name);

        let material = mesh
            .material_id
            .and_then(|id| material_ids.get(id).copied())
            .unwrap_or(default_material);

        let positions: Vec<Vec3> = mesh
            .positions
            .chunks_exact(3)
            .map(|c| Vec3::new(c[0], c[1], c[2]))
            .collect();
        let normals: Vec<Vec3> = mesh
            .normals
            .chunks_exact(3)
            .map(|c| Vec3::new(c[0], c[1], c[2]))
            .collect();
        let uvs: Vec<[f32; 2]> = mesh.texcoords.chunks_exact(2).map(|c| [c[0], c[1]]).collect();
        let indices: Vec<[u32; 3]> = mesh
            .indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();

        events.push(SceneEvent::Mesh(Mesh::new(
            positions,
            normals,
            uvs,
            indices,
            vec![material],
            transform,
        )));
    }

    Ok(events.into_iter())
}

fn parse_rgb(value: &str) -> Option<Rgb> {
    let mut parts = value.split_whitespace().map(|p| p.parse::<f32>().ok());
    let r = parts.next()??;
    let g = parts.next()??;
    let b = parts.next()??;
    Some(Rgb([r, g, b]))
}
