//! glTF 2.0 (`.gltf` / `.glb`) geometry import.

use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::mesh::{MeshData, MeshVertex, ModelData};

const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";

/// Import every triangle primitive of every mesh, in document order.
pub fn load_gltf_from_path(path: impl AsRef<Path>) -> Result<ModelData> {
    let path = path.as_ref();
    let (document, buffers, _images) = gltf::import(path)
        .with_context(|| format!("Failed to import glTF {}", path.display()))?;

    if document
        .extensions_required()
        .any(|ext| ext == DRACO_EXTENSION)
    {
        bail!(
            "{} requires {}, which is not supported",
            path.display(),
            DRACO_EXTENSION
        );
    }

    let mut meshes = Vec::new();
    for mesh in document.meshes() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::debug!(
                    "Skipping non-triangle primitive in mesh {:?}",
                    mesh.name().unwrap_or("<unnamed>")
                );
                continue;
            }
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|b| &b.0[..]));

            let positions: Vec<[f32; 3]> = match reader.read_positions() {
                Some(iter) => iter.collect(),
                None => bail!("glTF primitive without positions in {}", path.display()),
            };
            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|iter| iter.collect())
                .unwrap_or_default();
            let uvs: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|tc| tc.into_f32().collect())
                .unwrap_or_default();

            let vertices = positions
                .iter()
                .enumerate()
                .map(|(i, &p)| {
                    MeshVertex::new(
                        p,
                        normals.get(i).copied().unwrap_or([0.0, 0.0, 1.0]),
                        uvs.get(i).copied().unwrap_or([0.0, 0.0]),
                    )
                })
                .collect::<Vec<_>>();
            let indices = match reader.read_indices() {
                Some(idx) => idx.into_u32().collect(),
                None => (0..vertices.len() as u32).collect(),
            };

            meshes.push(MeshData::new(vertices, indices));
        }
    }

    if meshes.is_empty() {
        bail!("glTF {} contained no triangle meshes", path.display());
    }
    Ok(ModelData { meshes })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    /// One triangle with the buffer embedded as a base64 data URI.
    const TRIANGLE: &str = r#"{
        "asset": { "version": "2.0" },
        "buffers": [{
            "byteLength": 36,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
        }],
        "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }],
        "accessors": [{
            "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
            "min": [0, 0, 0], "max": [1, 1, 0]
        }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }]
    }"#;

    #[test]
    fn imports_embedded_triangle() {
        let mut file = tempfile::Builder::new()
            .suffix(".gltf")
            .tempfile()
            .expect("temp file");
        file.write_all(TRIANGLE.as_bytes()).expect("write gltf");

        let model = load_gltf_from_path(file.path()).expect("import gltf");
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.meshes[0].indices, vec![0, 1, 2]);
        assert_eq!(model.meshes[0].vertices[1].position, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_gltf_from_path("definitely/not/here.gltf").is_err());
    }
}
