//! Wavefront OBJ reader. Positions, normals and texture coordinates are
//! supported; each `o`/`g` statement starts a new mesh of the model.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result, anyhow, bail};

use crate::mesh::{MeshData, MeshVertex, ModelData};

pub fn load_obj_from_path(path: impl AsRef<Path>) -> Result<ModelData> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open OBJ file: {}", path.as_ref().display()))?;
    parse_obj(BufReader::new(file))
}

pub fn load_obj_from_str(contents: &str) -> Result<ModelData> {
    parse_obj(io::Cursor::new(contents))
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
struct Corner {
    pos: usize,
    uv: Option<usize>,
    normal: Option<usize>,
}

/// Vertices are deduplicated per mesh, so indices stay local to it.
#[derive(Default)]
struct MeshBuilder {
    unique: HashMap<Corner, u32>,
    vertices: Vec<MeshVertex>,
    indices: Vec<u32>,
}

impl MeshBuilder {
    fn vertex(&mut self, corner: Corner, attribs: &Attributes, line_no: usize) -> Result<u32> {
        if let Some(&idx) = self.unique.get(&corner) {
            return Ok(idx);
        }
        let position = attribs
            .positions
            .get(corner.pos)
            .copied()
            .ok_or_else(|| anyhow!("Position index out of bounds on line {}", line_no + 1))?;
        let uv = corner
            .uv
            .and_then(|i| attribs.texcoords.get(i).copied())
            .unwrap_or([0.0, 0.0]);
        let normal = corner
            .normal
            .and_then(|i| attribs.normals.get(i).copied())
            .unwrap_or([0.0, 0.0, 1.0]);

        let idx = u32::try_from(self.vertices.len())
            .map_err(|_| anyhow!("Too many vertices in OBJ (>{})", u32::MAX))?;
        self.vertices.push(MeshVertex::new(position, normal, uv));
        self.unique.insert(corner, idx);
        Ok(idx)
    }

    fn finish(self) -> Option<MeshData> {
        let mesh = MeshData::new(self.vertices, self.indices);
        mesh.is_valid().then_some(mesh)
    }
}

#[derive(Default)]
struct Attributes {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    texcoords: Vec<[f32; 2]>,
}

fn parse_obj<R: BufRead>(reader: R) -> Result<ModelData> {
    let mut attribs = Attributes::default();
    let mut meshes = Vec::new();
    let mut current = MeshBuilder::default();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_no + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else { continue };

        match tag {
            "v" => {
                let x = parse_f32(parts.next(), line_no, "x coordinate")?;
                let y = parse_f32(parts.next(), line_no, "y coordinate")?;
                let z = parse_f32(parts.next(), line_no, "z coordinate")?;
                attribs.positions.push([x, y, z]);
            }
            "vt" => {
                let u = parse_f32(parts.next(), line_no, "u coordinate")?;
                let v = parse_f32(parts.next(), line_no, "v coordinate")?;
                // OBJ is bottom-left; meshes here use a top-left origin.
                attribs.texcoords.push([u, 1.0 - v]);
            }
            "vn" => {
                let nx = parse_f32(parts.next(), line_no, "nx coordinate")?;
                let ny = parse_f32(parts.next(), line_no, "ny coordinate")?;
                let nz = parse_f32(parts.next(), line_no, "nz coordinate")?;
                attribs.normals.push([nx, ny, nz]);
            }
            "o" | "g" => {
                if let Some(mesh) = std::mem::take(&mut current).finish() {
                    meshes.push(mesh);
                }
            }
            "f" => {
                let mut face = Vec::with_capacity(4);
                for token in parts {
                    let corner = parse_corner(token, &attribs, line_no)?;
                    face.push(current.vertex(corner, &attribs, line_no)?);
                }
                if face.len() < 3 {
                    continue;
                }
                for tri in 1..(face.len() - 1) {
                    current
                        .indices
                        .extend_from_slice(&[face[0], face[tri], face[tri + 1]]);
                }
            }
            // mtllib/usemtl/s and friends carry nothing the loader needs.
            _ => {}
        }
    }

    if let Some(mesh) = current.finish() {
        meshes.push(mesh);
    }
    if meshes.is_empty() {
        bail!("OBJ contained no triangles");
    }

    Ok(ModelData { meshes })
}

fn parse_f32(value: Option<&str>, line_no: usize, what: &str) -> Result<f32> {
    let token = value.ok_or_else(|| anyhow!("Missing {} on line {}", what, line_no + 1))?;
    token
        .parse::<f32>()
        .with_context(|| format!("Failed to parse {} on line {}", what, line_no + 1))
}

fn parse_corner(token: &str, attribs: &Attributes, line_no: usize) -> Result<Corner> {
    let mut split = token.split('/');
    let pos = match split.next() {
        Some(p) if !p.is_empty() => resolve_index(p, attribs.positions.len(), line_no)?,
        _ => bail!("Malformed face element '{}' on line {}", token, line_no + 1),
    };
    let uv = match split.next() {
        Some(value) if !value.is_empty() => {
            Some(resolve_index(value, attribs.texcoords.len(), line_no)?)
        }
        _ => None,
    };
    let normal = match split.next() {
        Some(value) if !value.is_empty() => {
            Some(resolve_index(value, attribs.normals.len(), line_no)?)
        }
        _ => None,
    };
    Ok(Corner { pos, uv, normal })
}

/// OBJ indices are 1-based; negative values count back from the end.
fn resolve_index(token: &str, len: usize, line_no: usize) -> Result<usize> {
    let raw = token
        .parse::<i64>()
        .with_context(|| format!("Invalid index '{}' on line {}", token, line_no + 1))?;
    let idx = match raw {
        0 => bail!("OBJ index 0 on line {}", line_no + 1),
        r if r > 0 => r - 1,
        r => len as i64 + r,
    };
    if idx < 0 || idx as usize >= len {
        bail!(
            "OBJ index {} out of bounds (len={}) on line {}",
            raw,
            len,
            line_no + 1
        );
    }
    Ok(idx as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_triangle() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            vn 0.0 0.0 1.0
            vt 0.0 0.0
            vt 1.0 0.0
            vt 0.0 1.0
            f 1/1/1 2/2/1 3/3/1
        "#;
        let model = load_obj_from_str(src).expect("parse triangle");
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.meshes[0].vertices.len(), 3);
        assert_eq!(model.meshes[0].indices, vec![0, 1, 2]);
        assert_eq!(model.meshes[0].vertices[0].uv, [0.0, 1.0]);
    }

    #[test]
    fn objects_split_into_meshes_with_negative_indices() {
        let src = r#"
            o first
            v 0 0 0
            v 1 0 0
            v 1 1 0
            v 0 1 0
            f -4 -3 -2 -1
            o second
            v 0 0 1
            v 1 0 1
            v 0 1 1
            f 5 6 7
        "#;
        let model = load_obj_from_str(src).expect("parse objects");
        assert_eq!(model.meshes.len(), 2);
        assert_eq!(model.meshes[0].indices.len(), 6);
        assert_eq!(model.meshes[1].indices, vec![0, 1, 2]);
        assert_eq!(model.vertex_count(), 7);
    }

    #[test]
    fn zero_index_and_empty_files_fail() {
        assert!(load_obj_from_str("v 0 0 0\nf 0 1 1\n").is_err());
        assert!(load_obj_from_str("# nothing\n").is_err());
    }
}
