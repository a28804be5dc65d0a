//! Built-in loading capabilities, one per [`AssetKind`](crate::AssetKind).
//!
//! Each source resolves manifest locations against its root directory and
//! performs the blocking read + decode; the loader runs it off-thread.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};

use crate::{
    descriptor::AssetPath,
    gltf_import::load_gltf_from_path,
    loaded::LoadedAsset,
    obj::load_obj_from_path,
    texture::{CubeTextureData, HdrTexture, TextureData},
};

/// A capability that turns a manifest path into a decoded asset.
///
/// `load` is called exactly once per descriptor, on a worker thread; its
/// return value is the single success or failure outcome.
pub trait AssetSource: Send + Sync {
    fn load(&self, path: &AssetPath) -> Result<LoadedAsset>;
}

impl<F> AssetSource for F
where
    F: Fn(&AssetPath) -> Result<LoadedAsset> + Send + Sync,
{
    fn load(&self, path: &AssetPath) -> Result<LoadedAsset> {
        self(path)
    }
}

fn single_file(root: &Path, path: &AssetPath) -> Result<PathBuf> {
    path.single()
        .map(|p| root.join(p))
        .ok_or_else(|| anyhow!("Expected a single file, got {}", path))
}

pub struct TextureSource {
    root: PathBuf,
}

impl TextureSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for TextureSource {
    fn load(&self, path: &AssetPath) -> Result<LoadedAsset> {
        let file = single_file(&self.root, path)?;
        TextureData::load(file).map(LoadedAsset::Texture)
    }
}

pub struct CubeTextureSource {
    root: PathBuf,
}

impl CubeTextureSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for CubeTextureSource {
    fn load(&self, path: &AssetPath) -> Result<LoadedAsset> {
        let files: Vec<PathBuf> = path
            .locations()
            .into_iter()
            .map(|p| self.root.join(p))
            .collect();
        if files.len() != 6 {
            bail!("Cube texture needs 6 face paths, got {}", files.len());
        }
        CubeTextureData::load(&files).map(LoadedAsset::CubeTexture)
    }
}

pub struct RadianceSource {
    root: PathBuf,
}

impl RadianceSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for RadianceSource {
    fn load(&self, path: &AssetPath) -> Result<LoadedAsset> {
        let file = single_file(&self.root, path)?;
        HdrTexture::load(file).map(LoadedAsset::Radiance)
    }
}

/// Picks the model format from the file extension.
pub struct ModelSource {
    root: PathBuf,
}

impl ModelSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for ModelSource {
    fn load(&self, path: &AssetPath) -> Result<LoadedAsset> {
        let file = single_file(&self.root, path)?;
        let ext = file
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let model = match ext.as_str() {
            "gltf" | "glb" => load_gltf_from_path(&file)?,
            "obj" => load_obj_from_path(&file)?,
            other => bail!("Unsupported model format '{}' ({})", other, file.display()),
        };
        log::debug!(
            "Model {} has {} meshes, {} vertices",
            file.display(),
            model.meshes.len(),
            model.vertex_count()
        );
        Ok(LoadedAsset::Model(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, name: &str, size: u32) -> Result<()> {
        let img = image::RgbaImage::from_pixel(size, size, image::Rgba([10, 20, 30, 255]));
        img.save(dir.join(name)).context("save png")
    }

    #[test]
    fn texture_source_decodes_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", 4).unwrap();

        let asset = TextureSource::new(dir.path())
            .load(&AssetPath::from("a.png"))
            .expect("load texture");
        let tex = asset.as_texture().expect("texture variant");
        assert_eq!((tex.width, tex.height), (4, 4));
        assert_eq!(&tex.data[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn texture_source_rejects_path_lists() {
        let src = TextureSource::new(".");
        assert!(src.load(&AssetPath::from(vec!["a.png", "b.png"])).is_err());
    }

    #[test]
    fn cube_source_loads_six_faces() {
        let dir = tempfile::tempdir().unwrap();
        let names = ["px.png", "nx.png", "py.png", "ny.png", "pz.png", "nz.png"];
        for n in names {
            write_png(dir.path(), n, 2).unwrap();
        }
        let asset = CubeTextureSource::new(dir.path())
            .load(&AssetPath::from(names.to_vec()))
            .expect("load cube");
        assert_eq!(asset.as_cube_texture().unwrap().size(), 2);

        let short = AssetPath::from(names[..5].to_vec());
        assert!(CubeTextureSource::new(dir.path()).load(&short).is_err());
    }

    #[test]
    fn model_source_reads_obj_and_rejects_unknown_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tri.obj"), "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n")
            .unwrap();
        let src = ModelSource::new(dir.path());
        let asset = src.load(&AssetPath::from("tri.obj")).expect("load obj");
        assert_eq!(asset.as_model().unwrap().meshes.len(), 1);

        assert!(src.load(&AssetPath::from("tri.fbx")).is_err());
    }

    #[test]
    fn missing_hdr_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(
            RadianceSource::new(dir.path())
                .load(&AssetPath::from("missing.hdr"))
                .is_err()
        );
    }
}
