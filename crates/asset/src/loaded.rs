//! Results handed back by the loader, one per successfully loaded descriptor.

use std::{any::Any, fmt, sync::Arc};

use crate::{
    mesh::ModelData,
    texture::{CubeTextureData, HdrTexture, TextureData},
};

/// A decoded asset. The loader stores and returns these without looking inside.
pub enum LoadedAsset {
    Model(ModelData),
    Texture(TextureData),
    CubeTexture(CubeTextureData),
    Radiance(HdrTexture),
    /// Payload of an application-registered kind.
    Custom(Arc<dyn Any + Send + Sync>),
}

impl LoadedAsset {
    pub fn as_model(&self) -> Option<&ModelData> {
        match self {
            LoadedAsset::Model(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_texture(&self) -> Option<&TextureData> {
        match self {
            LoadedAsset::Texture(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_cube_texture(&self) -> Option<&CubeTextureData> {
        match self {
            LoadedAsset::CubeTexture(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_radiance(&self) -> Option<&HdrTexture> {
        match self {
            LoadedAsset::Radiance(h) => Some(h),
            _ => None,
        }
    }

    pub fn downcast_custom<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            LoadedAsset::Custom(any) => any.clone().downcast::<T>().ok(),
            _ => None,
        }
    }

    pub fn into_texture(self) -> Option<TextureData> {
        match self {
            LoadedAsset::Texture(t) => Some(t),
            _ => None,
        }
    }

    pub fn into_radiance(self) -> Option<HdrTexture> {
        match self {
            LoadedAsset::Radiance(h) => Some(h),
            _ => None,
        }
    }
}

impl fmt::Debug for LoadedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadedAsset::Model(m) => write!(f, "Model({} meshes)", m.meshes.len()),
            LoadedAsset::Texture(t) => write!(f, "Texture({}x{})", t.width, t.height),
            LoadedAsset::CubeTexture(c) => write!(f, "CubeTexture({})", c.size()),
            LoadedAsset::Radiance(h) => write!(f, "Radiance({}x{})", h.width, h.height),
            LoadedAsset::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
