//! Kind → loading capability table consulted at dispatch.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use crate::{
    descriptor::AssetKind,
    sources::{AssetSource, CubeTextureSource, ModelSource, RadianceSource, TextureSource},
};

#[derive(Clone, Default)]
pub struct LoaderRegistry {
    sources: HashMap<AssetKind, Arc<dyn AssetSource>>,
}

impl LoaderRegistry {
    /// Empty table; every kind is unknown until registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// The four built-in kinds, resolving paths relative to `root`.
    pub fn with_defaults(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let mut registry = Self::new();
        registry.register(AssetKind::Model, ModelSource::new(&root));
        registry.register(AssetKind::Texture, TextureSource::new(&root));
        registry.register(AssetKind::CubeTexture, CubeTextureSource::new(&root));
        registry.register(AssetKind::RadianceTexture, RadianceSource::new(&root));
        registry
    }

    /// Add or replace the source for `kind`.
    pub fn register(&mut self, kind: AssetKind, source: impl AssetSource + 'static) -> &mut Self {
        self.register_shared(kind, Arc::new(source))
    }

    pub fn register_shared(&mut self, kind: AssetKind, source: Arc<dyn AssetSource>) -> &mut Self {
        if self.sources.insert(kind.clone(), source).is_some() {
            log::debug!("Replaced loader for kind '{}'", kind);
        }
        self
    }

    pub fn get(&self, kind: &AssetKind) -> Option<Arc<dyn AssetSource>> {
        self.sources.get(kind).cloned()
    }

    pub fn contains(&self, kind: &AssetKind) -> bool {
        self.sources.contains_key(kind)
    }
}
