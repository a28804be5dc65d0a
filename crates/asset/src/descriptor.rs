//! Declarative asset manifest: what to load, under which name, from where.

use std::{fmt, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tag selecting which loading capability handles a descriptor.
///
/// The built-in kinds use the tags of the scene manifest format. Any other tag
/// is kept as [`AssetKind::Custom`] and only resolves if the application
/// registered a source for it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssetKind {
    /// glTF / OBJ model.
    Model,
    /// Flat 2D texture.
    Texture,
    /// Six-face cube texture.
    CubeTexture,
    /// Radiance (`.hdr`) environment texture.
    RadianceTexture,
    Custom(String),
}

impl AssetKind {
    pub fn as_str(&self) -> &str {
        match self {
            AssetKind::Model => "gltfModel",
            AssetKind::Texture => "texture",
            AssetKind::CubeTexture => "cubeTexture",
            AssetKind::RadianceTexture => "rgbeTexture",
            AssetKind::Custom(tag) => tag,
        }
    }
}

impl From<&str> for AssetKind {
    fn from(tag: &str) -> Self {
        match tag {
            "gltfModel" | "model" => AssetKind::Model,
            "texture" => AssetKind::Texture,
            "cubeTexture" => AssetKind::CubeTexture,
            "rgbeTexture" | "radianceTexture" => AssetKind::RadianceTexture,
            other => AssetKind::Custom(other.to_owned()),
        }
    }
}

impl From<String> for AssetKind {
    fn from(tag: String) -> Self {
        AssetKind::from(tag.as_str())
    }
}

impl From<AssetKind> for String {
    fn from(kind: AssetKind) -> Self {
        kind.as_str().to_owned()
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One location, or an ordered list of locations for multi-file kinds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssetPath {
    Single(String),
    Multiple(Vec<String>),
}

impl AssetPath {
    /// All locations in declaration order.
    pub fn locations(&self) -> Vec<&str> {
        match self {
            AssetPath::Single(p) => vec![p.as_str()],
            AssetPath::Multiple(ps) => ps.iter().map(String::as_str).collect(),
        }
    }

    /// The only location, if this path names exactly one file.
    pub fn single(&self) -> Option<&str> {
        match self {
            AssetPath::Single(p) => Some(p),
            AssetPath::Multiple(ps) if ps.len() == 1 => Some(&ps[0]),
            AssetPath::Multiple(_) => None,
        }
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetPath::Single(p) => f.write_str(p),
            AssetPath::Multiple(ps) => write!(f, "[{}]", ps.join(", ")),
        }
    }
}

impl From<&str> for AssetPath {
    fn from(p: &str) -> Self {
        AssetPath::Single(p.to_owned())
    }
}

impl<S: Into<String>> From<Vec<S>> for AssetPath {
    fn from(ps: Vec<S>) -> Self {
        AssetPath::Multiple(ps.into_iter().map(Into::into).collect())
    }
}

/// Immutable description of one loadable asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    #[serde(alias = "type")]
    pub kind: AssetKind,
    pub name: String,
    pub path: AssetPath,
}

impl AssetDescriptor {
    pub fn new(kind: AssetKind, name: impl Into<String>, path: impl Into<AssetPath>) -> Self {
        Self {
            kind,
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Ordered list of descriptors handed to a [`crate::ResourceLoader`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    pub assets: Vec<AssetDescriptor>,
}

impl Manifest {
    pub fn new(assets: Vec<AssetDescriptor>) -> Self {
        Self { assets }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse asset manifest")
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("In manifest {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl FromIterator<AssetDescriptor> for Manifest {
    fn from_iter<I: IntoIterator<Item = AssetDescriptor>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scene_manifest_with_type_alias() {
        let json = r#"[
            { "type": "texture", "name": "basecolor", "path": "metal/basecolor.jpg" },
            { "kind": "rgbeTexture", "name": "env", "path": "environment/autumn_field_1k.hdr" },
            { "type": "cubeTexture", "name": "sky",
              "path": ["px.jpg", "nx.jpg", "py.jpg", "ny.jpg", "pz.jpg", "nz.jpg"] }
        ]"#;
        let manifest = Manifest::from_json_str(json).expect("parse manifest");
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest.assets[0].kind, AssetKind::Texture);
        assert_eq!(manifest.assets[1].kind, AssetKind::RadianceTexture);
        assert_eq!(manifest.assets[2].path.locations().len(), 6);
        assert_eq!(manifest.assets[2].path.single(), None);
    }

    #[test]
    fn unknown_tags_survive_as_custom_kinds() {
        let json = r#"[{ "type": "foo", "name": "x", "path": "x.bin" }]"#;
        let manifest = Manifest::from_json_str(json).expect("parse manifest");
        assert_eq!(manifest.assets[0].kind, AssetKind::Custom("foo".into()));
        assert_eq!(manifest.assets[0].kind.to_string(), "foo");
    }

    #[test]
    fn missing_name_is_a_parse_error() {
        let json = r#"[{ "type": "texture", "path": "a.jpg" }]"#;
        assert!(Manifest::from_json_str(json).is_err());
    }
}
