//! Asset manifest, decoders and the asynchronous [`ResourceLoader`].
//!
//! The loader takes a [`Manifest`] of named descriptors, hands each one to the
//! [`AssetSource`] registered for its kind in a [`LoaderRegistry`], and reports
//! progress, per-asset errors and a single `ready` event as the loads finish.

pub mod descriptor;
pub mod error;
pub mod gltf_import;
pub mod loaded;
pub mod loader;
pub mod mesh;
pub mod obj;
pub mod observers;
pub mod registry;
pub mod sources;
pub mod texture;

pub use descriptor::{AssetDescriptor, AssetKind, AssetPath, Manifest};
pub use error::{AssetError, AssetResult};
pub use loaded::LoadedAsset;
pub use loader::{FailurePolicy, LoadState, ResourceLoader};
pub use mesh::{MeshData, MeshVertex, ModelData};
pub use observers::SubscriptionId;
pub use registry::LoaderRegistry;
pub use sources::AssetSource;
pub use texture::{CubeTextureData, HdrTexture, TextureData, TextureFormat};
