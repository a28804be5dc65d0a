//! Per-asset failures reported through the loader's `error` event.

use thiserror::Error;

use crate::descriptor::AssetDescriptor;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("No loader registered for kind '{}' (asset '{}')", .descriptor.kind, .descriptor.name)]
    UnknownKind { descriptor: AssetDescriptor },

    #[error("Duplicate asset name '{}' in manifest", .descriptor.name)]
    DuplicateName { descriptor: AssetDescriptor },

    #[error("Failed to load '{}' from {}: {source:#}", .descriptor.name, .descriptor.path)]
    LoadFailed {
        descriptor: AssetDescriptor,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to start loader thread for '{}'", .descriptor.name)]
    Spawn {
        descriptor: AssetDescriptor,
        #[source]
        source: std::io::Error,
    },
}

impl AssetError {
    /// The manifest entry this failure belongs to.
    pub fn descriptor(&self) -> &AssetDescriptor {
        match self {
            AssetError::UnknownKind { descriptor }
            | AssetError::DuplicateName { descriptor }
            | AssetError::LoadFailed { descriptor, .. }
            | AssetError::Spawn { descriptor, .. } => descriptor,
        }
    }

    /// `true` for manifest mistakes, `false` for I/O or decode failures.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            AssetError::UnknownKind { .. } | AssetError::DuplicateName { .. }
        )
    }
}

pub type AssetResult<T> = Result<T, AssetError>;
