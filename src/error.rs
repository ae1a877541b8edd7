//! Error types for asset loading.

use std::path::PathBuf;

/// Failure while loading one of the scene's external assets
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid glTF in '{path}'")]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("failed to decode image '{path}'")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to parse font '{path}': {source}")]
    Font {
        path: PathBuf,
        source: ttf_parser::FaceParsingError,
    },

    #[error("'{path}' contains no renderable meshes")]
    EmptyModel { path: PathBuf },

    #[error("loader for '{path}' stopped before producing a result")]
    Canceled { path: PathBuf },
}

pub type AssetResult<T> = Result<T, AssetError>;
