use std::path::PathBuf;

use thiserror::Error;

use crate::geometry::{Anchor, AnchorParseError, IVec2, Size};
use crate::world::{LayerId, ObjectExtra, ObjectSpec};

/// Everything the editor knows about an asset without decoding its pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetInfo {
    pub name: String,
    pub layer: LayerId,
    /// Reference point that persisted positions of this asset refer to.
    pub anchor: Anchor,
    /// Seamless assets tile over an explicit area instead of their natural size.
    pub seamless: bool,
    pub colorkey: bool,
    pub size: Size,
    pub path: PathBuf,
}

impl AssetInfo {
    /// Placement input for an object of this asset at a level position.
    pub fn object_spec(&self, position: IVec2, extra: ObjectExtra) -> ObjectSpec {
        ObjectSpec {
            kind: self.name.clone(),
            layer: self.layer,
            anchor: self.anchor,
            position,
            size: extra.size.unwrap_or(self.size),
            extra,
        }
    }
}

/// Looks up asset metadata by object kind.
pub trait AssetResolver {
    fn resolve(&self, kind: &str) -> Option<&AssetInfo>;
}

#[derive(Debug, Error)]
pub enum AssetCatalogError {
    #[error("failed to read asset directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read entry in asset directory {path}: {source}")]
    ReadDirEntry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "asset file name {path} must look like <name>.<layer>.<True|False>.<anchor>.png"
    )]
    MalformedFileName { path: PathBuf },
    #[error("asset {path} names unknown layer '{layer}'")]
    UnknownLayer { path: PathBuf, layer: String },
    #[error("asset {path} has an invalid anchor: {source}")]
    UnknownAnchor {
        path: PathBuf,
        #[source]
        source: AnchorParseError,
    },
    #[error("asset {path} has seamless flag '{value}', expected True or False")]
    InvalidSeamlessFlag { path: PathBuf, value: String },
    #[error("failed to read image dimensions of {path}: {source}")]
    ReadImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("asset {path} has zero-sized image")]
    EmptyImage { path: PathBuf },
    #[error("asset '{name}' is defined twice: {first} and {second}")]
    DuplicateAsset {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}
