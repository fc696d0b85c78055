mod catalog;
mod types;

pub use catalog::{assets_dir_under, AssetCatalog, COLORKEY_DIR_NAME, NO_COLORKEY_DIR_NAME};
pub use types::{AssetCatalogError, AssetInfo, AssetResolver};
