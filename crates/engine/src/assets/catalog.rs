use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::geometry::{Anchor, Size};
use crate::world::LayerId;

use super::types::{AssetCatalogError, AssetInfo, AssetResolver};

pub const COLORKEY_DIR_NAME: &str = "colorkey";
pub const NO_COLORKEY_DIR_NAME: &str = "no_colorkey";

/// Asset metadata keyed by name, in name order.
#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
    assets: BTreeMap<String, AssetInfo>,
}

impl AssetCatalog {
    /// Scans `<assets_dir>/colorkey` and `<assets_dir>/no_colorkey`. Either
    /// directory may be missing.
    pub fn discover(assets_dir: &Path) -> Result<Self, AssetCatalogError> {
        let mut catalog = Self::default();
        for (dir_name, colorkey) in [(COLORKEY_DIR_NAME, true), (NO_COLORKEY_DIR_NAME, false)] {
            let dir = assets_dir.join(dir_name);
            if !dir.is_dir() {
                debug!(path = %dir.display(), "asset_dir_missing");
                continue;
            }
            catalog.scan_dir(&dir, colorkey)?;
        }
        info!(
            asset_count = catalog.assets.len(),
            assets_dir = %assets_dir.display(),
            "asset_catalog_loaded"
        );
        Ok(catalog)
    }

    pub fn insert(&mut self, info: AssetInfo) -> Result<(), AssetCatalogError> {
        if let Some(existing) = self.assets.get(&info.name) {
            return Err(AssetCatalogError::DuplicateAsset {
                name: info.name.clone(),
                first: existing.path.clone(),
                second: info.path,
            });
        }
        self.assets.insert(info.name.clone(), info);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&AssetInfo> {
        self.assets.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetInfo> {
        self.assets.values()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    fn scan_dir(&mut self, dir: &Path, colorkey: bool) -> Result<(), AssetCatalogError> {
        let entries = fs::read_dir(dir).map_err(|source| AssetCatalogError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| AssetCatalogError::ReadDirEntry {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && is_png_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let info = read_asset_info(&path, colorkey)?;
            self.insert(info)?;
        }
        Ok(())
    }
}

impl AssetResolver for AssetCatalog {
    fn resolve(&self, kind: &str) -> Option<&AssetInfo> {
        self.assets.get(kind)
    }
}

struct ParsedFileName {
    name: String,
    layer: LayerId,
    seamless: bool,
    anchor: Anchor,
}

fn read_asset_info(path: &Path, colorkey: bool) -> Result<AssetInfo, AssetCatalogError> {
    let parsed = parse_file_name(path)?;
    let (w, h) = image::image_dimensions(path).map_err(|source| AssetCatalogError::ReadImage {
        path: path.to_path_buf(),
        source,
    })?;
    let size = Size::new(w, h);
    if size.is_empty() {
        return Err(AssetCatalogError::EmptyImage {
            path: path.to_path_buf(),
        });
    }
    Ok(AssetInfo {
        name: parsed.name,
        layer: parsed.layer,
        anchor: parsed.anchor,
        seamless: parsed.seamless,
        colorkey,
        size,
        path: path.to_path_buf(),
    })
}

/// `grass.blocks.False.midbottom.png` names asset `grass`.
fn parse_file_name(path: &Path) -> Result<ParsedFileName, AssetCatalogError> {
    let malformed = || AssetCatalogError::MalformedFileName {
        path: path.to_path_buf(),
    };
    let file_name = path.file_name().and_then(|name| name.to_str()).ok_or_else(malformed)?;
    let parts: Vec<&str> = file_name.split('.').collect();
    let [name, layer, seamless, anchor, _extension] = parts.as_slice() else {
        return Err(malformed());
    };
    if name.is_empty() {
        return Err(malformed());
    }

    let layer = LayerId::from_name(layer).ok_or_else(|| AssetCatalogError::UnknownLayer {
        path: path.to_path_buf(),
        layer: layer.to_string(),
    })?;
    let seamless = match *seamless {
        "True" => true,
        "False" => false,
        other => {
            return Err(AssetCatalogError::InvalidSeamlessFlag {
                path: path.to_path_buf(),
                value: other.to_string(),
            })
        }
    };
    let anchor = Anchor::from_name(anchor).map_err(|source| AssetCatalogError::UnknownAnchor {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(ParsedFileName {
        name: name.to_string(),
        layer,
        seamless,
        anchor,
    })
}

fn is_png_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

/// Default asset root under a project root.
pub fn assets_dir_under(root: &Path) -> PathBuf {
    root.join("data").join("assets")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use image::RgbaImage;
    use tempfile::TempDir;

    use super::*;

    fn write_png(dir: &Path, file_name: &str, w: u32, h: u32) -> PathBuf {
        fs::create_dir_all(dir).expect("mkdir");
        let path = dir.join(file_name);
        RgbaImage::new(w, h).save(&path).expect("write png");
        path
    }

    #[test]
    fn discovers_both_dirs_sorted_by_name() {
        let temp = TempDir::new().expect("tempdir");
        let assets = temp.path();
        write_png(
            &assets.join(COLORKEY_DIR_NAME),
            "tree.middleprops.False.midbottom.png",
            32,
            48,
        );
        write_png(
            &assets.join(NO_COLORKEY_DIR_NAME),
            "grass.blocks.True.topleft.png",
            16,
            16,
        );
        fs::write(assets.join(NO_COLORKEY_DIR_NAME).join("readme.txt"), "skip").expect("txt");

        let catalog = AssetCatalog::discover(assets).expect("discover");

        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["grass", "tree"]);
        let tree = catalog.resolve("tree").expect("tree");
        assert_eq!(tree.layer, LayerId::MiddleProps);
        assert_eq!(tree.anchor, Anchor::MidBottom);
        assert_eq!(tree.size, Size::new(32, 48));
        assert!(tree.colorkey);
        assert!(!tree.seamless);
        let grass = catalog.resolve("grass").expect("grass");
        assert!(grass.seamless);
        assert!(!grass.colorkey);
    }

    #[test]
    fn missing_asset_dirs_yield_empty_catalog() {
        let temp = TempDir::new().expect("tempdir");
        let catalog = AssetCatalog::discover(temp.path()).expect("discover");
        assert!(catalog.is_empty());
    }

    #[test]
    fn rejects_malformed_names() {
        let temp = TempDir::new().expect("tempdir");
        let dir = temp.path().join(COLORKEY_DIR_NAME);
        write_png(&dir, "rock.blocks.png", 16, 16);
        assert!(matches!(
            AssetCatalog::discover(temp.path()),
            Err(AssetCatalogError::MalformedFileName { .. })
        ));
    }

    #[test]
    fn rejects_unknown_layer_anchor_and_flag() {
        let cases = [
            ("rock.ceiling.False.topleft.png", "layer"),
            ("rock.blocks.Maybe.topleft.png", "flag"),
            ("rock.blocks.False.upperleft.png", "anchor"),
        ];
        for (file_name, expected) in cases {
            let temp = TempDir::new().expect("tempdir");
            write_png(&temp.path().join(COLORKEY_DIR_NAME), file_name, 16, 16);
            let error = AssetCatalog::discover(temp.path()).expect_err(file_name);
            let matched = match expected {
                "layer" => matches!(error, AssetCatalogError::UnknownLayer { .. }),
                "flag" => matches!(error, AssetCatalogError::InvalidSeamlessFlag { .. }),
                _ => matches!(error, AssetCatalogError::UnknownAnchor { .. }),
            };
            assert!(matched, "{file_name}: {error}");
        }
    }

    #[test]
    fn rejects_duplicate_names_across_dirs() {
        let temp = TempDir::new().expect("tempdir");
        write_png(
            &temp.path().join(COLORKEY_DIR_NAME),
            "rock.blocks.False.topleft.png",
            16,
            16,
        );
        write_png(
            &temp.path().join(NO_COLORKEY_DIR_NAME),
            "rock.actors.False.center.png",
            16,
            16,
        );
        assert!(matches!(
            AssetCatalog::discover(temp.path()),
            Err(AssetCatalogError::DuplicateAsset { name, .. }) if name == "rock"
        ));
    }

    #[test]
    fn unreadable_png_is_reported() {
        let temp = TempDir::new().expect("tempdir");
        let dir = temp.path().join(COLORKEY_DIR_NAME);
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join("rock.blocks.False.topleft.png"), b"not a png").expect("write");
        assert!(matches!(
            AssetCatalog::discover(temp.path()),
            Err(AssetCatalogError::ReadImage { .. })
        ));
    }

    #[test]
    fn seamless_spec_uses_explicit_area() {
        let info = AssetInfo {
            name: "water".to_string(),
            layer: LayerId::Blocks,
            anchor: Anchor::TopLeft,
            seamless: true,
            colorkey: false,
            size: Size::new(16, 16),
            path: PathBuf::from("water.blocks.True.topleft.png"),
        };
        let extra = crate::world::ObjectExtra {
            size: Some(Size::new(64, 32)),
            text: None,
        };
        let spec = info.object_spec(crate::geometry::IVec2::new(5, 6), extra);
        assert_eq!(spec.size, Size::new(64, 32));
        assert_eq!(spec.kind, "water");
    }
}
