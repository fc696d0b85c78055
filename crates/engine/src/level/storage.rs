use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::assets::AssetResolver;
use crate::geometry::{IVec2, Size};
use crate::world::{ExportedObject, LayerId, ObjectExtra, ObjectSpec};

use super::atomic_io::write_text_atomic;
use super::format::{LevelFile, ObjectRecord};

pub const LEVEL_FILE_EXTENSION: &str = "lvl";
pub const DEFAULT_LEVEL_FILE_NAME: &str = "level.lvl";

#[derive(Debug, Error)]
pub enum LevelIoError {
    #[error("failed to read level file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse level file {path} at {json_path}: {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode level json: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write level file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("level names unknown layer '{layer}'")]
    UnknownLayer { layer: String },
    #[error("layered_objects.{layer}[{index}] uses unknown asset '{name}'")]
    UnknownAsset {
        layer: String,
        index: usize,
        name: String,
    },
    #[error("layered_objects.{layer}[{index}] has a zero-sized area")]
    EmptyArea { layer: String, index: usize },
    #[error("layered_objects.{layer}[{index}] does not fit the coordinate range")]
    OutOfRange { layer: String, index: usize },
    #[error("failed to create levels directory {path}: {source}")]
    CreateLevelsDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} must either be a directory or not exist")]
    LevelsDirIsFile { path: PathBuf },
    #[error("failed to list levels directory {path}: {source}")]
    ReadLevelsDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Reads a level document. A missing file is a new, empty level.
pub fn read_level(path: &Path) -> Result<Option<LevelFile>, LevelIoError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "level_file_missing");
            return Ok(None);
        }
        Err(source) => {
            return Err(LevelIoError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse_level_json(path, &raw).map(Some)
}

fn parse_level_json(path: &Path, raw: &str) -> Result<LevelFile, LevelIoError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, LevelFile>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        LevelIoError::Parse {
            path: path.to_path_buf(),
            json_path,
            source: error.into_inner(),
        }
    })
}

pub fn write_level_atomic(path: &Path, level: &LevelFile) -> Result<(), LevelIoError> {
    let json = serde_json::to_string_pretty(level).map_err(LevelIoError::Encode)?;
    write_text_atomic(path, &json).map_err(|source| LevelIoError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        path = %path.display(),
        record_count = level.record_count(),
        "level_saved"
    );
    Ok(())
}

/// Resolves every record into a placement spec. The layer comes from the
/// record's group in the file; anchor and natural size come from the asset.
pub fn level_specs<R>(level: &LevelFile, resolver: &R) -> Result<Vec<ObjectSpec>, LevelIoError>
where
    R: AssetResolver + ?Sized,
{
    let mut specs = Vec::with_capacity(level.record_count());
    for (layer_name, records) in &level.layered_objects {
        let layer = LayerId::from_name(layer_name).ok_or_else(|| LevelIoError::UnknownLayer {
            layer: layer_name.clone(),
        })?;
        for (index, record) in records.iter().enumerate() {
            let asset =
                resolver
                    .resolve(&record.name)
                    .ok_or_else(|| LevelIoError::UnknownAsset {
                        layer: layer_name.clone(),
                        index,
                        name: record.name.clone(),
                    })?;
            let size = record.size.map(|[w, h]| Size::new(w, h));
            if size.is_some_and(|size| size.is_empty()) {
                return Err(LevelIoError::EmptyArea {
                    layer: layer_name.clone(),
                    index,
                });
            }
            let extra = ObjectExtra {
                size,
                text: record.text.clone(),
            };
            let mut spec = asset.object_spec(IVec2::new(record.pos[0], record.pos[1]), extra);
            if spec.checked_level_rect().is_none() {
                return Err(LevelIoError::OutOfRange {
                    layer: layer_name.clone(),
                    index,
                });
            }
            spec.layer = layer;
            specs.push(spec);
        }
    }
    Ok(specs)
}

/// Groups exported objects back into the on-disk shape. Empty layers are
/// omitted.
pub fn level_from_export(objects: &[ExportedObject]) -> LevelFile {
    let mut level = LevelFile::default();
    for object in objects {
        level
            .layered_objects
            .entry(object.layer.name().to_string())
            .or_default()
            .push(ObjectRecord {
                name: object.kind.clone(),
                pos: [object.position.x, object.position.y],
                size: object.extra.size.map(|size| [size.w, size.h]),
                text: object.extra.text.clone(),
            });
    }
    level
}

/// Creates the levels directory when missing; a plain file in its place is
/// an error.
pub fn ensure_levels_dir(dir: &Path) -> Result<(), LevelIoError> {
    if dir.is_file() {
        return Err(LevelIoError::LevelsDirIsFile {
            path: dir.to_path_buf(),
        });
    }
    fs::create_dir_all(dir).map_err(|source| LevelIoError::CreateLevelsDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// First `*.lvl` file in name order, else `level.lvl` in the same directory.
pub fn find_level_file(levels_dir: &Path) -> Result<PathBuf, LevelIoError> {
    ensure_levels_dir(levels_dir)?;
    let entries = fs::read_dir(levels_dir).map_err(|source| LevelIoError::ReadLevelsDir {
        path: levels_dir.to_path_buf(),
        source,
    })?;

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LevelIoError::ReadLevelsDir {
            path: levels_dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let is_level = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == LEVEL_FILE_EXTENSION);
        if is_level && path.is_file() {
            candidates.push(path);
        }
    }
    candidates.sort();

    Ok(candidates
        .into_iter()
        .next()
        .unwrap_or_else(|| levels_dir.join(DEFAULT_LEVEL_FILE_NAME)))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::TempDir;

    use super::*;
    use crate::assets::AssetInfo;
    use crate::geometry::Anchor;

    struct FixedAssets(HashMap<String, AssetInfo>);

    impl FixedAssets {
        fn new() -> Self {
            let mut assets = HashMap::new();
            for (name, layer, anchor, seamless) in [
                ("grass", LayerId::Blocks, Anchor::TopLeft, true),
                ("tree", LayerId::MiddleProps, Anchor::MidBottom, false),
                ("sign", LayerId::Labels, Anchor::Center, false),
            ] {
                assets.insert(
                    name.to_string(),
                    AssetInfo {
                        name: name.to_string(),
                        layer,
                        anchor,
                        seamless,
                        colorkey: false,
                        size: Size::new(16, 32),
                        path: PathBuf::from(format!("{name}.png")),
                    },
                );
            }
            Self(assets)
        }
    }

    impl AssetResolver for FixedAssets {
        fn resolve(&self, kind: &str) -> Option<&AssetInfo> {
            self.0.get(kind)
        }
    }

    const SAMPLE: &str = r#"{
        "layered_objects": {
            "blocks": [{"name": "grass", "pos": [0, 160], "size": [64, 16]}],
            "middleprops": [{"name": "tree", "pos": [40, 160]}],
            "labels": [{"name": "sign", "pos": [100, 20], "text": "go right"}]
        }
    }"#;

    #[test]
    fn missing_file_is_a_new_level() {
        let temp = TempDir::new().expect("tempdir");
        let loaded = read_level(&temp.path().join("level.lvl")).expect("read");
        assert_eq!(loaded, None);
    }

    #[test]
    fn records_resolve_to_specs_with_asset_anchor_and_size() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("level.lvl");
        fs::write(&path, SAMPLE).expect("write");

        let level = read_level(&path).expect("read").expect("present");
        let specs = level_specs(&level, &FixedAssets::new()).expect("specs");

        assert_eq!(specs.len(), 3);
        let grass = specs.iter().find(|spec| spec.kind == "grass").expect("grass");
        assert_eq!(grass.size, Size::new(64, 16));
        assert_eq!(grass.extra.size, Some(Size::new(64, 16)));
        let tree = specs.iter().find(|spec| spec.kind == "tree").expect("tree");
        assert_eq!(tree.anchor, Anchor::MidBottom);
        assert_eq!(tree.size, Size::new(16, 32));
        assert_eq!(tree.position, IVec2::new(40, 160));
        let sign = specs.iter().find(|spec| spec.kind == "sign").expect("sign");
        assert_eq!(sign.extra.text.as_deref(), Some("go right"));
    }

    #[test]
    fn parse_errors_carry_json_path() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("level.lvl");
        fs::write(
            &path,
            r#"{"layered_objects": {"blocks": [{"name": "grass", "pos": ["x", 0]}]}}"#,
        )
        .expect("write");

        match read_level(&path) {
            Err(LevelIoError::Parse { json_path, .. }) => {
                assert_eq!(json_path, "layered_objects.blocks[0].pos[0]");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_asset_and_layer_are_rejected() {
        let assets = FixedAssets::new();
        let mut level = LevelFile::default();
        level.layered_objects.insert(
            "blocks".to_string(),
            vec![ObjectRecord {
                name: "lava".to_string(),
                pos: [0, 0],
                size: None,
                text: None,
            }],
        );
        assert!(matches!(
            level_specs(&level, &assets),
            Err(LevelIoError::UnknownAsset { index: 0, name, .. }) if name == "lava"
        ));

        let mut level = LevelFile::default();
        level.layered_objects.insert("ceiling".to_string(), Vec::new());
        assert!(matches!(
            level_specs(&level, &assets),
            Err(LevelIoError::UnknownLayer { layer }) if layer == "ceiling"
        ));
    }

    #[test]
    fn oversized_or_overflowing_records_are_rejected() {
        let assets = FixedAssets::new();
        let record = |pos: [i32; 2], size: Option<[u32; 2]>| ObjectRecord {
            name: "grass".to_string(),
            pos,
            size,
            text: None,
        };
        for records in [
            vec![record([0, 0], Some([16, 16])), record([0, 0], Some([u32::MAX, 16]))],
            vec![record([0, 0], Some([i32::MAX as u32 + 1, 16]))],
            vec![record([i32::MAX - 4, 0], Some([16, 16]))],
        ] {
            let expected_index = records.len() - 1;
            let mut level = LevelFile::default();
            level.layered_objects.insert("blocks".to_string(), records);
            match level_specs(&level, &assets) {
                Err(LevelIoError::OutOfRange { layer, index }) => {
                    assert_eq!(layer, "blocks");
                    assert_eq!(index, expected_index);
                }
                other => panic!("expected out of range, got {other:?}"),
            }
        }
    }

    #[test]
    fn export_round_trips_through_disk() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("levels").join("level.lvl");
        let exported = vec![
            ExportedObject {
                layer: LayerId::Blocks,
                kind: "grass".to_string(),
                position: IVec2::new(0, 160),
                extra: ObjectExtra {
                    size: Some(Size::new(64, 16)),
                    text: None,
                },
            },
            ExportedObject {
                layer: LayerId::Labels,
                kind: "sign".to_string(),
                position: IVec2::new(-8, 4),
                extra: ObjectExtra {
                    size: None,
                    text: Some("hi".to_string()),
                },
            },
        ];

        let level = level_from_export(&exported);
        write_level_atomic(&path, &level).expect("write");
        let raw = fs::read_to_string(&path).expect("read raw");
        assert!(!raw.contains("\"text\": null"));
        let reread = read_level(&path).expect("read").expect("present");
        assert_eq!(reread, level);
        assert_eq!(reread.layered_objects["labels"][0].pos, [-8, 4]);
    }

    #[test]
    fn level_file_lookup_prefers_first_existing_lvl() {
        let temp = TempDir::new().expect("tempdir");
        let levels = temp.path().join("levels");

        let fresh = find_level_file(&levels).expect("find");
        assert_eq!(fresh, levels.join(DEFAULT_LEVEL_FILE_NAME));
        assert!(levels.is_dir());

        fs::write(levels.join("b.lvl"), "{}").expect("write b");
        fs::write(levels.join("a.lvl"), "{}").expect("write a");
        fs::write(levels.join("notes.txt"), "").expect("write txt");
        assert_eq!(find_level_file(&levels).expect("find"), levels.join("a.lvl"));
    }

    #[test]
    fn levels_path_occupied_by_file_is_an_error() {
        let temp = TempDir::new().expect("tempdir");
        let levels = temp.path().join("levels");
        fs::write(&levels, "").expect("write");
        assert!(matches!(
            find_level_file(&levels),
            Err(LevelIoError::LevelsDirIsFile { .. })
        ));
    }
}
