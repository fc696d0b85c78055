use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod assets;
pub mod geometry;
pub mod level;
pub mod world;

pub use assets::{AssetCatalog, AssetCatalogError, AssetInfo, AssetResolver};
pub use geometry::{snap_to_grid, Anchor, AnchorParseError, IVec2, Rect, Size};
pub use level::{
    find_level_file, level_from_export, level_specs, read_level, write_level_atomic, LevelFile,
    LevelIoError, ObjectRecord,
};
pub use world::{
    bucket_objects, BucketingError, Chunk, ChunkCell, ChunkError, ChunkHandle, ChunkLayout,
    ExportedObject, InvariantViolation, LayerId, LevelObject, ObjectExtra, ObjectId, ObjectKey,
    ObjectSpec, ResidencyConfig, ResidencyError, ResidencyStats, ResidencyTracker, Viewport,
    DEFAULT_TILE_SIZE, DEFAULT_VICINITY_MARGIN, MAX_SCROLL,
};

pub const ROOT_ENV_VAR: &str = "SLE_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub levels_dir: PathBuf,
}

impl AppPaths {
    pub fn under_root(root: PathBuf) -> Self {
        Self {
            assets_dir: assets::assets_dir_under(&root),
            levels_dir: root.join("levels"),
            root,
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "SLE_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or data/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or data/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/level-editor\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    Ok(AppPaths::under_root(resolve_root()?))
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;
            find_root_above(&exe_dir).ok_or_else(|| StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn find_root_above(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|candidate| is_repo_marker(candidate))
        .map(normalize_path)
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_data = path.join("data").is_dir();

    cargo_toml && (has_crates || has_data)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
