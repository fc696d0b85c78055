use std::path::PathBuf;

use sle_engine::{
    find_level_file, resolve_app_paths, AssetCatalog, AssetCatalogError, IVec2, LevelIoError,
    ResidencyConfig, Size, StartupError,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::session::{EditorSession, SessionError};

const TILE_SIZE_ENV_VAR: &str = "SLE_TILE_SIZE";
const VICINITY_MARGIN_ENV_VAR: &str = "SLE_VICINITY_MARGIN";
const SCROLL_STEP_ENV_VAR: &str = "SLE_SCROLL_STEP";

pub(crate) const SCREEN_SIZE: Size = Size::new(320, 180);
pub(crate) const UNIT_SIZE: Size = Size::new(16, 16);
pub(crate) const DEFAULT_SCROLL_STEP: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EditorConfig {
    pub(crate) residency: ResidencyConfig,
    pub(crate) screen: Size,
    pub(crate) unit: Size,
    /// Pixels scrolled per `move` step.
    pub(crate) scroll_step: i32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            residency: ResidencyConfig::default(),
            screen: SCREEN_SIZE,
            unit: UNIT_SIZE,
            scroll_step: DEFAULT_SCROLL_STEP,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum ConfigError {
    #[error("{var} must look like <w>x<h> with positive integers, got '{value}'")]
    InvalidSize { var: &'static str, value: String },
    #[error("{var} must look like <x>x<y> with non-negative integers, got '{value}'")]
    InvalidMargin { var: &'static str, value: String },
    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidStep { var: &'static str, value: String },
}

impl EditorConfig {
    pub(crate) fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(TILE_SIZE_ENV_VAR) {
            config.residency.tile_size = parse_pair(&raw)
                .filter(|(w, h)| *w > 0 && *h > 0)
                .map(|(w, h)| Size::new(w as u32, h as u32))
                .ok_or_else(|| ConfigError::InvalidSize {
                    var: TILE_SIZE_ENV_VAR,
                    value: raw.clone(),
                })?;
        }
        if let Some(raw) = lookup(VICINITY_MARGIN_ENV_VAR) {
            config.residency.vicinity_margin = parse_pair(&raw)
                .filter(|(x, y)| *x >= 0 && *y >= 0)
                .map(|(x, y)| IVec2::new(x, y))
                .ok_or_else(|| ConfigError::InvalidMargin {
                    var: VICINITY_MARGIN_ENV_VAR,
                    value: raw.clone(),
                })?;
        }
        if let Some(raw) = lookup(SCROLL_STEP_ENV_VAR) {
            config.scroll_step = raw
                .trim()
                .parse::<i32>()
                .ok()
                .filter(|step| *step > 0)
                .ok_or_else(|| ConfigError::InvalidStep {
                    var: SCROLL_STEP_ENV_VAR,
                    value: raw.clone(),
                })?;
        }

        Ok(config)
    }
}

fn parse_pair(raw: &str) -> Option<(i32, i32)> {
    let (a, b) = raw.trim().split_once(|c: char| c == 'x' || c == 'X')?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Assets(#[from] AssetCatalogError),
    #[error(transparent)]
    Level(#[from] LevelIoError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

pub(crate) struct EditorWiring {
    pub(crate) session: EditorSession,
    pub(crate) level_path: PathBuf,
}

pub(crate) fn build_app() -> Result<EditorWiring, BootstrapError> {
    init_tracing();
    info!("=== Scaled Level Editor Startup ===");

    let config = EditorConfig::from_env()?;
    let app_paths = resolve_app_paths()?;
    let catalog = AssetCatalog::discover(&app_paths.assets_dir)?;
    let level_path = find_level_file(&app_paths.levels_dir)?;
    info!(
        root = %app_paths.root.display(),
        level_path = %level_path.display(),
        tile_w = config.residency.tile_size.w,
        tile_h = config.residency.tile_size.h,
        scroll_step = config.scroll_step,
        "editor_paths_resolved"
    );

    let session = EditorSession::open(config, catalog, level_path.clone())?;
    Ok(EditorWiring {
        session,
        level_path,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
