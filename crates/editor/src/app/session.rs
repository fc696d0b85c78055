use std::path::{Path, PathBuf};

use serde::Serialize;
use sle_engine::{
    level_from_export, level_specs, read_level, snap_to_grid, write_level_atomic, AssetCatalog,
    AssetInfo, AssetResolver, IVec2, LayerId, LevelIoError, ObjectExtra, ObjectId, ObjectSpec,
    Rect, ResidencyError, ResidencyStats, ResidencyTracker, Viewport,
};
use thiserror::Error;
use tracing::{debug, info};

use super::bootstrap::EditorConfig;

#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("unknown asset '{0}'. try: assets")]
    UnknownAsset(String),
    #[error("asset '{0}' is seamless. use: place_area")]
    SeamlessNeedsArea(String),
    #[error("asset '{0}' is not seamless. use: place")]
    AreaNeedsSeamless(String),
    #[error("asset '{name}' is on layer {layer}, labels need the labels layer")]
    NotALabel { name: String, layer: &'static str },
    #[error("point {x},{y} is off screen")]
    OffScreen { x: i32, y: i32 },
    #[error("step count {0} is too large")]
    TooManySteps(u32),
    #[error(transparent)]
    Residency(#[from] ResidencyError),
    #[error(transparent)]
    Level(#[from] LevelIoError),
    #[error("failed to encode json: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    /// Content moves opposite to the camera.
    fn content_delta(self, step: i32) -> IVec2 {
        match self {
            Self::Up => IVec2::new(0, step),
            Self::Down => IVec2::new(0, -step),
            Self::Left => IVec2::new(step, 0),
            Self::Right => IVec2::new(-step, 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PlaceOutcome {
    Placed { id: ObjectId, position: IVec2 },
    AlreadyPresent { position: IVec2 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ObjectRow {
    pub(crate) id: u32,
    pub(crate) layer: LayerId,
    pub(crate) kind: String,
    /// Screen-space top-left.
    pub(crate) screen: [i32; 2],
    pub(crate) size: [u32; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) text: Option<String>,
}

/// One open level: the asset catalog, the residency tracker holding the
/// level content, and where to save it.
pub(crate) struct EditorSession {
    config: EditorConfig,
    catalog: AssetCatalog,
    tracker: ResidencyTracker,
    level_path: PathBuf,
    unsaved_changes: bool,
}

impl EditorSession {
    pub(crate) fn open(
        config: EditorConfig,
        catalog: AssetCatalog,
        level_path: PathBuf,
    ) -> Result<Self, SessionError> {
        let specs = match read_level(&level_path)? {
            Some(level) => level_specs(&level, &catalog)?,
            None => Vec::new(),
        };
        let viewport = Viewport::unscrolled(config.screen);
        let tracker = ResidencyTracker::load(config.residency, viewport, specs)?;
        info!(
            level_path = %level_path.display(),
            object_count = tracker.object_count(),
            chunk_count = tracker.chunks().len(),
            "session_opened"
        );
        Ok(Self {
            config,
            catalog,
            tracker,
            level_path,
            unsaved_changes: false,
        })
    }

    pub(crate) fn asset_names(&self) -> impl Iterator<Item = &str> {
        self.catalog.names()
    }

    pub(crate) fn asset(&self, name: &str) -> Option<&AssetInfo> {
        self.catalog.resolve(name)
    }

    /// Places a regular asset with its anchor on the unit cell under `screen`.
    pub(crate) fn place(
        &mut self,
        name: &str,
        screen: IVec2,
    ) -> Result<PlaceOutcome, SessionError> {
        let asset = self.require_asset(name)?;
        if asset.seamless {
            return Err(SessionError::SeamlessNeedsArea(name.to_string()));
        }
        let cell = self.unit_cell_at(screen)?;
        let position = self.tracker.screen_to_level(cell.anchor_point(asset.anchor));
        let spec = asset.object_spec(position, ObjectExtra::default());
        self.insert(spec)
    }

    /// Places a seamless asset filling the union of the unit cells under
    /// both corners. An area overlapping a loaded area of the same asset is
    /// ignored.
    pub(crate) fn place_area(
        &mut self,
        name: &str,
        from: IVec2,
        to: IVec2,
    ) -> Result<PlaceOutcome, SessionError> {
        let asset = self.require_asset(name)?;
        if !asset.seamless {
            return Err(SessionError::AreaNeedsSeamless(name.to_string()));
        }
        let area = self.unit_cell_at(from)?.union(&self.unit_cell_at(to)?);
        let position = self.tracker.screen_to_level(area.anchor_point(asset.anchor));
        if self.tracker.any_overlapping(&asset.name, area) {
            debug!(
                asset = %asset.name,
                x = position.x,
                y = position.y,
                "area_overlaps_existing"
            );
            return Ok(PlaceOutcome::AlreadyPresent { position });
        }
        let extra = ObjectExtra {
            size: Some(area.size()),
            text: None,
        };
        let spec = asset.object_spec(position, extra);
        self.insert(spec)
    }

    pub(crate) fn label(
        &mut self,
        name: &str,
        screen: IVec2,
        text: String,
    ) -> Result<PlaceOutcome, SessionError> {
        let asset = self.require_asset(name)?;
        if asset.layer != LayerId::Labels {
            return Err(SessionError::NotALabel {
                name: name.to_string(),
                layer: asset.layer.name(),
            });
        }
        let cell = self.unit_cell_at(screen)?;
        let position = self.tracker.screen_to_level(cell.anchor_point(asset.anchor));
        let extra = ObjectExtra {
            size: None,
            text: Some(text),
        };
        let spec = asset.object_spec(position, extra);
        self.insert(spec)
    }

    pub(crate) fn erase(&mut self, screen: IVec2) -> Result<Vec<ObjectId>, SessionError> {
        let erased = self.tracker.erase_at(screen)?;
        if !erased.is_empty() {
            self.unsaved_changes = true;
            debug!(count = erased.len(), x = screen.x, y = screen.y, "objects_erased");
        }
        Ok(erased)
    }

    pub(crate) fn pick(&self, screen: IVec2) -> Option<ObjectRow> {
        let id = self.tracker.hit_test(screen)?;
        self.row(id)
    }

    pub(crate) fn scroll(&mut self, delta: IVec2) -> Result<(), SessionError> {
        Ok(self.tracker.scroll_by(delta)?)
    }

    pub(crate) fn move_view(
        &mut self,
        direction: ScrollDirection,
        steps: u32,
    ) -> Result<(), SessionError> {
        let distance = i32::try_from(steps)
            .ok()
            .and_then(|steps| self.config.scroll_step.checked_mul(steps))
            .ok_or(SessionError::TooManySteps(steps))?;
        self.scroll(direction.content_delta(distance))
    }

    pub(crate) fn home(&mut self) -> Result<(), SessionError> {
        Ok(self.tracker.reset_scroll()?)
    }

    pub(crate) fn scroll_offset(&self) -> IVec2 {
        self.tracker.scroll()
    }

    /// Visible objects in draw order.
    pub(crate) fn visible_rows(&self) -> Vec<ObjectRow> {
        self.tracker
            .visible_objects()
            .filter_map(|object| self.row(object.id))
            .collect()
    }

    pub(crate) fn stats(&self) -> ResidencyStats {
        self.tracker.stats()
    }

    pub(crate) fn level_json(&self) -> Result<String, SessionError> {
        let level = level_from_export(&self.tracker.export());
        Ok(serde_json::to_string_pretty(&level)?)
    }

    pub(crate) fn save(&mut self) -> Result<&Path, SessionError> {
        let level = level_from_export(&self.tracker.export());
        write_level_atomic(&self.level_path, &level)?;
        self.unsaved_changes = false;
        Ok(&self.level_path)
    }

    pub(crate) fn has_unsaved_changes(&self) -> bool {
        self.unsaved_changes
    }

    #[cfg(test)]
    pub(crate) fn tracker(&self) -> &ResidencyTracker {
        &self.tracker
    }

    fn require_asset(&self, name: &str) -> Result<AssetInfo, SessionError> {
        self.catalog
            .resolve(name)
            .cloned()
            .ok_or_else(|| SessionError::UnknownAsset(name.to_string()))
    }

    fn unit_cell_at(&self, screen: IVec2) -> Result<Rect, SessionError> {
        if !self.tracker.viewport().rect.contains_point(screen) {
            return Err(SessionError::OffScreen {
                x: screen.x,
                y: screen.y,
            });
        }
        let top_left = snap_to_grid(screen, self.tracker.scroll(), self.config.unit);
        Ok(Rect::from_origin(top_left, self.config.unit))
    }

    fn insert(&mut self, spec: ObjectSpec) -> Result<PlaceOutcome, SessionError> {
        let position = spec.position;
        match self.tracker.insert(spec)? {
            Some(id) => {
                self.unsaved_changes = true;
                Ok(PlaceOutcome::Placed { id, position })
            }
            None => Ok(PlaceOutcome::AlreadyPresent { position }),
        }
    }

    fn row(&self, id: ObjectId) -> Option<ObjectRow> {
        let object = self.tracker.object(id)?;
        let size = object.rect.size();
        Some(ObjectRow {
            id: id.0,
            layer: object.layer,
            kind: object.kind().to_string(),
            screen: [object.rect.x, object.rect.y],
            size: [size.w, size.h],
            text: object.extra.text.clone(),
        })
    }
}
