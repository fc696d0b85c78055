use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::geometry::{IVec2, Rect, Size};

use super::bucketing::{bucket_objects, BucketingError};
use super::chunk::{Chunk, ChunkError, ChunkHandle};
use super::object::{
    ExportedObject, LayerId, LevelObject, ObjectId, ObjectKey, ObjectSpec, ObjectStore,
    LAYER_COUNT,
};

pub const DEFAULT_TILE_SIZE: Size = Size::new(320, 180);
pub const DEFAULT_VICINITY_MARGIN: IVec2 = IVec2::new(320, 180);
/// Largest scroll offset accepted on either axis, in both directions.
pub const MAX_SCROLL: i32 = 1 << 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResidencyConfig {
    pub tile_size: Size,
    /// Added on every side of the viewport to form the vicinity window.
    pub vicinity_margin: IVec2,
}

impl Default for ResidencyConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            vicinity_margin: DEFAULT_VICINITY_MARGIN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Exact on-screen rectangle, in screen coordinates.
    pub rect: Rect,
    /// Total scroll applied to level coordinates.
    pub scroll: IVec2,
}

impl Viewport {
    pub fn unscrolled(size: Size) -> Self {
        Self {
            rect: Rect::from_origin(IVec2::ZERO, size),
            scroll: IVec2::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResidencyStats {
    pub object_count: usize,
    pub chunk_count: usize,
    pub resident_count: usize,
    pub entered_last_update: usize,
    pub left_last_update: usize,
    pub working_object_count: usize,
    pub visible_object_count: usize,
    pub structural_updates: u64,
    pub skipped_updates: u64,
}

#[derive(Debug, Error)]
pub enum ResidencyError {
    #[error(transparent)]
    Bucketing(#[from] BucketingError),
    #[error(transparent)]
    Chunk(#[from] ChunkError),
    #[error("object {0:?} is not tracked")]
    UntrackedObject(ObjectId),
    #[error("object of kind '{kind}' has a zero-area size")]
    DegenerateObject { kind: String },
    #[error("object of kind '{kind}' at {x},{y} does not fit the coordinate range")]
    OutOfRange { kind: String, x: i32, y: i32 },
    #[error(
        "scroll from {},{} to {},{} is out of range (limit {} per axis)",
        .from.x, .from.y, .to.x, .to.y, MAX_SCROLL
    )]
    ScrollOutOfRange { from: IVec2, to: IVec2 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("object {object:?} has no owning chunk")]
    Unowned { object: ObjectId },
    #[error("object {object:?} claims chunk {claimed:?}, which does not list it")]
    OwnershipMismatch {
        object: ObjectId,
        claimed: ChunkHandle,
    },
    #[error("chunk {chunk:?} lists object {object:?}, which is missing or owned elsewhere")]
    DanglingMember { chunk: ChunkHandle, object: ObjectId },
    #[error("chunks {a:?} and {b:?} overlap")]
    ChunkOverlap { a: ChunkHandle, b: ChunkHandle },
    #[error("object {object:?} drifted from the origin of chunk {chunk:?}")]
    OffsetDrift { chunk: ChunkHandle, object: ObjectId },
    #[error("resident chunks disagree with the vicinity window")]
    ResidentMismatch,
    #[error("working set for {layer:?} disagrees with resident chunks")]
    WorkingSetMismatch { layer: LayerId },
    #[error("visible set for {layer:?} disagrees with the viewport")]
    VisibleSetMismatch { layer: LayerId },
}

/// Owns every chunk and object of a loaded level and keeps the per-layer
/// working sets in step with the viewport.
///
/// Chunk rects live in scrolled coordinates and are translated together on
/// every scroll. Object rects are only re-derived for resident chunks, so an
/// object's rect is current only while its chunk is resident.
#[derive(Debug)]
pub struct ResidencyTracker {
    config: ResidencyConfig,
    objects: ObjectStore,
    chunks: Vec<Chunk>,
    resident: BTreeSet<ChunkHandle>,
    working: [BTreeSet<ObjectId>; LAYER_COUNT],
    visible: [BTreeSet<ObjectId>; LAYER_COUNT],
    placements: HashMap<ObjectKey, ObjectId>,
    content_origin: Option<IVec2>,
    viewport: Viewport,
    stats: ResidencyStats,
}

impl ResidencyTracker {
    /// Empty level: no chunks and no content origin until the first insert.
    pub fn new(config: ResidencyConfig, viewport: Viewport) -> Self {
        Self {
            config,
            objects: ObjectStore::default(),
            chunks: Vec::new(),
            resident: BTreeSet::new(),
            working: Default::default(),
            visible: Default::default(),
            placements: HashMap::new(),
            content_origin: None,
            viewport,
            stats: ResidencyStats::default(),
        }
    }

    /// Bulk path: places every spec, buckets the lot into chunks and runs a
    /// first update. Records repeating an existing placement are skipped.
    pub fn load(
        config: ResidencyConfig,
        viewport: Viewport,
        specs: impl IntoIterator<Item = ObjectSpec>,
    ) -> Result<Self, ResidencyError> {
        let mut tracker = Self::new(config, viewport);
        let mut placed = Vec::new();

        for spec in specs {
            if spec.size.is_empty() {
                return Err(ResidencyError::DegenerateObject { kind: spec.kind });
            }
            check_in_range(&spec, viewport.scroll, config.tile_size)?;
            let key = spec.key();
            if tracker.placements.contains_key(&key) {
                warn!(
                    kind = %key.kind,
                    x = key.position.x,
                    y = key.position.y,
                    "level_record_duplicate_skipped"
                );
                continue;
            }
            let id = tracker.objects.insert(spec, viewport.scroll);
            tracker.placements.insert(key, id);
            if let Some(object) = tracker.objects.get(id) {
                placed.push((id, object.rect));
            }
        }

        if placed.is_empty() {
            info!("level_loaded_empty");
            tracker.refresh();
            return Ok(tracker);
        }

        let layout = bucket_objects(&placed, config.tile_size)?;
        tracker.content_origin = Some(layout.content_origin - viewport.scroll);
        for cell in layout.cells {
            let handle = ChunkHandle(tracker.chunks.len() as u32);
            let chunk = Chunk::new(handle, cell.rect, cell.members, &mut tracker.objects)?;
            tracker.chunks.push(chunk);
        }
        tracker.refresh();

        info!(
            object_count = tracker.objects.len(),
            chunk_count = tracker.chunks.len(),
            resident_count = tracker.resident.len(),
            content_origin = ?tracker.content_origin,
            "level_loaded"
        );
        Ok(tracker)
    }

    /// Moves every chunk by the scroll delta since the last viewport and
    /// recomputes residency and visibility.
    ///
    /// Fails without touching any state when the new scroll exceeds
    /// [`MAX_SCROLL`] or would push level content outside the `i32` range.
    pub fn apply_viewport(&mut self, viewport: Viewport) -> Result<(), ResidencyError> {
        let from = self.viewport.scroll;
        let to = viewport.scroll;
        let out_of_range = || ResidencyError::ScrollOutOfRange { from, to };
        let limit = MAX_SCROLL.unsigned_abs();
        if to.x.unsigned_abs() > limit || to.y.unsigned_abs() > limit {
            return Err(out_of_range());
        }
        let delta = to.checked_sub(from).ok_or_else(out_of_range)?;
        if delta != IVec2::ZERO {
            if !self.content_fits_after(delta) {
                return Err(out_of_range());
            }
            for chunk in &mut self.chunks {
                chunk.translate(delta);
            }
        }
        self.viewport = viewport;
        self.refresh();
        Ok(())
    }

    pub fn scroll_by(&mut self, delta: IVec2) -> Result<(), ResidencyError> {
        let from = self.viewport.scroll;
        let to = from
            .checked_add(delta)
            .ok_or(ResidencyError::ScrollOutOfRange {
                from,
                to: from.saturating_add(delta),
            })?;
        self.apply_viewport(Viewport {
            scroll: to,
            ..self.viewport
        })
    }

    pub fn reset_scroll(&mut self) -> Result<(), ResidencyError> {
        self.apply_viewport(Viewport {
            scroll: IVec2::ZERO,
            ..self.viewport
        })
    }

    /// Places a new object. Returns `Ok(None)` when the same kind already
    /// sits at the same level position.
    pub fn insert(&mut self, spec: ObjectSpec) -> Result<Option<ObjectId>, ResidencyError> {
        if spec.size.is_empty() {
            return Err(ResidencyError::DegenerateObject { kind: spec.kind });
        }
        check_in_range(&spec, self.viewport.scroll, self.config.tile_size)?;
        let key = spec.key();
        if self.placements.contains_key(&key) {
            debug!(
                kind = %key.kind,
                x = key.position.x,
                y = key.position.y,
                "placement_ignored_duplicate"
            );
            return Ok(None);
        }

        let layer = spec.layer;
        let id = self.objects.insert(spec, self.viewport.scroll);
        self.placements.insert(key, id);
        let rect = self
            .objects
            .get(id)
            .map(|object| object.rect)
            .ok_or(ResidencyError::UntrackedObject(id))?;

        match self.find_chunk_for(rect) {
            Some(handle) => {
                self.chunks[handle.0 as usize].add(id, &mut self.objects)?;
                // The next update skips structural work when residency is
                // unchanged, so a resident chunk admits the object here.
                if self.resident.contains(&handle) {
                    self.working[layer.index()].insert(id);
                }
                debug!(object = id.0, chunk = handle.0, "object_attached");
            }
            None => {
                let handle = self.synthesize_chunk(id, rect)?;
                debug!(object = id.0, chunk = handle.0, "chunk_synthesized");
            }
        }

        self.refresh();
        Ok(Some(id))
    }

    /// Removes a tracked object from its chunk and every working and visible
    /// set. The chunk is kept even when it becomes empty.
    pub fn remove(&mut self, id: ObjectId) -> Result<(), ResidencyError> {
        let (layer, owner) = match self.objects.get(id) {
            Some(object) => (object.layer, object.chunk),
            None => return Err(ResidencyError::UntrackedObject(id)),
        };
        debug_assert!(owner.is_some(), "tracked object {id:?} has no chunk");
        if let Some(handle) = owner {
            if let Some(chunk) = self.chunks.get_mut(handle.0 as usize) {
                chunk.remove(id, layer)?;
            }
        }
        self.working[layer.index()].remove(&id);
        self.visible[layer.index()].remove(&id);
        if let Some(removed) = self.objects.remove(id) {
            self.placements.remove(&removed.key);
        }
        self.update_counts();
        debug!(object = id.0, layer = layer.name(), "object_removed");
        self.debug_check();
        Ok(())
    }

    /// Topmost visible object containing `point`: highest layer first, then
    /// the most recently placed.
    pub fn hit_test(&self, point: IVec2) -> Option<ObjectId> {
        LayerId::ALL.into_iter().rev().find_map(|layer| {
            self.visible[layer.index()]
                .iter()
                .rev()
                .copied()
                .find(|id| self.object_contains(*id, point))
        })
    }

    /// Whether a working-set object of `kind` overlaps `rect`, given in
    /// screen coordinates.
    pub fn any_overlapping(&self, kind: &str, rect: Rect) -> bool {
        self.working
            .iter()
            .flatten()
            .filter_map(|id| self.objects.get(*id))
            .any(|object| object.kind() == kind && object.rect.intersects(&rect))
    }

    /// Removes every visible object under `point`.
    pub fn erase_at(&mut self, point: IVec2) -> Result<Vec<ObjectId>, ResidencyError> {
        let hits: Vec<ObjectId> = LayerId::ALL
            .into_iter()
            .flat_map(|layer| self.visible[layer.index()].iter().copied())
            .filter(|id| self.object_contains(*id, point))
            .collect();
        for id in &hits {
            self.remove(*id)?;
        }
        Ok(hits)
    }

    /// Current level content in persisted shape, grouped by layer and in
    /// placement order within a layer. Positions are derived from the owning
    /// chunk, so they are exact whether or not the chunk is resident.
    pub fn export(&self) -> Vec<ExportedObject> {
        let mut exported: Vec<ExportedObject> = self
            .objects
            .iter()
            .map(|object| {
                let position = self
                    .level_rect(object.id)
                    .map(|rect| rect.anchor_point(object.anchor))
                    .unwrap_or(object.key.position);
                debug_assert_eq!(
                    position, object.key.position,
                    "object {:?} position diverged from its placement",
                    object.id
                );
                ExportedObject {
                    layer: object.layer,
                    kind: object.key.kind.clone(),
                    position,
                    extra: object.extra.clone(),
                }
            })
            .collect();
        exported.sort_by_key(|object| object.layer);
        exported
    }

    /// Level-coordinate rect of an object, re-derived from its chunk.
    pub fn level_rect(&self, id: ObjectId) -> Option<Rect> {
        let rect = self.scrolled_rect(id)?;
        Some(Rect::from_origin(
            rect.top_left() - self.viewport.scroll,
            rect.size(),
        ))
    }

    pub fn screen_to_level(&self, point: IVec2) -> IVec2 {
        point - self.viewport.scroll
    }

    pub fn vicinity_rect(&self) -> Rect {
        self.viewport.rect.inflate(self.config.vicinity_margin)
    }

    pub fn visible_objects(&self) -> impl Iterator<Item = &LevelObject> + '_ {
        LayerId::ALL
            .into_iter()
            .flat_map(move |layer| self.visible_in_layer(layer))
    }

    pub fn visible_in_layer(&self, layer: LayerId) -> impl Iterator<Item = &LevelObject> + '_ {
        self.visible[layer.index()]
            .iter()
            .filter_map(move |id| self.objects.get(*id))
    }

    pub fn visible_ids(&self, layer: LayerId) -> &BTreeSet<ObjectId> {
        &self.visible[layer.index()]
    }

    pub fn working_set(&self, layer: LayerId) -> &BTreeSet<ObjectId> {
        &self.working[layer.index()]
    }

    pub fn resident_chunks(&self) -> &BTreeSet<ChunkHandle> {
        &self.resident
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, handle: ChunkHandle) -> Option<&Chunk> {
        self.chunks.get(handle.0 as usize)
    }

    pub fn object(&self, id: ObjectId) -> Option<&LevelObject> {
        self.objects.get(id)
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn content_origin(&self) -> Option<IVec2> {
        self.content_origin
    }

    pub fn config(&self) -> &ResidencyConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scroll(&self) -> IVec2 {
        self.viewport.scroll
    }

    pub fn stats(&self) -> ResidencyStats {
        self.stats
    }

    /// Checks every structural invariant the offset scheme depends on.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        for object in self.objects.iter() {
            let Some(claimed) = object.chunk else {
                return Err(InvariantViolation::Unowned { object: object.id });
            };
            let listed = self
                .chunk(claimed)
                .is_some_and(|chunk| chunk.contains(object.id));
            if !listed {
                return Err(InvariantViolation::OwnershipMismatch {
                    object: object.id,
                    claimed,
                });
            }
        }

        for chunk in &self.chunks {
            for id in chunk.objects() {
                let owned_here = self
                    .objects
                    .get(*id)
                    .is_some_and(|object| object.chunk == Some(chunk.handle()));
                if !owned_here {
                    return Err(InvariantViolation::DanglingMember {
                        chunk: chunk.handle(),
                        object: *id,
                    });
                }
            }
        }

        for (index, a) in self.chunks.iter().enumerate() {
            for b in &self.chunks[index + 1..] {
                if a.rect().intersects(&b.rect()) {
                    return Err(InvariantViolation::ChunkOverlap {
                        a: a.handle(),
                        b: b.handle(),
                    });
                }
            }
        }

        let vicinity = self.vicinity_rect();
        let expected_resident: BTreeSet<ChunkHandle> = self
            .chunks
            .iter()
            .filter(|chunk| chunk.rect().intersects(&vicinity))
            .map(Chunk::handle)
            .collect();
        if expected_resident != self.resident {
            return Err(InvariantViolation::ResidentMismatch);
        }

        for handle in &self.resident {
            let Some(chunk) = self.chunk(*handle) else {
                return Err(InvariantViolation::ResidentMismatch);
            };
            for id in chunk.objects() {
                let drifted = match (self.objects.get(*id), chunk.offset(*id)) {
                    (Some(object), Some(offset)) => {
                        object.rect.center() != chunk.rect().top_left() - offset
                    }
                    _ => true,
                };
                if drifted {
                    return Err(InvariantViolation::OffsetDrift {
                        chunk: *handle,
                        object: *id,
                    });
                }
            }
        }

        for layer in LayerId::ALL {
            let expected_working: BTreeSet<ObjectId> = self
                .resident
                .iter()
                .filter_map(|handle| self.chunk(*handle))
                .flat_map(|chunk| chunk.layer_objects(layer).iter().copied())
                .collect();
            if expected_working != self.working[layer.index()] {
                return Err(InvariantViolation::WorkingSetMismatch { layer });
            }

            let expected_visible: BTreeSet<ObjectId> = expected_working
                .iter()
                .copied()
                .filter(|id| {
                    self.objects
                        .get(*id)
                        .is_some_and(|object| object.rect.intersects(&self.viewport.rect))
                })
                .collect();
            if expected_visible != self.visible[layer.index()] {
                return Err(InvariantViolation::VisibleSetMismatch { layer });
            }
        }

        Ok(())
    }

    /// Full update: residency diff, admit/evict, reposition, visibility.
    fn refresh(&mut self) {
        let vicinity = self.vicinity_rect();
        let candidate: BTreeSet<ChunkHandle> = self
            .chunks
            .iter()
            .filter(|chunk| chunk.rect().intersects(&vicinity))
            .map(Chunk::handle)
            .collect();

        if candidate == self.resident {
            self.stats.entered_last_update = 0;
            self.stats.left_last_update = 0;
            self.stats.skipped_updates += 1;
            trace!(resident_count = self.resident.len(), "residency_unchanged");
        } else {
            let mut leaving = Vec::new();
            for handle in &self.resident {
                if !candidate.contains(handle) {
                    leaving.push(*handle);
                }
            }
            let mut entering = Vec::new();
            for handle in &candidate {
                if !self.resident.contains(handle) {
                    entering.push(*handle);
                }
            }

            // Evictions strictly before admissions.
            for handle in &leaving {
                self.evict_chunk(*handle);
            }
            for handle in &entering {
                self.admit_chunk(*handle);
            }
            self.resident = candidate;

            self.stats.entered_last_update = entering.len();
            self.stats.left_last_update = leaving.len();
            self.stats.structural_updates += 1;
            debug!(
                entered = entering.len(),
                left = leaving.len(),
                resident_count = self.resident.len(),
                "residency_changed"
            );
        }

        for handle in &self.resident {
            if let Some(chunk) = self.chunks.get(handle.0 as usize) {
                chunk.reposition(&mut self.objects);
            }
        }
        self.refresh_visible();
        self.update_counts();
        self.debug_check();
    }

    fn evict_chunk(&mut self, handle: ChunkHandle) {
        let Some(chunk) = self.chunks.get(handle.0 as usize) else {
            return;
        };
        for layer in LayerId::ALL {
            let working = &mut self.working[layer.index()];
            for id in chunk.layer_objects(layer) {
                working.remove(id);
            }
        }
    }

    fn admit_chunk(&mut self, handle: ChunkHandle) {
        let Some(chunk) = self.chunks.get(handle.0 as usize) else {
            return;
        };
        for layer in LayerId::ALL {
            self.working[layer.index()].extend(chunk.layer_objects(layer).iter().copied());
        }
    }

    fn refresh_visible(&mut self) {
        let screen = self.viewport.rect;
        for layer in LayerId::ALL {
            let visible = &mut self.visible[layer.index()];
            visible.clear();
            for id in &self.working[layer.index()] {
                if let Some(object) = self.objects.get(*id) {
                    if object.rect.intersects(&screen) {
                        visible.insert(*id);
                    }
                }
            }
        }
    }

    /// Resident chunks first, then every chunk, in handle order.
    fn find_chunk_for(&self, rect: Rect) -> Option<ChunkHandle> {
        let overlaps = |handle: &ChunkHandle| {
            self.chunk(*handle)
                .is_some_and(|chunk| chunk.rect().intersects(&rect))
        };
        self.resident.iter().copied().find(overlaps).or_else(|| {
            self.chunks
                .iter()
                .map(Chunk::handle)
                .find(|handle| overlaps(handle))
        })
    }

    /// Creates a singleton chunk on the grid cell holding the object's
    /// center. The first object of an empty level fixes the content origin.
    fn synthesize_chunk(&mut self, id: ObjectId, rect: Rect) -> Result<ChunkHandle, ResidencyError> {
        let scroll = self.viewport.scroll;
        let origin = *self
            .content_origin
            .get_or_insert(rect.top_left() - scroll);
        let level_center = rect.center() - scroll;
        let cell_start = |center: i32, origin: i32, scroll: i32, tile: u32| {
            let tile = i64::from(tile.max(1));
            let relative = i64::from(center) - i64::from(origin);
            let start =
                relative.div_euclid(tile) * tile + i64::from(origin) + i64::from(scroll);
            i32::try_from(start).ok()
        };
        let top_left = cell_start(level_center.x, origin.x, scroll.x, self.config.tile_size.w)
            .zip(cell_start(level_center.y, origin.y, scroll.y, self.config.tile_size.h))
            .map(|(x, y)| IVec2::new(x, y))
            .ok_or_else(|| ResidencyError::OutOfRange {
                kind: self
                    .objects
                    .get(id)
                    .map(|object| object.kind().to_string())
                    .unwrap_or_default(),
                x: level_center.x,
                y: level_center.y,
            })?;

        let handle = ChunkHandle(self.chunks.len() as u32);
        let chunk = Chunk::new(
            handle,
            Rect::from_origin(top_left, self.config.tile_size),
            [id],
            &mut self.objects,
        )?;
        self.chunks.push(chunk);
        Ok(handle)
    }

    /// Screen rect of an object derived from its chunk, current whether or
    /// not the chunk is resident.
    fn scrolled_rect(&self, id: ObjectId) -> Option<Rect> {
        let object = self.objects.get(id)?;
        let chunk = self.chunks.get(object.chunk?.0 as usize)?;
        let offset = chunk.offset(id)?;
        let mut rect = object.rect;
        rect.set_center(chunk.rect().top_left() - offset);
        Some(rect)
    }

    fn content_fits_after(&self, delta: IVec2) -> bool {
        let chunks_fit = self
            .chunks
            .iter()
            .all(|chunk| chunk.rect().checked_translated(delta).is_some());
        chunks_fit
            && self.objects.iter().all(|object| {
                self.scrolled_rect(object.id)
                    .and_then(|rect| rect.checked_translated(delta))
                    .is_some()
            })
    }

    fn object_contains(&self, id: ObjectId, point: IVec2) -> bool {
        self.objects
            .get(id)
            .is_some_and(|object| object.rect.contains_point(point))
    }

    fn update_counts(&mut self) {
        self.stats.object_count = self.objects.len();
        self.stats.chunk_count = self.chunks.len();
        self.stats.resident_count = self.resident.len();
        self.stats.working_object_count = self.working.iter().map(BTreeSet::len).sum();
        self.stats.visible_object_count = self.visible.iter().map(BTreeSet::len).sum();
    }

    fn debug_check(&self) {
        if cfg!(debug_assertions) {
            if let Err(violation) = self.validate() {
                panic!("residency invariant violated: {violation}");
            }
        }
    }
}

/// An object must fit the coordinate range with one tile of headroom on every
/// side, so the chunk holding it fits as well.
fn check_in_range(spec: &ObjectSpec, scroll: IVec2, tile: Size) -> Result<(), ResidencyError> {
    let headroom = i32::try_from(tile.w)
        .ok()
        .zip(i32::try_from(tile.h).ok())
        .map(|(w, h)| IVec2::new(w, h));
    spec.checked_level_rect()
        .and_then(|rect| rect.checked_translated(scroll))
        .zip(headroom)
        .filter(|(rect, headroom)| {
            rect.checked_translated(*headroom).is_some()
                && IVec2::ZERO
                    .checked_sub(*headroom)
                    .and_then(|back| rect.checked_translated(back))
                    .is_some()
        })
        .map(|_| ())
        .ok_or_else(|| ResidencyError::OutOfRange {
            kind: spec.kind.clone(),
            x: spec.position.x,
            y: spec.position.y,
        })
}
