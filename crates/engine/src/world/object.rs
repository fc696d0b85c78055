use serde::{Deserialize, Serialize};

use crate::geometry::{Anchor, IVec2, Rect, Size};

use super::chunk::ChunkHandle;

pub const LAYER_COUNT: usize = 5;

/// Logical layer, in draw order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LayerId {
    BackProps,
    MiddleProps,
    Blocks,
    Actors,
    Labels,
}

impl LayerId {
    pub const ALL: [LayerId; LAYER_COUNT] = [
        LayerId::BackProps,
        LayerId::MiddleProps,
        LayerId::Blocks,
        LayerId::Actors,
        LayerId::Labels,
    ];

    pub const fn index(self) -> usize {
        match self {
            LayerId::BackProps => 0,
            LayerId::MiddleProps => 1,
            LayerId::Blocks => 2,
            LayerId::Actors => 3,
            LayerId::Labels => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LayerId::BackProps => "backprops",
            LayerId::MiddleProps => "middleprops",
            LayerId::Blocks => "blocks",
            LayerId::Actors => "actors",
            LayerId::Labels => "labels",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        LayerId::ALL.into_iter().find(|layer| layer.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

/// Placement identity. `position` is the unscrolled anchor position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub kind: String,
    pub position: IVec2,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectExtra {
    /// Explicit area for seamless assets; overrides the asset's natural size.
    pub size: Option<Size>,
    pub text: Option<String>,
}

/// Everything needed to place an object, with its position in level
/// (unscrolled) coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSpec {
    pub kind: String,
    pub layer: LayerId,
    pub anchor: Anchor,
    pub position: IVec2,
    pub size: Size,
    pub extra: ObjectExtra,
}

impl ObjectSpec {
    pub fn key(&self) -> ObjectKey {
        ObjectKey {
            kind: self.kind.clone(),
            position: self.position,
        }
    }

    pub(crate) fn level_rect(&self) -> Rect {
        Rect::anchored(self.anchor, self.position, self.size)
    }

    pub(crate) fn checked_level_rect(&self) -> Option<Rect> {
        Rect::checked_anchored(self.anchor, self.position, self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedObject {
    pub layer: LayerId,
    pub kind: String,
    pub position: IVec2,
    pub extra: ObjectExtra,
}

#[derive(Debug, Clone)]
pub struct LevelObject {
    pub id: ObjectId,
    pub key: ObjectKey,
    pub layer: LayerId,
    pub anchor: Anchor,
    pub extra: ObjectExtra,
    /// Scrolled rect; only current while the owning chunk is resident.
    pub rect: Rect,
    pub(crate) chunk: Option<ChunkHandle>,
}

impl LevelObject {
    pub fn kind(&self) -> &str {
        &self.key.kind
    }

    pub fn chunk(&self) -> Option<ChunkHandle> {
        self.chunk
    }
}

/// Arena of live objects. Ids are allocated monotonically and never reused.
#[derive(Debug, Default)]
pub struct ObjectStore {
    slots: Vec<Option<LevelObject>>,
    live: usize,
}

impl ObjectStore {
    pub(crate) fn insert(&mut self, spec: ObjectSpec, scroll: IVec2) -> ObjectId {
        let id = ObjectId(self.slots.len() as u32);
        let rect = spec.level_rect().translated(scroll);
        let key = spec.key();
        self.slots.push(Some(LevelObject {
            id,
            key,
            layer: spec.layer,
            anchor: spec.anchor,
            extra: spec.extra,
            rect,
            chunk: None,
        }));
        self.live += 1;
        id
    }

    pub(crate) fn remove(&mut self, id: ObjectId) -> Option<LevelObject> {
        let removed = self.slots.get_mut(id.0 as usize).and_then(Option::take);
        if removed.is_some() {
            self.live -= 1;
        }
        removed
    }

    pub fn get(&self, id: ObjectId) -> Option<&LevelObject> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, id: ObjectId) -> Option<&mut LevelObject> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &LevelObject> {
        self.slots.iter().filter_map(Option::as_ref)
    }
}
