use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::geometry::{IVec2, Rect};

use super::object::{LayerId, ObjectId, ObjectStore, LAYER_COUNT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("object {0:?} does not exist")]
    UnknownObject(ObjectId),
    #[error("object {object:?} is not owned by chunk {chunk:?}")]
    NotOwned { chunk: ChunkHandle, object: ObjectId },
}

/// Fixed-size region owning a set of objects and each object's center
/// offset from the chunk's top-left corner.
///
/// Invariant: after `reposition`, every owned object satisfies
/// `object.rect.center() == chunk.rect.top_left() - offset`.
#[derive(Debug, Clone)]
pub struct Chunk {
    handle: ChunkHandle,
    rect: Rect,
    objects: BTreeSet<ObjectId>,
    offsets: HashMap<ObjectId, IVec2>,
    by_layer: [BTreeSet<ObjectId>; LAYER_COUNT],
}

impl Chunk {
    pub(crate) fn new(
        handle: ChunkHandle,
        rect: Rect,
        members: impl IntoIterator<Item = ObjectId>,
        store: &mut ObjectStore,
    ) -> Result<Self, ChunkError> {
        let mut chunk = Self {
            handle,
            rect,
            objects: BTreeSet::new(),
            offsets: HashMap::new(),
            by_layer: Default::default(),
        };
        for id in members {
            chunk.add(id, store)?;
        }
        Ok(chunk)
    }

    /// Takes ownership of an object not currently owned by any chunk. The
    /// offset is captured against the chunk's current rect.
    pub(crate) fn add(&mut self, id: ObjectId, store: &mut ObjectStore) -> Result<(), ChunkError> {
        debug_assert!(
            !self.objects.contains(&id),
            "object {id:?} added twice to chunk {:?}",
            self.handle
        );
        let object = store.get_mut(id).ok_or(ChunkError::UnknownObject(id))?;
        debug_assert!(
            object.chunk.is_none(),
            "object {id:?} already owned by {:?}",
            object.chunk
        );
        let offset = self.rect.top_left() - object.rect.center();
        object.chunk = Some(self.handle);
        self.by_layer[object.layer.index()].insert(id);
        self.offsets.insert(id, offset);
        self.objects.insert(id);
        Ok(())
    }

    pub(crate) fn remove(&mut self, id: ObjectId, layer: LayerId) -> Result<(), ChunkError> {
        if !self.objects.remove(&id) {
            return Err(ChunkError::NotOwned {
                chunk: self.handle,
                object: id,
            });
        }
        self.by_layer[layer.index()].remove(&id);
        self.offsets.remove(&id);
        Ok(())
    }

    /// Re-derives every owned object's rect from the chunk origin and the
    /// stored offsets.
    pub(crate) fn reposition(&self, store: &mut ObjectStore) {
        let origin = self.rect.top_left();
        for (id, offset) in &self.offsets {
            if let Some(object) = store.get_mut(*id) {
                object.rect.set_center(origin - *offset);
            }
        }
    }

    pub(crate) fn translate(&mut self, delta: IVec2) {
        self.rect.translate(delta);
    }

    pub fn handle(&self) -> ChunkHandle {
        self.handle
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn objects(&self) -> &BTreeSet<ObjectId> {
        &self.objects
    }

    pub fn layer_objects(&self, layer: LayerId) -> &BTreeSet<ObjectId> {
        &self.by_layer[layer.index()]
    }

    pub fn offset(&self, id: ObjectId) -> Option<IVec2> {
        self.offsets.get(&id).copied()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Anchor, Size};
    use crate::world::object::{ObjectExtra, ObjectSpec};

    fn insert(store: &mut ObjectStore, layer: LayerId, x: i32, y: i32) -> ObjectId {
        store.insert(
            ObjectSpec {
                kind: "crate".to_string(),
                layer,
                anchor: Anchor::TopLeft,
                position: IVec2::new(x, y),
                size: Size::new(16, 16),
                extra: ObjectExtra::default(),
            },
            IVec2::ZERO,
        )
    }

    #[test]
    fn new_captures_offsets_and_back_references() {
        let mut store = ObjectStore::default();
        let a = insert(&mut store, LayerId::Blocks, 10, 20);
        let b = insert(&mut store, LayerId::Actors, 100, 0);
        let chunk = Chunk::new(ChunkHandle(3), Rect::new(0, 0, 320, 180), [a, b], &mut store)
            .expect("chunk");

        assert_eq!(chunk.offset(a), Some(IVec2::new(-18, -28)));
        assert_eq!(store.get(a).expect("a").chunk(), Some(ChunkHandle(3)));
        assert!(chunk.layer_objects(LayerId::Blocks).contains(&a));
        assert!(chunk.layer_objects(LayerId::Actors).contains(&b));
        assert_eq!(chunk.len(), 2);
    }

    #[test]
    fn reposition_follows_translation_without_drift() {
        let mut store = ObjectStore::default();
        let a = insert(&mut store, LayerId::Blocks, 10, 20);
        let mut chunk =
            Chunk::new(ChunkHandle(0), Rect::new(0, 0, 320, 180), [a], &mut store).expect("chunk");
        let original = store.get(a).expect("a").rect;

        for _ in 0..50 {
            chunk.translate(IVec2::new(7, -3));
            chunk.reposition(&mut store);
        }
        let moved = store.get(a).expect("a").rect;
        assert_eq!(moved, original.translated(IVec2::new(350, -150)));
        assert_eq!(
            moved.center(),
            chunk.rect().top_left() - chunk.offset(a).expect("offset")
        );

        chunk.translate(IVec2::new(-350, 150));
        chunk.reposition(&mut store);
        assert_eq!(store.get(a).expect("a").rect, original);
    }

    #[test]
    fn remove_untracked_object_is_rejected() {
        let mut store = ObjectStore::default();
        let a = insert(&mut store, LayerId::Blocks, 0, 0);
        let b = insert(&mut store, LayerId::Blocks, 16, 0);
        let mut chunk =
            Chunk::new(ChunkHandle(1), Rect::new(0, 0, 320, 180), [a], &mut store).expect("chunk");

        assert_eq!(
            chunk.remove(b, LayerId::Blocks),
            Err(ChunkError::NotOwned {
                chunk: ChunkHandle(1),
                object: b
            })
        );
        chunk.remove(a, LayerId::Blocks).expect("remove a");
        assert!(chunk.is_empty());
        assert!(chunk.layer_objects(LayerId::Blocks).is_empty());
        assert_eq!(chunk.offset(a), None);
    }
}
