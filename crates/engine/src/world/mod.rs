mod bucketing;
mod chunk;
mod object;
mod residency;


pub use bucketing::{bucket_objects, BucketingError, ChunkCell, ChunkLayout};
pub use chunk::{Chunk, ChunkError, ChunkHandle};
pub use object::{
    ExportedObject, LayerId, LevelObject, ObjectExtra, ObjectId, ObjectKey, ObjectSpec,
    ObjectStore, LAYER_COUNT,
};
pub use residency::{
    InvariantViolation, ResidencyConfig, ResidencyError, ResidencyStats, ResidencyTracker,
    Viewport, DEFAULT_TILE_SIZE, DEFAULT_VICINITY_MARGIN, MAX_SCROLL,
};
