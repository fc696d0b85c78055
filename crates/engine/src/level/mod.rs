mod atomic_io;
mod format;
mod storage;

pub use format::{LevelFile, ObjectRecord};
pub use storage::{
    ensure_levels_dir, find_level_file, level_from_export, level_specs, read_level,
    write_level_atomic, LevelIoError, DEFAULT_LEVEL_FILE_NAME, LEVEL_FILE_EXTENSION,
};
