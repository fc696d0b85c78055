use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// On-disk level document. Layer keys are kept as strings so an unknown
/// layer name is reported with its record location rather than as a parse
/// failure of the whole map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelFile {
    #[serde(default)]
    pub layered_objects: BTreeMap<String, Vec<ObjectRecord>>,
}

impl LevelFile {
    pub fn record_count(&self) -> usize {
        self.layered_objects.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub name: String,
    /// Anchor position in level coordinates.
    pub pos: [i32; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<[u32; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}
