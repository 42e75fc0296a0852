//! Raw capture input: the `.heapsnapshot` document as flat arrays.

use crate::error::HeapResult;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::io::Read;

/// Column type descriptor from `node_types` / `edge_types`.
///
/// The `type` column carries the enumeration of type names; every other
/// column is described by a plain tag such as `"string"` or `"number"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeDescriptor {
    Enum(Vec<String>),
    Tag(String),
}

/// Field-layout contract carried inside the snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotMeta {
    #[serde(default)]
    pub node_fields: Vec<String>,
    #[serde(default)]
    pub node_types: Vec<TypeDescriptor>,
    #[serde(default)]
    pub edge_fields: Vec<String>,
    #[serde(default)]
    pub edge_types: Vec<TypeDescriptor>,
}

/// The `snapshot` header block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotHeader {
    #[serde(default)]
    pub meta: SnapshotMeta,
    /// Declared node count, checked against the `nodes` array when present.
    #[serde(default)]
    pub node_count: Option<usize>,
    /// Declared edge count, checked against the `edges` array when present.
    #[serde(default)]
    pub edge_count: Option<usize>,
    #[serde(default)]
    pub root_index: Option<usize>,
}

/// A captured heap snapshot, already materialized in memory.
///
/// Numeric columns are kept as JSON numbers and validated during decoding,
/// so a negative or fractional value surfaces as an error instead of being
/// coerced silently. Integer literals keep their exact `u64` value; addresses
/// beyond 2^53 are never rounded together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSnapshot {
    pub snapshot: SnapshotHeader,
    #[serde(default)]
    pub nodes: Vec<Number>,
    #[serde(default)]
    pub edges: Vec<Number>,
    #[serde(default)]
    pub strings: Vec<String>,
}

impl RawSnapshot {
    pub fn from_json_str(json: &str) -> HeapResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_slice(bytes: &[u8]) -> HeapResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> HeapResult<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Index of the designated root node (0 unless the capture says otherwise).
    pub fn root_index(&self) -> usize {
        self.snapshot.root_index.unwrap_or(0)
    }
}
