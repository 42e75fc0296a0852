//! Error taxonomy for snapshot decoding and leak ranking.
//!
//! Every variant aborts the current call; no partial graph or report is
//! ever returned.

/// Errors raised while decoding a snapshot or producing a report.
#[derive(Debug, thiserror::Error)]
pub enum HeapError {
    /// Field-layout metadata is missing, empty or inconsistent.
    #[error("Malformed snapshot schema: {0}")]
    MalformedSchema(String),

    /// A value indexes outside the strings table, a type table or the node array.
    #[error("Corrupt reference in {field} at offset {offset}: {reason}")]
    CorruptReference {
        field: &'static str,
        offset: usize,
        reason: String,
    },

    /// The edges array is shorter than the sum of declared edge counts.
    #[error(
        "Truncated snapshot at node {node_index}: edge span needs {required} values from offset {edge_offset}, {available} available"
    )]
    TruncatedSnapshot {
        node_index: usize,
        edge_offset: usize,
        required: usize,
        available: usize,
    },

    /// Engine results are not aligned 1:1 with the decoded nodes.
    #[error(
        "Engine output mismatch: {nodes} nodes, {retained_sizes} retained sizes, {distances} distances"
    )]
    EngineOutputMismatch {
        nodes: usize,
        retained_sizes: usize,
        distances: usize,
    },

    #[error("Invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl HeapError {
    /// Stable code identifying the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            HeapError::MalformedSchema(_) => "malformed_schema",
            HeapError::CorruptReference { .. } => "corrupt_reference",
            HeapError::TruncatedSnapshot { .. } => "truncated_snapshot",
            HeapError::EngineOutputMismatch { .. } => "engine_output_mismatch",
            HeapError::Json(_) => "invalid_json",
        }
    }

    pub(crate) fn corrupt(field: &'static str, offset: usize, reason: impl Into<String>) -> Self {
        HeapError::CorruptReference {
            field,
            offset,
            reason: reason.into(),
        }
    }
}

pub type HeapResult<T> = Result<T, HeapError>;
