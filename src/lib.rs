//! Heap snapshot decoding and leak-candidate ranking.
//!
//! A captured snapshot (flat `nodes`/`edges` arrays plus a string table and
//! a self-describing field layout) is decoded into a [`HeapGraph`] with
//! bidirectional adjacency. An injected [`HeapAnalysisEngine`] supplies
//! retained sizes and distances, and [`rank`] selects the nodes most likely
//! responsible for a leak.

pub mod decoder;
pub mod engine;
pub mod error;
pub mod graph;
pub mod ranking;
pub mod report;
pub mod schema;
pub mod snapshot;

#[cfg(feature = "python")]
mod python;

pub use decoder::decode;
pub use engine::{EngineOutput, HeapAnalysisEngine, PrecomputedEngine, UNREACHABLE_DISTANCE};
pub use error::{HeapError, HeapResult};
pub use graph::{Adjacency, Edge, EdgeRef, HeapGraph, Node};
pub use ranking::{rank, LeakCandidate, RankConfig};
pub use report::{produce_report, HeapReport};
pub use schema::FieldSchema;
pub use snapshot::{RawSnapshot, SnapshotHeader, SnapshotMeta, TypeDescriptor};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// A Python module implemented in Rust.
#[cfg(feature = "python")]
#[pymodule]
fn heapsight(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<python::HeapSnapshot>()?;
    m.add_function(wrap_pyfunction!(python::analyze, m)?)?;
    Ok(())
}
