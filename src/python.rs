use crate::engine::PrecomputedEngine;
use crate::error::HeapError;
use crate::graph::{EdgeRef, HeapGraph};
use crate::ranking::{rank, RankConfig};
use crate::report::produce_report;
use crate::snapshot::RawSnapshot;
use pyo3::exceptions::{PyKeyError, PyValueError};
use pyo3::prelude::*;

impl From<HeapError> for PyErr {
    fn from(err: HeapError) -> PyErr {
        PyValueError::new_err(format!("{}: {err}", err.kind()))
    }
}

/// A decoded heap snapshot held on the Rust side.
#[pyclass]
pub struct HeapSnapshot {
    graph: HeapGraph,
}

#[pymethods]
impl HeapSnapshot {
    /// Decodes a `.heapsnapshot` JSON document.
    #[new]
    pub fn new(snapshot_json: &str) -> PyResult<Self> {
        let raw = RawSnapshot::from_json_str(snapshot_json)?;
        let graph = crate::decoder::decode(&raw)?;
        Ok(HeapSnapshot { graph })
    }

    #[getter]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[getter]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[getter]
    pub fn root_index(&self) -> usize {
        self.graph.root_index()
    }

    #[getter]
    pub fn root_id(&self) -> String {
        self.graph.root_id().to_string()
    }

    /// Returns `(id, type, name, self_size, retain_size)` for a node index.
    pub fn node(&self, index: usize) -> Option<(String, String, String, u64, u64)> {
        self.graph.node(index).map(|n| {
            (
                n.id.to_string(),
                n.node_type.to_string(),
                n.name.to_string(),
                n.self_size,
                n.retain_size,
            )
        })
    }

    /// Returns `(id, edge type, name_or_index)` for every node pointing at `id`.
    pub fn retainers(&self, id: &str) -> PyResult<Vec<(String, String, String)>> {
        let index = self.lookup(id)?;
        Ok(self.graph.retainers(index).iter().map(edge_tuple).collect())
    }

    /// Returns `(id, edge type, name_or_index)` for every node `id` points at.
    pub fn references(&self, id: &str) -> PyResult<Vec<(String, String, String)>> {
        let index = self.lookup(id)?;
        Ok(self.graph.references(index).iter().map(edge_tuple).collect())
    }

    /// Applies engine results and returns `(index, id, size)` leak candidates.
    #[pyo3(signature = (retained_sizes, distances, limit = 5))]
    pub fn leak_candidates(
        &mut self,
        retained_sizes: Vec<u64>,
        distances: Vec<u64>,
        limit: usize,
    ) -> PyResult<Vec<(usize, String, u64)>> {
        let root_index = self.graph.root_index();
        let config = RankConfig::default().with_limit(limit);
        let candidates = rank(root_index, &retained_sizes, &distances, &mut self.graph, &config)?;
        Ok(candidates
            .into_iter()
            .map(|c| (c.index, c.id.to_string(), c.size))
            .collect())
    }
}

impl HeapSnapshot {
    fn lookup(&self, id: &str) -> PyResult<usize> {
        self.graph
            .index_of(id)
            .ok_or_else(|| PyKeyError::new_err(id.to_string()))
    }
}

fn edge_tuple(edge: &EdgeRef) -> (String, String, String) {
    (
        edge.id.to_string(),
        edge.edge_type.to_string(),
        edge.name_or_index.to_string(),
    )
}

/// Decodes, ranks and returns the full report as JSON.
#[pyfunction]
#[pyo3(signature = (snapshot_json, retained_sizes, distances, limit = 5))]
pub fn analyze(
    snapshot_json: &str,
    retained_sizes: Vec<u64>,
    distances: Vec<u64>,
    limit: usize,
) -> PyResult<String> {
    let raw = RawSnapshot::from_json_str(snapshot_json)?;
    let engine = PrecomputedEngine::from_arrays(retained_sizes, distances);
    let report = produce_report(&raw, &engine, &RankConfig::default().with_limit(limit))?;
    Ok(serde_json::to_string(&report).map_err(HeapError::from)?)
}
