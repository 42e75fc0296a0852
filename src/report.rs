//! Orchestrator: decode, analyze, rank, assemble.

use crate::decoder::decode;
use crate::engine::HeapAnalysisEngine;
use crate::error::HeapResult;
use crate::graph::HeapGraph;
use crate::ranking::{rank, LeakCandidate, RankConfig};
use crate::snapshot::RawSnapshot;
use serde::Serialize;
use tracing::info;

/// Diagnostic report for one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct HeapReport<A, S> {
    /// Decoded graph, annotated with retained sizes and distances.
    #[serde(flatten)]
    pub graph: HeapGraph,
    pub leak_candidates: Vec<LeakCandidate>,
    pub statistics: S,
    pub aggregates: A,
}

impl<A, S> HeapReport<A, S> {
    pub fn root_index(&self) -> usize {
        self.graph.root_index()
    }
}

/// Run the full pipeline over one snapshot.
pub fn produce_report<E: HeapAnalysisEngine>(
    raw: &RawSnapshot,
    engine: &E,
    config: &RankConfig,
) -> HeapResult<HeapReport<E::Aggregates, E::Statistics>> {
    let mut graph = decode(raw)?;
    let output = engine.analyze(&graph);
    let root_index = graph.root_index();
    let leak_candidates = rank(
        root_index,
        &output.retained_sizes,
        &output.distances,
        &mut graph,
        config,
    )?;

    info!(
        nodes = graph.node_count(),
        root_index,
        candidates = leak_candidates.len(),
        "heap report assembled"
    );

    Ok(HeapReport {
        graph,
        leak_candidates,
        statistics: output.statistics,
        aggregates: output.aggregates,
    })
}
